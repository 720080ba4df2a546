/*++

Licensed under the Apache-2.0 license.

File Name:

    memory.rs

Abstract:

    File contains the emulated host memory reachable by the DMA engines.

--*/

use std::cell::RefCell;
use std::rc::Rc;

/// Byte addressable host memory window starting at `base`.
#[derive(Clone)]
pub struct HostMemory {
    base: u64,
    ram: Rc<RefCell<Vec<u8>>>,
}

impl HostMemory {
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            ram: Rc::new(RefCell::new(vec![0; size])),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    fn range(&self, addr: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr.checked_sub(self.base)?).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.ram.borrow().len()).then_some(start..end)
    }

    /// Returns false if the range falls outside the window.
    pub fn write(&self, addr: u64, data: &[u8]) -> bool {
        match self.range(addr, data.len()) {
            Some(range) => {
                self.ram.borrow_mut()[range].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    pub fn read_into(&self, addr: u64, buf: &mut [u8]) -> bool {
        match self.range(addr, buf.len()) {
            Some(range) => {
                buf.copy_from_slice(&self.ram.borrow()[range]);
                true
            }
            None => false,
        }
    }

    pub fn read(&self, addr: u64, len: usize) -> Option<Vec<u8>> {
        let mut buf = vec![0; len];
        self.read_into(addr, &mut buf).then_some(buf)
    }
}
