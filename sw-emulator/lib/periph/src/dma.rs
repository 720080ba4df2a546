/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains the emulated DMA engine. Transfers complete after a
    configurable number of status polls and deliver host memory into the
    emulated hash engines, through the AES engine or back into host memory.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use asufw_drivers::{AsufwError, AsufwResult, DmaDest, DmaEngine, DmaStatus, DmaTransfer, ShaId};

use crate::{EmuAes, EmuSha, HostMemory};

const DEFAULT_LATENCY: u32 = 2;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum State {
    Idle,
    Busy { xfer: DmaTransfer, polls_left: u32 },
    Done,
    Error,
}

struct DmaModel {
    state: State,
    latency: u32,
    stall: bool,
    fail_next: bool,
    transfers: u32,
}

/// Emulated DMA engine; clones share the same engine.
#[derive(Clone)]
pub struct EmuDma {
    model: Rc<RefCell<DmaModel>>,
    memory: HostMemory,
    sha2: EmuSha,
    sha3: EmuSha,
    aes: EmuAes,
}

impl EmuDma {
    pub fn new(memory: HostMemory, sha2: EmuSha, sha3: EmuSha, aes: EmuAes) -> Self {
        Self {
            model: Rc::new(RefCell::new(DmaModel {
                state: State::Idle,
                latency: DEFAULT_LATENCY,
                stall: false,
                fail_next: false,
                transfers: 0,
            })),
            memory,
            sha2,
            sha3,
            aes,
        }
    }

    /// Number of status polls a transfer stays busy.
    pub fn set_latency(&self, polls: u32) {
        self.model.borrow_mut().latency = polls;
    }

    /// Keep transfers busy forever.
    pub fn set_stall(&self, stall: bool) {
        self.model.borrow_mut().stall = stall;
    }

    /// Report an error for the next transfer.
    pub fn fail_next(&self) {
        self.model.borrow_mut().fail_next = true;
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.model.borrow().state, State::Busy { .. })
    }

    /// Transfers started since creation.
    pub fn transfer_count(&self) -> u32 {
        self.model.borrow().transfers
    }

    fn perform(&self, xfer: &DmaTransfer) -> bool {
        let Ok(len) = usize::try_from(xfer.len) else {
            return false;
        };
        let Some(mut data) = self.memory.read(xfer.src, len) else {
            return false;
        };
        match xfer.dest {
            DmaDest::Sha(ShaId::Sha2) => self.sha2.absorb(&data, xfer.last),
            DmaDest::Sha(ShaId::Sha3) => self.sha3.absorb(&data, xfer.last),
            DmaDest::Host(addr) => return self.memory.write(addr, &data),
            DmaDest::Aes(addr) => {
                self.aes.transform(&mut data);
                return self.memory.write(addr, &data);
            }
        }
        true
    }
}

impl DmaEngine for EmuDma {
    fn start(&mut self, xfer: DmaTransfer) -> AsufwResult<()> {
        let mut model = self.model.borrow_mut();
        if matches!(model.state, State::Busy { .. }) {
            return Err(AsufwError::DMA_BUSY);
        }
        model.transfers += 1;
        model.state = State::Busy {
            xfer,
            polls_left: model.latency,
        };
        Ok(())
    }

    fn status(&mut self) -> DmaStatus {
        let state = self.model.borrow().state;
        match state {
            State::Idle => DmaStatus::Idle,
            State::Done => DmaStatus::Done,
            State::Error => DmaStatus::Error,
            State::Busy { xfer, polls_left } => {
                let mut model = self.model.borrow_mut();
                if model.stall {
                    return DmaStatus::Busy;
                }
                if polls_left > 0 {
                    model.state = State::Busy {
                        xfer,
                        polls_left: polls_left - 1,
                    };
                    return DmaStatus::Busy;
                }
                let fail = std::mem::take(&mut model.fail_next);
                drop(model);
                let ok = !fail && self.perform(&xfer);
                let (state, status) = if ok {
                    (State::Done, DmaStatus::Done)
                } else {
                    (State::Error, DmaStatus::Error)
                };
                self.model.borrow_mut().state = state;
                status
            }
        }
    }

    fn ack(&mut self) {
        let mut model = self.model.borrow_mut();
        if matches!(model.state, State::Done | State::Error) {
            model.state = State::Idle;
        }
    }

    fn reset(&mut self) {
        self.model.borrow_mut().state = State::Idle;
    }

    fn read_buffer(&mut self, src: u64, buf: &mut [u8]) -> AsufwResult<()> {
        if self.memory.read_into(src, buf) {
            Ok(())
        } else {
            Err(AsufwError::DMA_TRANSFER_FAILED)
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}
