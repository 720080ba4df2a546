/*++

Licensed under the Apache-2.0 license.

File Name:

    dma.rs

Abstract:

    File contains API for the DMA engines moving host data into the
    crypto engines and into firmware memory.

--*/

use crate::sha::ShaId;
use crate::wait;
use asufw_error::{AsufwError, AsufwResult};

/// Number of interchangeable DMA engines.
pub const DMA_COUNT: usize = 2;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DmaId {
    Dma0 = 0,
    Dma1 = 1,
}

impl DmaId {
    pub const ALL: [DmaId; DMA_COUNT] = [DmaId::Dma0, DmaId::Dma1];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Where a transfer delivers its data.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DmaDest {
    /// Stream into a hash engine's data port
    Sha(ShaId),
    /// Host memory address
    Host(u64),
    /// Through the AES engine, output to this host memory address
    Aes(u64),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DmaTransfer {
    pub src: u64,
    pub dest: DmaDest,
    pub len: u32,
    /// Final chunk of a message
    pub last: bool,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DmaStatus {
    Idle,
    Busy,
    Done,
    Error,
}

/// One DMA engine as seen by firmware.
pub trait DmaEngine {
    /// Program and start a transfer.
    fn start(&mut self, xfer: DmaTransfer) -> AsufwResult<()>;

    fn status(&mut self) -> DmaStatus;

    /// Acknowledge a Done or Error completion, returning the engine to Idle.
    fn ack(&mut self);

    fn reset(&mut self);

    /// Blocking copy of host memory into firmware memory.
    fn read_buffer(&mut self, src: u64, buf: &mut [u8]) -> AsufwResult<()>;

    fn delay_us(&mut self, us: u32);
}

pub struct Dma<'a> {
    id: DmaId,
    engine: &'a mut dyn DmaEngine,
}

impl<'a> Dma<'a> {
    pub fn new(id: DmaId, engine: &'a mut dyn DmaEngine) -> Self {
        Self { id, engine }
    }

    pub fn id(&self) -> DmaId {
        self.id
    }

    /// Issue a transfer without waiting for it.
    pub fn transfer(&mut self, xfer: DmaTransfer) -> AsufwResult<()> {
        if xfer.len == 0 {
            return Err(AsufwError::DMA_INVALID_PARAM);
        }
        match self.engine.status() {
            DmaStatus::Idle => {}
            DmaStatus::Busy => return Err(AsufwError::DMA_BUSY),
            DmaStatus::Done | DmaStatus::Error => self.engine.ack(),
        }
        self.engine.start(xfer)
    }

    pub fn status(&mut self) -> DmaStatus {
        self.engine.status()
    }

    /// Consume the completion of the last transfer.
    pub fn complete(&mut self) -> AsufwResult<()> {
        match self.engine.status() {
            DmaStatus::Done => {
                self.engine.ack();
                Ok(())
            }
            DmaStatus::Error => {
                self.engine.ack();
                Err(AsufwError::DMA_TRANSFER_FAILED)
            }
            DmaStatus::Busy => Err(AsufwError::DMA_BUSY),
            DmaStatus::Idle => Ok(()),
        }
    }

    /// Wait for the last transfer to finish.
    ///
    /// # Arguments
    ///
    /// * `timeout_us` - Wait budget in microseconds
    pub fn wait_blocking(&mut self, timeout_us: u32) -> AsufwResult<()> {
        let engine = &mut *self.engine;
        wait::poll_until(timeout_us, AsufwError::DMA_TIMEOUT, || {
            if engine.status() != DmaStatus::Busy {
                return true;
            }
            engine.delay_us(1);
            false
        })?;
        self.complete()
    }

    pub fn read_buffer(&mut self, src: u64, buf: &mut [u8]) -> AsufwResult<()> {
        if buf.is_empty() {
            return Err(AsufwError::DMA_INVALID_PARAM);
        }
        if self.engine.status() == DmaStatus::Busy {
            return Err(AsufwError::DMA_BUSY);
        }
        self.engine.read_buffer(src, buf)
    }

    pub fn reset(&mut self) {
        self.engine.reset();
    }
}
