/*++

Licensed under the Apache-2.0 license.

File Name:

    sha.rs

Abstract:

    File contains API for the SHA2 and SHA3 hash engines.

--*/

use crate::dma::{Dma, DmaDest, DmaTransfer};
use crate::wait;
use asufw_error::{AsufwError, AsufwResult};

/// Largest digest produced by either engine.
pub const SHA_MAX_DIGEST_LEN: usize = 64;
/// Largest block (rate) of any supported mode.
pub const SHA_MAX_BLOCK_LEN: usize = 136;

const SHA_DIGEST_TIMEOUT_US: u32 = 100_000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaId {
    Sha2,
    Sha3,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ShaMode {
    Sha2_256,
    Sha2_384,
    Sha2_512,
    Sha3_256,
    Sha3_384,
    Sha3_512,
}

impl ShaMode {
    pub fn engine(self) -> ShaId {
        match self {
            ShaMode::Sha2_256 | ShaMode::Sha2_384 | ShaMode::Sha2_512 => ShaId::Sha2,
            ShaMode::Sha3_256 | ShaMode::Sha3_384 | ShaMode::Sha3_512 => ShaId::Sha3,
        }
    }

    pub fn digest_len(self) -> usize {
        match self {
            ShaMode::Sha2_256 | ShaMode::Sha3_256 => 32,
            ShaMode::Sha2_384 | ShaMode::Sha3_384 => 48,
            ShaMode::Sha2_512 | ShaMode::Sha3_512 => 64,
        }
    }

    pub fn block_len(self) -> usize {
        match self {
            ShaMode::Sha2_256 => 64,
            ShaMode::Sha2_384 | ShaMode::Sha2_512 => 128,
            ShaMode::Sha3_256 => 136,
            ShaMode::Sha3_384 => 104,
            ShaMode::Sha3_512 => 72,
        }
    }
}

/// Wire encoding: 0..=2 SHA2-256/384/512, 3..=5 SHA3-256/384/512.
impl TryFrom<u32> for ShaMode {
    type Error = AsufwError;

    fn try_from(val: u32) -> AsufwResult<Self> {
        match val {
            0 => Ok(ShaMode::Sha2_256),
            1 => Ok(ShaMode::Sha2_384),
            2 => Ok(ShaMode::Sha2_512),
            3 => Ok(ShaMode::Sha3_256),
            4 => Ok(ShaMode::Sha3_384),
            5 => Ok(ShaMode::Sha3_512),
            _ => Err(AsufwError::SHA_INVALID_MODE),
        }
    }
}

/// Register level interface of one hash engine.
pub trait ShaEngine {
    fn reset(&mut self);

    fn start(&mut self, mode: ShaMode);

    /// Programmed I/O data path for firmware resident data.
    fn write(&mut self, data: &[u8], last: bool);

    fn digest_ready(&mut self) -> bool;

    fn read_digest(&mut self, out: &mut [u8]);

    fn delay_us(&mut self, us: u32);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum ShaState {
    Idle,
    Started,
    /// A DMA transfer into the engine is in flight
    Updating,
}

pub struct Sha<'a> {
    id: ShaId,
    engine: &'a mut dyn ShaEngine,
    state: ShaState,
    mode: Option<ShaMode>,
    last_fed: bool,
}

impl<'a> Sha<'a> {
    pub fn new(id: ShaId, engine: &'a mut dyn ShaEngine) -> Self {
        Self {
            id,
            engine,
            state: ShaState::Idle,
            mode: None,
            last_fed: false,
        }
    }

    pub fn id(&self) -> ShaId {
        self.id
    }

    pub fn mode(&self) -> Option<ShaMode> {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.state == ShaState::Idle
    }

    /// Start a new digest operation
    ///
    /// # Arguments
    ///
    /// * `mode` - Hash mode; must belong to this engine
    pub fn start(&mut self, mode: ShaMode) -> AsufwResult<()> {
        if mode.engine() != self.id {
            return Err(AsufwError::SHA_INVALID_MODE);
        }
        if self.state != ShaState::Idle {
            return Err(AsufwError::SHA_INVALID_STATE);
        }
        self.engine.reset();
        self.engine.start(mode);
        self.mode = Some(mode);
        self.last_fed = false;
        self.state = ShaState::Started;
        Ok(())
    }

    /// Feed firmware resident data.
    pub fn update(&mut self, data: &[u8], last: bool) -> AsufwResult<()> {
        self.check_feedable()?;
        self.engine.write(data, last);
        self.last_fed = last;
        Ok(())
    }

    /// Issue a DMA transfer of host data into the engine. Completion is
    /// reported through `update_done`.
    pub fn update_dma(&mut self, dma: &mut Dma, src: u64, len: u32, last: bool) -> AsufwResult<()> {
        self.check_feedable()?;
        if len == 0 {
            return Err(AsufwError::SHA_INVALID_PARAM);
        }
        dma.transfer(DmaTransfer {
            src,
            dest: DmaDest::Sha(self.id),
            len,
            last,
        })?;
        self.last_fed = last;
        self.state = ShaState::Updating;
        Ok(())
    }

    pub fn update_done(&mut self) -> AsufwResult<()> {
        if self.state != ShaState::Updating {
            return Err(AsufwError::SHA_INVALID_STATE);
        }
        self.state = ShaState::Started;
        Ok(())
    }

    /// Complete the digest
    ///
    /// # Arguments
    ///
    /// * `out` - Buffer receiving the digest
    ///
    /// # Returns
    ///
    /// * `AsufwResult<usize>` - Digest length written to `out`
    pub fn finish(&mut self, out: &mut [u8]) -> AsufwResult<usize> {
        let mode = match (self.state, self.mode) {
            (ShaState::Started, Some(mode)) => mode,
            _ => return Err(AsufwError::SHA_INVALID_STATE),
        };
        let len = mode.digest_len();
        if out.len() < len {
            return Err(AsufwError::SHA_INVALID_PARAM);
        }
        if !self.last_fed {
            self.engine.write(&[], true);
            self.last_fed = true;
        }

        let engine = &mut *self.engine;
        wait::poll_until(SHA_DIGEST_TIMEOUT_US, AsufwError::SHA_TIMEOUT, || {
            if engine.digest_ready() {
                return true;
            }
            engine.delay_us(1);
            false
        })?;
        self.engine.read_digest(&mut out[..len]);

        self.state = ShaState::Idle;
        self.mode = None;
        Ok(len)
    }

    /// One-shot digest of firmware resident data.
    pub fn digest(&mut self, mode: ShaMode, data: &[u8], out: &mut [u8]) -> AsufwResult<usize> {
        self.start(mode)?;
        self.update(data, true)?;
        self.finish(out)
    }

    /// Abandon any operation in progress.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.state = ShaState::Idle;
        self.mode = None;
        self.last_fed = false;
    }

    fn check_feedable(&self) -> AsufwResult<()> {
        if self.state != ShaState::Started || self.last_fed {
            return Err(AsufwError::SHA_INVALID_STATE);
        }
        Ok(())
    }
}
