/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains API for the AES-256 engine. Data reaches the engine
    either from firmware memory or through a DMA transfer that streams host
    memory through the engine and back out to host memory.

--*/

use crate::dma::{Dma, DmaDest, DmaTransfer};
use asufw_error::{AsufwError, AsufwResult};

pub const AES_KEY_LEN: usize = 32;
pub const AES_BLOCK_LEN: usize = 16;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesMode {
    Ecb,
    Cbc,
    Ctr,
}

/// Wire encoding: 0 ECB, 1 CBC, 2 CTR.
impl TryFrom<u32> for AesMode {
    type Error = AsufwError;

    fn try_from(val: u32) -> AsufwResult<Self> {
        match val {
            0 => Ok(AesMode::Ecb),
            1 => Ok(AesMode::Cbc),
            2 => Ok(AesMode::Ctr),
            _ => Err(AsufwError::AES_INVALID_MODE),
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AesDirection {
    Encrypt,
    Decrypt,
}

/// Wire encoding: 0 encrypt, 1 decrypt.
impl TryFrom<u32> for AesDirection {
    type Error = AsufwError;

    fn try_from(val: u32) -> AsufwResult<Self> {
        match val {
            0 => Ok(AesDirection::Encrypt),
            1 => Ok(AesDirection::Decrypt),
            _ => Err(AsufwError::AES_INVALID_MODE),
        }
    }
}

/// Register level interface of the AES engine.
pub trait AesEngine {
    /// Clear the key, IV and chaining state.
    fn reset(&mut self);

    /// Load key and IV and select the mode. The chaining state restarts
    /// from `iv`.
    fn configure(
        &mut self,
        mode: AesMode,
        dir: AesDirection,
        key: &[u8; AES_KEY_LEN],
        iv: &[u8; AES_BLOCK_LEN],
    );

    /// Programmed I/O path: transform whole blocks in place.
    fn process(&mut self, data: &mut [u8]);
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum AesState {
    Idle,
    Started,
    /// A DMA transfer through the engine is in flight
    Updating,
}

pub struct Aes<'a> {
    engine: &'a mut dyn AesEngine,
    state: AesState,
    mode: Option<AesMode>,
}

impl<'a> Aes<'a> {
    pub fn new(engine: &'a mut dyn AesEngine) -> Self {
        Self {
            engine,
            state: AesState::Idle,
            mode: None,
        }
    }

    pub fn mode(&self) -> Option<AesMode> {
        self.mode
    }

    pub fn is_idle(&self) -> bool {
        self.state == AesState::Idle
    }

    /// Start an operation
    ///
    /// # Arguments
    ///
    /// * `mode` - Block cipher mode
    /// * `dir` - Encrypt or decrypt
    /// * `key` - AES-256 key
    /// * `iv` - Initialization vector or initial counter block; ignored by ECB
    pub fn start(
        &mut self,
        mode: AesMode,
        dir: AesDirection,
        key: &[u8; AES_KEY_LEN],
        iv: &[u8; AES_BLOCK_LEN],
    ) -> AsufwResult<()> {
        if self.state != AesState::Idle {
            return Err(AsufwError::AES_INVALID_STATE);
        }
        self.engine.reset();
        self.engine.configure(mode, dir, key, iv);
        self.mode = Some(mode);
        self.state = AesState::Started;
        Ok(())
    }

    /// Transform firmware resident data in place.
    pub fn update(&mut self, data: &mut [u8]) -> AsufwResult<()> {
        if self.state != AesState::Started {
            return Err(AsufwError::AES_INVALID_STATE);
        }
        check_len(data.len())?;
        self.engine.process(data);
        Ok(())
    }

    /// Issue a DMA transfer of `len` bytes from `src` through the engine into
    /// `dst`. Completion is reported through `update_done`.
    pub fn update_dma(
        &mut self,
        dma: &mut Dma,
        src: u64,
        dst: u64,
        len: u32,
        last: bool,
    ) -> AsufwResult<()> {
        if self.state != AesState::Started {
            return Err(AsufwError::AES_INVALID_STATE);
        }
        check_len(usize::try_from(len).map_err(|_| AsufwError::AES_INVALID_PARAM)?)?;
        dma.transfer(DmaTransfer {
            src,
            dest: DmaDest::Aes(dst),
            len,
            last,
        })?;
        self.state = AesState::Updating;
        Ok(())
    }

    pub fn update_done(&mut self) -> AsufwResult<()> {
        if self.state != AesState::Updating {
            return Err(AsufwError::AES_INVALID_STATE);
        }
        self.state = AesState::Started;
        Ok(())
    }

    /// End the operation and clear the key from the engine.
    pub fn finish(&mut self) -> AsufwResult<()> {
        if self.state != AesState::Started {
            return Err(AsufwError::AES_INVALID_STATE);
        }
        self.reset();
        Ok(())
    }

    /// Abandon any operation in progress.
    pub fn reset(&mut self) {
        self.engine.reset();
        self.state = AesState::Idle;
        self.mode = None;
    }
}

fn check_len(len: usize) -> AsufwResult<()> {
    if len == 0 || len % AES_BLOCK_LEN != 0 {
        return Err(AsufwError::AES_INVALID_PARAM);
    }
    Ok(())
}
