/*++

Licensed under the Apache-2.0 license.

File Name:

    hmac.rs

Abstract:

    File contains the HMAC construction layered on the SHA engines.

--*/

use crate::dma::Dma;
use crate::sha::{Sha, ShaMode, SHA_MAX_BLOCK_LEN, SHA_MAX_DIGEST_LEN};
use crate::zeroize::secure_zeroize;
use asufw_error::{AsufwError, AsufwResult};

/// Largest key accepted by `Hmac::init`.
pub const HMAC_MAX_KEY_LEN: usize = 256;

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HmacState {
    Idle,
    /// Inner hash started with K0 ^ ipad
    Inner,
    /// Message DMA in flight
    Updating,
}

/// HMAC context. Persists across the requests of one streaming operation.
pub struct Hmac {
    state: HmacState,
    mode: Option<ShaMode>,
    k0: [u8; SHA_MAX_BLOCK_LEN],
}

impl Default for Hmac {
    fn default() -> Self {
        Self::new()
    }
}

impl Hmac {
    pub const fn new() -> Self {
        Self {
            state: HmacState::Idle,
            mode: None,
            k0: [0; SHA_MAX_BLOCK_LEN],
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == HmacState::Idle
    }

    pub fn mode(&self) -> Option<ShaMode> {
        self.mode
    }

    /// Derive K0 and start the inner hash
    ///
    /// # Arguments
    ///
    /// * `sha` - Engine matching `mode`
    /// * `mode` - Underlying hash
    /// * `key` - 1 to `HMAC_MAX_KEY_LEN` bytes
    pub fn init(&mut self, sha: &mut Sha, mode: ShaMode, key: &[u8]) -> AsufwResult<()> {
        if self.state != HmacState::Idle {
            return Err(AsufwError::HMAC_INVALID_STATE);
        }
        if key.is_empty() || key.len() > HMAC_MAX_KEY_LEN {
            return Err(AsufwError::HMAC_INVALID_KEY_LEN);
        }
        if mode.engine() != sha.id() {
            return Err(AsufwError::HMAC_INVALID_PARAM);
        }

        let block_len = mode.block_len();
        self.k0 = [0; SHA_MAX_BLOCK_LEN];
        if key.len() > block_len {
            sha.digest(mode, key, &mut self.k0)?;
        } else {
            self.k0[..key.len()].copy_from_slice(key);
        }

        let result = self.feed_pad(sha, mode, IPAD, false);
        if result.is_err() {
            secure_zeroize(&mut self.k0);
            return result;
        }
        self.mode = Some(mode);
        self.state = HmacState::Inner;
        Ok(())
    }

    /// Feed firmware resident message data.
    pub fn update(&mut self, sha: &mut Sha, data: &[u8]) -> AsufwResult<()> {
        if self.state != HmacState::Inner {
            return Err(AsufwError::HMAC_INVALID_STATE);
        }
        sha.update(data, false)
    }

    /// Issue a DMA transfer of host message data.
    pub fn update_dma(
        &mut self,
        sha: &mut Sha,
        dma: &mut Dma,
        src: u64,
        len: u32,
    ) -> AsufwResult<()> {
        if self.state != HmacState::Inner {
            return Err(AsufwError::HMAC_INVALID_STATE);
        }
        sha.update_dma(dma, src, len, false)?;
        self.state = HmacState::Updating;
        Ok(())
    }

    pub fn update_done(&mut self, sha: &mut Sha) -> AsufwResult<()> {
        if self.state != HmacState::Updating {
            return Err(AsufwError::HMAC_INVALID_STATE);
        }
        sha.update_done()?;
        self.state = HmacState::Inner;
        Ok(())
    }

    /// Finish the inner hash, run the outer hash and write the MAC
    ///
    /// # Returns
    ///
    /// * `AsufwResult<usize>` - MAC length written to `out`
    pub fn finish(&mut self, sha: &mut Sha, out: &mut [u8]) -> AsufwResult<usize> {
        let mode = match (self.state, self.mode) {
            (HmacState::Inner, Some(mode)) => mode,
            _ => return Err(AsufwError::HMAC_INVALID_STATE),
        };
        if out.len() < mode.digest_len() {
            return Err(AsufwError::HMAC_INVALID_PARAM);
        }

        let mut inner = [0u8; SHA_MAX_DIGEST_LEN];
        let result = sha
            .finish(&mut inner)
            .and_then(|len| {
                self.feed_pad(sha, mode, OPAD, false)?;
                sha.update(&inner[..len], true)
            })
            .and_then(|_| sha.finish(out));
        secure_zeroize(&mut inner);
        self.reset();
        result
    }

    /// Drop the context and clear the key material.
    pub fn reset(&mut self) {
        secure_zeroize(&mut self.k0);
        self.mode = None;
        self.state = HmacState::Idle;
    }

    fn feed_pad(&mut self, sha: &mut Sha, mode: ShaMode, pad: u8, last: bool) -> AsufwResult<()> {
        let block_len = mode.block_len();
        let mut block = [0u8; SHA_MAX_BLOCK_LEN];
        for (dst, src) in block.iter_mut().zip(self.k0.iter()).take(block_len) {
            *dst = src ^ pad;
        }
        let result = sha.start(mode).and_then(|_| sha.update(&block[..block_len], last));
        secure_zeroize(&mut block);
        result
    }
}
