/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the emulated AES-256 engine with ECB, CBC and CTR
    chaining.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use ::aes::cipher::generic_array::GenericArray;
use ::aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use ::aes::Aes256;
use asufw_drivers::{AesDirection, AesEngine, AesMode, AES_BLOCK_LEN, AES_KEY_LEN};

type Block = [u8; AES_BLOCK_LEN];

struct Context {
    cipher: Aes256,
    mode: AesMode,
    dir: AesDirection,
    /// Previous ciphertext block (CBC) or next counter block (CTR)
    chain: Block,
}

impl Context {
    fn process_block(&mut self, block: &mut [u8]) {
        match (self.mode, self.dir) {
            (AesMode::Ecb, AesDirection::Encrypt) => {
                self.cipher.encrypt_block(GenericArray::from_mut_slice(block))
            }
            (AesMode::Ecb, AesDirection::Decrypt) => {
                self.cipher.decrypt_block(GenericArray::from_mut_slice(block))
            }
            (AesMode::Cbc, AesDirection::Encrypt) => {
                xor(block, &self.chain);
                self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
                self.chain.copy_from_slice(block);
            }
            (AesMode::Cbc, AesDirection::Decrypt) => {
                let mut ct = [0u8; AES_BLOCK_LEN];
                ct.copy_from_slice(block);
                self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
                xor(block, &self.chain);
                self.chain = ct;
            }
            (AesMode::Ctr, _) => {
                let mut keystream = self.chain;
                self.cipher
                    .encrypt_block(GenericArray::from_mut_slice(&mut keystream));
                xor(block, &keystream);
                self.chain = u128::from_be_bytes(self.chain)
                    .wrapping_add(1)
                    .to_be_bytes();
            }
        }
    }
}

fn xor(block: &mut [u8], other: &Block) {
    for (b, o) in block.iter_mut().zip(other.iter()) {
        *b ^= o;
    }
}

#[derive(Default)]
struct AesModel {
    ctx: Option<Context>,
    bytes_processed: usize,
}

/// Emulated AES engine. Clones share the engine; the DMA model holds one to
/// stream data through it.
#[derive(Clone, Default)]
pub struct EmuAes {
    model: Rc<RefCell<AesModel>>,
}

impl EmuAes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data port used by DMA transfers. Trailing partial blocks pass
    /// through untouched.
    pub fn transform(&self, data: &mut [u8]) {
        let mut model = self.model.borrow_mut();
        let Some(ctx) = model.ctx.as_mut() else {
            return;
        };
        for block in data.chunks_exact_mut(AES_BLOCK_LEN) {
            ctx.process_block(block);
        }
        model.bytes_processed += data.len();
    }

    pub fn is_configured(&self) -> bool {
        self.model.borrow().ctx.is_some()
    }

    /// Bytes transformed since the last configure.
    pub fn bytes_processed(&self) -> usize {
        self.model.borrow().bytes_processed
    }
}

impl AesEngine for EmuAes {
    fn reset(&mut self) {
        let mut model = self.model.borrow_mut();
        model.ctx = None;
        model.bytes_processed = 0;
    }

    fn configure(
        &mut self,
        mode: AesMode,
        dir: AesDirection,
        key: &[u8; AES_KEY_LEN],
        iv: &[u8; AES_BLOCK_LEN],
    ) {
        let mut model = self.model.borrow_mut();
        model.ctx = Some(Context {
            cipher: Aes256::new(GenericArray::from_slice(key)),
            mode,
            dir,
            chain: *iv,
        });
        model.bytes_processed = 0;
    }

    fn process(&mut self, data: &mut [u8]) {
        self.transform(data);
    }
}
