/*++

Licensed under the Apache-2.0 license.

File Name:

    ctr_drbg.rs

Abstract:

    Unverified CTR_DRBG AES-256 model backing the emulated TRNG core.
    Section 10.2 of https://doi.org/10.6028/NIST.SP.800-90Ar1

--*/

use std::iter;

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::Aes256Enc;
use sha2::{Digest, Sha384};

pub const BLOCK_LEN_BYTES: usize = 128 / 8;
const KEY_LEN_BYTES: usize = 256 / 8;
const SEED_LEN_BYTES: usize = BLOCK_LEN_BYTES + KEY_LEN_BYTES;

pub type Block = [u8; BLOCK_LEN_BYTES];
type Key = [u8; KEY_LEN_BYTES];
type Seed = [u8; SEED_LEN_BYTES];

#[derive(Default)]
pub struct CtrDrbg {
    v: Block,
    key: Key,
}

impl CtrDrbg {
    pub fn new() -> Self {
        Self::default()
    }

    fn update(&mut self, provided_data: &Seed) {
        // Section 10.2.1.2.
        let mut temp = [0_u8; SEED_LEN_BYTES];

        for chunk in temp.chunks_exact_mut(BLOCK_LEN_BYTES) {
            block_increment(&mut self.v);
            chunk.copy_from_slice(&block_encrypt(&self.key, &self.v));
        }

        for (t, d) in iter::zip(&mut temp, provided_data) {
            *t ^= d;
        }

        self.key.copy_from_slice(&temp[..KEY_LEN_BYTES]);
        self.v.copy_from_slice(&temp[KEY_LEN_BYTES..]);
    }

    /// Fold seed material into the state. The silicon derivation function
    /// is replaced by SHA-384 compression of the material.
    pub fn reseed(&mut self, material: &[u8]) {
        let digest = Sha384::digest(material);
        let mut seed = [0u8; SEED_LEN_BYTES];
        seed.copy_from_slice(&digest);
        self.update(&seed);
    }

    /// Produce `out.len() / 16` blocks and advance the state.
    pub fn generate(&mut self, out: &mut [u8]) {
        // Section 10.2.1.5.
        for chunk in out.chunks_exact_mut(BLOCK_LEN_BYTES) {
            block_increment(&mut self.v);
            chunk.copy_from_slice(&block_encrypt(&self.key, &self.v));
        }
        self.update(&[0; SEED_LEN_BYTES]);
    }

    pub fn uninstantiate(&mut self) {
        self.v = [0; BLOCK_LEN_BYTES];
        self.key = [0; KEY_LEN_BYTES];
    }
}

fn block_increment(block: &mut Block) {
    for byte in block.iter_mut().rev() {
        if *byte == u8::MAX {
            *byte = 0;
        } else {
            *byte += 1;
            break;
        }
    }
}

fn block_encrypt(key: &Key, block: &Block) -> Block {
    let cipher = Aes256Enc::new(GenericArray::from_slice(key));
    let mut output_block = GenericArray::clone_from_slice(block);
    cipher.encrypt_block(&mut output_block);
    let mut out = [0u8; BLOCK_LEN_BYTES];
    out.copy_from_slice(&output_block);
    out
}
