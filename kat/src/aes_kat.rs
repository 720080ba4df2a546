/*++

Licensed under the Apache-2.0 license.

File Name:

    aes_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for the AES engine.

--*/

use asufw_drivers::{
    secure_zeroize, Aes, AesDirection, AesMode, AsufwError, AsufwResult, AES_BLOCK_LEN,
    AES_KEY_LEN,
};

// FIPS-197 appendix C.3
const KEY: [u8; AES_KEY_LEN] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d,
    0x1e, 0x1f,
];
const PLAINTEXT: [u8; AES_BLOCK_LEN] = [
    0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee,
    0xff,
];
const CIPHERTEXT: [u8; AES_BLOCK_LEN] = [
    0x8e, 0xa2, 0xb7, 0xca, 0x51, 0x67, 0x45, 0xbf, 0xea, 0xfc, 0x49, 0x90, 0x4b, 0x49, 0x60,
    0x89,
];

#[derive(Default, Debug)]
pub struct AesKat {}

impl AesKat {
    /// Encrypts and decrypts one ECB block.
    pub fn execute(&self, aes: &mut Aes) -> AsufwResult<()> {
        let mut block = PLAINTEXT;
        let result = Self::run(aes, AesDirection::Encrypt, &mut block, &CIPHERTEXT)
            .and_then(|_| Self::run(aes, AesDirection::Decrypt, &mut block, &PLAINTEXT));
        if result.is_err() {
            aes.reset();
        }
        secure_zeroize(&mut block);
        result
    }

    fn run(
        aes: &mut Aes,
        dir: AesDirection,
        block: &mut [u8; AES_BLOCK_LEN],
        expected: &[u8; AES_BLOCK_LEN],
    ) -> AsufwResult<()> {
        aes.start(AesMode::Ecb, dir, &KEY, &[0; AES_BLOCK_LEN])?;
        aes.update(block)?;
        aes.finish()?;
        if block != expected {
            return Err(AsufwError::AES_KAT_MISMATCH);
        }
        Ok(())
    }
}
