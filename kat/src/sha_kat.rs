/*++

Licensed under the Apache-2.0 license.

File Name:

    sha_kat.rs

Abstract:

    File contains the Known Answer Tests (KAT) for the SHA2 and SHA3 engines.

--*/

use asufw_drivers::{
    secure_zeroize, AsufwError, AsufwResult, Sha, ShaId, ShaMode, SHA_MAX_DIGEST_LEN,
};

const MSG_ABC: &[u8] = b"abc";

const SHA2_256_ABC: [u8; 32] = [
    0xba, 0x78, 0x16, 0xbf, 0x8f, 0x01, 0xcf, 0xea, 0x41, 0x41, 0x40, 0xde, 0x5d, 0xae, 0x22,
    0x23, 0xb0, 0x03, 0x61, 0xa3, 0x96, 0x17, 0x7a, 0x9c, 0xb4, 0x10, 0xff, 0x61, 0xf2, 0x00,
    0x15, 0xad,
];

const SHA2_384_ABC: [u8; 48] = [
    0xcb, 0x00, 0x75, 0x3f, 0x45, 0xa3, 0x5e, 0x8b, 0xb5, 0xa0, 0x3d, 0x69, 0x9a, 0xc6, 0x50,
    0x07, 0x27, 0x2c, 0x32, 0xab, 0x0e, 0xde, 0xd1, 0x63, 0x1a, 0x8b, 0x60, 0x5a, 0x43, 0xff,
    0x5b, 0xed, 0x80, 0x86, 0x07, 0x2b, 0xa1, 0xe7, 0xcc, 0x23, 0x58, 0xba, 0xec, 0xa1, 0x34,
    0xc8, 0x25, 0xa7,
];

const SHA3_256_ABC: [u8; 32] = [
    0x3a, 0x98, 0x5d, 0xa7, 0x4f, 0xe2, 0x25, 0xb2, 0x04, 0x5c, 0x17, 0x2d, 0x6b, 0xd3, 0x90,
    0xbd, 0x85, 0x5f, 0x08, 0x6e, 0x3e, 0x9d, 0x52, 0x5b, 0x46, 0xbf, 0xe2, 0x45, 0x11, 0x43,
    0x15, 0x32,
];

#[derive(Default, Debug)]
pub struct ShaKat {}

impl ShaKat {
    /// This function executes the Known Answer Tests for the engine behind `sha`.
    ///
    /// Test vector source: FIPS 180-4 / FIPS 202 "abc" examples.
    ///
    /// # Arguments
    ///
    /// * `sha` - SHA2 or SHA3 engine
    ///
    /// # Returns
    ///
    /// * `AsufwResult` - Result denoting the KAT outcome.
    pub fn execute(&self, sha: &mut Sha) -> AsufwResult<()> {
        match sha.id() {
            ShaId::Sha2 => {
                self.kat(sha, ShaMode::Sha2_256, &SHA2_256_ABC)?;
                self.kat(sha, ShaMode::Sha2_384, &SHA2_384_ABC)
            }
            ShaId::Sha3 => self.kat(sha, ShaMode::Sha3_256, &SHA3_256_ABC),
        }
    }

    fn kat(&self, sha: &mut Sha, mode: ShaMode, expected: &[u8]) -> AsufwResult<()> {
        let mut digest = [0u8; SHA_MAX_DIGEST_LEN];
        let result = sha.digest(mode, MSG_ABC, &mut digest).and_then(|len| {
            if digest[..len] != *expected {
                return Err(AsufwError::SHA_KAT_MISMATCH);
            }
            Ok(())
        });
        if result.is_err() {
            sha.reset();
        }
        secure_zeroize(&mut digest);
        result
    }
}
