/*++

Licensed under the Apache-2.0 license.

File Name:

    hmac_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) for HMAC.

--*/

use asufw_drivers::{
    secure_zeroize, AsufwError, AsufwResult, Hmac, Sha, ShaMode, SHA_MAX_DIGEST_LEN,
};

// RFC 4231, test case 2
const KEY: &[u8] = b"Jefe";
const DATA: &[u8] = b"what do ya want for nothing?";
const EXPECTED_MAC: [u8; 32] = [
    0x5b, 0xdc, 0xc1, 0x46, 0xbf, 0x60, 0x75, 0x4e, 0x6a, 0x04, 0x24, 0x26, 0x08, 0x95, 0x75,
    0xc7, 0x5a, 0x00, 0x3f, 0x08, 0x9d, 0x27, 0x39, 0x83, 0x9d, 0xec, 0x58, 0xb9, 0x64, 0xec,
    0x38, 0x43,
];

#[derive(Default, Debug)]
pub struct HmacKat {}

impl HmacKat {
    /// Runs HMAC-SHA256 over the SHA2 engine.
    pub fn execute(&self, hmac: &mut Hmac, sha2: &mut Sha) -> AsufwResult<()> {
        let mut mac = [0u8; SHA_MAX_DIGEST_LEN];
        let result = hmac
            .init(sha2, ShaMode::Sha2_256, KEY)
            .and_then(|_| hmac.update(sha2, DATA))
            .and_then(|_| hmac.finish(sha2, &mut mac))
            .and_then(|len| {
                if mac[..len] != EXPECTED_MAC {
                    return Err(AsufwError::HMAC_KAT_MISMATCH);
                }
                Ok(())
            });
        if result.is_err() {
            hmac.reset();
            sha2.reset();
        }
        secure_zeroize(&mut mac);
        result
    }
}
