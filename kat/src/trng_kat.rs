/*++

Licensed under the Apache-2.0 license.

File Name:

    trng_kat.rs

Abstract:

    File contains the Known Answer Test (KAT) and start-up health gate for
    the TRNG DRBG.

--*/

use asufw_drivers::{
    cprintln, printer::HexBytes, secure_zeroize, AsufwError, AsufwResult, Trng, TrngMode,
    TrngUserConfig, TRNG_PERS_STRING_LEN, TRNG_SEC_STRENGTH_BYTES,
};

pub const TRNG_KAT_DF_LENGTH: u8 = 7;
pub const TRNG_KAT_SEED_LIFE: u32 = 2;
const KAT_SEED_LEN: usize = TrngUserConfig::seed_len(TRNG_KAT_DF_LENGTH);

pub const TRNG_KAT_SEED: [u8; KAT_SEED_LEN] = [
    0xdd, 0x96, 0xee, 0xc8, 0xf7, 0x1c, 0x2f, 0x36, 0x6e, 0x41, 0xb3, 0x4d,
    0x88, 0x4b, 0x39, 0xc7, 0x90, 0x57, 0x9d, 0x59, 0x6f, 0xed, 0xc2, 0x01,
    0x35, 0x05, 0x3a, 0x45, 0xfe, 0x31, 0x65, 0x46, 0x00, 0x8e, 0x9e, 0xaa,
    0x94, 0xcb, 0x7b, 0x74, 0x8e, 0xf1, 0x51, 0x0f, 0x7b, 0x88, 0x43, 0x4e,
    0xec, 0xe3, 0x19, 0x8d, 0x7d, 0xf8, 0xd7, 0x5b, 0x1b, 0xf7, 0x7c, 0xb8,
    0x2c, 0x20, 0xb2, 0xaf, 0xf6, 0xfd, 0xcd, 0xe9, 0x3a, 0x57, 0x76, 0x8a,
    0x7c, 0xca, 0x32, 0x00, 0x2f, 0x46, 0xb9, 0xa2, 0xef, 0x9a, 0xe5, 0xc0,
    0xd5, 0xb3, 0xa3, 0x53, 0x5b, 0x66, 0x78, 0x33, 0x08, 0xa6, 0xc9, 0x50,
    0x8e, 0xdf, 0x00, 0x5d, 0xb1, 0xe0, 0x35, 0x0a, 0xea, 0x36, 0xf2, 0x5d,
    0x90, 0x74, 0x96, 0x93, 0x57, 0xca, 0x3b, 0x4c, 0x7b, 0x96, 0x88, 0x6e,
    0x56, 0xf2, 0x59, 0xa7, 0xe3, 0xbc, 0x78, 0x51,
];

pub const TRNG_KAT_RESEED: [u8; KAT_SEED_LEN] = [
    0xc3, 0xee, 0xdb, 0x70, 0x2c, 0x0c, 0x09, 0x81, 0x02, 0x52, 0xb9, 0xfd,
    0xc2, 0xf1, 0x44, 0x50, 0x3f, 0xcd, 0x1a, 0x9d, 0xdc, 0xf9, 0x4e, 0x01,
    0xc8, 0x3e, 0x85, 0xed, 0x76, 0xd0, 0x55, 0x4f, 0xc7, 0x87, 0xae, 0xe5,
    0xe1, 0xcf, 0xd3, 0x0d, 0xb3, 0x91, 0xe9, 0x38, 0x1e, 0x86, 0xc4, 0x7d,
    0x96, 0xca, 0x89, 0x2f, 0x20, 0xfc, 0xd7, 0x03, 0x76, 0xf8, 0xfe, 0xbd,
    0x3f, 0x29, 0xc2, 0x39, 0xb4, 0xf9, 0x6a, 0x8a, 0x52, 0x50, 0x78, 0x96,
    0x78, 0xd5, 0x6c, 0x3b, 0x25, 0x50, 0xb3, 0x4e, 0xfd, 0xa7, 0x32, 0x24,
    0x20, 0xf2, 0x4b, 0xa5, 0xad, 0x17, 0x83, 0xb7, 0xb7, 0x27, 0xf0, 0x8c,
    0x1f, 0xa2, 0xcd, 0xe2, 0x52, 0x8c, 0x89, 0xb1, 0x00, 0x09, 0xd6, 0x45,
    0xf5, 0x27, 0x02, 0x71, 0x67, 0x09, 0xde, 0x29, 0xee, 0xbc, 0x8d, 0x7c,
    0x65, 0x34, 0xe1, 0xde, 0x46, 0xa0, 0x16, 0xa8,
];

pub const TRNG_KAT_PERS: [u8; TRNG_PERS_STRING_LEN] = [
    0xc2, 0xc5, 0x47, 0x83, 0xf6, 0x1a, 0xd9, 0x59, 0x50, 0x42, 0xd0, 0x54,
    0x1b, 0x15, 0x32, 0xdf, 0xd4, 0x0b, 0x3b, 0x84, 0xdc, 0x2f, 0x83, 0x29,
    0x52, 0x13, 0xd2, 0x93, 0x08, 0xa7, 0x13, 0xf6, 0x61, 0x50, 0xcd, 0xb8,
    0xb1, 0x3b, 0x2a, 0x3f, 0x6e, 0x6c, 0x21, 0x15, 0x1e, 0x38, 0x80, 0x64,
];

/// Output expected from Instantiate(TRNG_KAT_SEED) + Reseed(TRNG_KAT_RESEED) +
/// Generate(32, prediction resistance).
pub const TRNG_KAT_EXPECTED: [u8; TRNG_SEC_STRENGTH_BYTES] = [
    0xee, 0xa7, 0x5b, 0xb6, 0x2b, 0x97, 0xf0, 0xc0, 0x0f, 0xd6, 0xab, 0x13, 0x00, 0x87, 0x7e,
    0xf4, 0x00, 0x7f, 0xd7, 0x56, 0xfe, 0xe5, 0xdf, 0xa6, 0x55, 0x5b, 0xb2, 0x86, 0xdd, 0x81,
    0x73, 0xb2,
];

#[derive(Default, Debug)]
pub struct TrngKat {}

impl TrngKat {
    /// This function executes the Known Answer Test for the DRBG.
    ///
    /// The TRNG is left uninstantiated. On failure it is also marked
    /// unhealthy so that it cannot be instantiated until uninstantiated again.
    ///
    /// # Arguments
    ///
    /// * `trng` - TRNG instance
    ///
    /// # Returns
    ///
    /// * `AsufwResult` - Result denoting the KAT outcome.
    pub fn execute(&self, trng: &mut Trng) -> AsufwResult<()> {
        trng.uninstantiate()?;
        let result = self.kat_drbg(trng);
        trng.uninstantiate()?;
        if let Err(err) = result {
            trng.mark_unhealthy();
            cprintln!("[kat] TRNG KAT failed, error=0x{:x}", u32::from(err));
            return Err(err);
        }
        Ok(())
    }

    /// Runs the DRBG KAT followed by an HRNG instantiate/uninstantiate cycle.
    pub fn health_gate(&self, trng: &mut Trng) -> AsufwResult<()> {
        self.execute(trng)?;

        let cfg = TrngUserConfig {
            mode: TrngMode::Hrng,
            ..TrngUserConfig::DEFAULT
        };
        let result = trng.instantiate(None, None, &cfg);
        trng.uninstantiate()?;
        if let Err(err) = result {
            trng.mark_unhealthy();
            cprintln!("[kat] HRNG self test failed, error=0x{:x}", u32::from(err));
            return Err(err);
        }
        Ok(())
    }

    fn kat_drbg(&self, trng: &mut Trng) -> AsufwResult<()> {
        let cfg = TrngUserConfig {
            mode: TrngMode::Drng,
            df_length: TRNG_KAT_DF_LENGTH,
            seed_life: TRNG_KAT_SEED_LIFE,
            ..TrngUserConfig::DEFAULT
        };
        trng.instantiate(Some(&TRNG_KAT_SEED), Some(&TRNG_KAT_PERS), &cfg)?;
        trng.reseed(Some(&TRNG_KAT_RESEED), TRNG_KAT_DF_LENGTH)?;

        let mut output = [0u8; TRNG_SEC_STRENGTH_BYTES];
        trng.generate(&mut output, true)?;
        if output != TRNG_KAT_EXPECTED {
            cprintln!("[kat] TRNG KAT output {}", HexBytes(&output));
            secure_zeroize(&mut output);
            return Err(AsufwError::TRNG_KAT_MISMATCH);
        }
        secure_zeroize(&mut output);
        Ok(())
    }
}
