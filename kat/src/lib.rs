/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the ASU firmware Known Answer Tests.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod aes_kat;
mod hmac_kat;
mod sha_kat;
mod trng_kat;

pub use aes_kat::AesKat;
pub use asufw_drivers::{AsufwError, AsufwResult};
pub use hmac_kat::HmacKat;
pub use sha_kat::ShaKat;
pub use trng_kat::{
    TrngKat, TRNG_KAT_DF_LENGTH, TRNG_KAT_EXPECTED, TRNG_KAT_PERS, TRNG_KAT_RESEED,
    TRNG_KAT_SEED, TRNG_KAT_SEED_LIFE,
};
