/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the ASU firmware driver library.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

mod aes;
mod dma;
mod hmac;
pub mod printer;
mod sha;
mod trng;
pub mod trng_regs;
pub mod wait;
mod zeroize;

pub use asufw_error::{AsufwError, AsufwResult, BufStatus, ErrorStatus, ResultExt};
pub use aes::{Aes, AesDirection, AesEngine, AesMode, AES_BLOCK_LEN, AES_KEY_LEN};
pub use dma::{Dma, DmaDest, DmaEngine, DmaId, DmaStatus, DmaTransfer, DMA_COUNT};
pub use hmac::{Hmac, HMAC_MAX_KEY_LEN};
pub use sha::{Sha, ShaEngine, ShaId, ShaMode, SHA_MAX_BLOCK_LEN, SHA_MAX_DIGEST_LEN};
pub use trng::{
    Trng, TrngErrorState, TrngMode, TrngState, TrngUserConfig, TRNG_MAX_DF_LENGTH,
    TRNG_MAX_SEED_LIFE, TRNG_MIN_DF_LENGTH, TRNG_PERS_STRING_LEN, TRNG_SEC_STRENGTH_BYTES,
};
pub use trng_regs::TrngRegs;
pub use zeroize::secure_zeroize;
