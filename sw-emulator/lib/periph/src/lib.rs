/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains exports for the emulated ASU peripherals.

--*/

mod aes;
mod dma;
mod hash_sha;
mod memory;
mod trng;

pub use aes::EmuAes;
pub use dma::EmuDma;
pub use hash_sha::EmuSha;
pub use memory::HostMemory;
pub use trng::{DrbgVector, EmuTrng};

use asufw_drivers::{ShaId, DMA_COUNT};

/// Base address of the emulated host memory window.
pub const HOST_MEMORY_BASE: u64 = 0x8000_0000;
pub const HOST_MEMORY_SIZE: usize = 0x1_0000;

/// The full set of peripherals behind one firmware instance. Clones share
/// the same models.
#[derive(Clone)]
pub struct EmuSoc {
    pub trng: EmuTrng,
    pub sha2: EmuSha,
    pub sha3: EmuSha,
    pub aes: EmuAes,
    pub dma: [EmuDma; DMA_COUNT],
    pub memory: HostMemory,
}

impl Default for EmuSoc {
    fn default() -> Self {
        Self::new()
    }
}

impl EmuSoc {
    pub fn new() -> Self {
        let memory = HostMemory::new(HOST_MEMORY_BASE, HOST_MEMORY_SIZE);
        let sha2 = EmuSha::new(ShaId::Sha2);
        let sha3 = EmuSha::new(ShaId::Sha3);
        let aes = EmuAes::new();
        let dma = [
            EmuDma::new(memory.clone(), sha2.clone(), sha3.clone(), aes.clone()),
            EmuDma::new(memory.clone(), sha2.clone(), sha3.clone(), aes.clone()),
        ];
        Self {
            trng: EmuTrng::new(),
            sha2,
            sha3,
            aes,
            dma,
            memory,
        }
    }
}
