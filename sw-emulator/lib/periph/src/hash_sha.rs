/*++

Licensed under the Apache-2.0 license.

File Name:

    hash_sha.rs

Abstract:

    File contains the emulated SHA2 and SHA3 engines.

--*/

use std::cell::RefCell;
use std::rc::Rc;

use asufw_drivers::{ShaEngine, ShaId, ShaMode};
use sha2::{Digest, Sha256, Sha384, Sha512};
use sha3::{Sha3_256, Sha3_384, Sha3_512};

enum Hasher {
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Sha3_256(Sha3_256),
    Sha3_384(Sha3_384),
    Sha3_512(Sha3_512),
}

impl Hasher {
    fn new(mode: ShaMode) -> Self {
        match mode {
            ShaMode::Sha2_256 => Hasher::Sha256(Sha256::new()),
            ShaMode::Sha2_384 => Hasher::Sha384(Sha384::new()),
            ShaMode::Sha2_512 => Hasher::Sha512(Sha512::new()),
            ShaMode::Sha3_256 => Hasher::Sha3_256(Sha3_256::new()),
            ShaMode::Sha3_384 => Hasher::Sha3_384(Sha3_384::new()),
            ShaMode::Sha3_512 => Hasher::Sha3_512(Sha3_512::new()),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Hasher::Sha256(h) => h.update(data),
            Hasher::Sha384(h) => h.update(data),
            Hasher::Sha512(h) => h.update(data),
            Hasher::Sha3_256(h) => h.update(data),
            Hasher::Sha3_384(h) => h.update(data),
            Hasher::Sha3_512(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Hasher::Sha256(h) => h.finalize().to_vec(),
            Hasher::Sha384(h) => h.finalize().to_vec(),
            Hasher::Sha512(h) => h.finalize().to_vec(),
            Hasher::Sha3_256(h) => h.finalize().to_vec(),
            Hasher::Sha3_384(h) => h.finalize().to_vec(),
            Hasher::Sha3_512(h) => h.finalize().to_vec(),
        }
    }
}

struct ShaModel {
    id: ShaId,
    hasher: Option<Hasher>,
    digest: Option<Vec<u8>>,
    bytes_absorbed: usize,
    stall: bool,
}

impl ShaModel {
    fn absorb(&mut self, data: &[u8], last: bool) {
        let Some(hasher) = self.hasher.as_mut() else {
            return;
        };
        hasher.update(data);
        self.bytes_absorbed += data.len();
        if last {
            self.digest = self.hasher.take().map(Hasher::finalize);
        }
    }
}

/// Emulated hash engine. Clones share the engine; the DMA model holds one
/// to stream data into it.
#[derive(Clone)]
pub struct EmuSha {
    model: Rc<RefCell<ShaModel>>,
}

impl EmuSha {
    pub fn new(id: ShaId) -> Self {
        Self {
            model: Rc::new(RefCell::new(ShaModel {
                id,
                hasher: None,
                digest: None,
                bytes_absorbed: 0,
                stall: false,
            })),
        }
    }

    pub fn id(&self) -> ShaId {
        self.model.borrow().id
    }

    /// Data port used by DMA transfers.
    pub fn absorb(&self, data: &[u8], last: bool) {
        self.model.borrow_mut().absorb(data, last);
    }

    /// Never report a digest as ready.
    pub fn set_stall(&self, stall: bool) {
        self.model.borrow_mut().stall = stall;
    }

    /// Bytes absorbed since the last start.
    pub fn bytes_absorbed(&self) -> usize {
        self.model.borrow().bytes_absorbed
    }

    pub fn is_active(&self) -> bool {
        self.model.borrow().hasher.is_some()
    }
}

impl ShaEngine for EmuSha {
    fn reset(&mut self) {
        let mut model = self.model.borrow_mut();
        model.hasher = None;
        model.digest = None;
        model.bytes_absorbed = 0;
    }

    fn start(&mut self, mode: ShaMode) {
        let mut model = self.model.borrow_mut();
        model.digest = None;
        model.bytes_absorbed = 0;
        model.hasher = (mode.engine() == model.id).then(|| Hasher::new(mode));
    }

    fn write(&mut self, data: &[u8], last: bool) {
        self.absorb(data, last);
    }

    fn digest_ready(&mut self) -> bool {
        let model = self.model.borrow();
        !model.stall && model.digest.is_some()
    }

    fn read_digest(&mut self, out: &mut [u8]) {
        if let Some(digest) = self.model.borrow().digest.as_ref() {
            let len = out.len().min(digest.len());
            out[..len].copy_from_slice(&digest[..len]);
        }
    }

    fn delay_us(&mut self, _us: u32) {}
}
