// Licensed under the Apache-2.0 license

use crate::module::KatStatus;
use crate::resource::{ResourceKind, ResourceRegistry, ResourceSet};
use crate::request::Request;
use crate::trng::start_production;
use asufw_drivers::{
    cprintln, Aes, AesEngine, AsufwError, AsufwResult, Dma, DmaEngine, DmaId, Hmac, Sha,
    ShaEngine, ShaId, Trng, TrngRegs, TrngState, DMA_COUNT,
};

/// Driver instances of every engine the firmware arbitrates.
pub struct Drivers<'a> {
    /// True random number generator
    pub trng: Trng<'a>,

    /// SHA2 engine
    pub sha2: Sha<'a>,

    /// SHA3 engine
    pub sha3: Sha<'a>,

    /// AES-256 engine
    pub aes: Aes<'a>,

    pub dma: [Dma<'a>; DMA_COUNT],

    /// HMAC context shared by both hash engines
    pub hmac: Hmac,
}

/// Hardware handles behind one `Drivers`.
pub struct DriverBackends<'a> {
    pub trng: &'a mut dyn TrngRegs,
    pub sha2: &'a mut dyn ShaEngine,
    pub sha3: &'a mut dyn ShaEngine,
    pub aes: &'a mut dyn AesEngine,
    pub dma0: &'a mut dyn DmaEngine,
    pub dma1: &'a mut dyn DmaEngine,
}

impl<'a> Drivers<'a> {
    pub fn new(backends: DriverBackends<'a>) -> Self {
        Self {
            trng: Trng::new(backends.trng),
            sha2: Sha::new(ShaId::Sha2, backends.sha2),
            sha3: Sha::new(ShaId::Sha3, backends.sha3),
            aes: Aes::new(backends.aes),
            dma: [
                Dma::new(DmaId::Dma0, backends.dma0),
                Dma::new(DmaId::Dma1, backends.dma1),
            ],
            hmac: Hmac::new(),
        }
    }

    pub fn sha(&mut self, id: ShaId) -> &mut Sha<'a> {
        match id {
            ShaId::Sha2 => &mut self.sha2,
            ShaId::Sha3 => &mut self.sha3,
        }
    }

    pub fn dma(&mut self, id: DmaId) -> &mut Dma<'a> {
        &mut self.dma[id.index()]
    }

    /// Borrow a hash engine together with a DMA engine.
    pub fn sha_and_dma(&mut self, sha: ShaId, dma: DmaId) -> (&mut Sha<'a>, &mut Dma<'a>) {
        let sha = match sha {
            ShaId::Sha2 => &mut self.sha2,
            ShaId::Sha3 => &mut self.sha3,
        };
        (sha, &mut self.dma[dma.index()])
    }

    /// Borrow the HMAC context together with the hash engine it runs on.
    pub fn hmac_and_sha(&mut self, sha: ShaId) -> (&mut Hmac, &mut Sha<'a>) {
        let sha = match sha {
            ShaId::Sha2 => &mut self.sha2,
            ShaId::Sha3 => &mut self.sha3,
        };
        (&mut self.hmac, sha)
    }

    pub fn hmac_parts(
        &mut self,
        sha: ShaId,
        dma: DmaId,
    ) -> (&mut Hmac, &mut Sha<'a>, &mut Dma<'a>) {
        let sha = match sha {
            ShaId::Sha2 => &mut self.sha2,
            ShaId::Sha3 => &mut self.sha3,
        };
        (&mut self.hmac, sha, &mut self.dma[dma.index()])
    }

    pub fn aes_and_dma(&mut self, dma: DmaId) -> (&mut Aes<'a>, &mut Dma<'a>) {
        (&mut self.aes, &mut self.dma[dma.index()])
    }

    /// Return the engines behind `released` to idle after a forced release.
    ///
    /// The TRNG is uninstantiated and, while `kat_status` holds its KAT,
    /// brought back up as the production instance. Without a passing KAT it
    /// stays unhealthy until the KAT command runs.
    pub fn reset_released(&mut self, released: ResourceSet, kat_status: KatStatus) {
        for kind in released.kinds() {
            match kind {
                ResourceKind::Dma0 => self.dma(DmaId::Dma0).reset(),
                ResourceKind::Dma1 => self.dma(DmaId::Dma1).reset(),
                ResourceKind::Sha2 => self.sha2.reset(),
                ResourceKind::Sha3 => self.sha3.reset(),
                ResourceKind::Trng => self.restart_trng(kat_status),
                ResourceKind::Hmac => self.hmac.reset(),
                ResourceKind::Aes => self.aes.reset(),
            }
        }
    }

    fn restart_trng(&mut self, kat_status: KatStatus) {
        let autoproc = self.trng.state() == TrngState::AutoProc;
        let result = self.trng.uninstantiate().and_then(|_| {
            if !kat_status.contains(KatStatus::TRNG) {
                self.trng.mark_unhealthy();
                return Ok(());
            }
            start_production(&mut self.trng, autoproc)
        });
        if let Err(err) = result {
            cprintln!("[rt] TRNG restart failed, error=0x{:x}", u32::from(err));
        }
    }
}

/// Everything a command handler may touch.
pub struct Env<'r, 'a> {
    pub drivers: &'r mut Drivers<'a>,
    pub resources: &'r mut ResourceRegistry,
    pub kat_status: &'r mut KatStatus,
}

impl Env<'_, '_> {
    /// DMA engine allocated to `req` by its resource handler.
    pub fn request_dma(&self, req: &Request) -> AsufwResult<DmaId> {
        let id = req.dma.ok_or(AsufwError::INTERNAL)?;
        self.resources
            .check_owner(ResourceKind::dma(id), req.req_id())?;
        Ok(id)
    }

    /// Release the request's DMA engine.
    pub fn release_dma(&mut self, req: &mut Request) -> AsufwResult<()> {
        if let Some(id) = req.dma.take() {
            self.resources.release(ResourceKind::dma(id), req.req_id())?;
        }
        Ok(())
    }

    pub fn release(&mut self, kind: ResourceKind, req: &Request) -> AsufwResult<()> {
        self.resources.release(kind, req.req_id())
    }
}
