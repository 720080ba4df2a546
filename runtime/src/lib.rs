/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the ASU runtime: boot flow, module registration and the
    request entry points.

--*/

#![cfg_attr(not(any(feature = "std", test)), no_std)]

pub mod aes;
mod dispatcher;
mod drivers;
pub mod hmac;
mod info;
mod module;
mod request;
mod resource;
pub mod sha;
pub mod trng;

pub use dispatcher::{Dispatcher, RequestState, QUEUE_DEPTH};
pub use drivers::{DriverBackends, Drivers, Env};
pub use info::ModuleInfoResp;
pub use module::{
    acquire_resources, acquire_stream, CmdHandler, CmdStatus, CommandDesc, KatStatus, ModuleDesc,
    ModuleId, ModuleRegistry, ResourceHandler, ResourceMask, MODULE_CAPACITY,
};
pub use request::{
    Continuation, Request, RequestHeader, Response, MAX_PAYLOAD_LEN, MAX_RESPONSE_LEN,
};
pub use resource::{Owner, ResourceKind, ResourceRegistry, ResourceSet, ResourceState};

use asufw_drivers::{cprintln, AsufwResult};
use asufw_kat::{AesKat, HmacKat, ShaKat, TrngKat};

/// Runtime configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RuntimeConfig {
    /// Run the KATs and the TRNG health gate during boot
    pub boot_kats: bool,

    /// Enter TRNG auto-proc mode once the production instance is up
    pub trng_autoproc: bool,

    /// Dispatcher polls a pending DMA transfer may take before it times out
    pub dma_wait_budget: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            boot_kats: true,
            trng_autoproc: false,
            dma_wait_budget: 1000,
        }
    }
}

pub struct Runtime<'a> {
    drivers: Drivers<'a>,
    resources: ResourceRegistry,
    modules: ModuleRegistry,
    dispatcher: Dispatcher,
    kat_status: KatStatus,
    config: RuntimeConfig,
}

impl<'a> Runtime<'a> {
    /// Boot the runtime: register the service modules, run the boot KATs and
    /// bring up the production TRNG instance.
    pub fn new(drivers: Drivers<'a>, config: RuntimeConfig) -> AsufwResult<Self> {
        let mut modules = ModuleRegistry::new();
        modules.register(&sha::SHA2_MODULE)?;
        modules.register(&sha::SHA3_MODULE)?;
        modules.register(&trng::TRNG_MODULE)?;
        modules.register(&hmac::HMAC_MODULE)?;
        modules.register(&aes::AES_MODULE)?;

        let mut rt = Self {
            drivers,
            resources: ResourceRegistry::new(),
            modules,
            dispatcher: Dispatcher::new(config.dma_wait_budget),
            kat_status: KatStatus::empty(),
            config,
        };

        let trng_healthy = if config.boot_kats {
            rt.run_boot_kats()
        } else {
            true
        };

        if trng_healthy {
            trng::start_production(&mut rt.drivers.trng, config.trng_autoproc)?;
        } else {
            cprintln!("[boot] TRNG left unhealthy");
        }
        cprintln!("[boot] Runtime ready, kat_status=0x{:x}", rt.kat_status.bits());
        Ok(rt)
    }

    /// Returns true if the TRNG health gate passed.
    fn run_boot_kats(&mut self) -> bool {
        let drivers = &mut self.drivers;
        let results = [
            (KatStatus::TRNG, TrngKat::default().health_gate(&mut drivers.trng)),
            (KatStatus::SHA2, ShaKat::default().execute(&mut drivers.sha2)),
            (KatStatus::SHA3, ShaKat::default().execute(&mut drivers.sha3)),
            (
                KatStatus::HMAC,
                HmacKat::default().execute(&mut drivers.hmac, &mut drivers.sha2),
            ),
            (KatStatus::AES, AesKat::default().execute(&mut drivers.aes)),
        ];
        for (kat, result) in results {
            self.kat_status.set(kat, result.is_ok());
            if let Err(err) = result {
                cprintln!(
                    "[boot] KAT failed, kat=0x{:x} error=0x{:x}",
                    kat.bits(),
                    u32::from(err)
                );
            }
        }
        self.kat_status.contains(KatStatus::TRNG)
    }

    /// Queue a request for dispatch.
    pub fn submit(
        &mut self,
        header: RequestHeader,
        req_id: u32,
        payload: &[u8],
    ) -> AsufwResult<()> {
        self.dispatcher.submit(header, req_id, payload)
    }

    /// Run one dispatcher pass; returns the number of requests that completed.
    pub fn poll(&mut self) -> usize {
        let mut env = Env {
            drivers: &mut self.drivers,
            resources: &mut self.resources,
            kat_status: &mut self.kat_status,
        };
        self.dispatcher.poll(&self.modules, &mut env)
    }

    pub fn take_response(&mut self, req_id: u32) -> Option<Response> {
        self.dispatcher.take_response(req_id)
    }

    pub fn request_state(&self, req_id: u32) -> Option<RequestState> {
        self.dispatcher.request_state(req_id)
    }

    /// Poll until no request is queued or waiting. Returns false if
    /// `max_polls` passes were not enough.
    pub fn run_until_idle(&mut self, max_polls: u32) -> bool {
        for _ in 0..max_polls {
            if self.dispatcher.is_idle() {
                return true;
            }
            self.poll();
        }
        self.dispatcher.is_idle()
    }

    pub fn drivers(&mut self) -> &mut Drivers<'a> {
        &mut self.drivers
    }

    pub fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn kat_status(&self) -> KatStatus {
        self.kat_status
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }
}
