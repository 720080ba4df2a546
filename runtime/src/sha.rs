/*++

Licensed under the Apache-2.0 license.

File Name:

    sha.rs

Abstract:

    File contains the SHA2 and SHA3 service modules: streaming digest
    operations over host memory, KAT and GET_INFO.

--*/

use crate::drivers::Env;
use crate::info::GetInfoCmd;
use crate::module::{
    acquire_resources, acquire_stream, CmdStatus, CommandDesc, KatStatus, ModuleDesc, ModuleId,
    ResourceMask,
};
use crate::request::{Continuation, Request};
use crate::resource::{ResourceKind, ResourceRegistry};
use asufw_drivers::{
    AsufwError, AsufwResult, ResultExt, ShaId, ShaMode, SHA_MAX_DIGEST_LEN,
};
use asufw_kat::ShaKat;
use bitflags::bitflags;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const SHA_MODULE_VERSION: u32 = 1;

pub mod cmd {
    pub const OPERATION: u8 = 0;
    pub const KAT: u8 = 1;
    pub const GET_INFO: u8 = 2;
}

bitflags! {
    /// Stage flags of a streaming operation.
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct StreamFlags: u32 {
        /// Start a new operation
        const INIT = 1 << 0;
        /// Feed `data_size` bytes from `data_addr`
        const UPDATE = 1 << 1;
        /// Produce the result and end the operation
        const FINAL = 1 << 2;
    }
}

impl StreamFlags {
    pub(crate) fn parse(val: u32, err: AsufwError) -> AsufwResult<Self> {
        Self::from_bits(val)
            .filter(|flags| !flags.is_empty())
            .ok_or(err)
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ShaOperationReq {
    pub data_addr_lo: u32,
    pub data_addr_hi: u32,
    pub data_size: u32,
    /// `ShaMode` wire value; read on INIT only
    pub sha_mode: u32,
    pub flags: u32,
}

impl ShaOperationReq {
    pub fn data_addr(&self) -> u64 {
        (u64::from(self.data_addr_hi) << 32) | u64::from(self.data_addr_lo)
    }
}

const SHA2_COMMANDS: [CommandDesc; 3] = [
    CommandDesc {
        handler: ShaOperationCmd::execute,
        resources: ResourceMask::DMA.union(ResourceMask::SHA2),
    },
    CommandDesc {
        handler: ShaKatCmd::execute,
        resources: ResourceMask::SHA2,
    },
    CommandDesc {
        handler: get_info,
        resources: ResourceMask::empty(),
    },
];

const SHA3_COMMANDS: [CommandDesc; 3] = [
    CommandDesc {
        handler: ShaOperationCmd::execute,
        resources: ResourceMask::DMA.union(ResourceMask::SHA3),
    },
    CommandDesc {
        handler: ShaKatCmd::execute,
        resources: ResourceMask::SHA3,
    },
    CommandDesc {
        handler: get_info,
        resources: ResourceMask::empty(),
    },
];

pub static SHA2_MODULE: ModuleDesc = ModuleDesc {
    id: ModuleId::Sha2,
    version: SHA_MODULE_VERSION,
    commands: &SHA2_COMMANDS,
    resource_handler: sha_resource_handler,
};

pub static SHA3_MODULE: ModuleDesc = ModuleDesc {
    id: ModuleId::Sha3,
    version: SHA_MODULE_VERSION,
    commands: &SHA3_COMMANDS,
    resource_handler: sha_resource_handler,
};

fn engine_of(req: &Request) -> AsufwResult<ShaId> {
    match req.module_id()? {
        ModuleId::Sha2 => Ok(ShaId::Sha2),
        ModuleId::Sha3 => Ok(ShaId::Sha3),
        _ => Err(AsufwError::INTERNAL),
    }
}

/// OPERATION acquires per stage; the other commands take their table mask.
fn sha_resource_handler(
    resources: &mut ResourceRegistry,
    req: &mut Request,
    mask: ResourceMask,
) -> AsufwResult<()> {
    if req.header().command_id() != cmd::OPERATION {
        return acquire_resources(resources, req, mask);
    }
    let op: ShaOperationReq = req.args_as()?;
    let flags = StreamFlags::parse(op.flags, AsufwError::SHA_INVALID_FLAGS)?;
    acquire_stream(
        resources,
        req,
        mask.difference(ResourceMask::DMA),
        flags.contains(StreamFlags::INIT),
        flags.contains(StreamFlags::UPDATE),
    )
}

fn get_info(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
    GetInfoCmd::execute(env, req, SHA_MODULE_VERSION)
}

/// Streaming digest. A chunk with UPDATE returns InProgress after issuing
/// its DMA transfer and finishes on resumption.
pub struct ShaOperationCmd;
impl ShaOperationCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let op: ShaOperationReq = req.args_as()?;
        let flags = StreamFlags::parse(op.flags, AsufwError::SHA_INVALID_FLAGS)?;
        let id = engine_of(req)?;

        match req.cont {
            Continuation::Start => {
                if flags.contains(StreamFlags::INIT) {
                    let mode = ShaMode::try_from(op.sha_mode)?;
                    env.drivers.sha(id).start(mode)?;
                }
                if flags.contains(StreamFlags::UPDATE) {
                    let dma_id = env.request_dma(req)?;
                    let (sha, dma) = env.drivers.sha_and_dma(id, dma_id);
                    sha.update_dma(
                        dma,
                        op.data_addr(),
                        op.data_size,
                        flags.contains(StreamFlags::FINAL),
                    )?;
                    req.cont = Continuation::ShaUpdate;
                    return Ok(CmdStatus::InProgress(dma_id));
                }
            }
            Continuation::ShaUpdate => {
                env.drivers.sha(id).update_done()?;
                env.release_dma(req)?;
            }
            Continuation::HmacUpdate | Continuation::AesChunk { .. } => {
                return Err(AsufwError::INTERNAL)
            }
        }

        if flags.contains(StreamFlags::FINAL) {
            let mut digest = [0u8; SHA_MAX_DIGEST_LEN];
            let len = env.drivers.sha(id).finish(&mut digest)?;
            req.set_response(&digest[..len])?;
            env.release(ResourceKind::sha(id), req)?;
        }
        Ok(CmdStatus::Done)
    }
}

pub struct ShaKatCmd;
impl ShaKatCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let id = engine_of(req)?;
        let module = req.module_id()?;
        let result = ShaKat::default().execute(env.drivers.sha(id));
        env.kat_status
            .set(KatStatus::for_module(module), result.is_ok());
        result.chain_err(&mut req.status, AsufwError::SHA_KAT_FAILED)?;
        env.release(ResourceKind::sha(id), req)?;
        Ok(CmdStatus::Done)
    }
}
