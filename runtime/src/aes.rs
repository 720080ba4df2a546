/*++

Licensed under the Apache-2.0 license.

File Name:

    aes.rs

Abstract:

    File contains the AES service module. An OPERATION streams host memory
    through the engine in chunks, one DMA transfer per chunk, and resumes
    after each transfer until the whole buffer is processed.

--*/

use crate::drivers::Env;
use crate::info::GetInfoCmd;
use crate::module::{
    acquire_resources, CmdStatus, CommandDesc, KatStatus, ModuleDesc, ModuleId, ResourceMask,
};
use crate::request::{Continuation, Request};
use crate::resource::ResourceKind;
use asufw_drivers::{
    AesDirection, AesMode, AsufwError, AsufwResult, ResultExt, AES_BLOCK_LEN, AES_KEY_LEN,
};
use asufw_kat::AesKat;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const AES_MODULE_VERSION: u32 = 1;

pub mod cmd {
    pub const OPERATION: u8 = 0;
    pub const KAT: u8 = 1;
    pub const GET_INFO: u8 = 2;
}

/// AES OPERATION payload.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct AesOperationReq {
    pub key: [u8; AES_KEY_LEN],
    /// IV for CBC, initial counter block for CTR
    pub iv: [u8; AES_BLOCK_LEN],
    pub src_addr_lo: u32,
    pub src_addr_hi: u32,
    pub dst_addr_lo: u32,
    pub dst_addr_hi: u32,
    pub data_size: u32,
    /// Bytes moved per DMA transfer; the last chunk may be shorter
    pub chunk_size: u32,
    /// `AesMode` wire value
    pub mode: u32,
    /// `AesDirection` wire value
    pub direction: u32,
}

impl AesOperationReq {
    pub fn src_addr(&self) -> u64 {
        (u64::from(self.src_addr_hi) << 32) | u64::from(self.src_addr_lo)
    }

    pub fn dst_addr(&self) -> u64 {
        (u64::from(self.dst_addr_hi) << 32) | u64::from(self.dst_addr_lo)
    }

    fn check(&self) -> AsufwResult<()> {
        let block = AES_BLOCK_LEN as u32;
        for len in [self.data_size, self.chunk_size] {
            if len == 0 || len % block != 0 {
                return Err(AsufwError::AES_INVALID_PARAM);
            }
        }
        Ok(())
    }
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct AesOperationResp {
    pub processed: u32,
}

const AES_COMMANDS: [CommandDesc; 3] = [
    CommandDesc {
        handler: AesOperationCmd::execute,
        resources: ResourceMask::DMA.union(ResourceMask::AES),
    },
    CommandDesc {
        handler: AesKatCmd::execute,
        resources: ResourceMask::AES,
    },
    CommandDesc {
        handler: get_info,
        resources: ResourceMask::empty(),
    },
];

pub static AES_MODULE: ModuleDesc = ModuleDesc {
    id: ModuleId::Aes,
    version: AES_MODULE_VERSION,
    commands: &AES_COMMANDS,
    resource_handler: acquire_resources,
};

fn get_info(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
    GetInfoCmd::execute(env, req, AES_MODULE_VERSION)
}

pub struct AesOperationCmd;
impl AesOperationCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let op: AesOperationReq = req.args_as()?;

        let done = match req.cont {
            Continuation::Start => {
                op.check()?;
                let mode = AesMode::try_from(op.mode)?;
                let dir = AesDirection::try_from(op.direction)?;
                env.drivers.aes.start(mode, dir, &op.key, &op.iv)?;
                0
            }
            Continuation::AesChunk { done } => {
                env.drivers.aes.update_done()?;
                done
            }
            Continuation::ShaUpdate | Continuation::HmacUpdate => {
                return Err(AsufwError::INTERNAL)
            }
        };

        if done < op.data_size {
            let len = op.chunk_size.min(op.data_size - done);
            let last = done + len == op.data_size;
            let dma_id = env.request_dma(req)?;
            let (aes, dma) = env.drivers.aes_and_dma(dma_id);
            aes.update_dma(
                dma,
                op.src_addr() + u64::from(done),
                op.dst_addr() + u64::from(done),
                len,
                last,
            )?;
            req.cont = Continuation::AesChunk { done: done + len };
            return Ok(CmdStatus::InProgress(dma_id));
        }

        env.drivers.aes.finish()?;
        env.release_dma(req)?;
        env.release(ResourceKind::Aes, req)?;
        req.set_response_as(&AesOperationResp { processed: done })?;
        Ok(CmdStatus::Done)
    }
}

pub struct AesKatCmd;
impl AesKatCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let result = AesKat::default().execute(&mut env.drivers.aes);
        env.kat_status.set(KatStatus::AES, result.is_ok());
        result.chain_err(&mut req.status, AsufwError::AES_KAT_FAILED)?;
        env.release(ResourceKind::Aes, req)?;
        Ok(CmdStatus::Done)
    }
}
