/*++

Licensed under the Apache-2.0 license.

File Name:

    hmac.rs

Abstract:

    File contains the HMAC service module. The MAC is computed over SHA2 or
    SHA3, selected by the hash mode of each request.

--*/

use crate::drivers::Env;
use crate::info::GetInfoCmd;
use crate::module::{
    acquire_resources, acquire_stream, CmdStatus, CommandDesc, KatStatus, ModuleDesc, ModuleId,
    ResourceMask,
};
use crate::request::{Continuation, Request};
use crate::resource::{ResourceKind, ResourceRegistry};
use crate::sha::StreamFlags;
use asufw_drivers::{
    secure_zeroize, AsufwError, AsufwResult, ResultExt, ShaId, ShaMode, HMAC_MAX_KEY_LEN,
    SHA_MAX_DIGEST_LEN,
};
use asufw_kat::HmacKat;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const HMAC_MODULE_VERSION: u32 = 1;

pub mod cmd {
    pub const COMPUTE: u8 = 0;
    pub const KAT: u8 = 1;
    pub const GET_INFO: u8 = 2;
}

/// HMAC COMPUTE payload. `sha_mode` must be the same on every chunk of one
/// operation; the key is read on INIT only.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct HmacComputeReq {
    pub key_addr_lo: u32,
    pub key_addr_hi: u32,
    pub key_len: u32,
    pub msg_addr_lo: u32,
    pub msg_addr_hi: u32,
    pub msg_len: u32,
    pub sha_mode: u32,
    pub flags: u32,
}

impl HmacComputeReq {
    pub fn key_addr(&self) -> u64 {
        (u64::from(self.key_addr_hi) << 32) | u64::from(self.key_addr_lo)
    }

    pub fn msg_addr(&self) -> u64 {
        (u64::from(self.msg_addr_hi) << 32) | u64::from(self.msg_addr_lo)
    }
}

const HMAC_COMMANDS: [CommandDesc; 3] = [
    CommandDesc {
        handler: HmacComputeCmd::execute,
        // The hash engine is picked from the payload by the resource handler.
        resources: ResourceMask::DMA.union(ResourceMask::HMAC),
    },
    CommandDesc {
        handler: HmacKatCmd::execute,
        resources: ResourceMask::SHA2.union(ResourceMask::HMAC),
    },
    CommandDesc {
        handler: get_info,
        resources: ResourceMask::empty(),
    },
];

pub static HMAC_MODULE: ModuleDesc = ModuleDesc {
    id: ModuleId::Hmac,
    version: HMAC_MODULE_VERSION,
    commands: &HMAC_COMMANDS,
    resource_handler: hmac_resource_handler,
};

fn hmac_resource_handler(
    resources: &mut ResourceRegistry,
    req: &mut Request,
    mask: ResourceMask,
) -> AsufwResult<()> {
    if req.header().command_id() != cmd::COMPUTE {
        return acquire_resources(resources, req, mask);
    }
    let op: HmacComputeReq = req.args_as()?;
    let flags = StreamFlags::parse(op.flags, AsufwError::HMAC_INVALID_PARAM)?;
    let engine = match ShaMode::try_from(op.sha_mode)?.engine() {
        ShaId::Sha2 => ResourceMask::SHA2,
        ShaId::Sha3 => ResourceMask::SHA3,
    };
    let init = flags.contains(StreamFlags::INIT);
    acquire_stream(
        resources,
        req,
        engine | ResourceMask::HMAC,
        init,
        init || flags.contains(StreamFlags::UPDATE),
    )
}

fn get_info(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
    GetInfoCmd::execute(env, req, HMAC_MODULE_VERSION)
}

pub struct HmacComputeCmd;
impl HmacComputeCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let op: HmacComputeReq = req.args_as()?;
        let flags = StreamFlags::parse(op.flags, AsufwError::HMAC_INVALID_PARAM)?;
        let mode = ShaMode::try_from(op.sha_mode)?;
        let id = mode.engine();

        match req.cont {
            Continuation::Start => {
                if flags.contains(StreamFlags::INIT) {
                    Self::init(env, req, &op, mode)?;
                } else if env.drivers.hmac.mode() != Some(mode) {
                    return Err(AsufwError::HMAC_INVALID_PARAM);
                }
                if flags.contains(StreamFlags::UPDATE) {
                    let dma_id = env.request_dma(req)?;
                    let (hmac, sha, dma) = env.drivers.hmac_parts(id, dma_id);
                    hmac.update_dma(sha, dma, op.msg_addr(), op.msg_len)?;
                    req.cont = Continuation::HmacUpdate;
                    return Ok(CmdStatus::InProgress(dma_id));
                }
            }
            Continuation::HmacUpdate => {
                let (hmac, sha) = env.drivers.hmac_and_sha(id);
                hmac.update_done(sha)?;
            }
            Continuation::ShaUpdate | Continuation::AesChunk { .. } => {
                return Err(AsufwError::INTERNAL)
            }
        }
        env.release_dma(req)?;

        if flags.contains(StreamFlags::FINAL) {
            let mut mac = [0u8; SHA_MAX_DIGEST_LEN];
            let (hmac, sha) = env.drivers.hmac_and_sha(id);
            let result = hmac.finish(sha, &mut mac).and_then(|len| req.set_response(&mac[..len]));
            secure_zeroize(&mut mac);
            result?;
            env.release(ResourceKind::sha(id), req)?;
            env.release(ResourceKind::Hmac, req)?;
        }
        Ok(CmdStatus::Done)
    }

    /// Read the key from host memory and start the inner hash.
    fn init(env: &mut Env, req: &Request, op: &HmacComputeReq, mode: ShaMode) -> AsufwResult<()> {
        let key_len = usize::try_from(op.key_len).map_err(|_| AsufwError::HMAC_INVALID_KEY_LEN)?;
        if key_len == 0 || key_len > HMAC_MAX_KEY_LEN {
            return Err(AsufwError::HMAC_INVALID_KEY_LEN);
        }
        let dma_id = env.request_dma(req)?;
        let mut key = [0u8; HMAC_MAX_KEY_LEN];
        let (hmac, sha, dma) = env.drivers.hmac_parts(mode.engine(), dma_id);
        let result = dma
            .read_buffer(op.key_addr(), &mut key[..key_len])
            .and_then(|_| hmac.init(sha, mode, &key[..key_len]));
        secure_zeroize(&mut key);
        result
    }
}

pub struct HmacKatCmd;
impl HmacKatCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let drivers = &mut *env.drivers;
        let result = HmacKat::default().execute(&mut drivers.hmac, &mut drivers.sha2);
        env.kat_status.set(KatStatus::HMAC, result.is_ok());
        result.chain_err(&mut req.status, AsufwError::HMAC_KAT_FAILED)?;
        env.release(ResourceKind::Sha2, req)?;
        env.release(ResourceKind::Hmac, req)?;
        Ok(CmdStatus::Done)
    }
}
