/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    File contains the TRNG service module: random bytes, the DRBG health
    gate on demand, and the DRBG instantiate/reseed/generate commands.

--*/

use crate::drivers::Env;
use crate::info::GetInfoCmd;
use crate::module::{
    acquire_resources, CmdStatus, CommandDesc, KatStatus, ModuleDesc, ModuleId, ResourceMask,
};
use crate::request::Request;
use crate::resource::ResourceKind;
use asufw_drivers::{
    cprintln, AsufwError, AsufwResult, ResultExt, Trng, TrngMode, TrngState,
    TRNG_SEC_STRENGTH_BYTES,
};
use asufw_kat::TrngKat;

#[cfg(feature = "drbg")]
use asufw_drivers::{
    secure_zeroize, TrngUserConfig, TRNG_MAX_DF_LENGTH, TRNG_PERS_STRING_LEN,
};
#[cfg(feature = "drbg")]
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

pub const TRNG_MODULE_VERSION: u32 = 1;

pub mod cmd {
    pub const GET_RANDOM_BYTES: u8 = 0;
    pub const KAT: u8 = 1;
    pub const GET_INFO: u8 = 2;
    pub const DRBG_INSTANTIATE: u8 = 3;
    pub const DRBG_RESEED: u8 = 4;
    pub const DRBG_GENERATE: u8 = 5;
}

/// Longest seed accepted by DRBG_INSTANTIATE / DRBG_RESEED.
#[cfg(feature = "drbg")]
const MAX_SEED_LEN: usize = TrngUserConfig::seed_len(TRNG_MAX_DF_LENGTH);

#[cfg(feature = "drbg")]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DrbgInstantiateReq {
    pub seed_addr_lo: u32,
    pub seed_addr_hi: u32,
    pub seed_len: u32,
    pub pers_addr_lo: u32,
    pub pers_addr_hi: u32,
    /// Non-zero if a personalization string is supplied
    pub pers_present: u32,
    pub df_length: u32,
    pub seed_life: u32,
}

#[cfg(feature = "drbg")]
impl DrbgInstantiateReq {
    pub fn seed_addr(&self) -> u64 {
        (u64::from(self.seed_addr_hi) << 32) | u64::from(self.seed_addr_lo)
    }

    pub fn pers_addr(&self) -> u64 {
        (u64::from(self.pers_addr_hi) << 32) | u64::from(self.pers_addr_lo)
    }
}

#[cfg(feature = "drbg")]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DrbgReseedReq {
    pub seed_addr_lo: u32,
    pub seed_addr_hi: u32,
    pub seed_len: u32,
    pub df_length: u32,
}

#[cfg(feature = "drbg")]
impl DrbgReseedReq {
    pub fn seed_addr(&self) -> u64 {
        (u64::from(self.seed_addr_hi) << 32) | u64::from(self.seed_addr_lo)
    }
}

#[cfg(feature = "drbg")]
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct DrbgGenerateReq {
    /// Output size in bytes
    pub size: u32,
    /// Non-zero to request prediction resistance
    pub pred_resistance: u32,
}

const GET_RANDOM_BYTES_DESC: CommandDesc = CommandDesc {
    handler: GetRandomBytesCmd::execute,
    resources: ResourceMask::TRNG,
};
const KAT_DESC: CommandDesc = CommandDesc {
    handler: TrngKatCmd::execute,
    resources: ResourceMask::TRNG,
};
const GET_INFO_DESC: CommandDesc = CommandDesc {
    handler: get_info,
    resources: ResourceMask::empty(),
};

cfg_if::cfg_if! {
    if #[cfg(feature = "drbg")] {
        const TRNG_COMMANDS: [CommandDesc; 6] = [
            GET_RANDOM_BYTES_DESC,
            KAT_DESC,
            GET_INFO_DESC,
            CommandDesc {
                handler: DrbgInstantiateCmd::execute,
                resources: ResourceMask::DMA.union(ResourceMask::TRNG),
            },
            CommandDesc {
                handler: DrbgReseedCmd::execute,
                resources: ResourceMask::DMA.union(ResourceMask::TRNG),
            },
            CommandDesc {
                handler: DrbgGenerateCmd::execute,
                resources: ResourceMask::TRNG,
            },
        ];
    } else {
        const TRNG_COMMANDS: [CommandDesc; 3] = [GET_RANDOM_BYTES_DESC, KAT_DESC, GET_INFO_DESC];
    }
}

pub static TRNG_MODULE: ModuleDesc = ModuleDesc {
    id: ModuleId::Trng,
    version: TRNG_MODULE_VERSION,
    commands: &TRNG_COMMANDS,
    resource_handler: acquire_resources,
};

fn get_info(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
    GetInfoCmd::execute(env, req, TRNG_MODULE_VERSION)
}

/// Bring up the production HRNG instance, optionally in auto-proc mode.
pub(crate) fn start_production(trng: &mut Trng, autoproc: bool) -> AsufwResult<()> {
    trng.init_and_cfg_mode(TrngMode::Hrng)?;
    if autoproc {
        trng.enable_autoproc()?;
    }
    Ok(())
}

/// 32 random bytes, from the auto-proc FIFO when it is running.
pub struct GetRandomBytesCmd;
impl GetRandomBytesCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let trng = &mut env.drivers.trng;
        let out = req.response_mut(TRNG_SEC_STRENGTH_BYTES)?;
        if trng.state() == TrngState::AutoProc {
            trng.read_fifo(out)?;
        } else {
            trng.generate(out, false)?;
        }
        env.release(ResourceKind::Trng, req)?;
        Ok(CmdStatus::Done)
    }
}

/// Re-run the health gate and restore the production instance.
pub struct TrngKatCmd;
impl TrngKatCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let trng = &mut env.drivers.trng;
        let autoproc = trng.state() == TrngState::AutoProc;
        let result = Self::run(trng, autoproc);
        env.kat_status.set(KatStatus::TRNG, result.is_ok());
        if let Err(err) = result {
            cprintln!("[trng] KAT command failed, error=0x{:x}", u32::from(err));
        }
        result.chain_err(&mut req.status, AsufwError::TRNG_KAT_FAILED)?;
        env.release(ResourceKind::Trng, req)?;
        Ok(CmdStatus::Done)
    }

    fn run(trng: &mut Trng, autoproc: bool) -> AsufwResult<()> {
        if autoproc {
            trng.disable_autoproc()?;
        }
        TrngKat::default().health_gate(trng)?;
        start_production(trng, autoproc)
    }
}

/// Read a seed from host memory into `buf`.
#[cfg(feature = "drbg")]
fn read_seed<'b>(
    env: &mut Env,
    req: &Request,
    addr: u64,
    len: u32,
    buf: &'b mut [u8],
) -> AsufwResult<&'b [u8]> {
    let len = usize::try_from(len).map_err(|_| AsufwError::TRNG_INVALID_SEED_LENGTH)?;
    let seed = buf
        .get_mut(..len)
        .filter(|seed| !seed.is_empty())
        .ok_or(AsufwError::TRNG_INVALID_SEED_LENGTH)?;
    let dma_id = env.request_dma(req)?;
    env.drivers.dma(dma_id).read_buffer(addr, &mut *seed)?;
    Ok(seed)
}

#[cfg(feature = "drbg")]
fn df_length(val: u32) -> AsufwResult<u8> {
    u8::try_from(val).map_err(|_| AsufwError::TRNG_INVALID_DF_LENGTH)
}

/// Replace the production instance with a caller seeded DRNG instance. A
/// rejected request leaves the TRNG to the dispatcher, which restarts the
/// production instance.
#[cfg(feature = "drbg")]
pub struct DrbgInstantiateCmd;
#[cfg(feature = "drbg")]
impl DrbgInstantiateCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let args: DrbgInstantiateReq = req.args_as()?;
        let mut seed_buf = [0u8; MAX_SEED_LEN];
        let mut pers = [0u8; TRNG_PERS_STRING_LEN];
        let result = Self::instantiate(env, req, &args, &mut seed_buf, &mut pers);
        secure_zeroize(&mut seed_buf);
        secure_zeroize(&mut pers);
        result?;

        env.release_dma(req)?;
        env.release(ResourceKind::Trng, req)?;
        Ok(CmdStatus::Done)
    }

    fn instantiate(
        env: &mut Env,
        req: &Request,
        args: &DrbgInstantiateReq,
        seed_buf: &mut [u8],
        pers: &mut [u8; TRNG_PERS_STRING_LEN],
    ) -> AsufwResult<()> {
        let cfg = TrngUserConfig {
            mode: TrngMode::Drng,
            df_length: df_length(args.df_length)?,
            seed_life: args.seed_life,
            ..TrngUserConfig::DEFAULT
        };
        let seed_len =
            usize::try_from(args.seed_len).map_err(|_| AsufwError::TRNG_INVALID_SEED_LENGTH)?;
        cfg.check(Some(seed_len))?;
        let seed = read_seed(env, req, args.seed_addr(), args.seed_len, seed_buf)?;
        let pers = if args.pers_present != 0 {
            let dma_id = env.request_dma(req)?;
            env.drivers.dma(dma_id).read_buffer(args.pers_addr(), pers)?;
            Some(&*pers)
        } else {
            None
        };

        let trng = &mut env.drivers.trng;
        match trng.state() {
            TrngState::AutoProc => trng.disable_autoproc()?,
            TrngState::Uninitialized => {}
            _ => trng.uninstantiate()?,
        }
        trng.instantiate(Some(seed), pers, &cfg)
    }
}

#[cfg(feature = "drbg")]
pub struct DrbgReseedCmd;
#[cfg(feature = "drbg")]
impl DrbgReseedCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let args: DrbgReseedReq = req.args_as()?;
        let df = df_length(args.df_length)?;
        let mut seed_buf = [0u8; MAX_SEED_LEN];
        let result = read_seed(env, req, args.seed_addr(), args.seed_len, &mut seed_buf)
            .and_then(|seed| env.drivers.trng.reseed(Some(seed), df));
        secure_zeroize(&mut seed_buf);
        result?;

        env.release_dma(req)?;
        env.release(ResourceKind::Trng, req)?;
        Ok(CmdStatus::Done)
    }
}

#[cfg(feature = "drbg")]
pub struct DrbgGenerateCmd;
#[cfg(feature = "drbg")]
impl DrbgGenerateCmd {
    pub(crate) fn execute(env: &mut Env, req: &mut Request) -> AsufwResult<CmdStatus> {
        let args: DrbgGenerateReq = req.args_as()?;
        let size = usize::try_from(args.size)
            .ok()
            .filter(|size| *size <= TRNG_SEC_STRENGTH_BYTES)
            .ok_or(AsufwError::TRNG_INVALID_BUF_SIZE)?;
        let out = req.response_mut(size)?;
        env.drivers.trng.generate(out, args.pred_resistance != 0)?;
        env.release(ResourceKind::Trng, req)?;
        Ok(CmdStatus::Done)
    }
}
