// Licensed under the Apache-2.0 license

use crate::drivers::Env;
use crate::module::{CmdStatus, KatStatus};
use crate::request::Request;
use asufw_drivers::AsufwResult;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ModuleInfoResp {
    pub module_id: u32,
    pub version: u32,
    /// 1 if the module's last known answer test passed
    pub kat_passed: u32,
}

/// GET_INFO: needs no resources and answers while every engine is busy.
pub struct GetInfoCmd;
impl GetInfoCmd {
    pub(crate) fn execute(
        env: &mut Env,
        req: &mut Request,
        version: u32,
    ) -> AsufwResult<CmdStatus> {
        let module = req.module_id()?;
        let resp = ModuleInfoResp {
            module_id: u32::from(u8::from(module)),
            version,
            kat_passed: u32::from(env.kat_status.contains(KatStatus::for_module(module))),
        };
        req.set_response_as(&resp)?;
        Ok(CmdStatus::Done)
    }
}
