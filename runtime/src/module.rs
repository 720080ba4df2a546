/*++

Licensed under the Apache-2.0 license.

File Name:

    module.rs

Abstract:

    File contains the Module Registry: the append-only table of service
    modules, their command tables and the resources each command needs.

--*/

use crate::drivers::Env;
use crate::request::Request;
use crate::resource::{Owner, ResourceKind, ResourceRegistry};
use asufw_drivers::{AsufwError, AsufwResult, DmaId};
use bitflags::bitflags;

/// Capacity of the module table.
pub const MODULE_CAPACITY: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ModuleId {
    Sha2 = 0,
    Sha3 = 1,
    Trng = 2,
    Hmac = 3,
    Aes = 4,
}

impl From<ModuleId> for u8 {
    fn from(id: ModuleId) -> u8 {
        id as u8
    }
}

impl TryFrom<u8> for ModuleId {
    type Error = AsufwError;

    fn try_from(val: u8) -> AsufwResult<Self> {
        match val {
            0 => Ok(ModuleId::Sha2),
            1 => Ok(ModuleId::Sha3),
            2 => Ok(ModuleId::Trng),
            3 => Ok(ModuleId::Hmac),
            4 => Ok(ModuleId::Aes),
            _ => Err(AsufwError::MODULE_NOT_REGISTERED),
        }
    }
}

bitflags! {
    /// Resources a command needs before its handler runs.
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct ResourceMask: u32 {
        const DMA = 1 << 0;
        const SHA2 = 1 << 1;
        const SHA3 = 1 << 2;
        const TRNG = 1 << 3;
        const HMAC = 1 << 4;
        const AES = 1 << 5;
    }
}

bitflags! {
    /// Modules whose known answer tests passed.
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct KatStatus: u32 {
        const SHA2 = 1 << 0;
        const SHA3 = 1 << 1;
        const TRNG = 1 << 2;
        const HMAC = 1 << 3;
        const AES = 1 << 4;
    }
}

impl KatStatus {
    pub fn for_module(id: ModuleId) -> Self {
        match id {
            ModuleId::Sha2 => KatStatus::SHA2,
            ModuleId::Sha3 => KatStatus::SHA3,
            ModuleId::Trng => KatStatus::TRNG,
            ModuleId::Hmac => KatStatus::HMAC,
            ModuleId::Aes => KatStatus::AES,
        }
    }
}

/// Handler outcome short of failure.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CmdStatus {
    /// Response is ready
    Done,
    /// A transfer on this DMA engine was issued; re-invoke on completion
    InProgress(DmaId),
}

pub type CmdHandler = fn(&mut Env<'_, '_>, &mut Request) -> AsufwResult<CmdStatus>;

/// Acquires the resources of one command before its handler runs.
pub type ResourceHandler =
    fn(&mut ResourceRegistry, &mut Request, ResourceMask) -> AsufwResult<()>;

#[derive(Copy, Clone)]
pub struct CommandDesc {
    pub handler: CmdHandler,
    pub resources: ResourceMask,
}

pub struct ModuleDesc {
    pub id: ModuleId,
    pub version: u32,
    pub commands: &'static [CommandDesc],
    pub resource_handler: ResourceHandler,
}

impl ModuleDesc {
    pub fn command(&self, command_id: u8) -> AsufwResult<&'static CommandDesc> {
        self.commands
            .get(usize::from(command_id))
            .ok_or(AsufwError::INVALID_COMMAND)
    }
}

pub struct ModuleRegistry {
    modules: [Option<&'static ModuleDesc>; MODULE_CAPACITY],
    count: usize,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleRegistry {
    pub const fn new() -> Self {
        Self {
            modules: [None; MODULE_CAPACITY],
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append a module to the table.
    pub fn register(&mut self, desc: &'static ModuleDesc) -> AsufwResult<()> {
        if self.lookup(u8::from(desc.id)).is_ok() {
            return Err(AsufwError::MODULE_ALREADY_REGISTERED);
        }
        let slot = self
            .modules
            .get_mut(self.count)
            .ok_or(AsufwError::MODULE_TABLE_FULL)?;
        *slot = Some(desc);
        self.count += 1;
        Ok(())
    }

    pub fn lookup(&self, module_id: u8) -> AsufwResult<&'static ModuleDesc> {
        self.modules[..self.count]
            .iter()
            .flatten()
            .find(|desc| u8::from(desc.id) == module_id)
            .copied()
            .ok_or(AsufwError::MODULE_NOT_REGISTERED)
    }

    /// Resolve a module/command pair.
    pub fn command(
        &self,
        module_id: u8,
        command_id: u8,
    ) -> AsufwResult<(&'static ModuleDesc, &'static CommandDesc)> {
        let module = self.lookup(module_id)?;
        Ok((module, module.command(command_id)?))
    }
}

/// Acquire the resources named by `mask`: DMA first, then the engines, then
/// the module's own unit.
///
/// Nothing already acquired is rolled back on failure; the dispatcher
/// force-releases the request's resources when it terminates.
pub fn acquire_resources(
    resources: &mut ResourceRegistry,
    req: &mut Request,
    mask: ResourceMask,
) -> AsufwResult<()> {
    let owner = req.owner()?;
    if mask.contains(ResourceMask::DMA) {
        let id = resources
            .allocate_dma(owner)
            .ok_or(AsufwError::DMA_ALLOCATION_FAILED)?;
        req.dma = Some(id);
    }
    acquire_engines(resources, owner, mask)
}

/// Resource acquisition for one chunk of a streaming operation.
///
/// The first chunk (`init`) allocates `units`; later chunks must come from the
/// request id that already owns them. A DMA engine is taken only when `dma`
/// is set and never outlives the chunk.
pub fn acquire_stream(
    resources: &mut ResourceRegistry,
    req: &mut Request,
    units: ResourceMask,
    init: bool,
    dma: bool,
) -> AsufwResult<()> {
    let owner = req.owner()?;
    if dma {
        let id = resources
            .allocate_dma(owner)
            .ok_or(AsufwError::DMA_ALLOCATION_FAILED)?;
        req.dma = Some(id);
    }
    if init {
        return acquire_engines(resources, owner, units);
    }
    for (bit, kind) in ENGINES {
        if units.contains(bit) {
            resources.check_owner(kind, owner.req_id)?;
        }
    }
    Ok(())
}

const ENGINES: [(ResourceMask, ResourceKind); 5] = [
    (ResourceMask::SHA2, ResourceKind::Sha2),
    (ResourceMask::SHA3, ResourceKind::Sha3),
    (ResourceMask::TRNG, ResourceKind::Trng),
    (ResourceMask::HMAC, ResourceKind::Hmac),
    (ResourceMask::AES, ResourceKind::Aes),
];

/// Allocate the fixed units of `mask`, in table order.
fn acquire_engines(
    resources: &mut ResourceRegistry,
    owner: Owner,
    mask: ResourceMask,
) -> AsufwResult<()> {
    for (bit, kind) in ENGINES {
        if mask.contains(bit) {
            resources.allocate(kind, owner)?;
        }
    }
    Ok(())
}
