/*++

Licensed under the Apache-2.0 license.

File Name:

    resource.rs

Abstract:

    File contains the Resource Registry tracking busy/idle state and the
    owning request of every shared hardware unit.

--*/

use crate::module::ModuleId;
use asufw_drivers::{AsufwError, AsufwResult, DmaId, ShaId, DMA_COUNT};
use bitflags::bitflags;

/// Shared unit arbitrated by the registry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Dma0 = 0,
    Dma1 = 1,
    Sha2 = 2,
    Sha3 = 3,
    Trng = 4,
    /// Logical unit of the HMAC module
    Hmac = 5,
    Aes = 6,
}

impl ResourceKind {
    pub const COUNT: usize = 7;

    pub const ALL: [ResourceKind; Self::COUNT] = [
        ResourceKind::Dma0,
        ResourceKind::Dma1,
        ResourceKind::Sha2,
        ResourceKind::Sha3,
        ResourceKind::Trng,
        ResourceKind::Hmac,
        ResourceKind::Aes,
    ];

    pub fn dma(id: DmaId) -> Self {
        match id {
            DmaId::Dma0 => ResourceKind::Dma0,
            DmaId::Dma1 => ResourceKind::Dma1,
        }
    }

    pub fn sha(id: ShaId) -> Self {
        match id {
            ShaId::Sha2 => ResourceKind::Sha2,
            ShaId::Sha3 => ResourceKind::Sha3,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Owner {
    pub module: ModuleId,
    pub req_id: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceState {
    Idle,
    Busy(Owner),
}

bitflags! {
    /// Set of resource kinds, returned by `ResourceRegistry::release_all`.
    /// Bit positions follow the `ResourceKind` discriminants.
    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    pub struct ResourceSet: u8 {
        const DMA0 = 1 << ResourceKind::Dma0 as u8;
        const DMA1 = 1 << ResourceKind::Dma1 as u8;
        const SHA2 = 1 << ResourceKind::Sha2 as u8;
        const SHA3 = 1 << ResourceKind::Sha3 as u8;
        const TRNG = 1 << ResourceKind::Trng as u8;
        const HMAC = 1 << ResourceKind::Hmac as u8;
        const AES = 1 << ResourceKind::Aes as u8;
    }
}

impl From<ResourceKind> for ResourceSet {
    fn from(kind: ResourceKind) -> Self {
        Self::from_bits_retain(1 << kind.index())
    }
}

impl ResourceSet {
    /// The kinds in the set, in `ResourceKind::ALL` order.
    pub fn kinds(self) -> impl Iterator<Item = ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(ResourceSet::from(*kind)))
    }
}

/// Busy/idle table for every `ResourceKind`.
///
/// The registry never touches engine hardware; resetting an engine after a
/// forced release is the caller's job.
pub struct ResourceRegistry {
    table: [ResourceState; ResourceKind::COUNT],
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceRegistry {
    pub const fn new() -> Self {
        Self {
            table: [ResourceState::Idle; ResourceKind::COUNT],
        }
    }

    pub fn state(&self, kind: ResourceKind) -> ResourceState {
        self.table[kind.index()]
    }

    pub fn owner(&self, kind: ResourceKind) -> Option<Owner> {
        match self.state(kind) {
            ResourceState::Busy(owner) => Some(owner),
            ResourceState::Idle => None,
        }
    }

    pub fn is_busy(&self, kind: ResourceKind) -> bool {
        self.owner(kind).is_some()
    }

    /// Mark `kind` busy on behalf of `owner`
    ///
    /// # Returns
    ///
    /// * `AsufwResult<()>` - `RESOURCE_UNAVAILABLE` if already busy
    pub fn allocate(&mut self, kind: ResourceKind, owner: Owner) -> AsufwResult<()> {
        let slot = &mut self.table[kind.index()];
        if *slot != ResourceState::Idle {
            return Err(AsufwError::RESOURCE_UNAVAILABLE);
        }
        *slot = ResourceState::Busy(owner);
        Ok(())
    }

    /// Allocate the first idle DMA engine.
    pub fn allocate_dma(&mut self, owner: Owner) -> Option<DmaId> {
        let id = DmaId::ALL
            .into_iter()
            .find(|id| !self.is_busy(ResourceKind::dma(*id)))?;
        self.table[ResourceKind::dma(id).index()] = ResourceState::Busy(owner);
        Some(id)
    }

    /// Release `kind`; only the owning request may do so.
    pub fn release(&mut self, kind: ResourceKind, req_id: u32) -> AsufwResult<()> {
        match self.owner(kind) {
            Some(owner) if owner.req_id == req_id => {
                self.table[kind.index()] = ResourceState::Idle;
                Ok(())
            }
            _ => Err(AsufwError::RELEASE_NOT_ALLOWED),
        }
    }

    /// Mark `kind` idle without an ownership check.
    pub fn idle(&mut self, kind: ResourceKind) {
        self.table[kind.index()] = ResourceState::Idle;
    }

    /// Ok if `kind` is busy and owned by `req_id`.
    pub fn check_owner(&self, kind: ResourceKind, req_id: u32) -> AsufwResult<()> {
        match self.owner(kind) {
            Some(owner) if owner.req_id == req_id => Ok(()),
            _ => Err(AsufwError::RESOURCE_OWNER_MISMATCH),
        }
    }

    /// Force-release everything owned by `req_id`.
    pub fn release_all(&mut self, req_id: u32) -> ResourceSet {
        let mut released = ResourceSet::empty();
        for kind in ResourceKind::ALL {
            if matches!(self.owner(kind), Some(owner) if owner.req_id == req_id) {
                self.idle(kind);
                released |= ResourceSet::from(kind);
            }
        }
        released
    }

    /// Number of DMA engines currently idle.
    pub fn idle_dma_count(&self) -> usize {
        DmaId::ALL
            .into_iter()
            .filter(|id| !self.is_busy(ResourceKind::dma(*id)))
            .count()
    }
}

const _: () = assert!(DMA_COUNT == 2);
