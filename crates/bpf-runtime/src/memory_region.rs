//! Memory-region table (C1): typed, permission-tagged address ranges with
//! O(1) hot-path validation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::errors::BpfFault;

/// Maximum number of regions a single table can hold.
pub const MAX_REGIONS: usize = 32;

/// Size of the most-recently-matched cache probed before the linear scan.
const MRU_CACHE_SIZE: usize = 8;

/// Access permission bits. A region may grant any combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions(u8);

impl Permissions {
    pub const READ: Permissions = Permissions(0b001);
    pub const WRITE: Permissions = Permissions(0b010);
    pub const EXECUTE: Permissions = Permissions(0b100);
    pub const NONE: Permissions = Permissions(0);

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, required: Permissions) -> bool {
        self.0 & required.0 == required.0
    }
}

impl std::ops::BitOr for Permissions {
    type Output = Permissions;
    fn bitor(self, rhs: Permissions) -> Permissions {
        Permissions(self.0 | rhs.0)
    }
}

/// A single mapped address range. Cache-line aligned so hot readers walking
/// the table don't pull a neighbor region's bytes along for free.
#[repr(align(64))]
#[derive(Debug)]
pub struct Region {
    pub start: u64,
    pub end: u64,
    pub perms: Permissions,
    pub label: &'static str,
    hits: AtomicU64,
}

impl Region {
    fn new(start: u64, end: u64, perms: Permissions, label: &'static str) -> Self {
        Self {
            start,
            end,
            perms,
            label,
            hits: AtomicU64::new(0),
        }
    }

    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    fn matches(&self, addr: u64, end: u64, required: Permissions) -> bool {
        addr >= self.start && end <= self.end && self.perms.contains(required)
    }
}

/// Result of attempting to add a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRegionResult {
    Ok,
    Full,
    Invalid,
}

struct Inner {
    regions: Vec<Region>,
    /// Indices into `regions`, most-recently-matched first.
    mru: [usize; MRU_CACHE_SIZE],
    mru_len: usize,
}

/// The region table itself. Reads are lock-free against a stable snapshot;
/// writes (`add_region`, `clear`) take an exclusive lock and invalidate the
/// MRU cache.
pub struct MemoryRegionTable {
    inner: RwLock<Inner>,
    misses: AtomicUsize,
}

impl Default for MemoryRegionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegionTable {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                regions: Vec::with_capacity(MAX_REGIONS),
                mru: [0; MRU_CACHE_SIZE],
                mru_len: 0,
            }),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn add_region(
        &self,
        start: u64,
        size: u64,
        perms: Permissions,
        label: &'static str,
    ) -> AddRegionResult {
        let Some(end) = start.checked_add(size) else {
            return AddRegionResult::Invalid;
        };
        if size == 0 {
            return AddRegionResult::Invalid;
        }

        let mut inner = self.inner.write();
        if inner.regions.len() >= MAX_REGIONS {
            return AddRegionResult::Full;
        }
        inner.regions.push(Region::new(start, end, perms, label));
        inner.mru_len = 0;
        AddRegionResult::Ok
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.regions.clear();
        inner.mru_len = 0;
    }

    /// Validate a single access, consulting the MRU cache before the linear
    /// scan. The first matching region wins.
    pub fn validate(&self, addr: u64, len: u64, required: Permissions) -> bool {
        let Some(end) = addr.checked_add(len) else {
            return false;
        };

        let inner = self.inner.read();
        for &idx in inner.mru[..inner.mru_len].iter() {
            if let Some(region) = inner.regions.get(idx) {
                if region.matches(addr, end, required) {
                    region.record_hit();
                    return true;
                }
            }
        }

        for (idx, region) in inner.regions.iter().enumerate() {
            if region.matches(addr, end, required) {
                region.record_hit();
                drop(inner);
                self.promote(idx);
                return true;
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        false
    }

    /// Validate up to four addresses sharing the same size and required
    /// permissions. Produces identical results to calling `validate` in a
    /// loop; present as its own entry point so callers can batch a scalar
    /// or (in principle) vectorized check.
    pub fn validate_batch(&self, addrs: &[u64], len: u64, required: Permissions) -> [bool; 4] {
        let mut results = [false; 4];
        for (i, &addr) in addrs.iter().take(4).enumerate() {
            results[i] = self.validate(addr, len, required);
        }
        results
    }

    pub fn region_at(&self, addr: u64) -> Option<RegionSnapshot> {
        let inner = self.inner.read();
        inner
            .regions
            .iter()
            .find(|r| addr >= r.start && addr < r.end)
            .map(RegionSnapshot::from)
    }

    pub fn miss_count(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    fn promote(&self, idx: usize) {
        let mut inner = self.inner.write();
        if inner.mru[..inner.mru_len].contains(&idx) {
            return;
        }
        if inner.mru_len < MRU_CACHE_SIZE {
            inner.mru[inner.mru_len] = idx;
            inner.mru_len += 1;
        } else {
            inner.mru.rotate_right(1);
            inner.mru[0] = idx;
        }
    }
}

/// A read-only copy of a region's public fields.
#[derive(Debug, Clone, Copy)]
pub struct RegionSnapshot {
    pub start: u64,
    pub end: u64,
    pub perms: Permissions,
    pub label: &'static str,
}

impl From<&Region> for RegionSnapshot {
    fn from(r: &Region) -> Self {
        Self {
            start: r.start,
            end: r.end,
            perms: r.perms,
            label: r.label,
        }
    }
}

/// Translate a failed validation into the fault the BPF runtime reports.
pub fn access_fault(addr: u64, len: u64) -> BpfFault {
    BpfFault::MemoryAccess { addr, len }
}
