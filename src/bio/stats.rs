//! # Estatísticas do Buffer Cache

use core::sync::atomic::{AtomicU64, Ordering};

/// Contadores internos (um conjunto por instância de cache)
#[derive(Default)]
pub(crate) struct StatCounters {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub local_allocs: AtomicU64,
    pub steals: AtomicU64,
    pub releases: AtomicU64,
    pub device_reads: AtomicU64,
    pub device_writes: AtomicU64,
    pub dirty_evictions: AtomicU64,
}

#[inline]
pub(crate) fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl StatCounters {
    pub fn snapshot(&self) -> BCacheStats {
        BCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            local_allocs: self.local_allocs.load(Ordering::Relaxed),
            steals: self.steals.load(Ordering::Relaxed),
            releases: self.releases.load(Ordering::Relaxed),
            device_reads: self.device_reads.load(Ordering::Relaxed),
            device_writes: self.device_writes.load(Ordering::Relaxed),
            dirty_evictions: self.dirty_evictions.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BCacheStats {
    /// bget que encontrou o bloco em cache
    pub hits: u64,
    /// bget que precisou reatribuir um buffer
    pub misses: u64,
    /// misses atendidos pelo próprio bucket home
    pub local_allocs: u64,
    /// misses atendidos roubando buffer de outro bucket
    pub steals: u64,
    pub releases: u64,
    pub device_reads: u64,
    pub device_writes: u64,
    /// buffers sujos reatribuídos sem bwrite
    pub dirty_evictions: u64,
}

impl BCacheStats {
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    pub fn hit_percent(&self) -> u64 {
        if self.lookups() == 0 {
            return 0;
        }
        (self.hits * 100) / self.lookups()
    }
}
