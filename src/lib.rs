//! Forge BCache.
//!
//! Buffer cache de blocos do Forge Kernel, particionado em buckets com locks
//! independentes. Fica entre os contextos de execução (um por core) e os
//! dispositivos de bloco.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │        Filesystem / Log (consumidores)       │
//! └──────────────────────┬───────────────────────┘
//!            bread / bwrite / brelse / bpin
//! ┌──────────────────────▼───────────────────────┐
//! │  bio::BufferCache                            │
//! │   buckets[0..N]  (spin::Mutex + LRU)         │
//! │   bufs[0..M]     (SleepLock + payload)       │
//! └──────────────────────┬───────────────────────┘
//! ┌──────────────────────▼───────────────────────┐
//! │  drivers::block::BlockDevice                 │
//! └──────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), no_std)]

// Slots, buckets e payloads vivem no heap do kernel
extern crate alloc;

// --- Infraestrutura ---
pub mod arch; // Identidade do contexto de execução
pub mod boot; // Linha de comando do kernel
pub mod klib; // Framework de self-test
pub mod logging; // Macros kinfo!/kdebug!/...
pub mod sync; // SleepLock

// --- Dispositivos ---
pub mod drivers;

// --- Buffer Cache ---
pub mod bio;

pub use crate::bio::{
    BCacheConfig, BCacheStats, BioError, BioResult, BufGuard, BufId, BufferCache, DevId,
    RecencyPolicy,
};
