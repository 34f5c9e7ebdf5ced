//! # Synchronization Primitives
//!
//! Primitivas de sincronização usadas pelo buffer cache.
//!
//! ## Hierarquia de Uso
//!
//! ```text
//! spin::Mutex → Locks dos buckets: seções curtas, nunca durante I/O
//! SleepLock   → Lock exclusivo de cada buffer: longo, pode esperar
//! ```
//!
//! ## Regras
//!
//! - **spin::Mutex**: Nunca segurar através de um ponto de espera
//! - **SleepLock**: Pode ser segurado durante I/O de disco
//! - **Ordem de Lock**: Dois buckets são sempre adquiridos em ordem
//!   crescente de índice

/// Lock exclusivo com dono (pode esperar)
pub mod sleeplock;

pub use sleeplock::{SleepLock, SleepLockGuard};
