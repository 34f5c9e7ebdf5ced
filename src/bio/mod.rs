//! # Buffer Cache (bio)
//!
//! Cache de blocos de disco compartilhado por todos os cores.
//!
//! ## Arquitetura
//!
//! - **Pool**: `nbuf` buffers de tamanho fixo, alocados uma vez no init.
//! - **Buckets**: `nbucket` listas LRU, cada uma com seu `spin::Mutex`. O
//!   bloco `b` sempre vive no bucket `b % nbucket` (seu *home*).
//! - **Despejo**: sem buffer livre no home, o `bget` rouba o buffer livre
//!   mais frio de outro bucket e o move para o home.
//!
//! ## Locks
//!
//! | Lock                | Tipo          | Protege                        |
//! |---------------------|---------------|--------------------------------|
//! | `buckets[i]`        | `spin::Mutex` | lista, identidade e refcnt     |
//! | `Buf::data`         | `SleepLock`   | payload (pode ser segurado I/O)|
//!
//! Nenhum lock de bucket é segurado enquanto se espera por um SleepLock.
//! Dois locks de bucket são sempre adquiridos em ordem crescente (ver
//! [`probe`]).

pub mod bucket;
pub mod buf;
pub mod cache;
pub mod config;
pub mod error;
pub mod probe;
pub mod stats;


pub use buf::{BlockId, BufFlags, BufId, DevId};
pub use cache::{AuditReport, BufGuard, BufferCache, ReadFailure};
pub use config::{BCacheConfig, RecencyPolicy, BSIZE, NBUCKET, NBUF};
pub use error::{fatal, BioError, BioResult, Violation, ViolationKind};
pub use probe::{lock_order, lock_schedule, LockOp, Probe, ProbeCursor};
pub use stats::BCacheStats;
