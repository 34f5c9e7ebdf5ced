//! Tipos de Erro do Buffer Cache
//!
//! Dois grupos:
//! - **Fatais** (`ResourceExhausted`, `ProtocolViolation`): o contexto que
//!   chamou não tem como continuar. Reportados por [`fatal`].
//! - **Propagados** (`DeviceIo`, `UnknownDevice`, ...): retornados ao
//!   chamador em `BioResult`.

use core::fmt;

use super::buf::{BlockId, BufId, DevId};
use crate::arch::{ContextId, NO_CONTEXT};
use crate::drivers::block::BlockError;

/// Tipo de violação do protocolo de uso dos buffers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    /// bwrite sem segurar o SleepLock do buffer
    WriteNotHolding,
    /// brelse sem segurar o SleepLock do buffer
    ReleaseNotHolding,
    /// brelse/bunpin com refcnt já em zero
    Unreferenced,
    /// bunpin com um BufId que não pertence a este cache
    UnknownBuf,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WriteNotHolding => "bwrite sem segurar o buffer",
            Self::ReleaseNotHolding => "brelse sem segurar o buffer",
            Self::Unreferenced => "refcnt negativo (release/unpin sem get/pin)",
            Self::UnknownBuf => "buffer inexistente",
        }
    }
}

/// Diagnóstico de uma violação de protocolo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub buf: BufId,
    pub block: BlockId,
    /// Dono do SleepLock do buffer no momento da violação
    pub holder: Option<ContextId>,
}

/// Erros do buffer cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioError {
    /// Nenhum buffer livre em nenhum bucket
    ResourceExhausted,
    /// Uso incorreto da API (ver [`Violation`])
    ProtocolViolation(Violation),
    /// Falha reportada pelo dispositivo
    DeviceIo(BlockError),
    /// Dispositivo não registrado
    UnknownDevice(DevId),
    /// Tamanho de bloco do dispositivo difere do cache
    BlockSizeMismatch,
    /// Configuração rejeitada por `BCacheConfig::validate`
    InvalidConfig(&'static str),
}

impl BioError {
    /// Retorna descrição legível do erro
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ResourceExhausted => "bget: sem buffers",
            Self::ProtocolViolation(v) => v.kind.as_str(),
            Self::DeviceIo(e) => e.as_str(),
            Self::UnknownDevice(_) => "Dispositivo não registrado",
            Self::BlockSizeMismatch => "Tamanho de bloco incompatível",
            Self::InvalidConfig(reason) => *reason,
        }
    }

    /// Erros que encerram o contexto que os encontrou
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ResourceExhausted | Self::ProtocolViolation(_))
    }
}

impl fmt::Display for BioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ProtocolViolation(v) => write!(
                f,
                "{} (buf={} dev={} blockno={} holder={:?})",
                v.kind.as_str(),
                v.buf.index(),
                v.block.dev.0,
                v.block.blockno,
                v.holder
            ),
            Self::DeviceIo(e) => write!(f, "I/O: {}", e),
            Self::UnknownDevice(dev) => write!(f, "{} (dev={})", self.as_str(), dev.0),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl From<BlockError> for BioError {
    fn from(e: BlockError) -> Self {
        Self::DeviceIo(e)
    }
}

/// Tipo Result específico do buffer cache
pub type BioResult<T> = Result<T, BioError>;

/// Reporta um erro fatal e aborta o contexto atual.
#[cold]
pub fn fatal(err: BioError) -> ! {
    crate::kerror!("(BCache) ================ FATAL ================");
    crate::kerror!(err.as_str());
    if let BioError::ProtocolViolation(v) = err {
        crate::kerror!("(BCache) buf=", v.buf.index());
        crate::kerror!("(BCache) dev=", v.block.dev.0);
        crate::kerror!("(BCache) blockno=", v.block.blockno);
        crate::kerror!("(BCache) holder=", v.holder.unwrap_or(NO_CONTEXT));
    }
    panic!("bcache: {}", err);
}
