//! # Configuração do Buffer Cache
//!
//! Define constantes padrão e a configuração de uma instância. Os valores
//! podem ser sobrescritos pela linha de comando do kernel:
//!
//! ```text
//! bcache.nbuf=64 bcache.buckets=13 bcache.bsize=1024 bcache.recency=release
//! ```

use super::error::{BioError, BioResult};
use crate::boot::CommandLine;

// =============================================================================
// CONSTANTES PADRÃO
// =============================================================================

/// Número de buffers no pool
pub const NBUF: usize = 30;

/// Número de buckets (primo, para espalhar blocos sequenciais)
pub const NBUCKET: usize = 13;

/// Tamanho de um bloco de disco (bytes)
pub const BSIZE: usize = 1024;

// =============================================================================
// CHAVES DA LINHA DE COMANDO
// =============================================================================

pub const KEY_NBUF: &str = "bcache.nbuf";
pub const KEY_NBUCKET: &str = "bcache.buckets";
pub const KEY_BSIZE: &str = "bcache.bsize";
pub const KEY_RECENCY: &str = "bcache.recency";

/// Quando um buffer volta para a ponta quente da lista do seu bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecencyPolicy {
    /// Nunca; apenas roubos reordenam (inserção na ponta quente do home)
    Fixed,
    /// A cada hit
    OnHit,
    /// Quando um brelse leva o refcnt a zero
    #[default]
    OnRelease,
}

impl RecencyPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fixed" => Some(Self::Fixed),
            "hit" => Some(Self::OnHit),
            "release" => Some(Self::OnRelease),
            _ => None,
        }
    }
}

/// Configuração de uma instância do buffer cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BCacheConfig {
    /// Buffers no pool (M)
    pub nbuf: usize,
    /// Buckets (N), deve ser menor que `nbuf`
    pub nbucket: usize,
    /// Bytes por bloco
    pub block_size: usize,
    pub recency: RecencyPolicy,
}

impl Default for BCacheConfig {
    fn default() -> Self {
        Self::new(NBUF, NBUCKET)
    }
}

impl BCacheConfig {
    pub const fn new(nbuf: usize, nbucket: usize) -> Self {
        Self {
            nbuf,
            nbucket,
            block_size: BSIZE,
            recency: RecencyPolicy::OnRelease,
        }
    }

    pub const fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub const fn with_recency(mut self, recency: RecencyPolicy) -> Self {
        self.recency = recency;
        self
    }

    pub fn validate(&self) -> BioResult<()> {
        if self.nbucket == 0 {
            return Err(BioError::InvalidConfig("bcache: nbucket deve ser >= 1"));
        }
        if self.nbuf <= self.nbucket {
            return Err(BioError::InvalidConfig("bcache: nbuf deve ser maior que nbucket"));
        }
        if self.nbuf > u32::MAX as usize {
            return Err(BioError::InvalidConfig("bcache: nbuf grande demais"));
        }
        if self.block_size == 0 {
            return Err(BioError::InvalidConfig("bcache: bsize deve ser > 0"));
        }
        Ok(())
    }

    /// Parte dos padrões e aplica as chaves `bcache.*` da linha de comando.
    ///
    /// Chaves desconhecidas são ignoradas; valores malformados não.
    pub fn from_cmdline(args: &str) -> BioResult<Self> {
        let cmdline = CommandLine::new(args);
        let mut config = Self::default();

        if let Some(v) = cmdline.get(KEY_NBUF) {
            config.nbuf = parse_usize(v, "bcache.nbuf inválido")?;
        }
        if let Some(v) = cmdline.get(KEY_NBUCKET) {
            config.nbucket = parse_usize(v, "bcache.buckets inválido")?;
        }
        if let Some(v) = cmdline.get(KEY_BSIZE) {
            config.block_size = parse_usize(v, "bcache.bsize inválido")?;
        }
        if let Some(v) = cmdline.get(KEY_RECENCY) {
            config.recency = RecencyPolicy::parse(v)
                .ok_or(BioError::InvalidConfig("bcache.recency inválido"))?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_usize(value: &str, reason: &'static str) -> BioResult<usize> {
    value.parse().map_err(|_| BioError::InvalidConfig(reason))
}
