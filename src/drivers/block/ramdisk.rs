//! # RamDisk
//!
//! Disco em memória. Usado no boot (antes dos drivers reais) e pelos testes
//! do buffer cache, que precisam contar transferências e injetar falhas.

use super::traits::{BlockDevice, BlockError};
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use spin::Mutex;

/// Disco em memória com contadores de I/O
pub struct RamDisk {
    block_size: usize,
    total_blocks: u64,
    data: Mutex<Vec<u8>>,
    read_only: bool,
    /// Se setado, toda transferência falha com `IoError`
    faulty: AtomicBool,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl RamDisk {
    /// Cria disco zerado
    pub fn new(block_size: usize, total_blocks: u64) -> Self {
        Self {
            block_size,
            total_blocks,
            data: Mutex::new(vec![0u8; block_size * total_blocks as usize]),
            read_only: false,
            faulty: AtomicBool::new(false),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    /// Cria disco somente leitura
    pub fn read_only(block_size: usize, total_blocks: u64) -> Self {
        Self {
            read_only: true,
            ..Self::new(block_size, total_blocks)
        }
    }

    /// Liga/desliga injeção de falhas
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::Release);
    }

    /// Número de leituras completadas
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Número de escritas completadas
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Acesso direto ao conteúdo (sem passar pelo cache)
    pub fn peek(&self, lba: u64) -> Result<Vec<u8>, BlockError> {
        let range = self.range(lba)?;
        Ok(self.data.lock()[range].to_vec())
    }

    /// Escreve direto no disco (sem passar pelo cache)
    pub fn poke(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError> {
        if buf.len() != self.block_size {
            return Err(BlockError::InvalidBuffer);
        }
        let range = self.range(lba)?;
        self.data.lock()[range].copy_from_slice(buf);
        Ok(())
    }

    fn range(&self, lba: u64) -> Result<core::ops::Range<usize>, BlockError> {
        if lba >= self.total_blocks {
            return Err(BlockError::InvalidBlock);
        }
        let start = lba as usize * self.block_size;
        Ok(start..start + self.block_size)
    }

    fn check(&self, lba: u64, len: usize) -> Result<core::ops::Range<usize>, BlockError> {
        if self.faulty.load(Ordering::Acquire) {
            return Err(BlockError::IoError);
        }
        if len != self.block_size {
            return Err(BlockError::InvalidBuffer);
        }
        self.range(lba)
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, lba: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let range = self.check(lba, buf.len())?;
        buf.copy_from_slice(&self.data.lock()[range]);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, lba: u64, buf: &[u8]) -> Result<(), BlockError> {
        if self.read_only {
            return Err(BlockError::ReadOnly);
        }
        let range = self.check(lba, buf.len())?;
        self.data.lock()[range].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn block_size(&self) -> usize {
        self.block_size
    }

    fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }
}

// =============================================================================
// TESTES
// =============================================================================
