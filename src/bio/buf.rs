//! # Buffers (Slot Pool)
//!
//! Cada [`Buf`] guarda o payload de um bloco e os metadados que o cache usa
//! para decidir quem pode reutilizá-lo.
//!
//! ## Quem protege o quê
//!
//! | Campo            | Protegido por                                  |
//! |------------------|------------------------------------------------|
//! | `key`, `refcnt`  | lock do bucket cuja lista contém o buffer      |
//! | `VALID`, `DIRTY` | `SleepLock` do buffer (ou bucket, se refcnt=0) |
//! | `data`           | `SleepLock` do buffer                          |
//!
//! Os campos são atômicos apenas para permitir leitura de diagnóstico sem
//! lock; toda escrita acontece com o lock correspondente adquirido.

use alloc::boxed::Box;
use alloc::vec;
use core::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};

use bitflags::bitflags;

use crate::sync::SleepLock;

/// Identificador de dispositivo (índice no registro do cache)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DevId(pub u32);

/// Índice estável de um buffer no pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BufId(u32);

impl BufId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identidade de um bloco: (dispositivo, número do bloco)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId {
    pub dev: DevId,
    pub blockno: u32,
}

impl BlockId {
    pub const fn new(dev: DevId, blockno: u32) -> Self {
        Self { dev, blockno }
    }

    pub(crate) const fn pack(self) -> u64 {
        ((self.dev.0 as u64) << 32) | self.blockno as u64
    }

    pub(crate) const fn unpack(raw: u64) -> Self {
        Self {
            dev: DevId((raw >> 32) as u32),
            blockno: raw as u32,
        }
    }
}

bitflags! {
    /// Estado de um buffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BufFlags: u8 {
        /// Carrega uma identidade (já foi alocado para algum bloco)
        const ASSIGNED = 1 << 0;
        /// Payload reflete o conteúdo do disco
        const VALID    = 1 << 1;
        /// Payload modificado desde o último bwrite
        const DIRTY    = 1 << 2;
    }
}

/// Um slot do pool
pub struct Buf {
    id: BufId,
    key: AtomicU64,
    refcnt: AtomicU32,
    flags: AtomicU8,
    pub(crate) data: SleepLock<Box<[u8]>>,
}

impl Buf {
    pub(crate) fn new(id: BufId, block_size: usize) -> Self {
        Self {
            id,
            key: AtomicU64::new(0),
            refcnt: AtomicU32::new(0),
            flags: AtomicU8::new(BufFlags::empty().bits()),
            data: SleepLock::new(vec![0u8; block_size].into_boxed_slice()),
        }
    }

    pub fn id(&self) -> BufId {
        self.id
    }

    /// Identidade atual. Só é estável com refcnt > 0 ou com o lock do bucket.
    pub fn block(&self) -> BlockId {
        BlockId::unpack(self.key.load(Ordering::Acquire))
    }

    pub fn refcnt(&self) -> u32 {
        self.refcnt.load(Ordering::Acquire)
    }

    pub fn flags(&self) -> BufFlags {
        BufFlags::from_bits_truncate(self.flags.load(Ordering::Acquire))
    }

    /// Este buffer carrega exatamente esta identidade?
    pub(crate) fn is(&self, block: BlockId) -> bool {
        self.flags().contains(BufFlags::ASSIGNED) && self.key.load(Ordering::Acquire) == block.pack()
    }

    pub(crate) fn set_flags(&self, flags: BufFlags) {
        self.flags.fetch_or(flags.bits(), Ordering::AcqRel);
    }

    pub(crate) fn clear_flags(&self, flags: BufFlags) {
        self.flags.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Troca a identidade e fixa refcnt=1.
    ///
    /// Requer o lock do bucket que contém o buffer e refcnt == 0.
    pub(crate) fn reassign(&self, block: BlockId) {
        debug_assert_eq!(self.refcnt(), 0);
        self.key.store(block.pack(), Ordering::Release);
        self.flags.store(BufFlags::ASSIGNED.bits(), Ordering::Release);
        self.refcnt.store(1, Ordering::Release);
    }

    /// Requer o lock do bucket.
    pub(crate) fn inc_ref(&self) -> u32 {
        self.refcnt.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Requer o lock do bucket. Retorna `None` se o contador já era zero.
    pub(crate) fn dec_ref(&self) -> Option<u32> {
        match self.refcnt.load(Ordering::Acquire) {
            0 => None,
            n => {
                self.refcnt.store(n - 1, Ordering::Release);
                Some(n - 1)
            }
        }
    }
}
