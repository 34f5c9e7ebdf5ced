//! # Buckets (Shard Table)
//!
//! Cada bucket é dono de uma lista de buffers ordenada por recência:
//!
//! ```text
//!  front (quente, MRU)                         back (frio, LRU)
//!  ┌─────┬─────┬─────┬─────┐
//!  │ b7  │ b2  │ b15 │ b4  │   ← candidatos a despejo vêm daqui
//!  └─────┴─────┴─────┴─────┘
//! ```
//!
//! A lista guarda apenas índices (`BufId`) no pool; o bucket inteiro vive
//! atrás de um `spin::Mutex` no `BufferCache`. O comprimento fica em torno
//! de NBUF/NBUCKET, então as buscas lineares são curtas.

use alloc::collections::VecDeque;

use super::buf::{BlockId, Buf, BufId};

pub struct Bucket {
    index: usize,
    lru: VecDeque<BufId>,
}

impl Bucket {
    pub fn new(index: usize, capacity: usize) -> Self {
        Self {
            index,
            lru: VecDeque::with_capacity(capacity),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lru.is_empty()
    }

    /// Buffer na posição `pos` (0 = mais quente)
    pub fn at(&self, pos: usize) -> Option<BufId> {
        self.lru.get(pos).copied()
    }

    /// Membros do mais quente ao mais frio
    pub fn members(&self) -> impl Iterator<Item = BufId> + '_ {
        self.lru.iter().copied()
    }

    /// Insere na ponta quente
    pub fn push_warm(&mut self, id: BufId) {
        self.lru.push_front(id);
    }

    /// Remove da lista, retornando o buffer
    pub fn remove(&mut self, pos: usize) -> Option<BufId> {
        self.lru.remove(pos)
    }

    /// Move para a ponta quente
    pub fn touch(&mut self, pos: usize) {
        if pos == 0 {
            return;
        }
        if let Some(id) = self.lru.remove(pos) {
            self.lru.push_front(id);
        }
    }

    pub fn position_of(&self, id: BufId) -> Option<usize> {
        self.lru.iter().position(|&member| member == id)
    }

    /// Procura o buffer que carrega `block`
    pub fn find(&self, bufs: &[Buf], block: BlockId) -> Option<usize> {
        self.lru
            .iter()
            .position(|id| bufs[id.index()].is(block))
    }

    /// Procura, a partir da ponta fria, um buffer com refcnt == 0
    pub fn coldest_free(&self, bufs: &[Buf]) -> Option<usize> {
        self.lru
            .iter()
            .rposition(|id| bufs[id.index()].refcnt() == 0)
    }
}
