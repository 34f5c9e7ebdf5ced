//! # Máquina de Estados da Busca
//!
//! Um `bget` percorre os buckets nesta ordem:
//!
//! ```text
//!   Home ──(sem hit, sem livre)──► Foreign(i₀) ──► Foreign(i₁) ──► … ──► Exhausted
//!     │                               │
//!     └──────────► Found ◄────────────┘
//! ```
//!
//! `Foreign` percorre os índices em ordem crescente a partir de 0, pulando o
//! home. A ordem é a mesma para todo home.
//!
//! ## Ordem de Lock
//!
//! - `Home`: apenas o lock do home.
//! - `Foreign(i)`: o home é solto antes; depois o par {home, i} é adquirido
//!   em ordem crescente de índice ([`lock_order`]).
//!
//! Todo contexto que segura dois locks de bucket os adquiriu do menor para
//! o maior índice, então não existe espera circular entre dois `bget`.
//! [`lock_schedule`] descreve a sequência exata, para verificação em modelo.

use alloc::vec::Vec;

/// Estado da busca
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// Procurar hit ou buffer livre no bucket home
    Home,
    /// Roubar um buffer livre do bucket `i`
    Foreign(usize),
    /// Nenhum bucket tem buffer livre
    Exhausted,
}

/// Cursor sobre os estados de uma busca
#[derive(Debug, Clone)]
pub struct ProbeCursor {
    home: usize,
    nbucket: usize,
    state: Probe,
}

impl ProbeCursor {
    pub fn new(home: usize, nbucket: usize) -> Self {
        debug_assert!(home < nbucket);
        Self {
            home,
            nbucket,
            state: Probe::Home,
        }
    }

    pub fn home(&self) -> usize {
        self.home
    }

    pub fn state(&self) -> Probe {
        self.state
    }

    /// Avança para o próximo estado e o retorna
    pub fn advance(&mut self) -> Probe {
        self.state = match self.state {
            Probe::Home => self.next_foreign(0),
            Probe::Foreign(i) => self.next_foreign(i + 1),
            Probe::Exhausted => Probe::Exhausted,
        };
        self.state
    }

    fn next_foreign(&self, from: usize) -> Probe {
        (from..self.nbucket)
            .find(|&i| i != self.home)
            .map_or(Probe::Exhausted, Probe::Foreign)
    }
}

/// Ordem de aquisição de dois buckets distintos: menor índice primeiro
#[inline]
pub fn lock_order(home: usize, other: usize) -> (usize, usize) {
    debug_assert_ne!(home, other);
    if home < other {
        (home, other)
    } else {
        (other, home)
    }
}

/// Operação sobre o lock de um bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOp {
    Acquire(usize),
    Release(usize),
}

/// Sequência de locks de um `bget` que não encontra buffer livre em nenhum
/// bucket (o caminho mais longo possível).
pub fn lock_schedule(home: usize, nbucket: usize) -> Vec<LockOp> {
    let mut ops = Vec::new();
    let mut cursor = ProbeCursor::new(home, nbucket);

    loop {
        match cursor.state() {
            Probe::Home => {
                ops.push(LockOp::Acquire(home));
                ops.push(LockOp::Release(home));
            }
            Probe::Foreign(i) => {
                let (first, second) = lock_order(home, i);
                ops.push(LockOp::Acquire(first));
                ops.push(LockOp::Acquire(second));
                ops.push(LockOp::Release(second));
                ops.push(LockOp::Release(first));
            }
            Probe::Exhausted => break,
        }
        cursor.advance();
    }

    ops
}
