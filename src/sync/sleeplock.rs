//! SleepLock - lock exclusivo que pode esperar, com registro de dono

use core::cell::UnsafeCell;
use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::arch::{ContextId, CpuOps, NO_CONTEXT};

/// SleepLock - bloqueia o contexto se não conseguir o lock
///
/// # Diferença do spin::Mutex
///
/// - SleepLock PODE ser segurado durante I/O e por muito tempo
/// - Enquanto espera, cede a CPU via [`CpuOps::relax`]
/// - Registra o contexto dono, para `holding()` e diagnóstico
///
/// Não há fila: vários contextos esperando pelo mesmo lock competem sem
/// garantia de ordem.
pub struct SleepLock<T> {
    /// Estado do lock
    locked: AtomicBool,
    /// ID do contexto dono (`NO_CONTEXT` se livre)
    holder: AtomicU64,
    /// Dados protegidos
    data: UnsafeCell<T>,
}

// SAFETY: SleepLock serializa o acesso a `data`
unsafe impl<T: Send> Send for SleepLock<T> {}
unsafe impl<T: Send> Sync for SleepLock<T> {}

impl<T> SleepLock<T> {
    pub const fn new(data: T) -> Self {
        Self {
            locked: AtomicBool::new(false),
            holder: AtomicU64::new(NO_CONTEXT),
            data: UnsafeCell::new(data),
        }
    }

    /// Adquire o lock (pode esperar)
    pub fn lock(&self, cpu: &dyn CpuOps) -> SleepLockGuard<'_, T> {
        loop {
            if self
                .locked
                .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                break;
            }

            // Esperar sem martelar a linha de cache
            while self.locked.load(Ordering::Relaxed) {
                cpu.relax();
            }
        }

        self.holder.store(cpu.context_id(), Ordering::Release);
        SleepLockGuard {
            lock: self,
            _not_send: PhantomData,
        }
    }

    /// Tenta adquirir sem esperar
    pub fn try_lock(&self, cpu: &dyn CpuOps) -> Option<SleepLockGuard<'_, T>> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            self.holder.store(cpu.context_id(), Ordering::Release);
            Some(SleepLockGuard {
                lock: self,
                _not_send: PhantomData,
            })
        } else {
            None
        }
    }

    /// O contexto atual segura este lock?
    pub fn holding(&self, cpu: &dyn CpuOps) -> bool {
        self.locked.load(Ordering::Acquire)
            && self.holder.load(Ordering::Acquire) == cpu.context_id()
    }

    /// Dono atual, se houver
    pub fn holder(&self) -> Option<ContextId> {
        match self.holder.load(Ordering::Acquire) {
            NO_CONTEXT => None,
            id => Some(id),
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }
}

/// Guard do SleepLock - libera ao sair do escopo
///
/// Não é `Send`: o lock pertence ao contexto que o adquiriu.
pub struct SleepLockGuard<'a, T> {
    lock: &'a SleepLock<T>,
    _not_send: PhantomData<*const ()>,
}

impl<T> Deref for SleepLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: Lock está adquirido
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SleepLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: Lock está adquirido
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SleepLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.holder.store(NO_CONTEXT, Ordering::Release);
        self.lock.locked.store(false, Ordering::Release);
    }
}

// =============================================================================
// TESTES
// =============================================================================
