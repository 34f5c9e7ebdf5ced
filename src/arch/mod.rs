//! # Contexto de Execução (HAL mínima)
//!
//! O buffer cache não sabe em qual CPU, nem em qual tarefa, está rodando.
//! Tudo o que ele precisa da plataforma passa por [`CpuOps`]:
//!
//! - **Identidade:** quem está segurando um `SleepLock` (diagnóstico de
//!   `holding()` e relatórios de violação de protocolo).
//! - **Espera:** o que fazer enquanto um `SleepLock` está ocupado. No kernel
//!   isso é o `yield` do scheduler; no boot (uma única CPU) é `spin_loop`.
//!
//! O handle é passado explicitamente para o `BufferCache`; não há estado
//! global de plataforma.

/// Identificador de um contexto de execução (tarefa, thread, CPU).
///
/// `0` é reservado para "nenhum dono".
pub type ContextId = u64;

/// Nenhum contexto segura o lock
pub const NO_CONTEXT: ContextId = 0;

/// Abstração da plataforma usada pelas primitivas de sincronização.
pub trait CpuOps: Send + Sync {
    /// Retorna o ID do contexto atual (nunca `NO_CONTEXT`).
    fn context_id(&self) -> ContextId;

    /// Chamado em cada volta da espera por um `SleepLock`.
    ///
    /// Implementações com scheduler devem ceder a CPU aqui.
    fn relax(&self) {
        core::hint::spin_loop();
    }
}

/// CPU de boot: um único contexto, espera por busy-wait.
///
/// Usada antes do scheduler existir e pelos self-tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootCpu;

/// ID fixo do contexto de boot
pub const BOOT_CONTEXT: ContextId = 1;

impl CpuOps for BootCpu {
    fn context_id(&self) -> ContextId {
        BOOT_CONTEXT
    }
}
