//! Infraestrutura comum dos testes de integração

#![allow(dead_code)]

use std::cell::Cell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use forge_bcache::arch::{ContextId, CpuOps};
use forge_bcache::drivers::block::RamDisk;
use forge_bcache::{BCacheConfig, BufferCache, DevId};

static NEXT_ID: AtomicU64 = AtomicU64::new(1_000);

thread_local! {
    static THREAD_ID: Cell<u64> = const { Cell::new(0) };
}

/// Cada thread do host é um contexto de execução
pub struct ThreadCpu;

impl CpuOps for ThreadCpu {
    fn context_id(&self) -> ContextId {
        THREAD_ID.with(|id| {
            if id.get() == 0 {
                id.set(NEXT_ID.fetch_add(1, Ordering::Relaxed));
            }
            id.get()
        })
    }

    fn relax(&self) {
        std::thread::yield_now();
    }
}

/// Cache com um RamDisk registrado como dispositivo 0
pub fn cache_with_disk(config: BCacheConfig, blocks: u64) -> (BufferCache, Arc<RamDisk>, DevId) {
    let cache = BufferCache::new(config, Arc::new(ThreadCpu)).expect("config válida");
    let disk = Arc::new(RamDisk::new(config.block_size, blocks));
    let dev = cache.register_device(disk.clone()).expect("bsize compatível");
    (cache, disk, dev)
}

/// Grava `blockno` (LE) nos 4 primeiros bytes de cada bloco do disco
pub fn stamp_blocks(disk: &RamDisk, block_size: usize, blocks: u32) {
    for blockno in 0..blocks {
        let mut data = vec![0u8; block_size];
        data[..4].copy_from_slice(&blockno.to_le_bytes());
        disk.poke(blockno as u64, &data).expect("bloco dentro do disco");
    }
}

pub fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(data[at..at + 4].try_into().unwrap())
}

pub fn read_u64(data: &[u8], at: usize) -> u64 {
    u64::from_le_bytes(data[at..at + 8].try_into().unwrap())
}
