//! bread/bwrite sobre dispositivos, e violações do protocolo

mod common;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use forge_bcache::arch::{ContextId, CpuOps};
use forge_bcache::drivers::block::{BlockError, RamDisk};
use forge_bcache::{BCacheConfig, BioError, BufferCache, DevId};

use common::{cache_with_disk, read_u32, stamp_blocks};

const BS: usize = 128;

fn config() -> BCacheConfig {
    BCacheConfig::new(8, 3).with_block_size(BS)
}

/// Contexto trocável manualmente, para simular outro dono
struct SwitchCpu(AtomicU64);

impl SwitchCpu {
    fn switch_to(&self, id: ContextId) {
        self.0.store(id, Ordering::SeqCst);
    }
}

impl CpuOps for SwitchCpu {
    fn context_id(&self) -> ContextId {
        self.0.load(Ordering::SeqCst)
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default()
}

#[test]
fn bread_loads_once_then_hits() {
    let (cache, disk, dev) = cache_with_disk(config(), 16);
    stamp_blocks(&disk, BS, 16);

    for _ in 0..5 {
        let b = cache.bread(dev, 11).unwrap();
        assert!(b.is_valid());
        assert!(!b.is_dirty());
        assert_eq!(read_u32(&b, 0), 11);
    }
    assert_eq!(disk.reads(), 1);
    assert_eq!(cache.stats().hits, 4);
    assert_eq!(cache.stats().hit_percent(), 80);
}

#[test]
fn bwrite_reaches_device_and_survives_eviction() {
    let (cache, disk, dev) = cache_with_disk(config(), 64);

    {
        let mut b = cache.bread(dev, 2).unwrap();
        b.fill(0xee);
        cache.bwrite(&b).unwrap();
    }
    assert_eq!(disk.writes(), 1);

    // Expulsa o bloco 2 do cache
    for blockno in (5..64).step_by(3) {
        drop(cache.bread(dev, blockno).unwrap());
    }
    assert!(!cache.contains(dev, 2));

    let b = cache.bread(dev, 2).unwrap();
    assert!(b.iter().all(|&x| x == 0xee));
}

#[test]
fn device_fault_returns_locked_invalid_buffer() {
    let (cache, disk, dev) = cache_with_disk(config(), 16);
    disk.set_faulty(true);

    let failure = cache.bread(dev, 3).unwrap_err();
    assert_eq!(failure.error, BioError::DeviceIo(BlockError::IoError));
    assert!(!failure.error.is_fatal());

    let b = failure.buf.unwrap();
    assert!(!b.is_valid());
    assert!(b.holder().is_some());
    assert_eq!(cache.refcnt(b.id()), Some(1));
    drop(b);

    disk.set_faulty(false);
    assert!(cache.bread(dev, 3).unwrap().is_valid());
    assert_eq!(cache.stats().device_reads, 1);
}

#[test]
fn out_of_range_block_is_reported() {
    let (cache, _disk, dev) = cache_with_disk(config(), 4);
    let failure = cache.bread(dev, 40).unwrap_err();
    assert_eq!(failure.error, BioError::DeviceIo(BlockError::InvalidBlock));
}

#[test]
fn bwrite_on_read_only_device() {
    let cache = BufferCache::new(config(), Arc::new(common::ThreadCpu)).unwrap();
    let dev = cache
        .register_device(Arc::new(RamDisk::read_only(BS, 8)))
        .unwrap();

    let mut b = cache.bread(dev, 1).unwrap();
    b[0] = 1;
    assert_eq!(
        cache.bwrite(&b),
        Err(BioError::DeviceIo(BlockError::ReadOnly))
    );
    assert!(b.is_dirty());
}

#[test]
fn devices_get_sequential_ids() {
    let (cache, _disk, dev) = cache_with_disk(config(), 4);
    assert_eq!(dev, DevId(0));
    let second = cache.register_device(Arc::new(RamDisk::new(BS, 4))).unwrap();
    assert_eq!(second, DevId(1));
    assert_eq!(cache.device_count(), 2);

    assert_eq!(
        cache.register_device(Arc::new(RamDisk::new(BS / 2, 4))),
        Err(BioError::BlockSizeMismatch)
    );
    assert_eq!(cache.device_count(), 2);
}

#[test]
fn same_blockno_on_different_devices_are_distinct() {
    let (cache, disk0, dev0) = cache_with_disk(config(), 8);
    let disk1 = Arc::new(RamDisk::new(BS, 8));
    let dev1 = cache.register_device(disk1.clone()).unwrap();
    disk0.poke(4, &[1u8; BS]).unwrap();
    disk1.poke(4, &[2u8; BS]).unwrap();

    let a = cache.bread(dev0, 4).unwrap();
    let b = cache.bread(dev1, 4).unwrap();
    assert_ne!(a.id(), b.id());
    assert_eq!((a[0], b[0]), (1, 2));
}

#[test]
fn unknown_device() {
    let (cache, _disk, _dev) = cache_with_disk(config(), 4);
    let failure = cache.bread(DevId(7), 0).unwrap_err();
    assert_eq!(failure.error, BioError::UnknownDevice(DevId(7)));
    assert!(failure.buf.is_none());
    assert_eq!(cache.stats().lookups(), 0);

    let err: BioError = failure.into();
    assert_eq!(err.to_string(), "Dispositivo não registrado (dev=7)");
}

#[test]
fn pin_keeps_reference_after_release() {
    let (cache, _disk, dev) = cache_with_disk(config(), 8);
    let b = cache.bread(dev, 5).unwrap();
    let id = b.id();
    cache.bpin(&b);
    cache.bpin(&b);
    cache.brelse(b);
    assert_eq!(cache.refcnt(id), Some(2));

    cache.bunpin(id);
    cache.bunpin(id);
    assert_eq!(cache.refcnt(id), Some(0));
    assert!(cache.contains(dev, 5));
}

#[test]
#[should_panic(expected = "refcnt negativo")]
fn unpin_without_pin_is_fatal() {
    let (cache, _disk, dev) = cache_with_disk(config(), 8);
    let id = cache.bread(dev, 5).unwrap().id();
    cache.bunpin(id);
}

#[test]
#[should_panic(expected = "bget: sem buffers")]
fn all_buffers_held_is_fatal() {
    let (cache, _disk, dev) = cache_with_disk(config(), 16);
    let _held: Vec<_> = (0..8).map(|n| cache.bget(dev, n)).collect();
    let _ = cache.bget(dev, 9);
}

#[test]
fn bwrite_from_other_context_is_fatal() {
    let cpu = Arc::new(SwitchCpu(AtomicU64::new(10)));
    let cache = BufferCache::new(config(), cpu.clone()).unwrap();
    let dev = cache.register_device(Arc::new(RamDisk::new(BS, 8))).unwrap();

    let b = cache.bread(dev, 1).unwrap();
    cpu.switch_to(11);
    let payload = catch_unwind(AssertUnwindSafe(|| cache.bwrite(&b))).unwrap_err();
    let msg = panic_message(payload);
    assert!(msg.contains("bwrite sem segurar"), "{}", msg);
    assert!(msg.contains("Some(10)"), "{}", msg);

    cpu.switch_to(10);
    drop(b);
}

#[test]
fn release_from_other_context_is_fatal() {
    let cpu = Arc::new(SwitchCpu(AtomicU64::new(20)));
    let cache = BufferCache::new(config(), cpu.clone()).unwrap();

    let b = cache.bget(DevId(0), 3);
    let id = b.id();
    cpu.switch_to(21);
    let payload = catch_unwind(AssertUnwindSafe(move || drop(b))).unwrap_err();
    assert!(panic_message(payload).contains("brelse sem segurar"));
    // O contador não foi tocado
    assert_eq!(cache.refcnt(id), Some(1));
}
