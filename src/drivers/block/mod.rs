//! # Dispositivos de Bloco
//!
//! Camada de abstração usada pelo buffer cache.
//!
//! ## Dispositivos Suportados
//!
//! | Driver      | Status      | Descrição                    |
//! |-------------|-------------|------------------------------|
//! | Ramdisk     | Funcional   | Disco em memória             |
//!
//! Drivers de hardware (ATA, VirtIO-BLK) implementam [`BlockDevice`] no
//! kernel e são registrados via `BufferCache::register_device`.

pub mod ramdisk;
pub mod traits;

pub use ramdisk::RamDisk;
pub use traits::{BlockDevice, BlockError};
