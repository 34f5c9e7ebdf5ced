//! # Drivers
//!
//! Apenas a camada de bloco: o buffer cache fala com discos através de
//! [`block::BlockDevice`].

pub mod block;
