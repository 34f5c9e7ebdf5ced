//! Boot
//!
//! Parâmetros recebidos do bootloader.

pub mod cmdline;

pub use cmdline::CommandLine;
