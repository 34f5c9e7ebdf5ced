//! Kernel Library (KLib).
//!
//! Utilitários agnósticos de hardware para uso interno.

pub mod test_framework;
