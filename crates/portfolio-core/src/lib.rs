//! # portfolio-core
//!
//! Core types, traits, and the content chunker for the portfolio admin
//! backend. Every other portfolio crate depends on this one.

pub mod chunking;
pub mod datetime;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use chunking::{chunk_content, WordChunker};
pub use datetime::{FlexibleDateTime, INVALID_DATE_MESSAGE};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
