//! Service layer shared by the REST and GraphQL handlers.

pub mod cache;

pub use cache::{RequestFacts, ResponseCache, VaryOn};
