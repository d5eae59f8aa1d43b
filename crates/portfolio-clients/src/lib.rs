//! # portfolio-clients
//!
//! HTTP clients for the services the portfolio backend talks to:
//!
//! - [`WordPressClient`]: reads posts and resolves term names ([`PostSource`])
//! - [`WeaviateClient`]: schema and object operations ([`VectorStore`])
//! - [`GithubClient`]: repository issue counts
//!
//! [`PostSource`]: portfolio_core::PostSource
//! [`VectorStore`]: portfolio_core::VectorStore

pub mod github;
pub mod html;
pub mod weaviate;
pub mod wordpress;

pub use github::{GithubClient, GithubConfig};
pub use html::clean_html;
pub use weaviate::{WeaviateClient, WeaviateConfig};
pub use wordpress::{Endpoint, PaginatedResponse, WordPressClient, WordPressConfig};
