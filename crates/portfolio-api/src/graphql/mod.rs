//! GraphQL schema served at `/graphql/v1`.
//!
//! Request data inserted by the HTTP handler:
//! - [`AppState`](crate::state::AppState)
//! - [`MaybeAuthUser`] for role checks
//! - [`RequestFacts`](crate::services::RequestFacts) for cache keys

mod mutation;
mod query;
pub mod types;

use async_graphql::{Context, EmptySubscription, ErrorExtensions, Schema};

use portfolio_auth::require_roles;
use portfolio_core::Role;

use crate::auth::MaybeAuthUser;

pub use mutation::{DatasetMutation, MutationRoot, PostMutation};
pub use query::QueryRoot;

pub type ApiSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema() -> ApiSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// Fails with the permission message unless the caller holds one of `allowed`.
pub(crate) fn require(ctx: &Context<'_>, allowed: &[Role]) -> async_graphql::Result<()> {
    let roles = ctx
        .data_opt::<MaybeAuthUser>()
        .and_then(|m| m.0.as_ref())
        .map(|u| u.roles.as_slice())
        .unwrap_or(&[]);
    require_roles(roles, allowed).map_err(|e| {
        async_graphql::Error::new(e.to_string()).extend_with(|_, ext| ext.set("code", "FORBIDDEN"))
    })
}
