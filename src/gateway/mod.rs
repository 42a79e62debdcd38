//! Remote Data Gateway: the hosted relational store behind the stores.
//!
//! The stores only depend on [`RemoteGateway`]. [`RestGateway`] talks to a
//! PostgREST endpoint; [`InMemoryGateway`] implements the same contract in process
//! for tests and demos.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub mod connection;
pub mod error;
pub mod in_memory;
pub mod query;
pub mod rest;
mod rpc_error;

pub use error::{GatewayError, GatewayErrorCode, GatewayResult};
pub use in_memory::{InMemoryGateway, Operation};
pub use query::{Direction, Embed, Filter, FilterOp, OrderBy, SelectQuery};
pub use rest::{RestGateway, RestGatewayBuilder, RetrySettings};

/// One table row as a JSON object, embedded relations included.
pub type Row = Map<String, Value>;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait RemoteGateway: Send + Sync + 'static {
    async fn select(&self, query: &SelectQuery) -> GatewayResult<Vec<Row>>;

    /// First matching row. An empty result is `Ok(None)`, not an error.
    async fn maybe_single(&self, query: &SelectQuery) -> GatewayResult<Option<Row>> {
        let single = query.clone().limit(1);
        Ok(self.select(&single).await?.into_iter().next())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> GatewayResult<u64>;

    /// Inserts one row and returns it as stored, with `returning` embeds hydrated.
    async fn insert(&self, table: &str, values: Row, returning: &[Embed]) -> GatewayResult<Row>;

    /// Applies `patch` to the matching rows and returns the rows actually changed.
    /// Rows hidden by a row-level policy are silently skipped.
    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> GatewayResult<Vec<Row>>;

    /// Deletes the matching rows and returns them. Rows hidden by a row-level
    /// policy are silently skipped.
    async fn delete(&self, table: &str, filters: &[Filter]) -> GatewayResult<Vec<Row>>;
}

pub type GatewayArc = Arc<dyn RemoteGateway>;

/// Builds a [`Row`] from `(column, value)` pairs.
pub fn row<I, K, V>(pairs: I) -> Row
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
