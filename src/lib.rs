//! # ecosnap-sdk
//!
//! Client-side synchronization for the EcoSnap nature-observation network.
//!
//! The crate keeps a viewer's feed and comment sections in memory, applies
//! likes optimistically and reconciles every mutation with the hosted
//! relational backend. Collaborators sit behind traits:
//!
//! - [`gateway::RemoteGateway`]: the hosted tables (`RestGateway` for PostgREST,
//!   `InMemoryGateway` for tests and demos).
//! - [`session::SessionProvider`]: who the viewer is (`RestAuth`, `MemorySession`).
//! - [`media::MediaHost`]: where attached photos and videos go.
//!
//! [`app::EcoSnapClient`] bundles them and hands out [`feed::FeedStore`],
//! [`comments::CommentStore`] and [`profiles::ProfileDirectory`] instances.
//!
//! ```no_run
//! use ecosnap_sdk::app::{EcoSnapClient, EcoSnapOptions, SyncSettings};
//! use ecosnap_sdk::model::FeedScope;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EcoSnapClient::connect(EcoSnapOptions::from_env()?, SyncSettings::default())?;
//! if let Some(auth) = client.rest_auth() {
//!     auth.sign_in_with_password("ana@example.com", "secret").await?;
//! }
//! let feed = client.feed_store(FeedScope::Global);
//! feed.load(FeedScope::Global).await?;
//! for post in feed.snapshot().posts {
//!     println!("{}: {}", post.id, post.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod comments;
pub mod feed;
pub mod gateway;
pub mod logger;
pub mod media;
pub mod model;
pub mod platform;
pub mod profiles;
pub mod session;
pub mod sync;
pub mod util;

#[cfg(all(test, not(target_arch = "wasm32")))]
pub mod test_support;
