//! Keyed query cache for the crmsync SDK.
//!
//! Reads are [`Query`] observers over a shared [`QueryClient`]; writes are
//! [`Mutation`]s that invalidate a declared set of keys on success.
//!
//! ```text
//! Query::fetch ──► QueryClient ──(absent/stale)──► fetcher ──► ApiClient
//!                      ▲                                          │
//!                      └────────── commit (matching tag) ◄────────┘
//! Mutation::mutate ──► ApiClient ──(ok)──► QueryClient::invalidate
//!                                              └──► observed keys refetch
//! ```

mod cache;
mod config;
mod entry;
mod invalidation;
mod key;
pub mod keys;
mod mutation;
mod query;
mod retry;

pub use cache::QueryClient;
pub use config::{QueryConfig, RetryPolicy};
pub use entry::{Fetcher, Payload, QueryStatus};
pub use invalidation::Invalidation;
pub use key::{KeyPart, QueryKey, Resource};
pub use mutation::{Mutation, MutationRecord, MutationStatus};
pub use query::{Query, QueryState};
pub use retry::with_retry;
