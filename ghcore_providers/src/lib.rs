#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod error;
pub mod github;
pub mod retry;
pub mod token_pool;

pub use error::ProviderError;
pub use github::{DEFAULT_API_URL, DEFAULT_GRAPHQL_URL, GitHubClient};
pub use retry::retry_with_backoff;
pub use token_pool::{Lease, TokenPool};
