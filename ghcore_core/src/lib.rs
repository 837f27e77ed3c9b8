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

pub mod lookup;
pub mod record;

pub use lookup::{
    ChainedIdentity, CommitGraph, Condition, EventStore, GitHubApi, IdentityResolver, IssueKind,
    Lookups, Offline, RefKind, UserInfo,
};
pub use record::{Record, get_i64, get_str, get_truthy, is_truthy, trim_refs_heads, value_to_string};
