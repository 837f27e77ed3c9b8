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

pub mod cache;
pub mod category;
pub mod context;
pub mod engine;
pub mod error;
pub mod patterns;
pub mod rules;

pub use cache::{BoundedCache, CacheKey, ResolutionCache};
pub use category::LinkCategory;
pub use engine::{EntitySearch, SearchConfig};
pub use error::SearchError;
pub use patterns::Patterns;
pub use rules::{Extractor, Resolution, Rule, rules_for};
