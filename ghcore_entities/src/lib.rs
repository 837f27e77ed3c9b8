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
pub mod exid;
pub mod object;
pub mod remap;
pub mod schema;

pub use error::EntityError;
pub use exid::{ExidTemplate, SEPARATORS, compose_id, decompose_id, match_key};
pub use object::{EntityObject, FieldScope, InitMode};
pub use remap::{Remap, RemapFn, RemapSource, TypeSpec};
pub use schema::{
    Derivation, Domain, EntitySchema, ExidArg, FieldDef, FieldRole, Lookup, NodeType,
    SchemaRegistry,
};
