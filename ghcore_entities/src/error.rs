use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    #[error("Invalid entity type specifier `{spec}`: {reason}")]
    InvalidSpecifier { spec: String, reason: String },

    #[error("Unknown init mode: {0}")]
    InvalidInitMode(String),

    #[error("'{field}' is not an attribute of {entity}")]
    MissingAttribute { field: String, entity: String },
}
