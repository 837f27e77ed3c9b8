use ghcore_entities::EntityError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Reference grammar failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Entity error: {0}")]
    Entity(#[from] EntityError),
}
