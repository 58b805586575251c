use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SharedError {
    #[error("Identifier must not be empty")]
    EmptyId,

    #[error("Identifier contains a forbidden character: {0:?}")]
    ForbiddenChar(char),

    #[error("Price is required unless the item is free")]
    MissingPrice,

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Price must be non-negative")]
    NegativePrice,
}
