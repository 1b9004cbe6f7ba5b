//! Configuration Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A configuration source could not be read or did not match the
    /// expected shape.
    #[display("failed to load configuration")]
    Load,
    /// Every source loaded, but the merged values are unusable.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}

