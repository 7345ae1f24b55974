use thiserror::Error;

/// Failure classes the adapter distinguishes for its callers.
///
/// Values of this type travel inside [`crate::Error`] so call sites can keep
/// using `?` and still match on the class via `downcast_ref`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// A table was registered without a name.
    #[error("no identity was provided for the table definition")]
    IdentityMissing,

    /// A table with the same name is already registered.
    #[error("a table named `{0}` is already registered")]
    IdentityDuplicate(String),

    /// The operation referenced a table that was never registered.
    #[error("no table named `{0}` is registered")]
    UnknownTable(String),

    /// The connection is gone, usually because teardown already ran.
    #[error("the adapter holds no connection, was it torn down?")]
    InvalidConnection,

    /// A criteria modifier the operation cannot honor.
    #[error("the `{0}` modifier is not supported by this operation")]
    UnsupportedModifier(&'static str),

    /// The backend returned no rows where exactly one was expected.
    #[error("the query returned no rows where one was expected")]
    EmptyResult,

    /// Criteria that cannot be translated to SQL.
    #[error("invalid criteria: {0}")]
    InvalidCriteria(String),

    /// A capability this adapter does not provide.
    #[error("{0} is not supported by this adapter")]
    Unsupported(&'static str),
}

impl AdapterError {
    /// Recover the adapter classification from a generic error, if it carries one.
    pub fn of(error: &crate::Error) -> Option<&AdapterError> {
        error.downcast_ref::<AdapterError>()
    }
}
