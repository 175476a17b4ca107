/// Storage-level failure kinds, per spec §4.1 and §7.
///
/// `dlb-engine` layers its own `PreconditionFailed` business-logic
/// variant on top of these; nothing downstream of this crate ever
/// sees a raw `tokio_postgres::Error`.
#[derive(Debug)]
pub enum StoreError {
    /// A conditional update or unique insert found the row already in
    /// a different state (or already present). Per §7, the caller
    /// treats this as "another worker already did the work" and does
    /// not retry.
    Conflict,
    /// The referenced row does not exist.
    NotFound(String),
    /// Connection failure, timeout, or other infrastructure hiccup.
    /// The Scheduler retries these with bounded backoff (§4.9).
    Transient(String),
    /// A misconfiguration or invariant violation the engine cannot
    /// recover from; surfaced to the caller and logged at `error`.
    Fatal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conflict => write!(f, "conflict: row already in a different state"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Transient(msg) => write!(f, "transient store error: {msg}"),
            Self::Fatal(msg) => write!(f, "fatal store error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<tokio_postgres::Error> for StoreError {
    /// Classifies a driver error using its SQLSTATE where one is
    /// present, falling back to `Transient` for bare I/O/protocol
    /// failures (connection drops, timeouts) since those are the
    /// errors the Scheduler's retry loop exists to absorb.
    fn from(err: tokio_postgres::Error) -> Self {
        match err.code() {
            Some(code) if *code == tokio_postgres::error::SqlState::UNIQUE_VIOLATION => {
                Self::Conflict
            }
            Some(code) if *code == tokio_postgres::error::SqlState::FOREIGN_KEY_VIOLATION => {
                Self::NotFound(err.to_string())
            }
            Some(_) => Self::Fatal(err.to_string()),
            None => Self::Transient(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages_are_human_readable() {
        assert!(StoreError::Conflict.to_string().contains("conflict"));
        assert!(StoreError::NotFound("cell".into()).to_string().contains("cell"));
    }
}
