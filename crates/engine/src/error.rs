use dlb_store::StoreError;

/// Errors the engine surfaces to callers, per spec §7. Each carries a
/// stable code for the external interface layer to relay alongside the
/// human message.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// Wrong phase, cell not in VOTING, non-participant voting,
    /// allocation exceeding budget. No state was mutated.
    PreconditionFailed { code: &'static str, message: String },
    /// A conditional update affected zero rows: another worker already
    /// completed this action. Not surfaced as a hard failure except
    /// where the caller needs an explicit "already voted/joined" signal.
    Conflict { code: &'static str },
    /// Unknown cell/idea/deliberation/member.
    NotFound(String),
    /// Store or downstream failure; the Scheduler retries these with
    /// backoff before surfacing.
    Transient(String),
    /// An invariant violation (e.g. more than one winner). Logged at
    /// `error` and the affected deliberation is halted pending review.
    Fatal(String),
}

impl EngineError {
    pub fn precondition(code: &'static str, message: impl Into<String>) -> Self {
        Self::PreconditionFailed {
            code,
            message: message.into(),
        }
    }
    pub fn conflict(code: &'static str) -> Self {
        Self::Conflict { code }
    }
    pub fn code(&self) -> &'static str {
        match self {
            Self::PreconditionFailed { code, .. } => code,
            Self::Conflict { code } => code,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Transient(_) => "TRANSIENT",
            Self::Fatal(_) => "FATAL",
        }
    }
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreconditionFailed { message, .. } => write!(f, "precondition failed: {message}"),
            Self::Conflict { code } => write!(f, "conflict: {code}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Transient(msg) => write!(f, "transient error: {msg}"),
            Self::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => Self::conflict("STORE_CONFLICT"),
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Transient(msg) => Self::Transient(msg),
            StoreError::Fatal(msg) => Self::Fatal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflict_maps_to_engine_conflict() {
        let err = EngineError::from(StoreError::Conflict);
        assert_eq!(err.code(), "STORE_CONFLICT");
    }

    #[test]
    fn display_includes_message() {
        let err = EngineError::precondition("ALREADY_VOTED", "voter already voted in this cell");
        assert!(err.to_string().contains("already voted"));
    }
}
