//! Error types for the ACL model

/// Errors raised while parsing ACL documents or resolving migration state
#[derive(Debug, thiserror::Error)]
pub enum AclError {
    /// Raw ACL document is not valid JSON for the expected shape
    #[error("malformed ACL document for {object_kind} {object_id}: {source}")]
    MalformedDocument {
        object_kind: String,
        object_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// ACL document could not be serialized
    #[error("failed to serialize ACL document: {0}")]
    Serialization(#[source] serde_json::Error),

    /// Unknown object kind string
    #[error("unknown object kind: {0}")]
    UnknownObjectKind(String),

    /// Two migration entries share the same workspace group name
    #[error("duplicate source group in migration state: {0}")]
    DuplicateSourceGroup(String),

    /// A principal matched a source name but no migration info resolved for it
    #[error("group {0} matched a migrating name but has no migration info")]
    MissingMigrationInfo(String),
}

impl AclError {
    /// Whether the error signals an inconsistency in migration state
    ///
    /// These are never retried: retrying cannot change the outcome.
    #[inline]
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::MissingMigrationInfo(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_info_is_invariant_violation() {
        assert!(AclError::MissingMigrationInfo("eng".into()).is_invariant_violation());
        assert!(!AclError::DuplicateSourceGroup("eng".into()).is_invariant_violation());
    }

    #[test]
    fn display_names_the_group() {
        let err = AclError::DuplicateSourceGroup("eng-ws".into());
        assert!(err.to_string().contains("eng-ws"));
    }
}
