use thiserror::Error;

/// Error type for snapgraph operations.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),
    #[error("unknown element: {0}")]
    UnknownElement(String),
    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),
    #[error("unknown attribute type: {0}")]
    UnknownType(String),
    #[error("write handle busy: {0}")]
    WriteBusy(String),
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("i/o failure: {0}")]
    IoFailure(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
}

impl GraphError {
    pub fn invalid_value<T: Into<String>>(msg: T) -> Self {
        GraphError::InvalidValue(msg.into())
    }

    pub fn unknown_attribute<T: Into<String>>(msg: T) -> Self {
        GraphError::UnknownAttribute(msg.into())
    }

    pub fn unknown_element<T: Into<String>>(msg: T) -> Self {
        GraphError::UnknownElement(msg.into())
    }

    pub fn duplicate_attribute<T: Into<String>>(msg: T) -> Self {
        GraphError::DuplicateAttribute(msg.into())
    }

    pub fn unknown_type<T: Into<String>>(msg: T) -> Self {
        GraphError::UnknownType(msg.into())
    }

    pub fn write_busy<T: Into<String>>(msg: T) -> Self {
        GraphError::WriteBusy(msg.into())
    }

    pub fn corrupt_archive<T: Into<String>>(msg: T) -> Self {
        GraphError::CorruptArchive(msg.into())
    }

    pub fn invalid_input<T: Into<String>>(msg: T) -> Self {
        GraphError::InvalidInput(msg.into())
    }

    pub fn duplicate_key<T: Into<String>>(msg: T) -> Self {
        GraphError::DuplicateKey(msg.into())
    }

    /// True for failures a caller may retry (write contention only).
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::WriteBusy(_))
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::CorruptArchive(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors_map_to_variants() {
        assert!(matches!(
            GraphError::invalid_value("x"),
            GraphError::InvalidValue(_)
        ));
        assert!(matches!(
            GraphError::corrupt_archive("x"),
            GraphError::CorruptArchive(_)
        ));
        assert!(GraphError::write_busy("x").is_retryable());
        assert!(!GraphError::unknown_attribute("x").is_retryable());
    }

    #[test]
    fn test_json_error_becomes_corrupt_archive() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(GraphError::from(err), GraphError::CorruptArchive(_)));
    }

    #[test]
    fn test_display_messages() {
        let err = GraphError::duplicate_attribute("vertex.Label");
        assert_eq!(err.to_string(), "duplicate attribute: vertex.Label");
    }
}
