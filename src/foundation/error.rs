pub type ScopeResult<T> = Result<T, ScopeError>;

#[derive(thiserror::Error, Debug)]
pub enum ScopeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("visibility error: {0}")]
    Visibility(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScopeError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn visibility(msg: impl Into<String>) -> Self {
        Self::Visibility(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ScopeError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ScopeError::visibility("x")
                .to_string()
                .contains("visibility error:")
        );
        assert!(
            ScopeError::backend("x")
                .to_string()
                .contains("backend error:")
        );
        assert!(
            ScopeError::protocol("x")
                .to_string()
                .contains("protocol error:")
        );
        assert!(
            ScopeError::config("x")
                .to_string()
                .contains("config error:")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ScopeError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
