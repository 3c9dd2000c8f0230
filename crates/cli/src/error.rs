use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Browser(#[from] vv::Error),

    #[error("{0}")]
    Context(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_errors_keep_their_message() {
        let error = RunnerError::from(vv::Error::Timeout {
            ms: 30000,
            condition: "selector .card".to_string(),
        });
        assert!(error.to_string().contains("selector .card"));
    }
}
