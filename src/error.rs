//! Error kinds surfaced by the scaffolding pipeline.

use std::path::PathBuf;

/// Domain failures. These travel inside `anyhow::Error` so callers can
/// `downcast_ref` them while still getting context chains in messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaffoldError {
    /// Missing tag, or no release carrying the requested asset
    NotFound(String),
    /// Terminal non-2xx response (including a redirect past the hop limit)
    Http { status: u16, url: String },
    /// Response body was not the expected JSON
    Parse(String),
    /// Target project directory is already present
    DirectoryExists(PathBuf),
    /// Install command exited unsuccessfully (`None` when killed by a signal)
    Subprocess { exit_code: Option<i32> },
}

impl std::fmt::Display for ScaffoldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScaffoldError::NotFound(msg) => {
                write!(f, "Not found: {}", msg)
            }
            ScaffoldError::Http { status, url } => {
                write!(f, "HTTP {} from {}", status, url)
            }
            ScaffoldError::Parse(msg) => {
                write!(f, "Failed to parse response: {}", msg)
            }
            ScaffoldError::DirectoryExists(path) => {
                write!(f, "Directory {} already exists", path.display())
            }
            ScaffoldError::Subprocess {
                exit_code: Some(code),
            } => {
                write!(f, "Install command failed with exit code {}", code)
            }
            ScaffoldError::Subprocess { exit_code: None } => {
                write!(f, "Install command was terminated by a signal")
            }
        }
    }
}

impl std::error::Error for ScaffoldError {}

impl ScaffoldError {
    /// HTTP status carried by an `Http` error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ScaffoldError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ScaffoldError::NotFound("no tag".into()).to_string(),
            "Not found: no tag"
        );
        assert_eq!(
            ScaffoldError::Http {
                status: 404,
                url: "https://example.com/x".into()
            }
            .to_string(),
            "HTTP 404 from https://example.com/x"
        );
        assert_eq!(
            ScaffoldError::DirectoryExists(PathBuf::from("my-app")).to_string(),
            "Directory my-app already exists"
        );
        assert_eq!(
            ScaffoldError::Subprocess { exit_code: Some(2) }.to_string(),
            "Install command failed with exit code 2"
        );
        assert!(
            ScaffoldError::Subprocess { exit_code: None }
                .to_string()
                .contains("signal")
        );
    }

    #[test]
    fn test_downcast_through_anyhow_context() {
        let err = anyhow::Error::from(ScaffoldError::Http {
            status: 502,
            url: "u".into(),
        })
        .context("Failed to fetch releases");

        let inner = err.downcast_ref::<ScaffoldError>().unwrap();
        assert_eq!(inner.status(), Some(502));
        assert_eq!(ScaffoldError::Parse("x".into()).status(), None);
    }
}
