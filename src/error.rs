//! Build error taxonomy.
//!
//! - Fatal errors (malformed entry, template lint, missing markers) abort
//!   the build before anything is published.
//! - Stage failures name the bundle that failed; the orchestrator combines
//!   script and style outcomes into a single [`StageFailure`].
//!
//! Per-file problems never reach this type: they are logged and the file
//! contributes empty output.

use std::path::PathBuf;
use thiserror::Error;

use crate::pipeline::ExtractError;
use crate::transform::PreprocessError;

/// Errors that reject a whole build.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("malformed entry document")]
    MalformedEntry(#[from] ExtractError),

    #[error("template lint failed in {0}")]
    TemplateLint(String),

    #[error("preprocessing `{0}` failed")]
    Preprocess(String, #[source] PreprocessError),

    #[error("entry document has no `{0}` marker region")]
    MissingMarker(&'static str),

    // NOTE: transparent so the bundle name leads the message
    #[error(transparent)]
    Stage(#[from] StageFailure),

    #[error("IO error at `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Which bundle stage failed, with the stage's own reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    #[error("script and style bundles both failed ({0}; {1})")]
    Both(String, String),

    #[error("script bundle failed: {0}")]
    Scripts(String),

    #[error("style bundle failed: {0}")]
    Styles(String),
}

impl StageFailure {
    /// Combine the two bundle outcomes.
    ///
    /// Returns both bodies when both stages produced output.
    pub fn combine(
        scripts: Result<String, String>,
        styles: Result<String, String>,
    ) -> Result<(String, String), Self> {
        match (scripts, styles) {
            (Ok(js), Ok(css)) => Ok((js, css)),
            (Err(js), Err(css)) => Err(Self::Both(js, css)),
            (Err(js), Ok(_)) => Err(Self::Scripts(js)),
            (Ok(_), Err(css)) => Err(Self::Styles(css)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine_success() {
        let out = StageFailure::combine(Ok("js".into()), Ok("css".into())).unwrap();
        assert_eq!(out, ("js".to_string(), "css".to_string()));
    }

    #[test]
    fn test_combine_names_failed_side() {
        let err = StageFailure::combine(Err("annotate".into()), Ok("css".into())).unwrap_err();
        assert_eq!(err, StageFailure::Scripts("annotate".into()));
        assert!(err.to_string().starts_with("script bundle failed"));

        let err = StageFailure::combine(Ok("js".into()), Err("io".into())).unwrap_err();
        assert_eq!(err, StageFailure::Styles("io".into()));
    }

    #[test]
    fn test_combine_both_failed() {
        let err = StageFailure::combine(Err("a".into()), Err("b".into())).unwrap_err();
        assert!(matches!(err, StageFailure::Both(..)));
        assert!(err.to_string().contains("both failed"));
    }
}
