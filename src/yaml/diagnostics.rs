//! YAML error types with source-span diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Errors raised while reading a YAML document
#[derive(Debug, Error, Diagnostic)]
pub enum YamlError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] YamlSyntaxError),

    #[error("failed to read YAML file: {0}")]
    #[diagnostic(code(metrology::yaml::io))]
    Io(#[from] std::io::Error),
}

/// Syntax or schema error located in the offending document
#[derive(Debug, Error, Diagnostic)]
#[error("invalid YAML in {filename}: {message}")]
#[diagnostic(code(metrology::yaml::syntax))]
pub struct YamlSyntaxError {
    pub message: String,
    pub filename: String,
    pub line: Option<usize>,
    pub column: Option<usize>,

    #[source_code]
    src: NamedSource<String>,

    #[label("here")]
    span: Option<SourceSpan>,
}

impl YamlSyntaxError {
    /// Wrap a serde_yml error, pointing at its location in `content`
    ///
    /// Type mismatches carry no location; those label the whole document.
    pub fn from_serde_error(err: &serde_yml::Error, content: &str, filename: &str) -> Self {
        let location = err.location();
        let span = match &location {
            Some(loc) => {
                let offset = loc.index().min(content.len());
                SourceSpan::from((offset, 1usize.min(content.len() - offset)))
            }
            None => SourceSpan::from((0, content.len())),
        };
        Self {
            message: err.to_string(),
            filename: filename.to_string(),
            line: location.as_ref().map(|loc| loc.line()),
            column: location.as_ref().map(|loc| loc.column()),
            src: NamedSource::new(filename, content.to_string()),
            span: Some(span),
        }
    }

    /// Labelled region of the source document
    pub fn span(&self) -> Option<SourceSpan> {
        self.span
    }
}
