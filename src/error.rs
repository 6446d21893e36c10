use crate::token::Token;
use std::fmt;
use std::ops::Range;

/// Errors raised outside of a single script line: files, catalogs, whole compilations.
#[derive(Debug, thiserror::Error)]
pub enum CompilerError {
    #[error("FileNotFoundError: {0}")]
    FileNotFound(String),
    #[error("IOError: {0}")]
    IO(#[from] std::io::Error),
    #[error("JsonError: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CatalogError: {0}")]
    Catalog(#[from] CatalogError),
    #[error("CompilationError: {0}")]
    Compilation(ErrorList),
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed reading catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("syntax {0} is registered twice")]
    DuplicateSyntaxId(u16),
    #[error("syntax {new} has the same token sequence as syntax {existing}")]
    DuplicateSyntaxPath { existing: u16, new: u16 },
    #[error("syntax {id} is invalid: {message}")]
    InvalidSyntax { id: u16, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("LexingError: {message} at position {position}")]
pub struct LexingError {
    pub(crate) message: String,
    pub(crate) position: usize,
    pub(crate) text: String,
}

impl LexingError {
    pub fn new(message: String, position: usize, text: String) -> Self {
        Self {
            message,
            position,
            text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Lexing,
    Syntax,
    Lookup,
    Verification,
    Logic,
    Argument,
    /// The pipeline broke one of its own invariants.
    Algorithm,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            ErrorKind::Lexing => "LexingError",
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Lookup => "LookupError",
            ErrorKind::Verification => "VerificationError",
            ErrorKind::Logic => "LogicError",
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::Algorithm => "InternalError",
        };
        f.write_str(name)
    }
}

/// A diagnostic located on one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub kind: ErrorKind,
    pub message: String,
    pub line: usize,
    pub text: String,
    pub range: Range<usize>,
}

impl std::error::Error for ScriptError {}

impl ScriptError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
            text: String::new(),
            range: 0..0,
        }
    }

    pub fn from_token(kind: ErrorKind, token: &Token, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            line: 0,
            text: token.text().to_string(),
            range: token.range(),
        }
    }

    pub fn from_lexing(error: LexingError) -> Self {
        let position = error.position;
        Self {
            kind: ErrorKind::Lexing,
            message: error.message,
            line: 0,
            text: error.text,
            range: position..position + 1,
        }
    }

    /// Attaches the 1-based line number, keeping any position already set.
    pub fn on_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Attaches the offending text when none was recorded yet.
    pub fn with_text(mut self, text: &str, range: Range<usize>) -> Self {
        if self.text.is_empty() {
            self.text = text.to_string();
            self.range = range;
        }
        self
    }

    pub fn is_algorithm(&self) -> bool {
        self.kind == ErrorKind::Algorithm
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}: {}\n  --> line {}:{}: '{}'",
            self.kind,
            self.message,
            self.line,
            self.range.start + 1,
            self.text
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorList {
    errors: Vec<ScriptError>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ScriptError) {
        log::debug!("line {}: {}", error.line, error.message);
        self.errors.push(error);
    }

    pub fn append(&mut self, other: ErrorList) {
        self.errors.extend(other.errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ScriptError> {
        self.errors.iter()
    }

    pub fn has_algorithm_errors(&self) -> bool {
        self.errors.iter().any(ScriptError::is_algorithm)
    }

    pub fn into_vec(self) -> Vec<ScriptError> {
        self.errors
    }
}

impl<'a> IntoIterator for &'a ErrorList {
    type Item = &'a ScriptError;
    type IntoIter = std::slice::Iter<'a, ScriptError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{} error(s)", self.errors.len())?;
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}
