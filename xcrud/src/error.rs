//! `xcrud` error types.
use std::{backtrace::Backtrace, borrow::Cow, fmt};

use crate::{diagnostic::Diagnostic, expr::ParseError, statement::NotExecuted};

/// A specialized [`Result`] type for `xcrud` operation.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// All possible error from `xcrud` library.
pub struct Error {
    context: String,
    backtrace: Backtrace,
    kind: ErrorKind,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn backtrace(&self) -> &Backtrace {
        &self.backtrace
    }

    /// Prefix error message with `context`.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Returns the server diagnostic if this is an execution error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match &self.kind {
            ErrorKind::Execution(e) => Some(&e.diagnostic),
            _ => None,
        }
    }
}

/// All possible error kind from `xcrud` library.
pub enum ErrorKind {
    /// Invalid statement configuration.
    Config(ConfigError),
    /// Diagnostics requested before any execution.
    NotExecuted(NotExecuted),
    /// Session or server failure.
    Execution(ExecutionError),
}

macro_rules! from {
    (<$ty:ty>$pat:pat => $body:expr) => {
        impl From<$ty> for Error {
            fn from($pat: $ty) -> Self {
                let backtrace = std::backtrace::Backtrace::capture();
                Self { context: String::new(), backtrace, kind: $body }
            }
        }
    };
}

from!(<ErrorKind>e => e);
from!(<ConfigError>e => ErrorKind::Config(e));
from!(<NotExecuted>e => ErrorKind::NotExecuted(e));
from!(<ExecutionError>e => ErrorKind::Execution(e));

impl std::error::Error for Error { }

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.context.is_empty() {
            write!(f, "{}: ", self.context)?;
        }

        fmt::Display::fmt(&self.kind, f)?;

        if let std::backtrace::BacktraceStatus::Captured = self.backtrace.status() {
            let mut backtrace = self.backtrace.to_string();
            write!(f, "\n\n")?;
            writeln!(f, "Stack backtrace:")?;
            backtrace.truncate(backtrace.trim_end().len());
            write!(f, "{}", backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

impl std::error::Error for ErrorKind { }

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => e.fmt(f),
            Self::NotExecuted(e) => e.fmt(f),
            Self::Execution(e) => e.fmt(f),
        }
    }
}

impl fmt::Debug for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

// ===== ConfigError =====

/// Part of an operation a [`ConfigError`] refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Clause {
    Where,
    OrderBy(usize),
    Limit,
    Projection(usize),
    Column(usize),
    Row(usize),
    Document(usize),
    /// Update assignment, by field key.
    Set(String),
    Param(String),
    /// Operation not supported by the statement kind.
    Operation(&'static str),
    /// Encoded command as a whole, when it exceeds the wire limits.
    Command,
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::Where => f.write_str("where clause"),
            Clause::OrderBy(i) => write!(f, "order term #{i}"),
            Clause::Limit => f.write_str("limit"),
            Clause::Projection(i) => write!(f, "projection #{i}"),
            Clause::Column(i) => write!(f, "column #{i}"),
            Clause::Row(i) => write!(f, "row #{i}"),
            Clause::Document(i) => write!(f, "document #{i}"),
            Clause::Set(key) => write!(f, "assignment `{key}`"),
            Clause::Param(name) => write!(f, "parameter `{name}`"),
            Clause::Operation(op) => write!(f, "`{op}` operation"),
            Clause::Command => f.write_str("encoded command"),
        }
    }
}

/// An error when configuring an operation.
pub struct ConfigError {
    clause: Clause,
    reason: Cow<'static, str>,
}

impl ConfigError {
    pub fn new(clause: Clause, reason: impl Into<Cow<'static, str>>) -> ConfigError {
        ConfigError { clause, reason: reason.into() }
    }

    /// Wrap expression parse failure.
    pub fn parse(clause: Clause, err: ParseError) -> ConfigError {
        ConfigError { clause, reason: err.to_string().into() }
    }

    /// Operation not applicable to the statement.
    pub(crate) fn unsupported(op: &'static str, kind: impl fmt::Display) -> ConfigError {
        ConfigError::new(Clause::Operation(op), format!("not supported by {kind} statement"))
    }

    pub fn clause(&self) -> &Clause {
        &self.clause
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl std::error::Error for ConfigError { }

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.clause, self.reason)
    }
}

impl fmt::Debug for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

// ===== ExecutionError =====

/// Session or server side failure of an executed command.
pub struct ExecutionError {
    pub(crate) diagnostic: Diagnostic,
}

impl ExecutionError {
    /// Create error from server diagnostic.
    pub fn new(diagnostic: Diagnostic) -> ExecutionError {
        ExecutionError { diagnostic }
    }

    /// Create client side error, e.g. the session is closed.
    pub fn session(message: impl Into<String>) -> ExecutionError {
        ExecutionError { diagnostic: Diagnostic::error(0, message) }
    }

    pub fn diagnostic(&self) -> &Diagnostic {
        &self.diagnostic
    }
}

impl std::error::Error for ExecutionError { }

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "execution failed, {}", self.diagnostic)
    }
}

impl fmt::Debug for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expr::{DataModel, parse};

    #[test]
    fn config_error_display() {
        let err = parse("(a", DataModel::Table).unwrap_err();
        let err = Error::from(ConfigError::parse(Clause::Where, err));
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Where));
        assert!(err.to_string().starts_with("invalid where clause: failed to parse expression at 2"));
    }

    #[test]
    fn context_prefix() {
        let err = Error::from(ExecutionError::session("session closed")).context("find");
        assert!(err.to_string().starts_with("find: execution failed, error: session closed"));
        assert_eq!(err.diagnostic().map(|d| d.code), Some(0));
    }
}
