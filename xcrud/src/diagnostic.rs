//! Server and client diagnostics.
use std::{borrow::Cow, fmt, str::FromStr};

/// Diagnostic severity, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Severity {
    Info,
    Warning,
    #[default]
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Cow<'static, str>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("info") => Ok(Severity::Info),
            s if s.eq_ignore_ascii_case("warning") || s.eq_ignore_ascii_case("warn") => {
                Ok(Severity::Warning)
            }
            s if s.eq_ignore_ascii_case("error") => Ok(Severity::Error),
            s => Err(format!("unknown severity: {s:?}").into()),
        }
    }
}

/// Single diagnostic entry.
#[derive(Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Server error code, `0` for client side diagnostic.
    pub code: u32,
    pub sqlstate: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: u32, message: impl Into<String>) -> Diagnostic {
        Diagnostic { severity, code, sqlstate: None, message: message.into() }
    }

    pub fn error(code: u32, message: impl Into<String>) -> Diagnostic {
        Self::new(Severity::Error, code, message)
    }

    pub fn warning(code: u32, message: impl Into<String>) -> Diagnostic {
        Self::new(Severity::Warning, code, message)
    }

    pub fn with_sqlstate(mut self, sqlstate: impl Into<String>) -> Diagnostic {
        self.sqlstate = Some(sqlstate.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.severity)?;
        if self.code != 0 {
            write!(f, " {}", self.code)?;
        }
        if let Some(state) = &self.sqlstate {
            write!(f, " ({state})")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl fmt::Debug for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Outcome of a successfully completed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub affected_rows: u64,
    pub last_insert_id: Option<u64>,
    /// Document ids generated by the server for added documents.
    pub generated_ids: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Completion {
    pub fn affected(rows: u64) -> Completion {
        Completion { affected_rows: rows, ..Default::default() }
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Completion {
        self.diagnostics.push(diagnostic);
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn severity_order() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!("WARN".parse::<Severity>().unwrap(), Severity::Warning);
        assert!("fatal".parse::<Severity>().is_err());
    }

    #[test]
    fn display() {
        let diag = Diagnostic::error(1062, "Duplicate entry").with_sqlstate("23000");
        assert_eq!(diag.to_string(), "error 1062 (23000): Duplicate entry");
        assert_eq!(Diagnostic::warning(0, "truncated").to_string(), "warning: truncated");
    }
}
