//! Statement configuration.
use std::env::var;

use crate::diagnostic::Severity;

/// Statement configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub(crate) min_severity: Severity,
}

impl Config {
    /// Retrieve configuration from environment variable.
    ///
    /// It reads:
    /// - `XCRUD_SEVERITY`, the minimum severity of reported diagnostics,
    ///   one of `info`, `warning` or `error`
    ///
    /// Missing or unparseable values fallback to default.
    pub fn from_env() -> Config {
        let min_severity = var("XCRUD_SEVERITY")
            .ok()
            .and_then(|e| e.parse().ok())
            .unwrap_or_default();

        Self { min_severity }
    }

    /// Set the minimum severity of diagnostics returned by
    /// [`Statement::diagnostics`][crate::Statement::diagnostics].
    pub fn min_severity(mut self, value: Severity) -> Self {
        self.min_severity = value;
        self
    }

    /// Get the minimum reported severity.
    pub fn severity(&self) -> Severity {
        self.min_severity
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { min_severity: Severity::Error }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn builder() {
        let config = Config::default();
        assert_eq!(config.severity(), Severity::Error);
        let config = config.min_severity(Severity::Info);
        assert_eq!(config.severity(), Severity::Info);
    }
}
