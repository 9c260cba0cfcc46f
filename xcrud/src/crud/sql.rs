use super::Params;
use crate::{Result, common::verbose, session::Session, value::Encode};

/// Raw sql statement with positional parameters.
#[derive(Clone, Debug)]
pub struct Sql {
    text: String,
    params: Params,
}

impl Sql {
    pub fn new(text: impl Into<String>) -> Sql {
        Sql { text: text.into(), params: Params::new() }
    }

    /// Bind the next `?` placeholder.
    pub fn bind(&mut self, value: impl Encode) {
        self.params.push(value);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn params(&self) -> &[crate::Value] {
        self.params.positional()
    }

    pub fn send<S: Session>(&self, session: &mut S) -> Result<S::Reply> {
        verbose!(params = self.params.positional().len(), "send sql");
        session.send_sql(&self.text, self.params.positional())
    }
}
