use super::{Clauses, Target, delegate_clauses, limit_without_offset};
use crate::{Result, common::verbose, session::Session};

/// Delete rows from a table, or remove documents from a collection.
#[derive(Clone, Debug)]
pub struct Remove {
    target: Target,
    clauses: Clauses,
}

delegate_clauses!(Remove);

impl Remove {
    pub fn new(target: Target) -> Remove {
        Remove { clauses: Clauses::new(target.model()), target }
    }

    /// Set row count limit, offset must be zero.
    pub fn set_limit(&mut self, row_count: u64, offset: u64) -> Result<()> {
        limit_without_offset(&mut self.clauses, row_count, offset)
    }

    pub fn send<S: Session>(&self, session: &mut S) -> Result<S::Reply> {
        verbose!(name = %self.target, "send delete");
        session.send_delete(
            &self.target,
            self.clauses.filter(),
            self.clauses.order(),
            self.clauses.limit(),
            self.clauses.params(),
        )
    }
}
