use super::{Clauses, Target, delegate_clauses};
use crate::{
    Result,
    common::verbose,
    error::{Clause, ConfigError},
    expr::{ProjectionItem, parse_projection},
    protocol::{Projection, ProjectionList},
    session::Session,
};

/// Find rows in a table or documents in a collection.
#[derive(Clone, Debug)]
pub struct Select {
    target: Target,
    clauses: Clauses,
    projection: Vec<ProjectionItem>,
}

delegate_clauses!(Select);

impl Select {
    pub fn new(target: Target) -> Select {
        Select { clauses: Clauses::new(target.model()), target, projection: vec![] }
    }

    /// Parse and append a projection element, `<expr> [AS alias]`.
    pub fn add_projection(&mut self, text: &str) -> Result<()> {
        let item = parse_projection(text, self.target.model())
            .map_err(|e| ConfigError::parse(Clause::Projection(self.projection.len()), e))?;
        self.projection.push(item);
        Ok(())
    }

    /// Set limit and offset, replacing any previous limit.
    pub fn set_limit(&mut self, row_count: u64, offset: u64) -> Result<()> {
        self.clauses.set_limit(row_count, offset);
        Ok(())
    }

    pub fn projection(&self) -> &[ProjectionItem] {
        &self.projection
    }

    pub fn send<S: Session>(&self, session: &mut S) -> Result<S::Reply> {
        let projection = match self.projection.is_empty() {
            true => None,
            false => Some(ProjectionList(&self.projection)),
        };
        let projection = projection.as_ref().map(|p| p as &dyn Projection);

        verbose!(name = %self.target, "send select");
        session.send_select(
            &self.target,
            self.clauses.filter(),
            projection,
            self.clauses.order(),
            self.clauses.limit(),
            self.clauses.params(),
        )
    }
}
