use std::collections::BTreeMap;

use super::{Clauses, Target, delegate_clauses, limit_without_offset};
use crate::{
    Result,
    common::verbose,
    error::{Clause, ConfigError},
    expr::{DataModel, Expr, IntoExpr, parse},
    protocol::{Assignment, ModifyOp, SetCursor},
    session::Session,
};

/// Update rows in a table, or modify documents in a collection.
///
/// Assignments are keyed by field, setting the same field again replaces
/// the previous assignment. Keys are resolved when the command is sent.
#[derive(Clone, Debug)]
pub struct Update {
    target: Target,
    clauses: Clauses,
    set: BTreeMap<String, Assignment>,
}

delegate_clauses!(Update);

impl Update {
    pub fn new(target: Target) -> Update {
        Update { clauses: Clauses::new(target.model()), target, set: BTreeMap::new() }
    }

    /// Assign a value to `field`.
    ///
    /// Field is a column reference for tables, or a document path for collections.
    pub fn set_value(&mut self, field: impl Into<String>, value: impl IntoExpr) {
        let value = Some(value.into_expr());
        self.set.insert(field.into(), Assignment { op: ModifyOp::Set, value });
    }

    /// Parse and assign an expression to `field`.
    pub fn set_expr(&mut self, field: impl Into<String>, text: &str) -> Result<()> {
        let field = field.into();
        let expr = match parse(text, self.target.model()) {
            Ok(ok) => ok,
            Err(err) => return Err(ConfigError::parse(Clause::Set(field), err).into()),
        };
        self.set.insert(field, Assignment { op: ModifyOp::Set, value: Some(expr) });
        Ok(())
    }

    /// Add a document modification.
    ///
    /// [`ModifyOp::Unset`] takes no value, every other operation requires one.
    /// Array operations are only available for collections.
    pub fn modify(&mut self, op: ModifyOp, path: impl Into<String>, value: Option<Expr>) -> Result<()> {
        let path = path.into();
        match (op, &value) {
            (ModifyOp::Unset, Some(_)) => {
                return Err(ConfigError::new(Clause::Set(path), "unset does not take a value").into());
            }
            (ModifyOp::Set | ModifyOp::ArrayInsert | ModifyOp::ArrayAppend, None) => {
                return Err(ConfigError::new(
                    Clause::Set(path),
                    format!("{} requires a value", op.as_str()),
                )
                .into());
            }
            _ => {}
        }
        if self.target.model() == DataModel::Table && op != ModifyOp::Set {
            return Err(ConfigError::new(
                Clause::Set(path),
                format!("{} is only supported for collections", op.as_str()),
            )
            .into());
        }
        self.set.insert(path, Assignment { op, value });
        Ok(())
    }

    /// Set row count limit, offset must be zero.
    pub fn set_limit(&mut self, row_count: u64, offset: u64) -> Result<()> {
        limit_without_offset(&mut self.clauses, row_count, offset)
    }

    pub fn assignments(&self) -> &BTreeMap<String, Assignment> {
        &self.set
    }

    pub fn send<S: Session>(&self, session: &mut S) -> Result<S::Reply> {
        if self.set.is_empty() {
            return Err(ConfigError::new(
                Clause::Set(String::new()),
                "update requires at least one assignment",
            )
            .into());
        }

        let mut set = SetCursor::new(&self.set, self.target.model());

        verbose!(name = %self.target, assignments = self.set.len(), "send update");
        session.send_update(
            &self.target,
            self.clauses.filter(),
            &mut set,
            self.clauses.order(),
            self.clauses.limit(),
            self.clauses.params(),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{error::ErrorKind, session::test::Recorder};

    #[test]
    fn empty_set_fails() {
        let update = Update::new(Target::table("db", "t"));
        let mut session = Recorder::default();
        let err = update.send(&mut session).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(_)));
        assert!(session.log.is_empty());
    }

    #[test]
    fn assignments_in_key_order() {
        let mut update = Update::new(Target::table("db", "t"));
        update.set_value("b", 2);
        update.set_value("a", 1);
        update.set_expr("c", "c + 1").unwrap();
        update.set_value("a", 10);
        update.set_where("id = :id").unwrap();
        update.set_limit(1, 0).unwrap();
        update.bind("id", 7);

        let mut session = Recorder::default();
        update.send(&mut session).unwrap();
        assert_eq!(
            session.log,
            ["update `db`.`t` set [a = 10, b = 2, c = (c + 1)] where (id == :id) limit 1 params [id = 7]"]
        );
    }

    #[test]
    fn offset_rejected() {
        let mut update = Update::new(Target::table("db", "t"));
        let err = update.set_limit(1, 1).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Limit));
        assert!(update.clauses().limit().is_none());
    }

    #[test]
    fn malformed_key_fails_at_send() {
        let mut update = Update::new(Target::table("db", "t"));
        update.set_value("a..b", 1);
        let err = update.send(&mut Recorder::default()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Set("a..b".into())));
    }

    #[test]
    fn document_modify() {
        let mut update = Update::new(Target::collection("db", "c"));
        update.modify(ModifyOp::Set, "$.name", Some(Expr::value("x"))).unwrap();
        update.modify(ModifyOp::Unset, "$.age", None).unwrap();
        update.modify(ModifyOp::ArrayAppend, "$.tags", Some(Expr::value("t"))).unwrap();
        assert!(update.modify(ModifyOp::Unset, "$.a", Some(Expr::value(1))).is_err());
        assert!(update.modify(ModifyOp::ArrayInsert, "$.a[0]", None).is_err());

        let mut session = Recorder::default();
        update.send(&mut session).unwrap();
        assert_eq!(
            session.log,
            ["update `db`.`c` set [$.age unset, $.name = \"x\", $.tags array_append \"t\"]"]
        );
    }

    #[test]
    fn array_ops_need_collection() {
        let mut update = Update::new(Target::table("db", "t"));
        assert!(update.modify(ModifyOp::ArrayAppend, "a", Some(Expr::value(1))).is_err());
        update.modify(ModifyOp::Set, "a", Some(Expr::value(1))).unwrap();
        assert_eq!(update.assignments().len(), 1);
    }
}
