//! Pull protocols consumed by the encoding layer.
//!
//! Builders do not serialize themselves. Instead, the session is handed
//! cursor objects implementing these traits, and pulls rows, columns and
//! update assignments lazily while it writes a command:
//!
//! - [`RowSource`], rows of an insert
//! - [`Columns`], column list of an insert
//! - [`Projection`], projection list of a select
//! - [`UpdateSpec`], assignments of an update
//!
//! Cursors borrow the accumulated state, they never mutate it, so a
//! statement can be executed again with a fresh cursor.
use std::collections::{BTreeMap, btree_map};

use crate::{
    Result,
    error::{Clause, ConfigError},
    expr::{ColumnRef, DataModel, Expr, FieldPath, ProjectionItem, parse_column_ref, parse_field_path},
    row::Row,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    NotStarted,
    At(usize),
    Exhausted,
}

impl Position {
    /// Advance within `len` elements.
    fn advance(&mut self, len: usize) -> bool {
        let next = match *self {
            Position::NotStarted => 0,
            Position::At(i) => i + 1,
            Position::Exhausted => return false,
        };
        *self = match next < len {
            true => Position::At(next),
            false => Position::Exhausted,
        };
        matches!(self, Position::At(_))
    }
}

// ===== Rows =====

/// Visitor of a single row.
pub trait RowProcessor {
    fn list_begin(&mut self);

    /// Single row value, in column order.
    fn element(&mut self, value: &Expr);

    fn list_end(&mut self);
}

/// Rows of an insert command.
pub trait RowSource {
    /// Move to the next row, returns `true` if a row is positioned.
    ///
    /// After the last row, this is a no-op returning `false`.
    fn next(&mut self) -> bool;

    /// Return to the state before the first row.
    fn rewind(&mut self);

    /// Index of the current row.
    fn index(&self) -> Option<usize>;

    /// Emit current row.
    ///
    /// # Panics
    ///
    /// Panics if cursor is not positioned on a row.
    fn process(&self, prc: &mut dyn RowProcessor) -> Result<()>;
}

/// [`RowSource`] over accumulated rows.
#[derive(Debug)]
pub struct RowCursor<'a> {
    rows: &'a [Row],
    pos: Position,
}

impl<'a> RowCursor<'a> {
    pub fn new(rows: &'a [Row]) -> Self {
        Self { rows, pos: Position::NotStarted }
    }
}

impl RowSource for RowCursor<'_> {
    fn next(&mut self) -> bool {
        self.pos.advance(self.rows.len())
    }

    fn rewind(&mut self) {
        self.pos = Position::NotStarted;
    }

    fn index(&self) -> Option<usize> {
        match self.pos {
            Position::At(i) => Some(i),
            _ => None,
        }
    }

    fn process(&self, prc: &mut dyn RowProcessor) -> Result<()> {
        let Position::At(i) = self.pos else {
            panic!("`process` called while row cursor is not positioned")
        };
        prc.list_begin();
        for value in self.rows[i].values() {
            prc.element(value);
        }
        prc.list_end();
        Ok(())
    }
}

// ===== Columns =====

/// Visitor of a column list.
pub trait ColumnsProcessor {
    fn list_begin(&mut self);

    fn name(&mut self, name: &str);

    fn list_end(&mut self);
}

/// Column list of an insert command, emitted in one pass.
pub trait Columns {
    fn process(&self, prc: &mut dyn ColumnsProcessor);
}

/// [`Columns`] over accumulated names.
#[derive(Debug, Clone, Copy)]
pub struct ColumnList<'a>(pub &'a [String]);

impl Columns for ColumnList<'_> {
    fn process(&self, prc: &mut dyn ColumnsProcessor) {
        prc.list_begin();
        for name in self.0 {
            prc.name(name);
        }
        prc.list_end();
    }
}

// ===== Projection =====

/// Visitor of a projection list.
pub trait ProjectionProcessor {
    fn list_begin(&mut self);

    fn element(&mut self, expr: &Expr, alias: Option<&str>);

    fn list_end(&mut self);
}

/// Projection list of a select command, emitted in one pass.
pub trait Projection {
    fn process(&self, prc: &mut dyn ProjectionProcessor);
}

/// [`Projection`] over accumulated projection items.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionList<'a>(pub &'a [ProjectionItem]);

impl Projection for ProjectionList<'_> {
    fn process(&self, prc: &mut dyn ProjectionProcessor) {
        prc.list_begin();
        for item in self.0 {
            prc.element(&item.expr, item.alias.as_deref());
        }
        prc.list_end();
    }
}

// ===== Update =====

/// Operation of a single update assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifyOp {
    Set,
    /// Remove the field, carries no value.
    Unset,
    ArrayInsert,
    ArrayAppend,
}

impl ModifyOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModifyOp::Set => "set",
            ModifyOp::Unset => "unset",
            ModifyOp::ArrayInsert => "array_insert",
            ModifyOp::ArrayAppend => "array_append",
        }
    }
}

/// Value of a set-value map entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub op: ModifyOp,
    pub value: Option<Expr>,
}

/// Resolved target of an update assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// Table column, optionally into a json path.
    Column(ColumnRef),
    /// Document field path.
    Path(FieldPath),
}

/// Visitor of a single update assignment.
pub trait UpdateProcessor {
    fn assignment(&mut self, op: ModifyOp, field: &FieldRef, value: Option<&Expr>);
}

/// Assignments of an update command.
pub trait UpdateSpec {
    /// Move to the next assignment, returns `true` if one is positioned.
    ///
    /// After the last assignment, this is a no-op returning `false`.
    fn next(&mut self) -> bool;

    /// Return to the state before the first assignment.
    fn rewind(&mut self);

    /// Emit current assignment.
    ///
    /// Fails if the assignment key is not a valid field reference.
    ///
    /// # Panics
    ///
    /// Panics if cursor is not positioned on an assignment.
    fn process(&self, prc: &mut dyn UpdateProcessor) -> Result<()>;
}

/// [`UpdateSpec`] over a set-value map, in key order.
#[derive(Debug)]
pub struct SetCursor<'a> {
    map: &'a BTreeMap<String, Assignment>,
    model: DataModel,
    iter: btree_map::Iter<'a, String, Assignment>,
    current: Option<(&'a String, &'a Assignment)>,
    pos: Position,
}

impl<'a> SetCursor<'a> {
    pub fn new(map: &'a BTreeMap<String, Assignment>, model: DataModel) -> Self {
        Self { map, model, iter: map.iter(), current: None, pos: Position::NotStarted }
    }
}

impl UpdateSpec for SetCursor<'_> {
    fn next(&mut self) -> bool {
        if self.pos == Position::NotStarted {
            self.iter = self.map.iter();
        }
        if !self.pos.advance(self.map.len()) {
            self.current = None;
            return false;
        }
        self.current = self.iter.next();
        self.current.is_some()
    }

    fn rewind(&mut self) {
        self.pos = Position::NotStarted;
        self.current = None;
    }

    fn process(&self, prc: &mut dyn UpdateProcessor) -> Result<()> {
        let Some((key, assignment)) = self.current else {
            panic!("`process` called while update cursor is not positioned")
        };

        let field = match self.model {
            DataModel::Table => parse_column_ref(key).map(FieldRef::Column),
            DataModel::Document => parse_field_path(key).map(FieldRef::Path),
        }
        .map_err(|e| ConfigError::parse(Clause::Set(key.clone()), e))?;

        prc.assignment(assignment.op, &field, assignment.value.as_ref());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{error::ErrorKind, row::IntoRow, value::Value};

    #[derive(Default)]
    struct Rows(Vec<Vec<String>>);

    impl RowProcessor for Rows {
        fn list_begin(&mut self) { self.0.push(vec![]) }
        fn element(&mut self, value: &Expr) { self.0.last_mut().unwrap().push(value.to_string()) }
        fn list_end(&mut self) { }
    }

    fn drain(src: &mut dyn RowSource) -> Vec<Vec<String>> {
        let mut rows = Rows::default();
        while src.next() {
            src.process(&mut rows).unwrap();
        }
        rows.0
    }

    #[test]
    fn rows_in_submission_order() {
        let rows = vec![(1, "a").into_row(), (2, "b").into_row(), (3, "c").into_row()];
        let mut cursor = RowCursor::new(&rows);
        assert_eq!(
            drain(&mut cursor),
            [["1", "\"a\""], ["2", "\"b\""], ["3", "\"c\""]]
        );
    }

    #[test]
    fn exhausted_cursor_is_noop() {
        let rows = vec![(1,).into_row()];
        let mut cursor = RowCursor::new(&rows);
        assert!(cursor.next());
        assert_eq!(cursor.index(), Some(0));
        assert!(!cursor.next());
        assert!(!cursor.next());
        assert_eq!(cursor.index(), None);
    }

    #[test]
    fn rewind_replays_identical_pass() {
        let rows = vec![(1, 2).into_row(), (3, 4).into_row()];
        let mut cursor = RowCursor::new(&rows);
        let first = drain(&mut cursor);
        cursor.rewind();
        let second = drain(&mut cursor);
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn empty_rows() {
        let mut cursor = RowCursor::new(&[]);
        assert!(!cursor.next());
    }

    #[test]
    #[should_panic]
    fn process_before_next() {
        let rows = vec![(1,).into_row()];
        let cursor = RowCursor::new(&rows);
        let _ = cursor.process(&mut Rows::default());
    }

    #[derive(Default)]
    struct Names(Vec<String>);

    impl ColumnsProcessor for Names {
        fn list_begin(&mut self) { self.0.push("[".into()) }
        fn name(&mut self, name: &str) { self.0.push(name.into()) }
        fn list_end(&mut self) { self.0.push("]".into()) }
    }

    #[test]
    fn columns_single_pass() {
        let cols = vec!["id".to_owned(), "name".to_owned()];
        let mut names = Names::default();
        ColumnList(&cols).process(&mut names);
        assert_eq!(names.0, ["[", "id", "name", "]"]);

        let mut names = Names::default();
        ColumnList(&[]).process(&mut names);
        assert_eq!(names.0, ["[", "]"]);
    }

    #[derive(Default)]
    struct Sets(Vec<(ModifyOp, FieldRef, Option<Expr>)>);

    impl UpdateProcessor for Sets {
        fn assignment(&mut self, op: ModifyOp, field: &FieldRef, value: Option<&Expr>) {
            self.0.push((op, field.clone(), value.cloned()));
        }
    }

    fn set(value: i32) -> Assignment {
        Assignment { op: ModifyOp::Set, value: Some(Expr::value(value)) }
    }

    #[test]
    fn assignments_in_key_order() {
        let mut map = BTreeMap::new();
        map.insert("name".to_owned(), set(1));
        map.insert("age".to_owned(), set(2));
        map.insert("t.id".to_owned(), set(3));

        let mut cursor = SetCursor::new(&map, DataModel::Table);
        let mut sets = Sets::default();
        while cursor.next() {
            cursor.process(&mut sets).unwrap();
        }
        assert!(!cursor.next());

        let names: Vec<_> = sets.0.iter().map(|(_, f, _)| match f {
            FieldRef::Column(c) => c.to_string(),
            FieldRef::Path(p) => p.to_string(),
        }).collect();
        assert_eq!(names, ["age", "name", "t.id"]);
        assert_eq!(sets.0[0].2, Some(Expr::Literal(Value::Int(2))));

        cursor.rewind();
        assert!(cursor.next());
    }

    #[test]
    fn document_paths() {
        let mut map = BTreeMap::new();
        map.insert("$.a.b".to_owned(), Assignment { op: ModifyOp::Unset, value: None });

        let mut cursor = SetCursor::new(&map, DataModel::Document);
        let mut sets = Sets::default();
        assert!(cursor.next());
        cursor.process(&mut sets).unwrap();
        assert_eq!(sets.0[0].0, ModifyOp::Unset);
        assert!(matches!(&sets.0[0].1, FieldRef::Path(p) if p.elements.len() == 2));
    }

    #[test]
    fn malformed_key_fails_at_process() {
        let mut map = BTreeMap::new();
        map.insert("a..b".to_owned(), set(1));
        map.insert("b".to_owned(), set(2));

        let mut cursor = SetCursor::new(&map, DataModel::Table);
        assert!(cursor.next());
        let err = cursor.process(&mut Sets::default()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Config(e) if e.clause() == &Clause::Set("a..b".into())
        ));
    }
}
