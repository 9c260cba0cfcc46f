//! Reference wire encoding of commands.
//!
//! Each command is written as a single frame:
//!
//! ```text
//! Byte1   message type
//! Int32   length of the frame in bytes, including self
//! Byte[n] body
//! ```
//!
//! The body is produced by driving the pull protocols of [`protocol`][crate::protocol],
//! so rows and assignments are never collected into an intermediate buffer.
//! Integers are big endian, strings are nul terminated unless noted.
use bytes::{BufMut, BytesMut};

use crate::{
    Result,
    common::verbose,
    crud::{Limit, Params, Target},
    error::{Clause, ConfigError},
    expr::{ColumnRef, DataModel, Direction, Expr, ExprProcessor, FieldPath, OrderTerm, PathElement},
    ext::{BufMutExt, UsizeExt},
    protocol::{
        Columns, ColumnsProcessor, FieldRef, ModifyOp, Projection, ProjectionProcessor, RowProcessor,
        RowSource, UpdateProcessor, UpdateSpec,
    },
    value::Value,
};

/// Insert or add command.
pub const INSERT: u8 = b'I';
/// Select or find command.
pub const FIND: u8 = b'F';
/// Update or modify command.
pub const UPDATE: u8 = b'U';
/// Delete or remove command.
pub const DELETE: u8 = b'D';
/// Raw sql command.
pub const SQL: u8 = b'Q';

/// Write insert frame.
///
/// ```text
/// Target
/// Byte1        1 if column list follows, otherwise 0
/// Int32        column count, followed by column names
/// Int32        row count, followed by rows
/// ```
///
/// Every row must have as many values as the column list, or as the first
/// row when there is no column list.
pub fn write_insert(
    buf: &mut BytesMut,
    target: &Target,
    rows: &mut dyn RowSource,
    columns: Option<&dyn Columns>,
) -> Result<()> {
    frame(buf, INSERT, |w| {
        w.target(target);

        let mut expected = match columns {
            Some(columns) => {
                w.buf.put_u8(1);
                let at = w.reserve_count();
                columns.process(w);
                w.patch_count(at, w.count);
                Some(w.count)
            }
            None => {
                w.buf.put_u8(0);
                None
            }
        };

        let at = w.reserve_count();
        let mut count = 0;
        rows.rewind();
        while rows.next() {
            let index = rows.index().unwrap_or(count);
            rows.process(w)?;
            let width = w.count;
            let expected = *expected.get_or_insert(width);
            if width != expected {
                return Err(ConfigError::new(
                    Clause::Row(index),
                    format!("row has {width} values, expected {expected}"),
                )
                .into());
            }
            count += 1;
        }
        w.patch_count(at, count);
        Ok(())
    })
}

/// Write find frame.
///
/// ```text
/// Target
/// Filter
/// Byte1        1 if projection list follows, otherwise 0
/// Order
/// Limit
/// Params
/// ```
pub fn write_select(
    buf: &mut BytesMut,
    target: &Target,
    filter: Option<&Expr>,
    projection: Option<&dyn Projection>,
    order: Option<&[OrderTerm]>,
    limit: Option<&Limit>,
    params: &Params,
) -> Result<()> {
    frame(buf, FIND, |w| {
        w.target(target);
        w.filter(filter);
        match projection {
            Some(projection) => {
                w.buf.put_u8(1);
                projection.process(w);
            }
            None => w.buf.put_u8(0),
        }
        w.order(order);
        w.limit(limit);
        w.params(params);
        Ok(())
    })
}

/// Write update frame.
///
/// ```text
/// Target
/// Filter
/// Int32        assignment count, followed by assignments
/// Order
/// Limit
/// Params
/// ```
pub fn write_update(
    buf: &mut BytesMut,
    target: &Target,
    filter: Option<&Expr>,
    set: &mut dyn UpdateSpec,
    order: Option<&[OrderTerm]>,
    limit: Option<&Limit>,
    params: &Params,
) -> Result<()> {
    frame(buf, UPDATE, |w| {
        w.target(target);
        w.filter(filter);

        let at = w.reserve_count();
        let mut count = 0;
        set.rewind();
        while set.next() {
            set.process(w)?;
            count += 1;
        }
        w.patch_count(at, count);

        w.order(order);
        w.limit(limit);
        w.params(params);
        Ok(())
    })
}

/// Write delete frame.
///
/// ```text
/// Target
/// Filter
/// Order
/// Limit
/// Params
/// ```
pub fn write_delete(
    buf: &mut BytesMut,
    target: &Target,
    filter: Option<&Expr>,
    order: Option<&[OrderTerm]>,
    limit: Option<&Limit>,
    params: &Params,
) -> Result<()> {
    frame(buf, DELETE, |w| {
        w.target(target);
        w.filter(filter);
        w.order(order);
        w.limit(limit);
        w.params(params);
        Ok(())
    })
}

/// Write sql frame.
///
/// ```text
/// String       sql text
/// Int16        parameter count, followed by values
/// ```
pub fn write_sql(buf: &mut BytesMut, sql: &str, params: &[Value]) -> Result<()> {
    frame(buf, SQL, |w| {
        w.buf.put_nul_string(sql);
        w.put_len16(params.len(), || Clause::Param("?".into()));
        for value in params {
            w.value(value);
        }
        Ok(())
    })
}

/// Write message type, reserve the length, write the body, then back-patch the length.
///
/// On failure, including a count that does not fit its wire width, `buf` is
/// truncated to its previous length.
fn frame<F>(buf: &mut BytesMut, msgtype: u8, body: F) -> Result<()>
where
    F: FnOnce(&mut Writer) -> Result<()>,
{
    let offset = buf.len();
    buf.put_u8(msgtype);
    buf.put_u32(0);

    let mut w = Writer { buf: &mut *buf, count: 0, overflow: None };
    let result: Result<()> = match body(&mut w) {
        Ok(()) => w.overflow.take().map_or(Ok(()), |err| Err(err.into())),
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        verbose!(msgtype, "frame aborted: {err}");
        buf.truncate(offset);
        return Err(err);
    }

    // write the length
    let mut written_buf = &mut buf[offset + 1..];
    let Some(len) = written_buf.len().to_u32() else {
        let reason = format!("frame of {} bytes exceeds the wire limit", written_buf.len());
        buf.truncate(offset);
        return Err(ConfigError::new(Clause::Command, reason).into());
    };
    written_buf.put_u32(len);

    verbose!(msgtype, len, "frame written");
    Ok(())
}

// value tags
const NULL: u8 = b'N';
const BOOL: u8 = b'B';
const INT: u8 = b'i';
const UINT: u8 = b'u';
const FLOAT: u8 = b'f';
const DOUBLE: u8 = b'd';
const STRING: u8 = b's';
const BYTES: u8 = b'x';

// expression tags
const PARAM: u8 = b'P';
const COLUMN: u8 = b'C';
const FIELD: u8 = b'$';
const LIST_BEGIN: u8 = b'[';
const LIST_END: u8 = b']';
const DOC_BEGIN: u8 = b'{';
const DOC_KEY: u8 = b'k';
const DOC_END: u8 = b'}';
const OPERATOR: u8 = b'(';
const CALL: u8 = b'c';
const APPLY_END: u8 = b')';

/// Body writer, the processor every protocol is driven into.
struct Writer<'a> {
    buf: &'a mut BytesMut,
    /// Elements emitted by the current list.
    count: usize,
    /// First length which did not fit its wire width.
    overflow: Option<ConfigError>,
}

impl Writer<'_> {
    fn reserve_count(&mut self) -> usize {
        let at = self.buf.len();
        self.buf.put_u32(0);
        at
    }

    fn patch_count(&mut self, at: usize, count: usize) {
        let count = match count.to_u32() {
            Some(count) => count,
            None => {
                self.overflow(Clause::Command, count, u32::MAX as usize);
                0
            }
        };
        (&mut self.buf[at..at + 4]).put_u32(count);
    }

    fn put_len16(&mut self, len: usize, clause: impl FnOnce() -> Clause) {
        match len.to_u16() {
            Some(len) => self.buf.put_u16(len),
            None => {
                self.overflow(clause(), len, u16::MAX.into());
                self.buf.put_u16(0);
            }
        }
    }

    /// `u32` length prefixed bytes.
    fn put_len_bytes(&mut self, bytes: &[u8]) {
        match bytes.len().to_u32() {
            Some(len) => self.buf.put_u32(len),
            None => {
                self.overflow(Clause::Command, bytes.len(), u32::MAX as usize);
                self.buf.put_u32(0);
            }
        }
        self.buf.put_slice(bytes);
    }

    /// Processor callbacks cannot fail, the first overflow is kept and
    /// reported once the body is written.
    fn overflow(&mut self, clause: Clause, len: usize, max: usize) {
        if self.overflow.is_none() {
            let reason = format!("length {len} exceeds the wire limit of {max}");
            self.overflow = Some(ConfigError::new(clause, reason));
        }
    }

    /// ```text
    /// Byte1        `T` for table, `D` for collection
    /// String       schema
    /// String       name
    /// ```
    fn target(&mut self, target: &Target) {
        self.buf.put_u8(match target.model() {
            DataModel::Table => b'T',
            DataModel::Document => b'D',
        });
        self.buf.put_nul_string(target.schema());
        self.buf.put_nul_string(target.name());
    }

    fn filter(&mut self, filter: Option<&Expr>) {
        match filter {
            Some(expr) => {
                self.buf.put_u8(1);
                expr.process(self);
            }
            None => self.buf.put_u8(0),
        }
    }

    fn order(&mut self, order: Option<&[OrderTerm]>) {
        let Some(order) = order else {
            return self.buf.put_u8(0);
        };
        self.buf.put_u8(1);
        self.put_len16(order.len(), || Clause::OrderBy(u16::MAX.into()));
        for term in order {
            term.expr.process(self);
            self.buf.put_u8(match term.direction {
                Direction::Asc => 0,
                Direction::Desc => 1,
            });
        }
    }

    fn limit(&mut self, limit: Option<&Limit>) {
        let Some(limit) = limit else {
            return self.buf.put_u8(0);
        };
        self.buf.put_u8(1);
        self.buf.put_u64(limit.row_count);
        self.buf.put_u64(limit.offset);
    }

    fn params(&mut self, params: &Params) {
        self.put_len16(params.named().len(), || {
            let name = params.named().nth(u16::MAX.into()).map(|(name, _)| name.to_owned());
            Clause::Param(name.unwrap_or_default())
        });
        for (name, value) in params.named() {
            self.buf.put_nul_string(name);
            self.value(value);
        }
    }

    fn path(&mut self, path: &FieldPath) {
        self.put_len16(path.elements.len(), || Clause::Command);
        for el in &path.elements {
            match el {
                PathElement::Member(name) => {
                    self.buf.put_u8(b'm');
                    self.buf.put_nul_string(name);
                }
                PathElement::MemberAsterisk => self.buf.put_u8(b'M'),
                PathElement::ArrayIndex(i) => {
                    self.buf.put_u8(b'i');
                    self.buf.put_u32(*i);
                }
                PathElement::ArrayIndexAsterisk => self.buf.put_u8(b'I'),
                PathElement::DoubleAsterisk => self.buf.put_u8(b'D'),
            }
        }
    }
}

impl ExprProcessor for Writer<'_> {
    fn value(&mut self, value: &Value) {
        match value {
            Value::Null => self.buf.put_u8(NULL),
            Value::Bool(b) => {
                self.buf.put_u8(BOOL);
                self.buf.put_u8(*b as u8);
            }
            Value::Int(i) => {
                self.buf.put_u8(INT);
                self.buf.put_i64(*i);
            }
            Value::UInt(u) => {
                self.buf.put_u8(UINT);
                self.buf.put_u64(*u);
            }
            Value::Float(v) => {
                self.buf.put_u8(FLOAT);
                self.buf.put_f32(*v);
            }
            Value::Double(v) => {
                self.buf.put_u8(DOUBLE);
                self.buf.put_f64(*v);
            }
            Value::String(s) => {
                self.buf.put_u8(STRING);
                self.put_len_bytes(s.as_bytes());
            }
            Value::Bytes(b) => {
                self.buf.put_u8(BYTES);
                self.put_len_bytes(b);
            }
        }
    }

    fn param(&mut self, name: &str) {
        self.buf.put_u8(PARAM);
        self.buf.put_nul_string(name);
    }

    fn column(&mut self, column: &ColumnRef) {
        self.buf.put_u8(COLUMN);
        self.buf.put_nul_string(column.schema.as_deref().unwrap_or_default());
        self.buf.put_nul_string(column.table.as_deref().unwrap_or_default());
        self.buf.put_nul_string(&column.name);
        match &column.path {
            Some(path) => {
                self.buf.put_u8(1);
                self.path(path);
            }
            None => self.buf.put_u8(0),
        }
    }

    fn field(&mut self, path: &FieldPath) {
        self.buf.put_u8(FIELD);
        self.path(path);
    }

    fn list_begin(&mut self) {
        self.buf.put_u8(LIST_BEGIN);
    }

    fn list_end(&mut self) {
        self.buf.put_u8(LIST_END);
    }

    fn doc_begin(&mut self) {
        self.buf.put_u8(DOC_BEGIN);
    }

    fn doc_key(&mut self, key: &str) {
        self.buf.put_u8(DOC_KEY);
        self.buf.put_nul_string(key);
    }

    fn doc_end(&mut self) {
        self.buf.put_u8(DOC_END);
    }

    fn operator_begin(&mut self, name: &str) {
        self.buf.put_u8(OPERATOR);
        self.buf.put_nul_string(name);
    }

    fn operator_end(&mut self) {
        self.buf.put_u8(APPLY_END);
    }

    fn call_begin(&mut self, name: &str) {
        self.buf.put_u8(CALL);
        self.buf.put_nul_string(name);
    }

    fn call_end(&mut self) {
        self.buf.put_u8(APPLY_END);
    }
}

impl RowProcessor for Writer<'_> {
    fn list_begin(&mut self) {
        self.count = 0;
        self.buf.put_u8(LIST_BEGIN);
    }

    fn element(&mut self, value: &Expr) {
        self.count += 1;
        value.process(self);
    }

    fn list_end(&mut self) {
        self.buf.put_u8(LIST_END);
    }
}

impl ColumnsProcessor for Writer<'_> {
    fn list_begin(&mut self) {
        self.count = 0;
    }

    fn name(&mut self, name: &str) {
        self.count += 1;
        self.buf.put_nul_string(name);
    }

    fn list_end(&mut self) { }
}

impl ProjectionProcessor for Writer<'_> {
    fn list_begin(&mut self) {
        self.buf.put_u8(LIST_BEGIN);
    }

    /// ```text
    /// Expr
    /// String       alias, empty for none
    /// ```
    fn element(&mut self, expr: &Expr, alias: Option<&str>) {
        expr.process(self);
        self.buf.put_nul_string(alias.unwrap_or_default());
    }

    fn list_end(&mut self) {
        self.buf.put_u8(LIST_END);
    }
}

impl UpdateProcessor for Writer<'_> {
    /// ```text
    /// Byte1        operation, 0 set, 1 unset, 2 array insert, 3 array append
    /// Column | Field
    /// Byte1        1 if value expression follows, otherwise 0
    /// ```
    fn assignment(&mut self, op: ModifyOp, field: &FieldRef, value: Option<&Expr>) {
        self.buf.put_u8(match op {
            ModifyOp::Set => 0,
            ModifyOp::Unset => 1,
            ModifyOp::ArrayInsert => 2,
            ModifyOp::ArrayAppend => 3,
        });
        match field {
            FieldRef::Column(column) => ExprProcessor::column(self, column),
            FieldRef::Path(path) => ExprProcessor::field(self, path),
        }
        match value {
            Some(expr) => {
                self.buf.put_u8(1);
                expr.process(self);
            }
            None => self.buf.put_u8(0),
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{
        error::ErrorKind,
        expr::parse,
        protocol::{Assignment, ColumnList, RowCursor, SetCursor},
        row::{IntoRow, Row},
    };

    fn frame_len(buf: &[u8]) -> u32 {
        u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]])
    }

    #[test]
    fn sql_frame() {
        let mut buf = BytesMut::new();
        write_sql(&mut buf, "SELECT 1", &[]).unwrap();
        assert_eq!(&buf[..], b"Q\0\0\0\x0fSELECT 1\0\0\0");

        let mut buf = BytesMut::new();
        write_sql(&mut buf, "?", &[Value::Int(1), Value::Null]).unwrap();
        assert_eq!(&buf[..], b"Q\0\0\0\x12?\0\0\x02i\0\0\0\0\0\0\0\x01N");
    }

    #[test]
    fn delete_frame() {
        let mut buf = BytesMut::new();
        let target = Target::table("db", "t");
        let filter = parse("a", DataModel::Table).unwrap();
        write_delete(&mut buf, &target, Some(&filter), None, None, &Params::new()).unwrap();
        assert_eq!(&buf[..], b"D\0\0\0\x15Tdb\0t\0\x01C\0\0a\0\0\0\0\0\0");
        assert_eq!(frame_len(&buf) as usize, buf.len() - 1);
    }

    #[test]
    fn frames_are_appended() {
        let mut buf = BytesMut::new();
        write_sql(&mut buf, "A", &[]).unwrap();
        let first = buf.len();
        write_sql(&mut buf, "B", &[]).unwrap();
        assert_eq!(frame_len(&buf[first..]) as usize, buf.len() - first - 1);
        assert_eq!(buf[first], SQL);
    }

    #[test]
    fn insert_frame() {
        let rows = vec![(1, "a").into_row(), (2, "b").into_row()];
        let names = ["id".to_owned(), "name".to_owned()];

        let mut buf = BytesMut::new();
        let target = Target::table("db", "t");
        write_insert(&mut buf, &target, &mut RowCursor::new(&rows), Some(&ColumnList(&names))).unwrap();

        let body = &buf[5..];
        let expected: &[u8] = &[
            b"Tdb\0t\0".as_slice(),
            b"\x01\0\0\0\x02id\0name\0",
            b"\0\0\0\x02",
            b"[i\0\0\0\0\0\0\0\x01s\0\0\0\x01a]",
            b"[i\0\0\0\0\0\0\0\x02s\0\0\0\x01b]",
        ]
        .concat();
        assert_eq!(body, expected);
    }

    #[test]
    fn width_mismatch_truncates() {
        let mut buf = BytesMut::new();
        write_sql(&mut buf, "SELECT 1", &[]).unwrap();
        let before = buf.clone();

        let rows = vec![(1, 2).into_row(), Row::new().with(3)];
        let target = Target::table("db", "t");
        let err = write_insert(&mut buf, &target, &mut RowCursor::new(&rows), None).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Row(1)));
        assert_eq!(buf, before);
    }

    #[test]
    fn oversized_param_list_truncates() {
        let mut buf = BytesMut::new();
        write_sql(&mut buf, "SELECT 1", &[]).unwrap();
        let before = buf.clone();

        let params = (0..70_000).map(Value::Int).collect::<Vec<_>>();
        let err = write_sql(&mut buf, "?", &params).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Param("?".into())));
        assert_eq!(buf, before);

        // exactly at the limit still fits
        write_sql(&mut buf, "?", &params[..usize::from(u16::MAX)]).unwrap();
        assert_eq!(frame_len(&buf[before.len()..]) as usize, buf.len() - before.len() - 1);
    }

    #[test]
    fn oversized_order_truncates() {
        let term = OrderTerm { expr: parse("a", DataModel::Table).unwrap(), direction: Direction::Asc };
        let order = vec![term; 70_000];

        let mut buf = BytesMut::new();
        let target = Target::table("db", "t");
        let err = write_delete(&mut buf, &target, None, Some(&order), None, &Params::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::OrderBy(65_535)));
        assert!(buf.is_empty());
    }

    #[test]
    fn update_malformed_key_truncates() {
        let mut map = BTreeMap::new();
        map.insert("a".to_owned(), Assignment { op: ModifyOp::Set, value: Some(Expr::value(1)) });
        map.insert("b..c".to_owned(), Assignment { op: ModifyOp::Set, value: Some(Expr::value(2)) });

        let mut buf = BytesMut::new();
        let target = Target::table("db", "t");
        let mut set = SetCursor::new(&map, DataModel::Table);
        let err = write_update(&mut buf, &target, None, &mut set, None, None, &Params::new()).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Set("b..c".into())));
        assert!(buf.is_empty());
    }

    #[test]
    fn select_clauses() {
        let mut params = Params::new();
        params.bind("min", 1u8);
        let order = [OrderTerm { expr: parse("a", DataModel::Document).unwrap(), direction: Direction::Desc }];
        let limit = Limit { row_count: 5, offset: 2 };

        let mut buf = BytesMut::new();
        let target = Target::collection("db", "c");
        write_select(&mut buf, &target, None, None, Some(&order), Some(&limit), &params).unwrap();

        let body = &buf[5..];
        let expected: &[u8] = &[
            b"Ddb\0c\0".as_slice(),
            b"\0\0",
            b"\x01\0\x01$\0\x01ma\0\x01",
            b"\x01\0\0\0\0\0\0\0\x05\0\0\0\0\0\0\0\x02",
            b"\0\x01min\0u\0\0\0\0\0\0\0\x01",
        ]
        .concat();
        assert_eq!(body, expected);
    }
}
