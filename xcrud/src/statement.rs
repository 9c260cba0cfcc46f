//! The [`Statement`] handle.
use std::fmt;

use crate::{
    Result,
    common::{span, unit_error, verbose},
    config::Config,
    crud::{Insert, Remove, Select, Sql, Target, Update},
    diagnostic::{Completion, Diagnostic},
    error::ConfigError,
    expr::{DataModel, Expr, IntoExpr},
    protocol::ModifyOp,
    reply::Reply,
    row::IntoRow,
    session::Session,
    value::Encode,
};

unit_error! {
    /// Diagnostics requested before the statement was executed.
    pub struct NotExecuted("statement has not been executed");
}

/// Lifecycle state of a [`Statement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    /// Nothing configured yet.
    Created,
    /// At least one configuration operation succeeded.
    Configuring,
    /// Command handed to the session.
    ResultReady,
}

/// Operation kind of a [`Statement`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Insert,
    Select,
    Update,
    Remove,
    Sql,
}

#[derive(Debug)]
enum Operation {
    Insert(Insert),
    Select(Select),
    Update(Update),
    Remove(Remove),
    Sql(Sql),
}

impl Operation {
    fn kind(&self) -> Kind {
        match self {
            Operation::Insert(_) => Kind::Insert,
            Operation::Select(_) => Kind::Select,
            Operation::Update(_) => Kind::Update,
            Operation::Remove(_) => Kind::Remove,
            Operation::Sql(_) => Kind::Sql,
        }
    }

    fn target(&self) -> Option<&Target> {
        match self {
            Operation::Insert(op) => Some(op.target()),
            Operation::Select(op) => Some(op.target()),
            Operation::Update(op) => Some(op.target()),
            Operation::Remove(op) => Some(op.target()),
            Operation::Sql(_) => None,
        }
    }

    fn model(&self) -> Option<DataModel> {
        self.target().map(Target::model)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let document = self.model() == Some(DataModel::Document);
        f.write_str(match (self.kind(), document) {
            (Kind::Insert, false) => "insert",
            (Kind::Insert, true) => "add",
            (Kind::Select, false) => "select",
            (Kind::Select, true) => "find",
            (Kind::Update, false) => "update",
            (Kind::Update, true) => "modify",
            (Kind::Remove, false) => "delete",
            (Kind::Remove, true) => "remove",
            (Kind::Sql, _) => "sql",
        })
    }
}

/// Match the operation against the given kinds, or fail with unsupported
/// operation error naming `$op`.
macro_rules! on {
    ($self:ident, $op:literal, $($pat:pat $(if $guard:expr)? => $body:expr),* $(,)?) => {{
        let result = match &mut $self.op {
            $($pat $(if $guard)? => $body,)*
            #[allow(unreachable_patterns)]
            other => Err(ConfigError::unsupported($op, &*other).into()),
        };
        $self.configured(result)
    }};
}

/// A single CRUD operation against a [`Session`].
///
/// Statement owns the operation configuration and the outcome of its
/// latest execution. Configuration can be changed after execution, the
/// next execution sends the updated command.
///
/// # Example
///
/// ```no_run
/// # async fn app(session: impl xcrud::Session) -> xcrud::Result<()> {
/// use xcrud::{Statement, Target};
///
/// let mut stmt = Statement::select(session, Target::table("shop", "products"));
/// stmt.set_where("price > :min")?;
/// stmt.add_order_by("price DESC")?;
/// stmt.set_limit(10, 0)?;
/// stmt.bind("min", 100)?;
///
/// if let Some(reply) = stmt.execute()? {
///     reply.wait().await?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Statement<S: Session> {
    session: S,
    config: Config,
    op: Operation,
    state: State,
    executed: bool,
    diag: Vec<Diagnostic>,
    reply: Option<Reply<S::Reply>>,
}

impl<S: Session> Statement<S> {
    fn new(session: S, op: Operation) -> Self {
        Self {
            session,
            config: Config::default(),
            op,
            state: State::Created,
            executed: false,
            diag: vec![],
            reply: None,
        }
    }

    /// Insert rows into a table, or add documents into a collection.
    pub fn insert(session: S, target: Target) -> Self {
        Self::new(session, Operation::Insert(Insert::new(target)))
    }

    /// Select rows from a table, or find documents in a collection.
    pub fn select(session: S, target: Target) -> Self {
        Self::new(session, Operation::Select(Select::new(target)))
    }

    /// Update rows in a table, or modify documents in a collection.
    pub fn update(session: S, target: Target) -> Self {
        Self::new(session, Operation::Update(Update::new(target)))
    }

    /// Delete rows from a table, or remove documents from a collection.
    pub fn remove(session: S, target: Target) -> Self {
        Self::new(session, Operation::Remove(Remove::new(target)))
    }

    /// Raw sql text with positional `?` parameters.
    pub fn sql(session: S, text: impl Into<String>) -> Self {
        Self::new(session, Operation::Sql(Sql::new(text)))
    }

    /// Replace statement configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    fn configured(&mut self, result: Result<()>) -> Result<()> {
        if result.is_ok() {
            self.state = State::Configuring;
        }
        result
    }

    // ===== Insert =====

    /// Append a row to an insert.
    pub fn add_row(&mut self, row: impl IntoRow) -> Result<()> {
        on!(self, "add_row", Operation::Insert(op) => op.add_row(row))
    }

    /// Append column names to an insert.
    pub fn add_columns<I>(&mut self, columns: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        on!(self, "add_columns", Operation::Insert(op) => op.add_columns(columns))
    }

    /// Append a document to an add.
    pub fn add_document(&mut self, document: Expr) -> Result<()> {
        on!(self, "add_document", Operation::Insert(op) => op.add_document(document))
    }

    /// Parse json object text and append it as a document.
    #[cfg(feature = "json")]
    pub fn add_document_json(&mut self, json: &str) -> Result<()> {
        use crate::error::Clause;

        on!(self, "add_document", Operation::Insert(op) => {
            match Expr::from_json(json) {
                Ok(document) => op.add_document(document),
                Err(err) => {
                    let clause = Clause::Document(op.rows().len());
                    Err(ConfigError::new(clause, err.to_string()).into())
                }
            }
        })
    }

    // ===== Select =====

    /// Parse and append a projection element, `<expr> [AS alias]`.
    pub fn add_projection(&mut self, text: &str) -> Result<()> {
        on!(self, "add_projection", Operation::Select(op) => op.add_projection(text))
    }

    // ===== Filter, order and limit =====

    /// Parse and set the filter, replacing any previous one.
    pub fn set_where(&mut self, text: &str) -> Result<()> {
        on!(
            self, "set_where",
            Operation::Select(op) => op.set_where(text),
            Operation::Update(op) => op.set_where(text),
            Operation::Remove(op) => op.set_where(text),
        )
    }

    /// Set limit, replacing any previous one.
    ///
    /// Update and remove only support a zero offset.
    pub fn set_limit(&mut self, row_count: u64, offset: u64) -> Result<()> {
        on!(
            self, "set_limit",
            Operation::Select(op) => op.set_limit(row_count, offset),
            Operation::Update(op) => op.set_limit(row_count, offset),
            Operation::Remove(op) => op.set_limit(row_count, offset),
        )
    }

    /// Parse and append an order term, `<expr> [ASC|DESC]`.
    pub fn add_order_by(&mut self, text: &str) -> Result<()> {
        on!(
            self, "add_order_by",
            Operation::Select(op) => op.add_order_by(text),
            Operation::Update(op) => op.add_order_by(text),
            Operation::Remove(op) => op.add_order_by(text),
        )
    }

    /// Replace order terms, no term is applied if any fails to parse.
    pub fn set_order_by<'a>(&mut self, terms: impl IntoIterator<Item = &'a str>) -> Result<()> {
        on!(
            self, "set_order_by",
            Operation::Select(op) => op.set_order_by(terms),
            Operation::Update(op) => op.set_order_by(terms),
            Operation::Remove(op) => op.set_order_by(terms),
        )
    }

    pub fn clear_order_by(&mut self) -> Result<()> {
        on!(
            self, "clear_order_by",
            Operation::Select(op) => { op.clear_order_by(); Ok(()) },
            Operation::Update(op) => { op.clear_order_by(); Ok(()) },
            Operation::Remove(op) => { op.clear_order_by(); Ok(()) },
        )
    }

    // ===== Update =====

    /// Assign a value to a column, replacing previous assignment of the same column.
    pub fn set_value(&mut self, column: impl Into<String>, value: impl IntoExpr) -> Result<()> {
        on!(
            self, "set_value",
            Operation::Update(op) if op.target().model() == DataModel::Table => {
                op.set_value(column, value);
                Ok(())
            }
        )
    }

    /// Parse and assign an expression to a column.
    pub fn set_expr(&mut self, column: impl Into<String>, text: &str) -> Result<()> {
        on!(
            self, "set_expr",
            Operation::Update(op) if op.target().model() == DataModel::Table => {
                op.set_expr(column, text)
            }
        )
    }

    /// Add a document modification.
    pub fn modify(&mut self, op: ModifyOp, path: impl Into<String>, value: Option<Expr>) -> Result<()> {
        on!(
            self, "modify",
            Operation::Update(update) if update.target().model() == DataModel::Document => {
                update.modify(op, path, value)
            }
        )
    }

    // ===== Parameters =====

    /// Bind value to placeholder `:name`, rebinding overwrites.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Encode) -> Result<()> {
        on!(
            self, "bind",
            Operation::Select(op) => { op.bind(name, value); Ok(()) },
            Operation::Update(op) => { op.bind(name, value); Ok(()) },
            Operation::Remove(op) => { op.bind(name, value); Ok(()) },
        )
    }

    /// Bind the next `?` placeholder of a sql statement.
    pub fn bind_positional(&mut self, value: impl Encode) -> Result<()> {
        on!(self, "bind_positional", Operation::Sql(op) => { op.bind(value); Ok(()) })
    }

    // ===== Execution =====

    /// Send the command to the session.
    ///
    /// Returns `None` for an insert without rows, in which case the session
    /// is not contacted. Any reply of a previous execution is dropped.
    pub fn execute(&mut self) -> Result<Option<&mut Reply<S::Reply>>> {
        span!("execute", op = %self.op);

        if let Some(_prev) = self.reply.take() {
            #[cfg(feature = "log")]
            if !_prev.is_complete() {
                log::debug!("{} reply discarded before completion", self.op);
            }
        }

        self.diag.clear();
        self.executed = true;

        let sent = match &self.op {
            Operation::Insert(op) => op.send(&mut self.session),
            Operation::Select(op) => op.send(&mut self.session).map(Some),
            Operation::Update(op) => op.send(&mut self.session).map(Some),
            Operation::Remove(op) => op.send(&mut self.session).map(Some),
            Operation::Sql(op) => op.send(&mut self.session).map(Some),
        };

        match sent {
            Ok(reply) => {
                verbose!(sent = reply.is_some(), "executed");
                self.state = State::ResultReady;
                self.reply = reply.map(Reply::new);
                Ok(self.reply.as_mut())
            }
            Err(err) => {
                #[cfg(feature = "log")]
                log::error!("{} failed: {err}", self.op);
                let diag = match err.diagnostic() {
                    Some(diag) => diag.clone(),
                    None => Diagnostic::error(0, err.to_string()),
                };
                self.diag.push(diag);
                Err(err)
            }
        }
    }

    /// Wait for the reply of the latest execution.
    ///
    /// Returns `None` if the latest execution sent nothing.
    pub async fn wait(&mut self) -> Result<Option<&Completion>> {
        if !self.executed {
            return Err(NotExecuted.into());
        }
        match &mut self.reply {
            Some(reply) => reply.wait().await.map(Some),
            None => Ok(None),
        }
    }

    /// Diagnostics of the latest execution, at or above the configured
    /// minimum severity.
    pub fn diagnostics(&self) -> Result<Vec<Diagnostic>> {
        if !self.executed {
            return Err(NotExecuted.into());
        }
        let reported = self.reply.iter().flat_map(Reply::diagnostics);
        Ok(self
            .diag
            .iter()
            .chain(reported)
            .filter(|d| d.severity >= self.config.min_severity)
            .cloned()
            .collect())
    }

    /// Reply of the latest execution.
    pub fn reply(&mut self) -> Option<&mut Reply<S::Reply>> {
        self.reply.as_mut()
    }

    /// Take the reply of the latest execution out of the statement.
    ///
    /// Diagnostics the reply already carries remain in
    /// [`diagnostics`][Statement::diagnostics]. Diagnostics arriving after
    /// this call are only reported by the returned [`Reply`].
    pub fn take_reply(&mut self) -> Option<Reply<S::Reply>> {
        let reply = self.reply.take()?;
        self.diag.extend(reply.diagnostics().cloned());
        Some(reply)
    }

    /// Drop the reply of the latest execution.
    pub fn discard_reply(&mut self) {
        self.reply = None;
    }

    // ===== Accessors =====

    pub fn state(&self) -> State {
        self.state
    }

    pub fn kind(&self) -> Kind {
        self.op.kind()
    }

    /// Target of the operation, `None` for sql statement.
    pub fn target(&self) -> Option<&Target> {
        self.op.target()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Consume statement, returning the session.
    pub fn into_session(self) -> S {
        self.session
    }
}

impl<S: Session> fmt::Debug for Statement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("op", &self.op)
            .field("state", &self.state)
            .field("executed", &self.executed)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        diagnostic::Severity,
        error::{Clause, ErrorKind},
        session::test::Recorder,
    };

    #[test]
    fn state_machine() {
        let mut stmt = Statement::select(Recorder::default(), Target::table("db", "t"));
        assert_eq!(stmt.state(), State::Created);
        assert!(stmt.set_where("(").is_err());
        assert_eq!(stmt.state(), State::Created);
        stmt.set_where("a > 1").unwrap();
        assert_eq!(stmt.state(), State::Configuring);
        stmt.execute().unwrap().unwrap();
        assert_eq!(stmt.state(), State::ResultReady);
        stmt.set_limit(1, 0).unwrap();
        assert_eq!(stmt.state(), State::Configuring);
    }

    #[test]
    fn unsupported_operation() {
        let mut stmt = Statement::select(Recorder::default(), Target::table("db", "t"));
        let err = stmt.add_row((1,)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Config(e) if e.clause() == &Clause::Operation("add_row")));
        assert_eq!(err.to_string().lines().next(), Some("invalid `add_row` operation: not supported by select statement"));

        let mut stmt = Statement::update(Recorder::default(), Target::collection("db", "c"));
        let err = stmt.set_value("a", 1).unwrap_err();
        assert!(err.to_string().contains("not supported by modify statement"));

        let mut stmt = Statement::sql(Recorder::default(), "SELECT 1");
        assert!(stmt.set_where("a").is_err());
        stmt.bind_positional(1).unwrap();
    }

    #[test]
    fn diagnostics_before_execute() {
        let stmt = Statement::remove(Recorder::default(), Target::table("db", "t"));
        let err = stmt.diagnostics().unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotExecuted(_)));
    }

    #[test]
    fn empty_insert_is_noop() {
        let mut stmt = Statement::insert(Recorder::default(), Target::table("db", "t"));
        assert!(stmt.execute().unwrap().is_none());
        assert!(stmt.session().log.is_empty());
        assert_eq!(stmt.state(), State::ResultReady);
        assert!(stmt.diagnostics().unwrap().is_empty());
    }

    #[test]
    fn failed_execute_is_diagnosed() {
        let mut stmt = Statement::update(Recorder::default(), Target::table("db", "t"));
        assert!(stmt.execute().is_err());
        let diags = stmt.diagnostics().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Error);

        // next execution resets diagnostics
        stmt.set_value("a", 1).unwrap();
        stmt.execute().unwrap();
        assert!(stmt.diagnostics().unwrap().is_empty());
    }

    #[tokio::test]
    async fn severity_threshold() {
        let completion = Completion::affected(1)
            .with_diagnostic(Diagnostic::new(Severity::Info, 0, "rows matched: 1"))
            .with_diagnostic(Diagnostic::warning(1265, "data truncated"));
        let session = Recorder { outcomes: vec![Ok(completion)], ..Default::default() };

        let config = Config::default().min_severity(Severity::Warning);
        let mut stmt = Statement::remove(session, Target::table("db", "t")).with_config(config);
        stmt.execute().unwrap();
        assert!(stmt.diagnostics().unwrap().is_empty());

        assert_eq!(stmt.wait().await.unwrap().unwrap().affected_rows, 1);
        let diags = stmt.diagnostics().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, 1265);
    }

    #[tokio::test]
    async fn execute_drops_previous_reply() {
        let session = Recorder {
            outcomes: vec![Err(Diagnostic::error(1146, "table doesn't exist")), Ok(Completion::affected(3))],
            ..Default::default()
        };
        let mut stmt = Statement::remove(session, Target::table("db", "t"));
        stmt.execute().unwrap();
        assert!(stmt.wait().await.is_err());
        assert_eq!(stmt.diagnostics().unwrap()[0].code, 1146);

        stmt.execute().unwrap();
        assert_eq!(stmt.wait().await.unwrap().unwrap().affected_rows, 3);
        assert!(stmt.diagnostics().unwrap().is_empty());
        assert_eq!(stmt.session().log.len(), 2);
    }

    #[tokio::test]
    async fn taken_reply_keeps_diagnostics() {
        let completion = Completion::affected(1).with_diagnostic(Diagnostic::warning(1265, "data truncated"));
        let session = Recorder { outcomes: vec![Ok(completion)], ..Default::default() };

        let config = Config::default().min_severity(Severity::Warning);
        let mut stmt = Statement::remove(session, Target::table("db", "t")).with_config(config);
        stmt.execute().unwrap();
        stmt.wait().await.unwrap();

        let reply = stmt.take_reply().unwrap();
        assert_eq!(reply.diagnostics().count(), 1);
        let diags = stmt.diagnostics().unwrap();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, 1265);

        // next execution starts clean
        stmt.execute().unwrap();
        assert!(stmt.diagnostics().unwrap().is_empty());
    }
}
