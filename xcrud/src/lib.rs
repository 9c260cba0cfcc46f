//! CRUD Command Builder
//!
//! Statements accumulate insert, select, update and remove configuration,
//! and hand it to a [`Session`] which pulls rows, columns and assignments
//! while encoding the command.
//!
//! # Examples
//!
//! Table insert:
//!
//! ```no_run
//! use xcrud::{Statement, Target, session::Pipeline};
//!
//! # async fn app() -> xcrud::Result<()> {
//! let mut pipeline = Pipeline::new();
//!
//! let mut stmt = Statement::insert(&mut pipeline, Target::table("shop", "products"));
//! stmt.add_columns(["id", "name"])?;
//! stmt.add_row((1, "Lamp"))?;
//! stmt.add_row((2, "Desk"))?;
//!
//! if let Some(reply) = stmt.execute()? {
//!     let completion = reply.wait().await?;
//!     assert_eq!(completion.affected_rows, 2);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Document modify:
//!
//! ```no_run
//! use xcrud::{Expr, ModifyOp, Statement, Target, session::Pipeline};
//!
//! # async fn app() -> xcrud::Result<()> {
//! let mut pipeline = Pipeline::new();
//!
//! let mut stmt = Statement::update(&mut pipeline, Target::collection("shop", "orders"));
//! stmt.set_where("status == :status")?;
//! stmt.bind("status", "pending")?;
//! stmt.modify(ModifyOp::Set, "$.status", Some(Expr::value("shipped")))?;
//! stmt.modify(ModifyOp::Unset, "$.draft", None)?;
//! stmt.execute()?;
//! drop(stmt);
//!
//! let frames = pipeline.take_outgoing();
//! assert_eq!(frames[0], xcrud::wire::UPDATE);
//! # Ok(())
//! # }
//! ```

mod common;
mod ext;

// Expression
mod value;
pub mod expr;
pub mod row;

// Protocol
pub mod protocol;
pub mod wire;

// Operation
pub mod crud;
pub mod session;
mod reply;
mod statement;

// Support
mod config;
mod diagnostic;
mod error;


pub use value::{Encode, Value};
pub use expr::{DataModel, Expr, IntoExpr};
pub use row::{IntoRow, Row};
pub use protocol::ModifyOp;

pub use crud::Target;
pub use session::{PendingReply, Session};
pub use reply::Reply;
pub use statement::{Kind, NotExecuted, State, Statement};

pub use config::Config;
pub use diagnostic::{Completion, Diagnostic, Severity};
pub use error::{Clause, ConfigError, Error, ErrorKind, ExecutionError, Result};
