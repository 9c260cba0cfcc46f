use bytes::{Bytes, BytesMut};
use std::{
    collections::VecDeque,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::sync::oneshot;

use super::{PendingReply, Session};
use crate::{
    Result,
    common::verbose,
    crud::{Limit, Params, Target},
    diagnostic::{Completion, Diagnostic},
    error::ExecutionError,
    expr::{Expr, OrderTerm},
    protocol::{Columns, Projection, RowSource, UpdateSpec},
    value::Value,
    wire,
};

type Outcome = Result<Completion, Diagnostic>;

/// In-process [`Session`] which encodes commands with [`wire`] and
/// resolves replies in send order.
///
/// The transport is left to the caller: take the encoded frames with
/// [`take_outgoing`][Pipeline::take_outgoing], and feed each server
/// response back through [`complete`][Pipeline::complete] or
/// [`fail`][Pipeline::fail].
///
/// Dropping the pipeline fails every pending reply.
#[derive(Debug, Default)]
pub struct Pipeline {
    outgoing: BytesMut,
    pending: VecDeque<oneshot::Sender<Outcome>>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline::default()
    }

    /// Encoded frames not yet taken.
    pub fn outgoing(&self) -> &[u8] {
        &self.outgoing
    }

    /// Take encoded frames.
    pub fn take_outgoing(&mut self) -> Bytes {
        self.outgoing.split().freeze()
    }

    /// Number of commands waiting for a response.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Resolve the oldest pending command successfully.
    ///
    /// Returns `false` if there is no pending command.
    pub fn complete(&mut self, completion: Completion) -> bool {
        self.resolve(Ok(completion))
    }

    /// Resolve the oldest pending command with server error.
    ///
    /// Returns `false` if there is no pending command.
    pub fn fail(&mut self, diagnostic: Diagnostic) -> bool {
        self.resolve(Err(diagnostic))
    }

    fn resolve(&mut self, outcome: Outcome) -> bool {
        let Some(tx) = self.pending.pop_front() else {
            return false;
        };
        if tx.send(outcome).is_err() {
            verbose!("reply dropped before response");
        }
        true
    }

    fn queue(&mut self) -> PipelineReply {
        let (tx, rx) = oneshot::channel();
        self.pending.push_back(tx);
        verbose!(pending = self.pending.len(), "command queued");
        PipelineReply { rx, completion: None }
    }
}

impl Session for Pipeline {
    type Reply = PipelineReply;

    fn send_insert(
        &mut self,
        target: &Target,
        rows: &mut dyn RowSource,
        columns: Option<&dyn Columns>,
    ) -> Result<Self::Reply> {
        wire::write_insert(&mut self.outgoing, target, rows, columns)?;
        Ok(self.queue())
    }

    fn send_select(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        projection: Option<&dyn Projection>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        wire::write_select(&mut self.outgoing, target, filter, projection, order, limit, params)?;
        Ok(self.queue())
    }

    fn send_update(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        set: &mut dyn UpdateSpec,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        wire::write_update(&mut self.outgoing, target, filter, set, order, limit, params)?;
        Ok(self.queue())
    }

    fn send_delete(
        &mut self,
        target: &Target,
        filter: Option<&Expr>,
        order: Option<&[OrderTerm]>,
        limit: Option<&Limit>,
        params: &Params,
    ) -> Result<Self::Reply> {
        wire::write_delete(&mut self.outgoing, target, filter, order, limit, params)?;
        Ok(self.queue())
    }

    fn send_sql(&mut self, sql: &str, params: &[Value]) -> Result<Self::Reply> {
        wire::write_sql(&mut self.outgoing, sql, params)?;
        Ok(self.queue())
    }
}

/// [`PendingReply`] of a [`Pipeline`] command.
#[derive(Debug)]
pub struct PipelineReply {
    rx: oneshot::Receiver<Outcome>,
    completion: Option<Completion>,
}

impl PendingReply for PipelineReply {
    fn poll_complete(&mut self, cx: &mut Context) -> Poll<Result<()>> {
        if self.completion.is_some() {
            return Poll::Ready(Ok(()));
        }
        match ready!(Pin::new(&mut self.rx).poll(cx)) {
            Ok(Ok(completion)) => {
                self.completion = Some(completion);
                Poll::Ready(Ok(()))
            }
            Ok(Err(diagnostic)) => Poll::Ready(Err(ExecutionError::new(diagnostic).into())),
            Err(_) => Poll::Ready(Err(ExecutionError::session("session closed").into())),
        }
    }

    fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }
}
