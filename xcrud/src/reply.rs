//! Handle to the outcome of an executed statement.
use std::{
    future::poll_fn,
    task::{Context, Poll, ready},
};

use crate::{
    Result,
    diagnostic::{Completion, Diagnostic},
    error::ExecutionError,
    session::PendingReply,
};

/// Result of [`Statement::execute`][crate::Statement::execute].
///
/// Wraps the session [`PendingReply`], and keeps the failure diagnostic
/// once the command fails.
#[derive(Debug)]
pub struct Reply<R> {
    inner: R,
    state: ReplyState,
}

#[derive(Debug)]
enum ReplyState {
    Pending,
    Complete,
    Failed(Diagnostic),
}

impl<R: PendingReply> Reply<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self { inner, state: ReplyState::Pending }
    }

    /// Poll until the command completes.
    ///
    /// Polling again after completion returns the same outcome.
    pub fn poll_complete(&mut self, cx: &mut Context) -> Poll<Result<()>> {
        match &self.state {
            ReplyState::Pending => {}
            ReplyState::Complete => return Poll::Ready(Ok(())),
            ReplyState::Failed(diag) => {
                return Poll::Ready(Err(ExecutionError::new(diag.clone()).into()));
            }
        }

        match ready!(self.inner.poll_complete(cx)) {
            Ok(()) => {
                self.state = ReplyState::Complete;
                Poll::Ready(Ok(()))
            }
            Err(err) => {
                let diag = match err.diagnostic() {
                    Some(diag) => diag.clone(),
                    None => Diagnostic::error(0, err.to_string()),
                };
                #[cfg(feature = "log")]
                log::error!("{diag}");
                self.state = ReplyState::Failed(diag);
                Poll::Ready(Err(err))
            }
        }
    }

    /// Wait for the command to complete.
    pub async fn wait(&mut self) -> Result<&Completion> {
        poll_fn(|cx| self.poll_complete(cx)).await?;
        match self.inner.completion() {
            Some(completion) => Ok(completion),
            None => Err(ExecutionError::session("reply completed without outcome").into()),
        }
    }

    /// Returns `true` if the command completed, successfully or not.
    pub fn is_complete(&self) -> bool {
        !matches!(self.state, ReplyState::Pending)
    }

    /// Completion info, `None` until successfully completed.
    pub fn completion(&self) -> Option<&Completion> {
        match self.state {
            ReplyState::Complete => self.inner.completion(),
            _ => None,
        }
    }

    /// Number of rows affected by the command.
    pub fn affected_rows(&self) -> Option<u64> {
        self.completion().map(|c| c.affected_rows)
    }

    /// Diagnostics reported for this command so far.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        let failed = match &self.state {
            ReplyState::Failed(diag) => Some(diag),
            _ => None,
        };
        let reported = self.completion().map(|c| &c.diagnostics[..]).unwrap_or_default();
        reported.iter().chain(failed)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}
