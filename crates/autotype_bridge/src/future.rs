use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{FailureKind, Operation, WorkerError};

/// Result buffer of a fulfilled invocation, or its failure.
pub type OperationOutcome = Result<Vec<Value>, WorkerError>;

/// Eventual outcome of one worker invocation.
///
/// Resolves exactly once, after the worker's output stream has closed and the
/// process has been reaped. Dropping it does not cancel the worker; the
/// invocation still runs to completion in the background.
#[derive(Debug)]
pub struct OperationFuture {
    operation: Operation,
    state: State,
}

#[derive(Debug)]
enum State {
    Pending(JoinHandle<OperationOutcome>),
    Failed(Option<WorkerError>),
}

impl OperationFuture {
    /// Drives `task` on the current Tokio runtime.
    pub fn spawn<F>(operation: Operation, task: F) -> Self
    where
        F: Future<Output = OperationOutcome> + Send + 'static,
    {
        Self {
            operation,
            state: State::Pending(tokio::spawn(task)),
        }
    }

    /// An invocation that failed before any worker output existed.
    pub fn failed(error: WorkerError) -> Self {
        Self {
            operation: error.operation,
            state: State::Failed(Some(error)),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }
}

impl Future for OperationFuture {
    type Output = OperationOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let operation = self.operation;
        match &mut self.state {
            State::Pending(handle) => Pin::new(handle).poll(cx).map(|joined| {
                joined.unwrap_or_else(|err| {
                    Err(WorkerError::new(
                        operation,
                        FailureKind::Aborted,
                        format!("{operation} invocation was aborted: {err}"),
                    ))
                })
            }),
            State::Failed(error) => Poll::Ready(Err(error.take().unwrap_or_else(|| {
                WorkerError::new(
                    operation,
                    FailureKind::Aborted,
                    format!("{operation} outcome was already taken"),
                )
            }))),
        }
    }
}
