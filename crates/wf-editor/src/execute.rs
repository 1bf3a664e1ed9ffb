//! Execution trigger: run one node's script in isolation.
//!
//! The engine does not interpret scripts. It hands `data.code` and
//! `data.input` to an injected [`CodeRunner`] (a JS `Function` in the
//! browser, a sandboxed interpreter or subprocess elsewhere) and reports
//! the result. Failures are logged and returned, never propagated, and the
//! workflow is only borrowed immutably. Ordering across nodes, retries,
//! and passing outputs downstream belong to a workflow execution service.

use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use wf_core::{NodeId, Workflow};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecError {
    /// The script could not be turned into a callable.
    #[error("failed to compile node code: {0}")]
    Compile(String),

    /// The script threw while running.
    #[error("node code raised: {0}")]
    Runtime(String),

    #[error("code runner panicked: {0}")]
    Panicked(String),
}

/// Construct-and-call capability: build a function from `code` with a
/// single parameter named `input`, and call it with `input`.
pub trait CodeRunner {
    fn run(&self, code: &str, input: &Value) -> Result<Value, ExecError>;
}

impl<F> CodeRunner for F
where
    F: Fn(&str, &Value) -> Result<Value, ExecError>,
{
    fn run(&self, code: &str, input: &Value) -> Result<Value, ExecError> {
        self(code, input)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// Node missing, or it has no code.
    Skipped,
    Completed(Value),
    Failed(ExecError),
}

impl ExecOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

pub fn execute_node(workflow: &Workflow, id: NodeId, runner: &dyn CodeRunner) -> ExecOutcome {
    let Some(node) = workflow.node(id) else {
        log::trace!("execute {id}: no such node");
        return ExecOutcome::Skipped;
    };
    let Some(code) = node.data.code() else {
        log::trace!("execute {id}: no code");
        return ExecOutcome::Skipped;
    };
    let input = node.data.input().cloned().unwrap_or(Value::Null);

    let result = panic::catch_unwind(AssertUnwindSafe(|| runner.run(code, &input)))
        .unwrap_or_else(|payload| Err(ExecError::Panicked(panic_message(payload.as_ref()))));

    match result {
        Ok(value) => {
            log::debug!("execute {id} ({}): completed", node.name);
            ExecOutcome::Completed(value)
        }
        Err(err) => {
            log::error!("execute {id} ({}): {err}", node.name);
            ExecOutcome::Failed(err)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
