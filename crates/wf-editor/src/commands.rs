//! Undo/Redo command stack.
//!
//! Every command holds the workflow snapshots from before and after it
//! ran. Snapshots are `Arc` clones of the two stores, so recording one is
//! O(1) and undo/redo just swaps them back in.
//!
//! Drag gestures are **batched**: `begin_batch` captures the snapshot at
//! gesture start, every `UpdatePosition` tick is applied live, and
//! `end_batch` pushes one command covering the whole gesture.

use crate::engine::{GraphMutation, MutationOutcome, WorkflowEngine};
use wf_core::WorkflowSnapshot;

#[derive(Debug, Clone)]
pub struct Command {
    pub before: WorkflowSnapshot,
    pub after: WorkflowSnapshot,
    pub description: String,
}

/// Manages undo/redo stacks with batch grouping for drag gestures.
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Batch nesting depth (0 = not batching).
    batch_depth: usize,
    /// Snapshot captured at the start of the outermost batch.
    batch_snapshot: Option<WorkflowSnapshot>,
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth.min(256)),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch_snapshot: None,
        }
    }

    /// Start a batch group. Mutations until the matching `end_batch()`
    /// are applied live but recorded as one undo step.
    pub fn begin_batch(&mut self, engine: &WorkflowEngine) {
        if self.batch_depth == 0 {
            self.batch_snapshot = Some(engine.snapshot());
        }
        self.batch_depth += 1;
    }

    /// End a batch group. When the outermost batch closes and the stores
    /// changed, push one command.
    pub fn end_batch(&mut self, engine: &WorkflowEngine, description: &str) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0
            && let Some(before) = self.batch_snapshot.take()
        {
            self.push(before, engine.snapshot(), description);
        }
    }

    pub fn is_batching(&self) -> bool {
        self.batch_depth > 0
    }

    /// Apply a mutation and record it.
    pub fn execute(&mut self, engine: &mut WorkflowEngine, mutation: GraphMutation) -> MutationOutcome {
        let description = mutation.describe();
        self.record(engine, description, |engine| engine.apply(mutation))
    }

    /// Run any sequence of engine calls as one undoable step.
    pub fn record<T>(
        &mut self,
        engine: &mut WorkflowEngine,
        description: &str,
        edit: impl FnOnce(&mut WorkflowEngine) -> T,
    ) -> T {
        if self.batch_depth > 0 {
            // The snapshot taken at begin_batch() covers this edit.
            return edit(engine);
        }
        let before = engine.snapshot();
        let result = edit(engine);
        self.push(before, engine.snapshot(), description);
        result
    }

    fn push(&mut self, before: WorkflowSnapshot, after: WorkflowSnapshot, description: &str) {
        // Untouched stores are the same allocations: nothing to record.
        if before.ptr_eq(&after) {
            return;
        }
        self.undo_stack.push(Command {
            before,
            after,
            description: description.to_string(),
        });
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command. Returns its description.
    ///
    /// Refused while a batch is open: the batch's start snapshot would no
    /// longer describe the state its command is pushed over.
    pub fn undo(&mut self, engine: &mut WorkflowEngine) -> Option<String> {
        if self.is_batching() {
            log::debug!("undo ignored: batch open");
            return None;
        }
        let cmd = self.undo_stack.pop()?;
        engine.restore(cmd.before.clone());
        let desc = cmd.description.clone();
        self.redo_stack.push(cmd);
        log::debug!("undo: {desc}");
        Some(desc)
    }

    /// Redo the last undone command. Refused while a batch is open.
    pub fn redo(&mut self, engine: &mut WorkflowEngine) -> Option<String> {
        if self.is_batching() {
            log::debug!("redo ignored: batch open");
            return None;
        }
        let cmd = self.redo_stack.pop()?;
        engine.restore(cmd.after.clone());
        let desc = cmd.description.clone();
        self.undo_stack.push(cmd);
        log::debug!("redo: {desc}");
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Forget all history (after loading a new document).
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.batch_depth = 0;
        self.batch_snapshot = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wf_core::{Node, NodeId, Position};

    fn engine() -> WorkflowEngine {
        let mut engine = WorkflowEngine::default();
        engine.add_node(Node::new(NodeId::intern("box"), "http", "Box", Position::new(0.0, 0.0)));
        engine
    }

    fn position(engine: &WorkflowEngine) -> Position {
        engine.workflow().node(NodeId::intern("box")).unwrap().position
    }

    #[test]
    fn undo_redo_move() {
        let mut engine = engine();
        let mut stack = CommandStack::new(100);

        stack.execute(
            &mut engine,
            GraphMutation::UpdatePosition {
                id: NodeId::intern("box"),
                position: Position::new(50.0, 30.0),
            },
        );
        assert_eq!(position(&engine), Position::new(50.0, 30.0));

        assert_eq!(stack.undo(&mut engine), Some("Move node".to_string()));
        assert_eq!(position(&engine), Position::new(0.0, 0.0));

        assert_eq!(stack.redo(&mut engine), Some("Move node".to_string()));
        assert_eq!(position(&engine), Position::new(50.0, 30.0));
    }

    #[test]
    fn redo_clears_on_new_action() {
        let mut engine = engine();
        let mut stack = CommandStack::new(100);
        let id = NodeId::intern("box");

        stack.execute(&mut engine, GraphMutation::Lock { id });
        stack.undo(&mut engine);
        assert!(stack.can_redo());

        stack.execute(&mut engine, GraphMutation::ToggleDisabled { id });
        assert!(!stack.can_redo());
    }

    #[test]
    fn max_depth_trims_oldest() {
        let mut engine = engine();
        let mut stack = CommandStack::new(3);

        for i in 0..5 {
            stack.execute(
                &mut engine,
                GraphMutation::UpdatePosition {
                    id: NodeId::intern("box"),
                    position: Position::new(i as f64 + 1.0, 0.0),
                },
            );
        }
        let mut undo_count = 0;
        while stack.undo(&mut engine).is_some() {
            undo_count += 1;
        }
        assert_eq!(undo_count, 3);
        assert_eq!(position(&engine), Position::new(2.0, 0.0));
    }

    #[test]
    fn no_op_is_not_recorded() {
        let mut engine = engine();
        let mut stack = CommandStack::new(100);
        stack.execute(
            &mut engine,
            GraphMutation::RemoveNode {
                id: NodeId::intern("missing"),
            },
        );
        assert!(!stack.can_undo());
    }

    #[test]
    fn batch_undo_is_single_step() {
        let mut engine = engine();
        let mut stack = CommandStack::new(100);

        // Simulate a drag gesture: begin_batch, 5 ticks, end_batch
        stack.begin_batch(&engine);
        for i in 1..=5 {
            stack.execute(
                &mut engine,
                GraphMutation::UpdatePosition {
                    id: NodeId::intern("box"),
                    position: Position::new(i as f64 * 10.0, i as f64 * 5.0),
                },
            );
        }
        stack.end_batch(&engine, "Drag");

        assert_eq!(stack.undo(&mut engine), Some("Drag".to_string()));
        assert_eq!(position(&engine), Position::new(0.0, 0.0));
        assert!(!stack.can_undo());

        stack.redo(&mut engine);
        assert_eq!(position(&engine), Position::new(50.0, 25.0));
    }

    #[test]
    fn empty_batch_no_undo_entry() {
        let engine = engine();
        let mut stack = CommandStack::new(100);

        stack.begin_batch(&engine);
        stack.end_batch(&engine, "Drag");

        assert!(!stack.can_undo());
    }
}
