use crate::domain::command::{OrderCommand, WorkflowState};
use crate::error::Result;
use tracing::{info, warn};

/// Sequences reversible commands and owns the undo/redo stacks.
///
/// One global stack serves every entity in the process: an undo touching
/// order A can interleave freely with executes touching order B. The stacks
/// are bounded; evicted commands are permanently unrecoverable.
pub struct CommandInvoker {
    undo_stack: Vec<Box<dyn OrderCommand>>,
    redo_stack: Vec<Box<dyn OrderCommand>>,
    max_history: usize,
}

impl Default for CommandInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandInvoker {
    pub const DEFAULT_HISTORY_LIMIT: usize = 50;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_history: limit,
        }
    }

    /// Runs the command, pushes it onto the undo stack (evicting the oldest
    /// entry past the cap) and clears the redo stack.
    pub fn execute(
        &mut self,
        mut command: Box<dyn OrderCommand>,
        state: &mut WorkflowState,
    ) -> Result<()> {
        command.execute(state)?;
        info!(command = %command.description(), "command executed");

        self.undo_stack.push(command);
        if self.undo_stack.len() > self.max_history {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
        Ok(())
    }

    /// Reverts the most recent command. Returns false (and changes nothing)
    /// when there is nothing to undo.
    pub fn undo(&mut self, state: &mut WorkflowState) -> Result<bool> {
        let Some(mut command) = self.undo_stack.pop() else {
            warn!("nothing to undo");
            return Ok(false);
        };
        command.undo(state)?;
        info!(command = %command.description(), "command undone");
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Re-applies the most recently undone command. Returns false when the
    /// redo stack is empty.
    pub fn redo(&mut self, state: &mut WorkflowState) -> Result<bool> {
        let Some(mut command) = self.redo_stack.pop() else {
            warn!("nothing to redo");
            return Ok(false);
        };
        command.execute(state)?;
        info!(command = %command.description(), "command redone");
        self.undo_stack.push(command);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Descriptions of the executed commands, oldest first.
    pub fn command_history(&self) -> Vec<String> {
        self.undo_stack.iter().map(|c| c.description()).collect()
    }

    pub fn last_command(&self) -> Option<String> {
        self.undo_stack.last().map(|c| c.description())
    }

    pub fn clear_history(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}
