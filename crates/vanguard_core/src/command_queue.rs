//! Per-unit command queue and the dequeue loop that feeds it to the state
//! machine.
//!
//! The loop runs once per tick before the unit's state step. It tracks two
//! flags about the head command:
//!
//! - `received`: the head has been dispatched to the state machine.
//! - `executed`: the state machine is done with the active command and the
//!   loop may move on.
//!
//! A received-and-executed head is popped and the next command dispatched.
//! An executed head that was never received (because an order was just
//! added or an interrupt inserted in front of it) is dispatched again
//! without popping. A lone guard order that has been received is never
//! popped: guard is a standing order, held until something supersedes it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::command::Command;

/// Queue of commands for a unit to execute.
///
/// Commands are executed in order. The front command is the active one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CommandQueue {
    commands: VecDeque<Command>,
}

impl CommandQueue {
    /// Create an empty command queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: VecDeque::new(),
        }
    }

    /// Add a command to the back of the queue.
    pub fn push(&mut self, command: Command) {
        self.commands.push_back(command);
    }

    /// Insert a command at `index`; indices past the end append.
    pub fn insert(&mut self, index: usize, command: Command) {
        let index = index.min(self.commands.len());
        self.commands.insert(index, command);
    }

    /// Get the current command being executed.
    #[must_use]
    pub fn current(&self) -> Option<&Command> {
        self.commands.front()
    }

    /// Get the command at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Command> {
        self.commands.get(index)
    }

    /// Remove and return the current command (when completed).
    pub fn pop(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    /// Clear all commands.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Check if the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get the number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Iterate over queued commands, head first.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }

    /// Whether the queue is exactly one guard order.
    #[must_use]
    pub fn is_lone_guard(&self) -> bool {
        self.commands.len() == 1 && self.commands.front().is_some_and(Command::is_guard)
    }
}

/// What the dequeue loop decided this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dequeue {
    /// Nothing to do.
    Wait,
    /// Hand this command to the state machine.
    Dispatch(Command),
    /// A stop emptied the queue; fall back to idle.
    Idle,
    /// The unit is dead; the loop has ended for good.
    Finished,
}

/// Flags of the dequeue loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeueLoop {
    received: bool,
    executed: bool,
    stop_pending: bool,
    finished: bool,
}

impl Default for DequeueLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl DequeueLoop {
    /// A fresh loop: nothing received, ready to dispatch.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            received: false,
            executed: true,
            stop_pending: false,
            finished: false,
        }
    }

    /// The head has been dispatched to the state machine.
    #[must_use]
    pub const fn received(&self) -> bool {
        self.received
    }

    /// The state machine is done with the active command.
    #[must_use]
    pub const fn executed(&self) -> bool {
        self.executed
    }

    /// The loop ended because the unit died.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// The active command is complete; pop it on the next pass.
    pub fn mark_executed(&mut self) {
        self.executed = true;
    }

    /// Something was put in front of (or replaced) the head: dispatch the
    /// head again on the next pass without popping.
    pub fn interrupt(&mut self) {
        self.executed = true;
        self.received = false;
    }

    /// A new order arrived through the public command API.
    pub fn order_added(&mut self, is_stop: bool) {
        self.interrupt();
        self.stop_pending = is_stop;
    }

    /// The head was handed to the state machine.
    pub fn mark_dispatched(&mut self) {
        self.executed = false;
        self.received = true;
    }

    /// Run one pass of the loop over `queue`.
    pub fn advance(&mut self, queue: &mut CommandQueue, dead: bool) -> Dequeue {
        if self.finished {
            return Dequeue::Finished;
        }
        if dead {
            self.finished = true;
            return Dequeue::Finished;
        }
        if queue.is_empty() {
            if std::mem::take(&mut self.stop_pending) {
                return Dequeue::Idle;
            }
            return Dequeue::Wait;
        }
        if !self.executed {
            return Dequeue::Wait;
        }

        if self.received {
            if queue.is_lone_guard() {
                return Dequeue::Wait;
            }
            queue.pop();
            self.received = false;
            if queue.is_empty() {
                return Dequeue::Wait;
            }
        }

        match queue.current() {
            Some(&command) => {
                self.mark_dispatched();
                Dequeue::Dispatch(command)
            }
            None => Dequeue::Wait,
        }
    }
}
