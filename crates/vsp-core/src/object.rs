//! Externally owned object tree.
//!
//! The simulated model owns its nodes; the control core only borrows them for
//! the duration of one protocol exchange. Instead of probing node types at
//! runtime, every node advertises an explicit [`Capabilities`] set and the
//! core only calls the accessors a capability covers.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// What a node can be asked about.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Children can be enumerated
        const INTROSPECTABLE = 1 << 0;
        /// Node carries attributes
        const ATTRIBUTE_HOLDER = 1 << 1;
        /// Node accepts commands
        const COMMAND_HOLDER = 1 << 2;
    }
}

/// Node of the simulated object hierarchy.
pub trait ObjectNode {
    /// Last segment of the hierarchical name.
    fn basename(&self) -> &str;

    /// Kind tag, e.g. the model type name.
    fn kind(&self) -> &str;

    /// Capabilities this node supports.
    fn capabilities(&self) -> Capabilities;

    /// Child nodes in declaration order.
    fn children(&self) -> Vec<&dyn ObjectNode>;

    /// Child nodes in declaration order, mutably.
    fn children_mut(&mut self) -> Vec<&mut dyn ObjectNode>;

    /// Attributes (requires [`Capabilities::ATTRIBUTE_HOLDER`]).
    fn attributes(&self) -> Vec<&dyn Attribute> {
        Vec::new()
    }

    /// Attribute by name, mutably (requires
    /// [`Capabilities::ATTRIBUTE_HOLDER`]).
    fn attribute_mut(&mut self, _name: &str) -> Option<&mut dyn Attribute> {
        None
    }

    /// Command descriptors (requires [`Capabilities::COMMAND_HOLDER`]).
    fn commands(&self) -> Vec<CommandInfo> {
        Vec::new()
    }

    /// Invoke a command (requires [`Capabilities::COMMAND_HOLDER`]).
    fn execute(&mut self, _command: &str, _args: &[String]) -> Result<CommandOutput, CommandError> {
        Err(CommandError::Unsupported)
    }

    /// Called before the session hands the kernel back to the simulation.
    fn session_suspend(&mut self) {}

    /// Called after the kernel returned control to the session.
    fn session_resume(&mut self) {}
}

/// Root set of the object hierarchy.
pub trait Registry {
    /// Top-level nodes in declaration order.
    fn top_level(&self) -> Vec<&dyn ObjectNode>;

    /// Top-level nodes in declaration order, mutably.
    fn top_level_mut(&mut self) -> Vec<&mut dyn ObjectNode>;
}

/// Named, typed value owned by a node.
pub trait Attribute {
    /// Attribute name (last segment of its hierarchical name).
    fn name(&self) -> &str;

    /// Value type, e.g. `u32`.
    fn type_name(&self) -> &str;

    /// Kind of attribute, e.g. `property` or `counter`.
    fn kind(&self) -> &str {
        "property"
    }

    /// Textual value.
    fn value(&self) -> String;

    /// Size of one element in bytes.
    fn size(&self) -> usize;

    /// Number of elements.
    fn num(&self) -> usize;

    /// Whether [`Attribute::set_value`] may succeed.
    fn is_writable(&self) -> bool {
        false
    }

    /// Replace the value from its textual form.
    fn set_value(&mut self, _text: &str) -> Result<(), AttributeError> {
        Err(AttributeError::ReadOnly)
    }
}

/// Descriptor of a node command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInfo {
    /// Command name
    pub name: String,
    /// Minimum number of arguments
    pub argc: usize,
    /// Human-readable description
    pub description: String,
}

impl CommandInfo {
    /// Create a descriptor.
    pub fn new(name: impl Into<String>, argc: usize, description: impl Into<String>) -> Self {
        Self { name: name.into(), argc, description: description.into() }
    }
}

/// Result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Whether the command reports success
    pub success: bool,
    /// Captured output
    pub text: String,
}

impl CommandOutput {
    /// Successful output.
    pub fn ok(text: impl Into<String>) -> Self {
        Self { success: true, text: text.into() }
    }

    /// Unsuccessful output.
    pub fn failed(text: impl Into<String>) -> Self {
        Self { success: false, text: text.into() }
    }
}

/// Errors raised by a command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Command raised an error
    #[error("{0}")]
    Failed(String),

    /// Node has no such command
    #[error("command '{0}' not found")]
    Unknown(String),

    /// Too few arguments for the command
    #[error("command '{command}' requires {expected} arguments, got {actual}")]
    MissingArguments {
        /// Command name
        command: String,
        /// Declared argument count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Node does not accept commands
    #[error("commands not supported")]
    Unsupported,
}

/// Errors raised when writing an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// Attribute rejects all writes
    #[error("not writable")]
    ReadOnly,

    /// Text is not a valid value for the attribute
    #[error("invalid value '{value}': {reason}")]
    InvalidValue {
        /// Rejected text
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_error_display() {
        assert_eq!(CommandError::Failed("bad state".to_string()).to_string(), "bad state");
        let err =
            CommandError::MissingArguments { command: "echo".to_string(), expected: 1, actual: 0 };
        assert_eq!(err.to_string(), "command 'echo' requires 1 arguments, got 0");
    }

    #[test]
    fn capability_sets_combine() {
        let caps = Capabilities::INTROSPECTABLE | Capabilities::COMMAND_HOLDER;
        assert!(caps.contains(Capabilities::COMMAND_HOLDER));
        assert!(!caps.contains(Capabilities::ATTRIBUTE_HOLDER));
    }
}
