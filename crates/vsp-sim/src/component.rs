//! Generic component node.

use std::fmt;

use vsp_core::{Attribute, Capabilities, CommandError, CommandInfo, CommandOutput, ObjectNode};

type CommandFn = Box<dyn FnMut(&[String]) -> Result<CommandOutput, CommandError>>;

struct Command {
    info: CommandInfo,
    run: CommandFn,
}

/// Node of a simulated platform: children, attributes and commands.
///
/// Capabilities follow the contents: a component holding attributes is an
/// attribute holder, one with commands a command holder. Every component is
/// introspectable unless marked [`Component::opaque`].
pub struct Component {
    name: String,
    kind: String,
    opaque: bool,
    children: Vec<Component>,
    attributes: Vec<Box<dyn Attribute>>,
    commands: Vec<Command>,
    suspends: u64,
    resumes: u64,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("children", &self.children)
            .field("attributes", &self.attributes.iter().map(|a| a.name()).collect::<Vec<_>>())
            .field("commands", &self.commands.iter().map(|c| &c.info.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Component {
    /// Empty component.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            opaque: false,
            children: Vec::new(),
            attributes: Vec::new(),
            commands: Vec::new(),
            suspends: 0,
            resumes: 0,
        }
    }

    /// Add a child.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Add an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attribute: impl Attribute + 'static) -> Self {
        self.attributes.push(Box::new(attribute));
        self
    }

    /// Add a command taking at least `argc` arguments.
    #[must_use]
    pub fn with_command(
        mut self,
        name: impl Into<String>,
        argc: usize,
        description: impl Into<String>,
        run: impl FnMut(&[String]) -> Result<CommandOutput, CommandError> + 'static,
    ) -> Self {
        let info = CommandInfo::new(name, argc, description);
        self.commands.push(Command { info, run: Box::new(run) });
        self
    }

    /// Hide children from introspection.
    #[must_use]
    pub fn opaque(mut self) -> Self {
        self.opaque = true;
        self
    }

    /// Direct child by basename.
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Suspend notifications received.
    pub const fn suspend_count(&self) -> u64 {
        self.suspends
    }

    /// Resume notifications received.
    pub const fn resume_count(&self) -> u64 {
        self.resumes
    }
}

impl ObjectNode for Component {
    fn basename(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::empty();
        caps.set(Capabilities::INTROSPECTABLE, !self.opaque);
        caps.set(Capabilities::ATTRIBUTE_HOLDER, !self.attributes.is_empty());
        caps.set(Capabilities::COMMAND_HOLDER, !self.commands.is_empty());
        caps
    }

    fn children(&self) -> Vec<&dyn ObjectNode> {
        self.children.iter().map(|c| c as &dyn ObjectNode).collect()
    }

    fn children_mut(&mut self) -> Vec<&mut dyn ObjectNode> {
        self.children.iter_mut().map(|c| c as &mut dyn ObjectNode).collect()
    }

    fn attributes(&self) -> Vec<&dyn Attribute> {
        self.attributes.iter().map(|a| &**a as &dyn Attribute).collect()
    }

    fn attribute_mut(&mut self, name: &str) -> Option<&mut dyn Attribute> {
        let attribute = self.attributes.iter_mut().find(|a| a.name() == name)?;
        Some(&mut **attribute as &mut dyn Attribute)
    }

    fn commands(&self) -> Vec<CommandInfo> {
        self.commands.iter().map(|c| c.info.clone()).collect()
    }

    fn execute(&mut self, command: &str, args: &[String]) -> Result<CommandOutput, CommandError> {
        let command = self
            .commands
            .iter_mut()
            .find(|c| c.info.name == command)
            .ok_or_else(|| CommandError::Unknown(command.to_string()))?;
        (command.run)(args)
    }

    fn session_suspend(&mut self) {
        self.suspends += 1;
    }

    fn session_resume(&mut self) {
        self.resumes += 1;
    }
}
