//! Object and attribute introspection.
//!
//! Names are dotted paths from a top-level node, e.g. `system.cpu.pc`. The
//! empty name denotes a virtual root whose children are the top-level
//! nodes. A missing segment is an ordinary "not found" result.

use std::fmt;

use vsp_proto::{FIELD_DELIMITER, escape};

use crate::object::{Attribute, Capabilities, CommandInfo, ObjectNode, Registry};

const PATH_SEPARATOR: char = '.';

/// Result of resolving an object name.
#[derive(Clone, Copy)]
pub enum Target<'a> {
    /// Virtual root above the top-level nodes
    Root(&'a dyn Registry),
    /// A real node
    Object(&'a dyn ObjectNode),
}

impl fmt::Debug for Target<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root(_) => f.write_str("Target::Root"),
            Self::Object(node) => write!(f, "Target::Object({})", node.basename()),
        }
    }
}

/// Resolve `name` to a node, or to the virtual root for the empty name.
pub fn find_object<'a>(registry: &'a dyn Registry, name: &str) -> Option<Target<'a>> {
    if name.is_empty() {
        return Some(Target::Root(registry));
    }

    let mut segments = name.split(PATH_SEPARATOR);
    let first = segments.next()?;
    let mut node = registry.top_level().into_iter().find(|n| n.basename() == first)?;
    for segment in segments {
        if !node.capabilities().contains(Capabilities::INTROSPECTABLE) {
            return None;
        }
        node = node.children().into_iter().find(|c| c.basename() == segment)?;
    }
    Some(Target::Object(node))
}

/// Resolve `name` to a node for mutation. The virtual root is not a node.
pub fn find_object_mut<'a>(
    registry: &'a mut dyn Registry,
    name: &str,
) -> Option<&'a mut dyn ObjectNode> {
    let mut segments = name.split(PATH_SEPARATOR);
    let first = segments.next()?;
    let mut node = registry.top_level_mut().into_iter().find(|n| n.basename() == first)?;
    for segment in segments {
        if !node.capabilities().contains(Capabilities::INTROSPECTABLE) {
            return None;
        }
        node = node.children_mut().into_iter().find(|c| c.basename() == segment)?;
    }
    Some(node)
}

/// Resolve `name` as `<object>.<attribute>`.
pub fn find_attribute<'a>(registry: &'a dyn Registry, name: &str) -> Option<&'a dyn Attribute> {
    let (parent, attribute) = name.rsplit_once(PATH_SEPARATOR)?;
    let Target::Object(node) = find_object(registry, parent)? else {
        return None;
    };
    if !node.capabilities().contains(Capabilities::ATTRIBUTE_HOLDER) {
        return None;
    }
    node.attributes().into_iter().find(|a| a.name() == attribute)
}

/// Resolve `name` as `<object>.<attribute>` for mutation.
pub fn find_attribute_mut<'a>(
    registry: &'a mut dyn Registry,
    name: &str,
) -> Option<&'a mut dyn Attribute> {
    let (parent, attribute) = name.rsplit_once(PATH_SEPARATOR)?;
    let node = find_object_mut(registry, parent)?;
    if !node.capabilities().contains(Capabilities::ATTRIBUTE_HOLDER) {
        return None;
    }
    node.attribute_mut(attribute)
}

/// Everything a client can learn about one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Description {
    /// Kind tag (`root` for the virtual root)
    pub kind: String,
    /// Child basenames
    pub children: Vec<String>,
    /// Attribute names
    pub attributes: Vec<String>,
    /// Command descriptors
    pub commands: Vec<CommandInfo>,
}

/// Describe a resolved target, asking only for what its capabilities cover.
pub fn describe(target: Target<'_>) -> Description {
    match target {
        Target::Root(registry) => Description {
            kind: "root".to_string(),
            children: registry.top_level().iter().map(|n| n.basename().to_string()).collect(),
            attributes: Vec::new(),
            commands: Vec::new(),
        },
        Target::Object(node) => {
            let caps = node.capabilities();
            let children = if caps.contains(Capabilities::INTROSPECTABLE) {
                node.children().iter().map(|c| c.basename().to_string()).collect()
            } else {
                Vec::new()
            };
            let attributes = if caps.contains(Capabilities::ATTRIBUTE_HOLDER) {
                node.attributes().iter().map(|a| a.name().to_string()).collect()
            } else {
                Vec::new()
            };
            let commands = if caps.contains(Capabilities::COMMAND_HOLDER) {
                node.commands()
            } else {
                Vec::new()
            };

            Description { kind: node.kind().to_string(), children, attributes, commands }
        },
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let esc = |text: &str| escape(text, FIELD_DELIMITER);

        write!(f, "kind:{},", esc(&self.kind))?;
        for child in &self.children {
            write!(f, "child:{},", esc(child))?;
        }
        for attribute in &self.attributes {
            write!(f, "attr:{},", esc(attribute))?;
        }
        for command in &self.commands {
            let (name, description) = (esc(&command.name), esc(&command.description));
            write!(f, "cmd:{name}:{}:{description},", command.argc)?;
        }
        Ok(())
    }
}

/// Visit every node depth-first in declaration order, parents first, with
/// its full dotted name.
pub fn for_each_object(registry: &dyn Registry, visit: &mut dyn FnMut(&str, &dyn ObjectNode)) {
    fn walk(path: &str, node: &dyn ObjectNode, visit: &mut dyn FnMut(&str, &dyn ObjectNode)) {
        visit(path, node);
        for child in node.children() {
            let child_path = format!("{path}{PATH_SEPARATOR}{}", child.basename());
            walk(&child_path, child, visit);
        }
    }

    for node in registry.top_level() {
        walk(node.basename(), node, visit);
    }
}

/// Send the suspend notification to every node, children before parents.
pub fn notify_suspend(registry: &mut dyn Registry) {
    fn suspend(node: &mut dyn ObjectNode) {
        for child in node.children_mut() {
            suspend(child);
        }
        node.session_suspend();
    }

    for node in registry.top_level_mut() {
        suspend(node);
    }
}

/// Send the resume notification to every node, children before parents.
pub fn notify_resume(registry: &mut dyn Registry) {
    fn resume(node: &mut dyn ObjectNode) {
        for child in node.children_mut() {
            resume(child);
        }
        node.session_resume();
    }

    for node in registry.top_level_mut() {
        resume(node);
    }
}
