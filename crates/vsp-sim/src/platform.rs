//! Platform: the top-level set of components.

use vsp_core::{CommandError, CommandOutput, ObjectNode, Registry, SimTime};

use crate::{
    component::Component,
    kernel::{EventKernel, Wake},
    property::{Counter, Property},
};

/// Period of the demo timer.
pub const TIMER_PERIOD: SimTime = SimTime::from_us(10);

/// Top-level components of a simulated system.
#[derive(Debug, Default)]
pub struct Platform {
    top: Vec<Component>,
}

impl Platform {
    /// Platform without components.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level component.
    #[must_use]
    pub fn with(mut self, component: Component) -> Self {
        self.top.push(component);
        self
    }

    /// Component by dotted path.
    pub fn component(&self, path: &str) -> Option<&Component> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut node = self.top.iter().find(|c| c.basename() == first)?;
        for segment in segments {
            node = node.child(segment)?;
        }
        Some(node)
    }
}

impl Registry for Platform {
    fn top_level(&self) -> Vec<&dyn ObjectNode> {
        self.top.iter().map(|c| c as &dyn ObjectNode).collect()
    }

    fn top_level_mut(&mut self) -> Vec<&mut dyn ObjectNode> {
        self.top.iter_mut().map(|c| c as &mut dyn ObjectNode).collect()
    }
}

/// Small demo system driven by `kernel`.
///
/// ```text
/// system
///   ├─ timer   ticks every 10 us; attributes ticks, period
///   └─ device  attributes reg0, regs, status; commands reset, echo
/// ```
pub fn demo_platform(kernel: &mut EventKernel) -> Platform {
    let ticks = Counter::new("ticks");
    let process_ticks = ticks.clone();
    kernel.spawn(
        move |_: SimTime| {
            process_ticks.increment();
            Wake::After(TIMER_PERIOD)
        },
        TIMER_PERIOD,
    );

    let timer = Component::new("timer", "timer")
        .with_attribute(ticks.clone())
        .with_attribute(Property::text("period", TIMER_PERIOD.to_string()).read_only());

    let device = Component::new("device", "device")
        .with_attribute(Property::unsigned("reg0", 0, 4))
        .with_attribute(Property::array("regs", vec![0; 4], 2))
        .with_attribute(Property::text("status", "idle").read_only())
        .with_command("reset", 0, "reset the timer tick count", move |_| {
            ticks.reset();
            Ok(CommandOutput::ok("timer reset"))
        })
        .with_command("echo", 1, "echo the arguments", |args| {
            if args.iter().all(String::is_empty) {
                return Err(CommandError::Failed("nothing to echo".to_string()));
            }
            Ok(CommandOutput::ok(args.join(" ")))
        });

    Platform::new().with(Component::new("system", "system").with_child(timer).with_child(device))
}
