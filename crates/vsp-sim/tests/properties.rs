//! Property-based tests for runs, introspection and random request
//! sequences.

mod common;

use common::{exchange, fixture, reply};
use proptest::prelude::*;
use vsp_core::{
    CommandOutput, Dispatcher, Kernel, Registry, Response, RunOutcome, RunState, SimTime,
    introspect::for_each_object,
};
use vsp_sim::{Component, EventKernel, Operation, Platform, Property, demo_platform};

/// Upper bound on runs executed by the model-based test.
const MAX_RUN: SimTime = SimTime::from_us(200);

#[derive(Debug, Clone)]
struct NodeShape {
    attributes: usize,
    commands: usize,
    children: Vec<NodeShape>,
}

fn node_shape() -> impl Strategy<Value = NodeShape> {
    let leaf = (0..3usize, 0..3usize).prop_map(|(attributes, commands)| NodeShape {
        attributes,
        commands,
        children: Vec::new(),
    });
    leaf.prop_recursive(3, 16, 3, |inner| {
        (0..3usize, 0..3usize, prop::collection::vec(inner, 0..3)).prop_map(
            |(attributes, commands, children)| NodeShape { attributes, commands, children },
        )
    })
}

fn build(name: String, shape: &NodeShape) -> Component {
    let mut component = Component::new(name, format!("kind{}", shape.children.len()));
    for i in 0..shape.attributes {
        component = component.with_attribute(Property::unsigned(format!("attr{i}"), i as u64, 4));
    }
    for i in 0..shape.commands {
        component = component.with_command(format!("cmd{i}"), i, format!("command {i}"), |_| {
            Ok(CommandOutput::ok(""))
        });
    }
    for (i, child) in shape.children.iter().enumerate() {
        component = component.with_child(build(format!("n{i}"), child));
    }
    component
}

fn expected_description(shape: &NodeShape) -> String {
    let mut text = format!("kind:kind{},", shape.children.len());
    for i in 0..shape.children.len() {
        text.push_str(&format!("child:n{i},"));
    }
    for i in 0..shape.attributes {
        text.push_str(&format!("attr:attr{i},"));
    }
    for i in 0..shape.commands {
        text.push_str(&format!("cmd:cmd{i}:{i}:command {i},"));
    }
    text
}

fn collect_shapes<'a>(
    path: String,
    shape: &'a NodeShape,
    out: &mut Vec<(String, &'a NodeShape)>,
) {
    for (i, child) in shape.children.iter().enumerate() {
        collect_shapes(format!("{path}.n{i}"), child, out);
    }
    out.push((path, shape));
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        1 => Just(Operation::Noop),
        4 => any::<u8>().prop_map(|micros| Operation::Step { micros }),
        3 => any::<u8>().prop_map(|object| Operation::Info { object }),
        3 => (any::<u8>(), "[a-z,\\\\]{0,6}")
            .prop_map(|(command, argument)| Operation::Execute { command, argument }),
        2 => Just(Operation::Time),
        1 => Just(Operation::Quantum),
        1 => (1..5000u16).prop_map(|nanos| Operation::SetQuantum { nanos }),
        3 => any::<u8>().prop_map(|attribute| Operation::Read { attribute }),
        3 => (any::<u8>(), any::<u32>())
            .prop_map(|(attribute, value)| Operation::Write { attribute, value }),
        1 => Just(Operation::Version),
        1 => "[a-zA-Z0-9,.]{0,8}".prop_map(Operation::Raw),
    ]
}

proptest! {
    #[test]
    fn prop_step_with_duration_is_exact(micros in 1..5_000u64, with_timer in any::<bool>()) {
        let mut d = if with_timer {
            let mut kernel = EventKernel::new();
            let platform = demo_platform(&mut kernel);
            Dispatcher::new(kernel, platform)
        } else {
            fixture()
        };

        prop_assert_eq!(exchange(&mut d, &format!("s,{micros}e-6")), "OK");
        prop_assert_eq!(d.kernel().now(), SimTime::from_us(micros));
    }

    #[test]
    fn prop_step_without_events_is_one_quantum(nanos in 1..10_000u64, steps in 1..5u64) {
        let mut d = fixture();
        prop_assert_eq!(reply(&mut d, &format!("Q,{nanos}e-9")), "OK");
        for _ in 0..steps {
            prop_assert_eq!(exchange(&mut d, "s"), "OK");
        }
        prop_assert_eq!(reply(&mut d, "t"), format!("{},0", nanos * steps));
    }

    #[test]
    fn prop_describe_matches_tree(shapes in prop::collection::vec(node_shape(), 1..4)) {
        let platform = shapes.iter().enumerate().fold(Platform::new(), |platform, (i, shape)| {
            platform.with(build(format!("top{i}"), shape))
        });
        let mut d = Dispatcher::new(EventKernel::new(), platform);

        let mut nodes = Vec::new();
        for (i, shape) in shapes.iter().enumerate() {
            collect_shapes(format!("top{i}"), shape, &mut nodes);
        }

        for (path, shape) in nodes {
            let first = reply(&mut d, &format!("i,{path}"));
            prop_assert_eq!(&first, &expected_description(shape));
            prop_assert_eq!(first, reply(&mut d, &format!("i,{path}")));
        }

        let mut visited = 0;
        for_each_object(d.registry() as &dyn Registry, &mut |_, _| visited += 1);
        prop_assert!(visited > 0);
    }

    #[test]
    fn prop_random_requests_keep_time_monotonic(
        ops in prop::collection::vec(operation_strategy(), 0..40)
    ) {
        let mut kernel = EventKernel::new();
        let platform = demo_platform(&mut kernel);
        let mut d = Dispatcher::new(kernel, platform);
        let mut last = (SimTime::ZERO, 0);

        for op in &ops {
            match d.handle_packet(&op.to_payload()) {
                Response::Reply(_) => {},
                Response::Quit(text) => {
                    prop_assert_eq!(text, "OK");
                    prop_assert_eq!(d.state(), RunState::Terminated);
                    break;
                },
                Response::Run(request) => {
                    if request.is_unbounded() || request.duration() > MAX_RUN {
                        continue;
                    }
                    prop_assert_eq!(d.run(request), Ok(RunOutcome::Reply("OK".to_string())));
                },
            }

            let now = (d.kernel().now(), d.kernel().delta_count());
            prop_assert!(now >= last);
            last = now;
            prop_assert_eq!(d.state(), RunState::Idle);
        }
    }
}
