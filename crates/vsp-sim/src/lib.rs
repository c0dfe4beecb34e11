//! Reference simulation backend for the vsp control server.
//!
//! Provides a cooperative event kernel and a generic component tree that
//! implement the [`vsp_core::Kernel`] and [`vsp_core::Registry`] traits. The
//! server binary runs the demo platform on it; the test suites use it as a
//! deterministic backend.
//!
//! ## Architecture
//!
//! ```text
//! vsp-sim
//!   ├─ EventKernel  (time-ordered process queue, one delta cycle per unit)
//!   ├─ Component    (children, attributes, closure commands)
//!   ├─ Property     (typed attribute values), Counter (shared read-only)
//!   ├─ Platform     (top-level components, demo system)
//!   └─ Operation    (arbitrary client requests for model-based tests)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod component;
pub mod kernel;
pub mod operation;
pub mod platform;
pub mod property;

pub use component::Component;
pub use kernel::{DEFAULT_QUANTUM, EventKernel, Process, Wake};
pub use operation::Operation;
pub use platform::{Platform, TIMER_PERIOD, demo_platform};
pub use property::{Counter, Property};
