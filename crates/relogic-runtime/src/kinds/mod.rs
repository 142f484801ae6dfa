//! Node kinds built into every engine.
//!
//! - [`Interface`]: passes its inputs straight through to its outputs
//! - [`Timer`]: turns an external or system-clock ticker into time deltas
//! - [`Animation`]: samples a keyframe channel at a progress value
//!
//! [`register_builtin`] installs a restoring factory for each of them.

pub mod animation;
pub mod interface;
pub mod timer;

pub use animation::{Animation, Channel};
pub use interface::Interface;
pub use timer::Timer;

use relogic_core::{KindRegistry, NodeBehavior, NodeKind};

/// Registers the factories of all built-in kinds.
pub fn register_builtin(registry: &mut KindRegistry) {
    registry.register(NodeKind::Interface, |state| {
        Interface::from_state(state).map(|k| Box::new(k) as Box<dyn NodeBehavior>)
    });
    registry.register(NodeKind::Timer, |state| {
        Timer::from_state(state).map(|k| Box::new(k) as Box<dyn NodeBehavior>)
    });
    registry.register(NodeKind::Animation, |state| {
        Animation::from_state(state).map(|k| Box::new(k) as Box<dyn NodeBehavior>)
    });
}
