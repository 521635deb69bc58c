//! The force simulation.
//!
//! One `Arena` holds the particle and traction sets for a single layout
//! run and executes simulation steps until the layout stabilizes. Force
//! functions are pure pair operations; particles accumulate forces during
//! a step and integrate them into position at the end of it.

mod arena;
mod forces;
mod particle;

pub use arena::{Arena, ForcedStable};
pub use forces::{ForceConfig, Traction, repulsion, traction};
pub use particle::Particle;
