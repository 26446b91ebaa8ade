//! Kinematics: trapezoidal integration and the accelerations that feed it.

pub mod acceleration;
pub mod integrator;
pub mod thrusters;

pub use acceleration::Acceleration;
pub use integrator::{Kinematics, StepOutcome};
pub use thrusters::{Thrust, ThrusterSet};
