//! Step-response simulation for ctrlkit.
//!
//! Provides:
//! - Actuator chain (saturation, rate limit, first-order lag)
//! - Dead time as a whole-sample input shift
//! - FOPDT, IPDT and underdamped SOPDT plants integrated with explicit Euler
//! - Step simulator on a generated grid and on a recorded time axis
//! - Closed-form step curves for cross-checking the integrators

pub mod actuator;
pub mod analytic;
pub mod error;
pub mod plant;
pub mod step;

pub use actuator::{ActuatorParams, ActuatorState};
pub use analytic::analytic_step_response;
pub use error::{SimError, SimResult};
pub use plant::{
    FopdtParams, IpdtParams, PlantDynamics, PlantKind, PlantModel, SopdtUnderdampedParams,
    apply_deadtime, integrate,
};
pub use step::{StepResponse, StepSpec, make_step_cv, simulate_on_grid, simulate_step_response};
