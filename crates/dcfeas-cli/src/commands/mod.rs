pub mod invest;
pub mod overrides;
pub mod project;
pub mod ramp;
pub mod readiness;
pub mod sensitivity;
