pub mod cashflow;
pub mod ramp;
