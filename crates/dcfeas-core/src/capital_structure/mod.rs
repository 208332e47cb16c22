pub mod debt_schedule;
pub mod engine;
pub mod financing;
pub mod levered;
pub mod sensitivity;
pub mod valuation;
