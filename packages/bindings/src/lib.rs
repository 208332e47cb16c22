use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use dcfeas_core::capital_structure::engine;
use dcfeas_core::capital_structure::financing::FinancingAssumptions;
use dcfeas_core::overrides::merge::{self, CellOverride};
use dcfeas_core::projection::cashflow::{self, ProjectAssumptions};
use dcfeas_core::projection::ramp::{self, LinearRampInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct DealInput {
    project: ProjectAssumptions,
    financing: FinancingAssumptions,
}

#[derive(Deserialize)]
struct OverridesInput {
    project: ProjectAssumptions,
    overrides: Vec<CellOverride>,
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn project_cashflows(input_json: String) -> NapiResult<String> {
    let input: ProjectAssumptions = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cashflow::analyze_project(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn linear_ramp(input_json: String) -> NapiResult<String> {
    let input: LinearRampInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = ramp::linear_ramp(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Capital structure
// ---------------------------------------------------------------------------

/// Runs the projection first; `input_json` carries `project` and
/// `financing`.
#[napi]
pub fn invest(input_json: String) -> NapiResult<String> {
    let input: DealInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let projection = cashflow::project(&input.project).map_err(to_napi_error)?;
    let output = engine::analyze_investment(&input.project, &projection, &input.financing)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Dashboard edits
// ---------------------------------------------------------------------------

#[napi]
pub fn apply_overrides(input_json: String) -> NapiResult<String> {
    let input: OverridesInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let projection = cashflow::project(&input.project).map_err(to_napi_error)?;
    let rows = merge::apply_overrides(
        &projection,
        input.project.total_capex,
        input.project.discount_rate,
        &input.overrides,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&rows).map_err(to_napi_error)
}
