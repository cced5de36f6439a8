use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Serialize;

use gsci_core::index::{IndexCalculationInput, IndexStepInput};
use gsci_core::portfolio::PortfolioInput;
use gsci_core::WeightMap;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_index(input_json: String) -> NapiResult<String> {
    let input: IndexCalculationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = gsci_core::index::calculate_index(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn index_return(input_json: String) -> NapiResult<String> {
    let mut input: IndexStepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    input.previous_level = None;
    let output = gsci_core::index::calculate_index_step(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn index_level(input_json: String) -> NapiResult<String> {
    let input: IndexStepInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    if input.previous_level.is_none() {
        return Err(to_napi_error("previous_level is required"));
    }
    let output = gsci_core::index::calculate_index_step(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Serialize)]
struct NormalizedWeights {
    weights: WeightMap,
    weight_sum: rust_decimal::Decimal,
}

#[napi]
pub fn normalize_weights(cpw_json: String) -> NapiResult<String> {
    let cpw: WeightMap = serde_json::from_str(&cpw_json).map_err(to_napi_error)?;
    let weights = gsci_core::index::weighting::normalize(&cpw).map_err(to_napi_error)?;
    let output = NormalizedWeights {
        weight_sum: gsci_core::weight_sum(&weights),
        weights,
    };
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Portfolio
// ---------------------------------------------------------------------------

#[napi]
pub fn construct_portfolio(input_json: String) -> NapiResult<String> {
    let input: PortfolioInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = gsci_core::portfolio::construct_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
