//! Stand-in for the PDF endpoints: a synchronous, CPU-bound body behind admission control.
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::post,
};
use pressgate_api::{ApiError, run_heavy};
use pressgate_core::GateService;
use serde::{Deserialize, Serialize};

const MAX_SIMULATED_MS: u64 = 120_000;

#[derive(Debug, Deserialize)]
pub struct SimulateParams {
    /// How long the body keeps its thread busy.
    #[serde(default = "default_millis")]
    pub millis: u64,
    /// Make the body fail after its work.
    #[serde(default)]
    pub fail: bool,
}

fn default_millis() -> u64 {
    1_000
}

#[derive(Debug, Serialize)]
pub struct SimulateResponse {
    pub worked_ms: u64,
}

pub fn router(service: GateService) -> Router {
    Router::new()
        .route("/jobs/simulate", post(simulate))
        .with_state(service)
}

/// POST /jobs/simulate?millis=1500&fail=false
async fn simulate(
    State(service): State<GateService>,
    Query(params): Query<SimulateParams>,
) -> Result<Json<SimulateResponse>, ApiError> {
    let millis = params.millis.min(MAX_SIMULATED_MS);
    let fail = params.fail;

    let worked_ms = run_heavy(&service, move || {
        std::thread::sleep(Duration::from_millis(millis));
        if fail {
            Err(format!("simulated failure after {millis}ms"))
        } else {
            Ok(millis)
        }
    })
    .await?;

    Ok(Json(SimulateResponse { worked_ms }))
}
