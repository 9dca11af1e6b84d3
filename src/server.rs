//! HTTP surface: health checks and portfolio valuation.

use crate::core::error::Error;
use crate::core::portfolio::{Holding, Portfolio, ValuationResult};
use crate::valuation::Valuator;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub valuator: Valuator,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/portfolio/value", post(portfolio_value))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Request body for `POST /portfolio/value`.
///
/// Accepts the holdings list form and the older map form
/// `{"portfolio": {"BTC": 1}, "fiat_currency": "CLP"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PortfolioValueRequest {
    Holdings(Portfolio),
    AssetMap {
        portfolio: BTreeMap<String, Decimal>,
        fiat_currency: String,
    },
}

impl From<PortfolioValueRequest> for Portfolio {
    fn from(request: PortfolioValueRequest) -> Portfolio {
        match request {
            PortfolioValueRequest::Holdings(portfolio) => portfolio,
            PortfolioValueRequest::AssetMap {
                portfolio,
                fiat_currency,
            } => Portfolio {
                holdings: portfolio
                    .into_iter()
                    .map(|(asset, quantity)| Holding { asset, quantity })
                    .collect(),
                currency: fiat_currency,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(Error::InvalidInput(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Error::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::UpstreamDataError(_) | Error::PriceNotFound { .. } => StatusCode::BAD_GATEWAY,
        };
        if status.is_server_error() {
            warn!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.0.code().to_string(),
                message: self.0.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Reports ready only when the price source answers.
async fn readiness(State(state): State<AppState>) -> Result<Json<HealthResponse>, ApiError> {
    state.valuator.provider().markets().await?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
    }))
}

async fn portfolio_value(
    State(state): State<AppState>,
    payload: Result<Json<PortfolioValueRequest>, JsonRejection>,
) -> Result<Json<ValuationResult>, ApiError> {
    let Json(request) = payload?;
    let portfolio = Portfolio::from(request);
    let result = state.valuator.value(&portfolio).await?;
    info!(
        currency = %result.currency,
        total = %result.total_value,
        "Portfolio valued"
    );
    Ok(Json(result))
}
