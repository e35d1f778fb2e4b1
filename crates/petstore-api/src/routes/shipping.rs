//! # Shipping API
//!
//! - `POST /v1/shipping/quote` — quote a hypothetical shipment (public)
//! - `GET /v1/shipping/rates` — the active tier table (public)

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use petstore_catalog::Dimensions;
use petstore_checkout::{ShippingQuote, ShippingRates};
use petstore_core::parse_amount;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// One parcel line in a quote request.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteLine {
    pub qty: u32,
    pub weight_grams: u32,
    /// `[length, width, height]` in millimetres.
    pub dims_mm: [u32; 3],
}

/// Request for a shipping quote.
#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub lines: Vec<QuoteLine>,
    /// Merchandise subtotal as a decimal amount string; used for the
    /// free-shipping threshold. Defaults to zero (no free shipping).
    #[serde(default)]
    pub subtotal: Option<String>,
}

impl Validate for QuoteRequest {
    fn validate(&self) -> Result<(), String> {
        if self.lines.is_empty() {
            return Err("lines must not be empty".to_string());
        }
        if self.lines.len() > 100 {
            return Err("lines must not exceed 100 entries".to_string());
        }
        for (i, line) in self.lines.iter().enumerate() {
            if line.qty == 0 {
                return Err(format!("lines[{i}].qty must be positive"));
            }
        }
        if let Some(ref subtotal) = self.subtotal {
            match parse_amount(subtotal) {
                Some(cents) if cents >= 0 => {}
                _ => return Err(format!("subtotal {subtotal:?} is not a valid amount")),
            }
        }
        Ok(())
    }
}

/// Shipping quote response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuoteResponse {
    pub actual_grams: u64,
    pub volumetric_grams: u64,
    pub chargeable_grams: u64,
    pub cost_cents: i64,
    /// Cost as a decimal string for display.
    pub cost: String,
    pub free_threshold_applied: bool,
}

impl From<ShippingQuote> for QuoteResponse {
    fn from(quote: ShippingQuote) -> Self {
        Self {
            actual_grams: quote.actual_grams,
            volumetric_grams: quote.volumetric_grams,
            chargeable_grams: quote.chargeable_grams,
            cost_cents: quote.cost_cents,
            cost: petstore_core::format_amount(quote.cost_cents),
            free_threshold_applied: quote.free_threshold_applied,
        }
    }
}

/// Build the shipping router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/shipping/quote", post(quote_shipment))
        .route("/v1/shipping/rates", get(get_rates))
}

/// POST /v1/shipping/quote — Quote a shipment.
#[utoipa::path(
    post,
    path = "/v1/shipping/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quote computed", body = QuoteResponse),
        (status = 422, description = "Validation error", body = crate::error::ErrorBody),
    ),
    tag = "shipping"
)]
pub(crate) async fn quote_shipment(
    State(state): State<AppState>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>, AppError> {
    let req = extract_validated_json(body)?;

    let mut actual: u64 = 0;
    let mut volume_mm3: u64 = 0;
    for line in &req.lines {
        let qty = line.qty as u64;
        actual = actual.saturating_add((line.weight_grams as u64).saturating_mul(qty));
        let dims = Dimensions {
            length_mm: line.dims_mm[0],
            width_mm: line.dims_mm[1],
            height_mm: line.dims_mm[2],
        };
        volume_mm3 = volume_mm3.saturating_add(dims.volume_mm3().saturating_mul(qty));
    }
    let volumetric = volume_mm3 / petstore_checkout::VOLUMETRIC_DIVISOR;

    let subtotal_cents = req
        .subtotal
        .as_deref()
        .and_then(parse_amount)
        .unwrap_or(0);

    let quote = state.shipping_rates.quote(actual, volumetric, subtotal_cents);
    Ok(Json(quote.into()))
}

/// GET /v1/shipping/rates — The active rate table.
#[utoipa::path(
    get,
    path = "/v1/shipping/rates",
    responses((status = 200, description = "Active shipping rates")),
    tag = "shipping"
)]
pub(crate) async fn get_rates(State(state): State<AppState>) -> Json<ShippingRates> {
    Json((*state.shipping_rates).clone())
}
