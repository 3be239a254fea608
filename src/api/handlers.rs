use std::collections::BTreeMap;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::IngressError;
use crate::http::server::AppState;
use crate::routing::Panel;

/// Success envelope shared by every API response.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub result: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self { result: "ok", data })
    }
}

#[derive(Debug, Serialize)]
pub struct PanelList {
    pub panels: BTreeMap<String, Panel>,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidateSession {
    pub session: String,
}

#[derive(Debug, Serialize)]
pub struct Empty {}

pub async fn panels(State(state): State<AppState>) -> Json<ApiResponse<PanelList>> {
    let panels = state.resolver.registry().panels().into_iter().collect();
    ApiResponse::ok(PanelList { panels })
}

pub async fn create_session(State(state): State<AppState>) -> Json<ApiResponse<SessionCreated>> {
    let session = state.gate.store().create_session();
    tracing::debug!("Issued ingress session");
    ApiResponse::ok(SessionCreated { session })
}

pub async fn validate_session(
    State(state): State<AppState>,
    Json(body): Json<ValidateSession>,
) -> Result<Json<ApiResponse<Empty>>, IngressError> {
    if !state.gate.authorize(Some(&body.session)) {
        return Err(IngressError::Unauthorized);
    }
    Ok(ApiResponse::ok(Empty {}))
}
