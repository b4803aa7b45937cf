use super::types::{ConvertParams, ConvertRequest, ConvertResponse};
use crate::{
    Error,
    convert::{Conversion, Converter},
};
use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, Json},
};
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../../assets/index.html");
const ABOUT_HTML: &str = include_str!("../../assets/about.html");

#[derive(Clone)]
pub struct AppState {
    pub converter: Arc<Converter>,
    pub favicon_path: PathBuf,
}

impl AppState {
    pub fn new(converter: Converter, favicon_path: impl Into<PathBuf>) -> Self {
        Self {
            converter: Arc::new(converter),
            favicon_path: favicon_path.into(),
        }
    }
}

/// `POST /convert` with a JSON body `{"mql_query": "..."}`.
pub async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConvertResponse>, (StatusCode, Json<ConvertResponse>)> {
    let request_id = Uuid::new_v4().to_string();
    let mut debug_info = BTreeMap::from([
        ("request_id".to_string(), request_id.clone()),
        ("model".to_string(), state.converter.settings().model.clone()),
    ]);

    let Json(request) = payload.map_err(|rejection| {
        warn!(request_id = %request_id, "Rejected conversion request body: {}", rejection);
        (
            rejection.status(),
            Json(ConvertResponse::failure(
                debug_info.clone(),
                vec![rejection.body_text()],
                Vec::new(),
            )),
        )
    })?;

    match run_conversion(&state.converter, &request_id, &request.mql_query).await {
        Ok(conversion) => {
            debug_info.insert("model".to_string(), conversion.model);
            debug_info.insert(
                "elapsed_ms".to_string(),
                conversion.elapsed.as_millis().to_string(),
            );
            Ok(Json(ConvertResponse {
                promql_query: conversion.promql_query,
                debug: debug_info,
                errors: Vec::new(),
                warnings: conversion.warnings,
            }))
        }
        Err(e) => Err((
            e.status_code(),
            Json(ConvertResponse::failure(
                debug_info,
                e.public_messages(),
                e.warnings().to_vec(),
            )),
        )),
    }
}

/// `GET /convert?mql_query=...`, answering with the bare PromQL text.
pub async fn convert_query(
    State(state): State<AppState>,
    Query(params): Query<ConvertParams>,
) -> Result<String, (StatusCode, String)> {
    let request_id = Uuid::new_v4().to_string();

    match run_conversion(&state.converter, &request_id, &params.mql_query).await {
        Ok(conversion) => Ok(conversion.promql_query),
        Err(e) => Err((e.status_code(), e.public_messages().join("\n"))),
    }
}

async fn run_conversion(
    converter: &Converter,
    request_id: &str,
    mql_query: &str,
) -> Result<Conversion, Error> {
    info!(
        request_id = %request_id,
        query_len = mql_query.len(),
        "Received conversion request"
    );
    debug!(request_id = %request_id, "Input MQL query: {}", mql_query);

    match converter.convert(mql_query).await {
        Ok(conversion) => {
            debug!(
                request_id = %request_id,
                "Generated PromQL query: {}",
                conversion.promql_query
            );
            Ok(conversion)
        }
        Err(e) => {
            if e.is_upstream() {
                error!(request_id = %request_id, "Conversion failed: {}", e);
            } else if matches!(e, Error::Validation { .. }) {
                warn!(request_id = %request_id, "Conversion rejected: {}", e);
            } else {
                error!(request_id = %request_id, "Unexpected conversion error: {}", e);
            }
            Err(e)
        }
    }
}

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn about() -> Html<&'static str> {
    Html(ABOUT_HTML)
}

pub async fn health() -> &'static str {
    "OK"
}
