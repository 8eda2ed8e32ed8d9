use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use nimbus_core::{codec, LamportClock, PutOutcome, LAMPORT_CLOCK_HEADER};

use super::AppState;

#[derive(Debug, Deserialize)]
pub(crate) struct WeatherQuery {
    station: Option<String>,
}

/// Single handler for `/weather.json`; the per-request state machine
/// is linear: merge inbound clock, dispatch on method, respond with a
/// post-send-tick clock stamp.
pub(crate) async fn handle_weather(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(raw) = headers.get(LAMPORT_CLOCK_HEADER) {
        let peer = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok());
        match peer {
            Some(peer) => {
                state.clock.merge(peer);
            }
            None => {
                tracing::warn!("invalid Lamport clock header from peer: {:?}", raw);
                return respond(&state.clock, StatusCode::BAD_REQUEST, "Invalid Lamport Clock");
            }
        }
    }

    match method {
        Method::GET => handle_get(&state, query).await,
        Method::PUT => handle_put(&state, &headers, body).await,
        _ => respond(&state.clock, StatusCode::BAD_REQUEST, "Bad Request"),
    }
}

async fn handle_get(state: &AppState, query: WeatherQuery) -> Response {
    let found = {
        let store = state.store.lock().await;
        match query.station.as_deref() {
            Some(id) => store.get(id),
            None => store.latest(),
        }
    };

    match found {
        Some(record) => respond(&state.clock, StatusCode::OK, codec::encode(&record)),
        None => respond(&state.clock, StatusCode::NO_CONTENT, ""),
    }
}

async fn handle_put(state: &AppState, headers: &HeaderMap, body: Bytes) -> Response {
    let content_length = match headers.get(header::CONTENT_LENGTH) {
        None => return respond(&state.clock, StatusCode::NO_CONTENT, ""),
        Some(raw) => match raw.to_str() {
            Ok(value) if value.trim().is_empty() => {
                return respond(&state.clock, StatusCode::NO_CONTENT, "")
            }
            Ok(value) => match value.trim().parse::<u64>() {
                Ok(length) => length,
                Err(_) => {
                    return respond(
                        &state.clock,
                        StatusCode::BAD_REQUEST,
                        "Invalid Content-Length",
                    )
                }
            },
            Err(_) => {
                return respond(
                    &state.clock,
                    StatusCode::BAD_REQUEST,
                    "Invalid Content-Length",
                )
            }
        },
    };

    if content_length == 0 {
        return respond(&state.clock, StatusCode::NO_CONTENT, "");
    }

    let text = match std::str::from_utf8(&body) {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!("request body is not UTF-8: {}", error);
            return internal_error(&state.clock);
        }
    };

    let record = match codec::decode(text) {
        Ok(record) => record,
        Err(error) => {
            tracing::warn!("rejecting malformed record: {}", error);
            return internal_error(&state.clock);
        }
    };

    if record.id().is_none() {
        return respond(&state.clock, StatusCode::BAD_REQUEST, "Missing 'id' field");
    }

    // Receive event; this stamp becomes the record's lamportClock.
    let stamp = state.clock.tick();

    let (outcome, file_existed) = {
        let mut store = state.store.lock().await;
        let outcome = match store.put(record, stamp) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!("store rejected record: {}", error);
                return internal_error(&state.clock);
            }
        };

        let file_existed = state.data_file.exists();
        let snapshot = store.snapshot();
        if let Err(error) = state.data_file.write(&snapshot).await {
            // Memory stays authoritative; the next trigger retries.
            tracing::error!("failed to persist store: {}", error);
        }
        (outcome, file_existed)
    };

    let status = if outcome == PutOutcome::Created || !file_existed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    respond(&state.clock, status, "Success")
}

fn internal_error(clock: &LamportClock) -> Response {
    respond(clock, StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

/// Ticks the clock for the send event and stamps every response with
/// the resulting value.
fn respond(clock: &LamportClock, status: StatusCode, body: impl Into<String>) -> Response {
    let stamp = clock.tick();
    (
        status,
        [
            (header::CONTENT_TYPE.as_str(), "application/json".to_string()),
            (LAMPORT_CLOCK_HEADER, stamp.to_string()),
        ],
        body.into(),
    )
        .into_response()
}
