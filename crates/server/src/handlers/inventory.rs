//! 已保存快照、按需轮询与轮询设置

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use ixinventory_core::database::dao::{InventoryDao, PollSettings, PollSettingsDao};
use ixinventory_core::database::lock_db;
use ixinventory_scheduler::{PollCategory, PollReport};
use serde::Serialize;

use super::{database_error, invalid_request};
use crate::AppState;

/// `POST /api/poll/all` 中每个类别的结果
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum PollOutcome {
    Report(PollReport),
    Failed { category: PollCategory, error: String },
}

fn parse_category(raw: &str) -> Result<PollCategory, Response> {
    raw.parse::<PollCategory>()
        .map_err(|e| invalid_request(&e.to_string()))
}

/// GET /api/inventory/:category
pub async fn get_inventory(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Response {
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };

    let conn = match lock_db(&state.db) {
        Ok(conn) => conn,
        Err(e) => return database_error(&e),
    };

    let rows = match category {
        PollCategory::Chassis => InventoryDao::list_summaries(&conn).map(|r| Json(r).into_response()),
        PollCategory::Cards => InventoryDao::list_cards(&conn).map(|r| Json(r).into_response()),
        PollCategory::Ports => InventoryDao::list_ports(&conn).map(|r| Json(r).into_response()),
        PollCategory::Licensing => {
            InventoryDao::list_licenses(&conn).map(|r| Json(r).into_response())
        }
        PollCategory::Sensors => InventoryDao::list_sensors(&conn).map(|r| Json(r).into_response()),
        PollCategory::Performance => InventoryDao::list_perf(&conn).map(|r| Json(r).into_response()),
    };

    rows.unwrap_or_else(|e| database_error(&e.to_string()))
}

/// GET /api/inventory/performance/:ip/history
pub async fn get_perf_history(State(state): State<AppState>, Path(ip): Path<String>) -> Response {
    let conn = match lock_db(&state.db) {
        Ok(conn) => conn,
        Err(e) => return database_error(&e),
    };

    match InventoryDao::perf_history(&conn, &ip) {
        Ok(history) => Json(history).into_response(),
        Err(e) => database_error(&e.to_string()),
    }
}

/// POST /api/poll/:target - target 为类别名或 `all`
pub async fn run_poll(State(state): State<AppState>, Path(target): Path<String>) -> Response {
    if target.eq_ignore_ascii_case("all") {
        state.log("info", "[POLLER] 手动触发全类别轮询").await;
        let outcomes: Vec<PollOutcome> = PollCategory::ALL
            .into_iter()
            .zip(state.poller.poll_all().await)
            .map(|(category, result)| match result {
                Ok(report) => PollOutcome::Report(report),
                Err(e) => PollOutcome::Failed {
                    category,
                    error: e.to_string(),
                },
            })
            .collect();
        return Json(outcomes).into_response();
    }

    let category = match parse_category(&target) {
        Ok(category) => category,
        Err(response) => return response,
    };

    state
        .log("info", &format!("[POLLER] 手动触发 {category} 轮询"))
        .await;
    match state.poller.poll(category).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => {
            state
                .log("error", &format!("[POLLER] {category} 轮询失败: {e}"))
                .await;
            database_error(&e.to_string())
        }
    }
}

/// GET /api/poll-settings
pub async fn get_poll_settings(State(state): State<AppState>) -> Response {
    let conn = match lock_db(&state.db) {
        Ok(conn) => conn,
        Err(e) => return database_error(&e),
    };

    match PollSettingsDao::get_poll_settings(&conn) {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => database_error(&e.to_string()),
    }
}

/// PUT /api/poll-settings
pub async fn put_poll_settings(
    State(state): State<AppState>,
    Json(settings): Json<PollSettings>,
) -> Response {
    let result = {
        let conn = match lock_db(&state.db) {
            Ok(conn) => conn,
            Err(e) => return database_error(&e),
        };
        PollSettingsDao::set_poll_settings(&conn, &settings)
    };

    match result {
        Ok(()) => {
            state
                .log("info", &format!("[POLLER] 轮询设置已更新: {settings:?}"))
                .await;
            Json(settings).into_response()
        }
        Err(e) => database_error(&e.to_string()),
    }
}
