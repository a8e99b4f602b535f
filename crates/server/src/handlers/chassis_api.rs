//! 单台机箱实时采集端点
//!
//! 请求体 `{ip, username?, password?}`，未提供用户名密码时通过凭证解析器获取。
//! 机箱侧失败时返回对应类别的 `NA` 占位结果，而不是错误。

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use ixinventory_core::credential::ChassisCredentials;
use ixinventory_scheduler::{CollectError, Collected, PollCategory};
use serde::{Deserialize, Serialize};

use super::{invalid_request, not_found, upstream_error};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisRequest {
    pub ip: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl ChassisRequest {
    /// 请求中同时给出用户名和密码时直接使用
    fn credentials(&self) -> Option<ChassisCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(ChassisCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBundleResponse {
    pub chassis_ip: String,
    pub result_url: String,
}

async fn live_collect(state: AppState, category: PollCategory, request: ChassisRequest) -> Response {
    let ip = request.ip.trim().to_string();
    if ip.is_empty() {
        return invalid_request("ip 不能为空");
    }

    let chassis_type = match state.poller.chassis_type(&ip) {
        Ok(chassis_type) => chassis_type,
        Err(e) => {
            tracing::warn!("[CHASSIS] 读取 {} 的机箱类型失败，按 NA 处理: {}", ip, e);
            "NA".to_string()
        }
    };

    match state
        .poller
        .collect_one(&ip, category, request.credentials(), &chassis_type)
        .await
    {
        Ok(collected) => Json(collected).into_response(),
        Err(CollectError::Credential(e)) => not_found(&e.to_string()),
        Err(CollectError::Chassis(e)) => {
            state
                .log("warn", &format!("[CHASSIS] {ip} 实时采集 {category} 失败: {e}"))
                .await;
            Json(Collected::unavailable(category, &ip)).into_response()
        }
    }
}

/// POST /chassis/summary
pub async fn chassis_summary(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Chassis, request).await
}

/// POST /chassis/cards
pub async fn chassis_cards(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Cards, request).await
}

/// POST /chassis/ports
pub async fn chassis_ports(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Ports, request).await
}

/// POST /chassis/licensing
pub async fn chassis_licensing(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Licensing, request).await
}

/// POST /chassis/sensors
pub async fn chassis_sensors(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Sensors, request).await
}

/// POST /chassis/performance
pub async fn chassis_performance(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    live_collect(state, PollCategory::Performance, request).await
}

/// POST /chassis/logs - 触发日志收集并返回下载地址
pub async fn chassis_logs(
    State(state): State<AppState>,
    Json(request): Json<ChassisRequest>,
) -> Response {
    let ip = request.ip.trim().to_string();
    if ip.is_empty() {
        return invalid_request("ip 不能为空");
    }

    let session = match state.poller.open_session(&ip, request.credentials()).await {
        Ok(session) => session,
        Err(CollectError::Credential(e)) => return not_found(&e.to_string()),
        Err(CollectError::Chassis(e)) => {
            state
                .log("error", &format!("[CHASSIS] {ip} 登录失败，无法收集日志: {e}"))
                .await;
            return upstream_error(&e.to_string());
        }
    };

    match session.collect_logs().await {
        Ok(result_url) => {
            state
                .log("info", &format!("[CHASSIS] {ip} 日志收集完成: {result_url}"))
                .await;
            Json(LogBundleResponse {
                chassis_ip: ip,
                result_url,
            })
            .into_response()
        }
        Err(e) => {
            state
                .log("error", &format!("[CHASSIS] {ip} 日志收集失败: {e}"))
                .await;
            upstream_error(&e.to_string())
        }
    }
}
