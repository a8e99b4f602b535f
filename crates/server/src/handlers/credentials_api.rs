//! 凭证管理端点
//!
//! 任何响应都不包含密码。

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use ixinventory_core::credential::{
    apply_credential_updates, CredentialSourceKind, CredentialUpdateError,
};
use serde::Serialize;

use super::{database_error, invalid_request};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub source: CredentialSourceKind,
    pub chassis_count: usize,
}

/// GET /api/credentials/status
pub async fn credentials_status(State(state): State<AppState>) -> Response {
    Json(state.resolver.status().await).into_response()
}

/// POST /api/credentials/refresh - 绕过缓存立即重新加载
pub async fn credentials_refresh(State(state): State<AppState>) -> Response {
    let outcome = state.resolver.refresh().await;
    state
        .log(
            "info",
            &format!(
                "[CREDENTIAL] 手动刷新凭证: 来源 {}，共 {} 台机箱",
                outcome.source,
                outcome.entries.len()
            ),
        )
        .await;

    Json(RefreshResponse {
        source: outcome.source,
        chassis_count: outcome.entries.len(),
    })
    .into_response()
}

/// POST /api/credentials/upload - 文本请求体，每行 `OPERATION,ip,username,password`
pub async fn credentials_upload(State(state): State<AppState>, body: String) -> Response {
    match apply_credential_updates(&state.credential_file, &body) {
        Ok(summary) => {
            state.resolver.invalidate();
            state
                .log(
                    "info",
                    &format!(
                        "[CREDENTIAL] 凭证文件已上传，共 {} 台机箱",
                        summary.chassis_count
                    ),
                )
                .await;
            Json(summary).into_response()
        }
        Err(
            e @ (CredentialUpdateError::Malformed { .. }
            | CredentialUpdateError::UnknownOperation { .. }
            | CredentialUpdateError::UnknownIp { .. }),
        ) => invalid_request(&e.to_string()),
        Err(e) => {
            state
                .log("error", &format!("[CREDENTIAL] 凭证文件更新失败: {e}"))
                .await;
            database_error(&e.to_string())
        }
    }
}
