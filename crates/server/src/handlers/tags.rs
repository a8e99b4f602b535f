//! 用户标签端点

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    Json,
};
use ixinventory_core::database::dao::{TagDao, TagError, TagKind, TagOperation};
use ixinventory_core::database::lock_db;
use serde::{Deserialize, Serialize};

use super::{database_error, invalid_request};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TagUpdateRequest {
    /// 机箱 ip 或板卡序列号
    pub key: String,
    /// 逗号分隔
    pub tags: String,
    pub operation: String,
}

#[derive(Debug, Serialize)]
pub struct TagUpdateResponse {
    pub key: String,
    pub tags: Vec<String>,
}

fn tag_error_response(error: TagError) -> Response {
    match error {
        TagError::Database(e) => database_error(&e.to_string()),
        other => invalid_request(&other.to_string()),
    }
}

/// GET /api/tags/:kind
pub async fn get_tags(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let kind = match kind.parse::<TagKind>() {
        Ok(kind) => kind,
        Err(e) => return tag_error_response(e),
    };

    let conn = match lock_db(&state.db) {
        Ok(conn) => conn,
        Err(e) => return database_error(&e),
    };

    match TagDao::get_tags(&conn, kind) {
        Ok(tags) => Json(tags).into_response(),
        Err(e) => database_error(&e.to_string()),
    }
}

/// POST /api/tags/:kind - `{key, tags: "a,b", operation: add|remove}`
pub async fn update_tags(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(request): Json<TagUpdateRequest>,
) -> Response {
    let (kind, operation) = match (
        kind.parse::<TagKind>(),
        request.operation.parse::<TagOperation>(),
    ) {
        (Ok(kind), Ok(operation)) => (kind, operation),
        (Err(e), _) | (_, Err(e)) => return tag_error_response(e),
    };

    let result = {
        let mut conn = match lock_db(&state.db) {
            Ok(conn) => conn,
            Err(e) => return database_error(&e),
        };
        TagDao::update_tags(&mut conn, kind, &request.key, &request.tags, operation)
    };

    match result {
        Ok(tags) => {
            state
                .log(
                    "info",
                    &format!(
                        "[TAGS] {:?} {} 标签更新为 [{}]",
                        kind,
                        request.key.trim(),
                        tags.join(",")
                    ),
                )
                .await;
            Json(TagUpdateResponse {
                key: request.key.trim().to_string(),
                tags,
            })
            .into_response()
        }
        Err(e) => tag_error_response(e),
    }
}
