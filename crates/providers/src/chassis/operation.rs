//! 异步操作状态
//!
//! License 查询和日志收集在机箱上以异步操作执行，POST 后返回
//! `{id, state, url, resultUrl}`，需要轮询 `url` 直到进入终态。

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub result_url: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

impl OperationStatus {
    pub fn phase(&self) -> OperationState {
        match self.state.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" | "COMPLETED" => OperationState::Succeeded,
            "ERROR" | "FAILED" | "EXCEPTION" => OperationState::Failed,
            _ => OperationState::InProgress,
        }
    }

    /// 失败时的描述
    pub fn failure_message(&self) -> String {
        self.message
            .clone()
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| format!("state={}", self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_state() {
        let status: OperationStatus = serde_json::from_value(serde_json::json!({
            "id": 7,
            "state": "IN_PROGRESS",
            "url": "/platform/api/v2/operations/7"
        }))
        .unwrap();
        assert_eq!(status.phase(), OperationState::InProgress);
        assert!(status.result_url.is_none());

        let done: OperationStatus = serde_json::from_value(serde_json::json!({
            "state": "completed",
            "resultUrl": "/platform/api/v2/operations/7/result"
        }))
        .unwrap();
        assert_eq!(done.phase(), OperationState::Succeeded);

        let failed: OperationStatus =
            serde_json::from_value(serde_json::json!({"state": "ERROR", "message": "no server"}))
                .unwrap();
        assert_eq!(failed.phase(), OperationState::Failed);
        assert_eq!(failed.failure_message(), "no server");
    }
}
