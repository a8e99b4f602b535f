//! 通过 `oneshot` 驱动 Router 的端到端测试

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ixinventory_core::credential::{
    ChassisCredentials, CredentialMap, CredentialRecord, CredentialResolver, CredentialSource,
    FileCredentialSource, ResolverSettings, SourceError,
};
use ixinventory_core::config::ServerConfig;
use ixinventory_core::database::open_in_memory;
use ixinventory_core::logger::shared_log_store;
use ixinventory_providers::chassis::{ChassisApi, ChassisConnector, ChassisError};
use ixinventory_scheduler::InventoryPoller;
use ixinventory_server::{build_router, AppState, ServerError, ServerState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

struct FixedService(Option<CredentialMap>);

#[async_trait]
impl CredentialSource for FixedService {
    async fn fetch(&self) -> Result<CredentialMap, SourceError> {
        self.0
            .clone()
            .ok_or_else(|| SourceError::ServiceUnavailable("offline".to_string()))
    }
}

#[derive(Clone)]
struct FakeChassis {
    ip: String,
    logs_available: bool,
}

#[async_trait]
impl ChassisApi for FakeChassis {
    fn ip(&self) -> &str {
        &self.ip
    }

    async fn chassis(&self) -> Result<Value, ChassisError> {
        Ok(json!({
            "type": "Ixia XGS2",
            "serialNumber": "SN-1",
            "state": "UP",
            "ixosApplications": [{"name": "IxOS", "version": "10.00"}]
        }))
    }

    async fn cards(&self) -> Result<Vec<Value>, ChassisError> {
        Ok(vec![json!({"cardNumber": 1, "serialNumber": "C-1", "type": "K400", "numberOfPorts": 8})])
    }

    async fn ports(&self) -> Result<Vec<Value>, ChassisError> {
        Ok(vec![json!({"cardNumber": 1, "portNumber": 1, "owner": "alice"})])
    }

    async fn sensors(&self) -> Result<Vec<Value>, ChassisError> {
        Ok(vec![])
    }

    async fn perf_counters(&self) -> Result<Value, ChassisError> {
        Ok(json!({"memoryInUseBytes": 1024, "memoryTotalBytes": 4096, "cpuUsagePercent": 12}))
    }

    async fn license_host_id(&self) -> Result<String, ChassisError> {
        Ok("HOST-1".to_string())
    }

    async fn licenses(&self) -> Result<Vec<Value>, ChassisError> {
        Ok(vec![])
    }

    async fn collect_logs(&self) -> Result<String, ChassisError> {
        if self.logs_available {
            Ok(format!("https://{}/logs/bundle.zip", self.ip))
        } else {
            Err(ChassisError::OperationFailed("disk full".to_string()))
        }
    }
}

struct FakeConnector(HashMap<String, FakeChassis>);

#[async_trait]
impl ChassisConnector for FakeConnector {
    async fn connect(
        &self,
        ip: &str,
        _credentials: &ChassisCredentials,
    ) -> Result<Box<dyn ChassisApi>, ChassisError> {
        match self.0.get(ip) {
            Some(chassis) => Ok(Box::new(chassis.clone())),
            None => Err(ChassisError::Auth(format!("{ip} unreachable"))),
        }
    }
}

struct Harness {
    app: Router,
    _dir: TempDir,
}

fn harness(service_ips: Option<&[&str]>) -> Harness {
    let (state, dir) = app_state(service_ips);
    Harness {
        app: build_router(state),
        _dir: dir,
    }
}

/// `service_ips` 为 None 时凭证服务不可用，解析器使用本地文件
fn app_state(service_ips: Option<&[&str]>) -> (AppState, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let file = Arc::new(FileCredentialSource::new(dir.path().join("credentials.json")));

    let service_map = service_ips.map(|ips| {
        ips.iter()
            .map(|ip| (ip.to_string(), CredentialRecord::new(*ip, "admin", "secret-pw")))
            .collect::<CredentialMap>()
    });
    let resolver = Arc::new(CredentialResolver::new(
        ResolverSettings::new(Duration::from_secs(300), 0.5),
        Arc::new(FixedService(service_map)),
        file.clone(),
    ));

    let connector = FakeConnector(
        [
            FakeChassis {
                ip: "10.0.0.1".to_string(),
                logs_available: true,
            },
            FakeChassis {
                ip: "10.0.0.2".to_string(),
                logs_available: false,
            },
        ]
        .into_iter()
        .map(|c| (c.ip.clone(), c))
        .collect(),
    );

    let poller = Arc::new(InventoryPoller::new(
        open_in_memory().unwrap(),
        resolver,
        Arc::new(connector),
        10,
    ));
    (AppState::new(poller, file, shared_log_store(100)), dir)
}

async fn send(app: &Router, method: &str, uri: &str, body: Body, content_type: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", content_type)
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, "GET", uri, Body::empty(), "application/json").await
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    send(app, "POST", uri, Body::from(body.to_string()), "application/json").await
}

async fn post_text(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    send(app, "POST", uri, Body::from(body.to_string()), "text/plain").await
}

#[tokio::test]
async fn test_health() {
    let h = harness(Some(&["10.0.0.1"]));
    let (status, body) = get(&h.app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_live_summary_resolves_credentials() {
    let h = harness(Some(&["10.0.0.1"]));
    let (status, body) = post_json(&h.app, "/chassis/summary", json!({"ip": "10.0.0.1"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chassisIp"], "10.0.0.1");
    assert_eq!(body["chassisType"], "Ixia_XGS2");
    assert_eq!(body["os"], "Linux");
    assert_eq!(body["IxOS"], "10.00");
}

#[tokio::test]
async fn test_live_call_unknown_ip_is_not_found() {
    let h = harness(Some(&["10.0.0.1"]));
    let (status, body) = post_json(&h.app, "/chassis/ports", json!({"ip": "10.9.9.9"})).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "not_found");
}

#[tokio::test]
async fn test_live_call_unreachable_chassis_returns_placeholder() {
    let h = harness(Some(&["10.0.0.1"]));
    let (status, body) = post_json(
        &h.app,
        "/chassis/cards",
        json!({"ip": "10.0.0.5", "username": "admin", "password": "pw"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["chassisIp"], "10.0.0.5");
    assert_eq!(body[0]["cardNumber"], "NA");
}

#[tokio::test]
async fn test_collect_logs() {
    let h = harness(Some(&["10.0.0.1", "10.0.0.2"]));

    let (status, body) = post_json(&h.app, "/chassis/logs", json!({"ip": "10.0.0.1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chassisIp"], "10.0.0.1");
    assert_eq!(body["resultUrl"], "https://10.0.0.1/logs/bundle.zip");

    let (status, body) = post_json(&h.app, "/chassis/logs", json!({"ip": "10.0.0.2"})).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "upstream_error");
}

#[tokio::test]
async fn test_poll_then_read_inventory() {
    let h = harness(Some(&["10.0.0.1", "10.0.0.3"]));

    let (status, report) = post_json(&h.app, "/api/poll/chassis", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["category"], "chassis");
    assert_eq!(report["polled"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["records"], 2);

    let (status, rows) = get(&h.app, "/api/inventory/chassis").await;
    assert_eq!(status, StatusCode::OK);
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["chassisIp"], "10.0.0.3");
    assert_eq!(rows[1]["chassisStatus"], "Not Reachable");

    let (_, logs) = get(&h.app, "/api/logs?limit=10").await;
    assert!(!logs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_poll_all_and_perf_history() {
    let h = harness(Some(&["10.0.0.1"]));

    let (status, outcomes) = post_json(&h.app, "/api/poll/all", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcomes.as_array().unwrap().len(), 6);

    let (status, history) = get(&h.app, "/api/inventory/performance/10.0.0.1/history").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_category_is_invalid_request() {
    let h = harness(Some(&["10.0.0.1"]));

    let (status, body) = get(&h.app, "/api/inventory/fans").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");

    let (status, _) = post_json(&h.app, "/api/poll/fans", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_poll_settings_round_trip() {
    let h = harness(Some(&["10.0.0.1"]));

    let (status, defaults) = get(&h.app, "/api/poll-settings").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(defaults["licensing"], 1440);

    let updated = json!({"chassis": 5, "cards": 0, "ports": 15, "sensors": 1, "licensing": 60, "perf": 2});
    let (status, _) = send(
        &h.app,
        "PUT",
        "/api/poll-settings",
        Body::from(updated.to_string()),
        "application/json",
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, stored) = get(&h.app, "/api/poll-settings").await;
    assert_eq!(stored, updated);
}

#[tokio::test]
async fn test_tags_add_and_list() {
    let h = harness(Some(&["10.0.0.1"]));

    let (status, body) = post_json(
        &h.app,
        "/api/tags/chassis",
        json!({"key": "10.0.0.1", "tags": "lab, rack1", "operation": "add"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tags"], json!(["lab", "rack1"]));

    let (status, all) = get(&h.app, "/api/tags/chassis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["10.0.0.1"], json!(["lab", "rack1"]));

    let (status, body) = post_json(
        &h.app,
        "/api/tags/chassis",
        json!({"key": "10.0.0.1", "tags": "lab", "operation": "rename"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");

    let (status, _) = get(&h.app, "/api/tags/port").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credentials_refresh_and_status_hide_passwords() {
    let h = harness(Some(&["10.0.0.1", "10.0.0.2"]));

    let (status, body) = post_json(&h.app, "/api/credentials/refresh", json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"source": "service", "chassisCount": 2}));

    let (status, body) = get(&h.app, "/api/credentials/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["serviceAvailable"], true);
    assert_eq!(body["cacheValid"], true);
    assert_eq!(body["chassisCount"], 2);
    assert!(!body.to_string().contains("secret-pw"));
}

#[tokio::test]
async fn test_credentials_upload_updates_file_source() {
    let h = harness(None);

    let (_, body) = post_json(&h.app, "/api/credentials/refresh", json!({})).await;
    assert_eq!(body, json!({"source": "file", "chassisCount": 0}));

    let (status, summary) = post_text(
        &h.app,
        "/api/credentials/upload",
        "ADD,10.0.0.1,admin,pw1\nADD,10.0.0.2,admin,pw2\n",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["added"], 2);
    assert_eq!(summary["chassisCount"], 2);

    // 上传后缓存失效，下一次实时调用直接读取新文件
    let (status, body) = post_json(&h.app, "/chassis/summary", json!({"ip": "10.0.0.1"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["chassisIp"], "10.0.0.1");

    let (status, body) = post_text(&h.app, "/api/credentials/upload", "RENAME,10.0.0.1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_request");
}

#[tokio::test]
async fn test_server_start_and_stop() {
    let (state, _dir) = app_state(Some(&["10.0.0.1"]));
    let mut server = ServerState::new(ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    });

    server.start(state.clone()).await.unwrap();
    assert!(server.running);
    // 重复启动不会再次绑定
    server.start(state).await.unwrap();

    server.stop().await;
    assert!(!server.running);
}

#[tokio::test]
async fn test_server_rejects_invalid_host() {
    let (state, _dir) = app_state(None);
    let mut server = ServerState::new(ServerConfig {
        host: "not a host".to_string(),
        port: 8080,
    });

    let result = server.start(state).await;
    assert!(matches!(result, Err(ServerError::InvalidAddress { .. })));
    assert!(!server.running);
}
