//! HTTP API 服务器
//!
//! - `/chassis/*`: 单台机箱实时采集
//! - `/api/inventory/*`、`/api/poll/*`: 已保存快照与按需轮询
//! - `/api/tags/*`、`/api/credentials/*`: 标签和凭证维护

pub mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use ixinventory_core::config::ServerConfig;
use ixinventory_core::credential::{CredentialResolver, FileCredentialSource};
use ixinventory_core::database::DbConnection;
use ixinventory_core::logger::SharedLogStore;
use ixinventory_scheduler::InventoryPoller;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;

/// 凭证上传等请求体上限
const BODY_LIMIT: usize = 2 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("无效的监听地址 {addr}: {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error("无法绑定到 {addr}: {source}。请检查地址是否有效或端口是否被占用。")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("服务器运行错误: {0}")]
    Serve(#[from] std::io::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbConnection,
    pub resolver: Arc<CredentialResolver>,
    pub poller: Arc<InventoryPoller>,
    /// 凭证上传写入的本地文件
    pub credential_file: Arc<FileCredentialSource>,
    pub logs: SharedLogStore,
}

impl AppState {
    pub fn new(
        poller: Arc<InventoryPoller>,
        credential_file: Arc<FileCredentialSource>,
        logs: SharedLogStore,
    ) -> Self {
        Self {
            db: poller.db().clone(),
            resolver: poller.resolver().clone(),
            poller,
            credential_file,
            logs,
        }
    }

    /// 同时写入 tracing 和内存日志
    pub async fn log(&self, level: &str, message: &str) {
        match level {
            "error" => tracing::error!("{}", message),
            "warn" => tracing::warn!("{}", message),
            _ => tracing::info!("{}", message),
        }
        self.logs.write().await.add(level, message);
    }
}

pub struct ServerState {
    pub config: ServerConfig,
    pub running: bool,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: false,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// 先绑定端口再在后台任务中提供服务，绑定失败直接返回错误
    pub async fn start(&mut self, state: AppState) -> Result<(), ServerError> {
        if self.running {
            return Ok(());
        }

        let listener = bind(&self.config.host, self.config.port).await?;
        let (tx, rx) = oneshot::channel();
        self.shutdown_tx = Some(tx);

        self.handle = Some(tokio::spawn(async move {
            if let Err(e) = serve(listener, state, rx).await {
                tracing::error!("[SERVER] 服务器错误: {}", e);
            }
        }));

        self.running = true;
        Ok(())
    }

    /// 发送关闭信号并等待正在处理的请求结束
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::error!("[SERVER] 服务器任务异常退出: {}", e);
            }
        }
        self.running = false;
    }
}

pub fn build_router(state: AppState) -> Router {
    let chassis_routes = Router::new()
        .route("/chassis/summary", post(handlers::chassis_summary))
        .route("/chassis/cards", post(handlers::chassis_cards))
        .route("/chassis/ports", post(handlers::chassis_ports))
        .route("/chassis/licensing", post(handlers::chassis_licensing))
        .route("/chassis/sensors", post(handlers::chassis_sensors))
        .route("/chassis/performance", post(handlers::chassis_performance))
        .route("/chassis/logs", post(handlers::chassis_logs));

    let inventory_routes = Router::new()
        .route("/api/inventory/:category", get(handlers::get_inventory))
        .route(
            "/api/inventory/performance/:ip/history",
            get(handlers::get_perf_history),
        )
        .route("/api/poll/:target", post(handlers::run_poll))
        .route(
            "/api/poll-settings",
            get(handlers::get_poll_settings).put(handlers::put_poll_settings),
        );

    let tag_routes = Router::new().route(
        "/api/tags/:kind",
        get(handlers::get_tags).post(handlers::update_tags),
    );

    let credential_routes = Router::new()
        .route("/api/credentials/status", get(handlers::credentials_status))
        .route("/api/credentials/refresh", post(handlers::credentials_refresh))
        .route("/api/credentials/upload", post(handlers::credentials_upload));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/logs", get(handlers::get_logs))
        .merge(chassis_routes)
        .merge(inventory_routes)
        .merge(tag_routes)
        .merge(credential_routes)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn bind(host: &str, port: u16) -> Result<tokio::net::TcpListener, ServerError> {
    let addr = format!("{host}:{port}");
    let socket: std::net::SocketAddr =
        addr.parse().map_err(|e: std::net::AddrParseError| ServerError::InvalidAddress {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;

    tokio::net::TcpListener::bind(socket)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: oneshot::Receiver<()>,
) -> Result<(), ServerError> {
    let app = build_router(state);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("[SERVER] 监听 {}", addr);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await?;

    tracing::info!("[SERVER] 服务器已停止");
    Ok(())
}
