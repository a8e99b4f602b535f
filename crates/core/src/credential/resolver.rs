//! 凭证解析器
//!
//! 为机箱 ip 提供登录用的用户名密码。数据来源依次为：
//! 1. 进程内缓存（有效期内不做任何 I/O）
//! 2. 远程凭证服务
//! 3. 本地凭证文件（服务不可用时降级）
//!
//! 降级到文件时缓存有效期按 `fallback_ttl_factor` 缩短，使系统更快回到
//! 权威的凭证服务，同时避免每个请求都去访问已经宕机的服务。
//!
//! 刷新过程由 `refresh_lock` 串行化；等待锁的调用方会复用前一个刷新的结果，
//! 所以冷启动时的并发请求只会触发一次远程获取。缓存读写锁从不跨越 I/O 持有。

use super::source::{CredentialSource, FileCredentialSource, ServiceCredentialSource};
use super::types::{
    ChassisCredentials, CredentialError, CredentialMap, CredentialSourceKind, ResolverStatus,
};
use crate::config::CredentialConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// 解析 miss 时，缓存至少达到该年龄才会触发补充刷新
const MISS_REFRESH_MIN_AGE: Duration = Duration::from_secs(10);

/// 缓存有效期设置
#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub ttl: Duration,
    pub fallback_ttl_factor: f64,
}

impl ResolverSettings {
    pub fn new(ttl: Duration, fallback_ttl_factor: f64) -> Self {
        Self {
            ttl,
            fallback_ttl_factor,
        }
    }

    /// 指定来源对应的有效期
    pub fn effective_ttl(&self, source: CredentialSourceKind) -> Duration {
        match source {
            CredentialSourceKind::Service => self.ttl,
            CredentialSourceKind::File => self.ttl.mul_f64(self.fallback_ttl_factor),
        }
    }
}

impl From<&CredentialConfig> for ResolverSettings {
    fn from(config: &CredentialConfig) -> Self {
        Self::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.fallback_ttl_factor,
        )
    }
}

/// 刷新结果
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub entries: Arc<CredentialMap>,
    pub source: CredentialSourceKind,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: Arc<CredentialMap>,
    fetched_at: Option<Instant>,
    source: Option<CredentialSourceKind>,
    /// 每次整体替换后递增
    generation: u64,
}

impl CacheState {
    fn is_fresh(&self, settings: &ResolverSettings, now: Instant) -> bool {
        match (self.fetched_at, self.source) {
            (Some(fetched_at), Some(source)) => {
                now.saturating_duration_since(fetched_at) < settings.effective_ttl(source)
            }
            _ => false,
        }
    }

    fn age(&self, now: Instant) -> Option<Duration> {
        self.fetched_at
            .map(|fetched_at| now.saturating_duration_since(fetched_at))
    }
}

/// 一次加载得到的快照
struct Snapshot {
    entries: Arc<CredentialMap>,
    generation: u64,
    /// 是否由本次调用刷新得到
    refreshed: bool,
}

/// 凭证解析器
pub struct CredentialResolver {
    settings: ResolverSettings,
    service: Arc<dyn CredentialSource>,
    file: Arc<dyn CredentialSource>,
    state: RwLock<CacheState>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl CredentialResolver {
    /// 创建解析器（缓存为空，首次查询时加载）
    pub fn new(
        settings: ResolverSettings,
        service: Arc<dyn CredentialSource>,
        file: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            settings,
            service,
            file,
            state: RwLock::new(CacheState::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// 使用配置创建默认来源（HTTP 凭证服务 + 本地文件）
    pub fn from_config(config: &CredentialConfig) -> Self {
        Self::new(
            ResolverSettings::from(config),
            Arc::new(ServiceCredentialSource::from_config(config)),
            Arc::new(FileCredentialSource::from_config(config)),
        )
    }

    /// 解析机箱凭证
    ///
    /// # 错误
    /// - 缓存和两个来源中都没有该 ip 时返回 `CredentialError::NotFound`
    pub async fn resolve(&self, ip: &str) -> Result<ChassisCredentials, CredentialError> {
        let snapshot = self.load_snapshot().await;
        if let Some(record) = snapshot.entries.get(ip) {
            return Ok(record.credentials());
        }

        // 缓存可能落后于来源：较旧的快照在 miss 时补充刷新一次
        if !snapshot.refreshed && self.cache_age_at_least(MISS_REFRESH_MIN_AGE) {
            tracing::debug!("[CREDENTIAL] 缓存中没有 {}，尝试刷新", ip);
            let entries = self.refresh_after(snapshot.generation).await;
            if let Some(record) = entries.get(ip) {
                return Ok(record.credentials());
            }
        }

        tracing::warn!("[CREDENTIAL] 机箱未配置凭证: {}", ip);
        Err(CredentialError::NotFound(ip.to_string()))
    }

    /// 获取当前凭证映射
    ///
    /// `force_refresh` 为 false 且缓存在有效期内时不做任何 I/O。
    pub async fn load(&self, force_refresh: bool) -> Arc<CredentialMap> {
        if force_refresh {
            return self.refresh().await.entries;
        }
        self.load_snapshot().await.entries
    }

    /// 强制刷新（总是执行 I/O），返回最终提供数据的来源
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = self.refresh_lock.lock().await;
        self.fetch_and_store().await
    }

    /// 使缓存失效，下一次加载重新读取来源（保留现有条目供 status 展示）
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.fetched_at = None;
        state.generation = state.generation.wrapping_add(1);
    }

    /// 当前快照的来源（尚未加载时为 None）
    pub fn source(&self) -> Option<CredentialSourceKind> {
        self.state.read().source
    }

    /// 解析器状态（实时探测凭证服务，不影响缓存）
    pub async fn status(&self) -> ResolverStatus {
        let service_available = self.service.probe().await;
        let now = Instant::now();
        let state = self.state.read();
        ResolverStatus {
            service_available,
            cache_age_seconds: state.age(now).map(|age| age.as_secs_f64()),
            cache_valid: state.is_fresh(&self.settings, now),
            chassis_count: state.entries.len(),
            source: state.source,
        }
    }

    fn fresh_snapshot(&self) -> Option<Snapshot> {
        let state = self.state.read();
        state
            .is_fresh(&self.settings, Instant::now())
            .then(|| Snapshot {
                entries: state.entries.clone(),
                generation: state.generation,
                refreshed: false,
            })
    }

    fn cache_age_at_least(&self, min_age: Duration) -> bool {
        self.state
            .read()
            .age(Instant::now())
            .map(|age| age >= min_age)
            .unwrap_or(true)
    }

    async fn load_snapshot(&self) -> Snapshot {
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        let _guard = self.refresh_lock.lock().await;
        // 等锁期间其他调用方可能已经完成刷新
        if let Some(snapshot) = self.fresh_snapshot() {
            return snapshot;
        }

        let outcome = self.fetch_and_store().await;
        Snapshot {
            entries: outcome.entries,
            generation: self.state.read().generation,
            refreshed: true,
        }
    }

    /// 仅当缓存仍是 `seen_generation` 时刷新，否则复用更新的结果
    async fn refresh_after(&self, seen_generation: u64) -> Arc<CredentialMap> {
        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.state.read();
            if state.generation != seen_generation {
                return state.entries.clone();
            }
        }
        self.fetch_and_store().await.entries
    }

    /// 调用方必须持有 `refresh_lock`
    async fn fetch_and_store(&self) -> RefreshOutcome {
        let started = self.state.read().generation;
        match self.service.fetch().await {
            Ok(entries) => {
                tracing::info!("[CREDENTIAL] 从凭证服务加载 {} 台机箱凭证", entries.len());
                self.store(entries, CredentialSourceKind::Service, started)
            }
            Err(service_err) => {
                tracing::warn!("[CREDENTIAL] {}，降级到本地凭证文件", service_err);
                let entries = match self.file.fetch().await {
                    Ok(entries) => entries,
                    Err(file_err) => {
                        tracing::warn!("[CREDENTIAL] {}，按空凭证处理", file_err);
                        CredentialMap::new()
                    }
                };
                tracing::info!("[CREDENTIAL] 从本地文件加载 {} 台机箱凭证", entries.len());
                self.store(entries, CredentialSourceKind::File, started)
            }
        }
    }

    /// 获取期间发生过 `invalidate` 时，结果照常写入但不计入有效期
    fn store(
        &self,
        entries: CredentialMap,
        source: CredentialSourceKind,
        started: u64,
    ) -> RefreshOutcome {
        let entries = Arc::new(entries);
        let mut state = self.state.write();
        if state.generation == started {
            state.fetched_at = Some(Instant::now());
        } else {
            tracing::debug!("[CREDENTIAL] 刷新期间缓存已失效，下次加载重新获取");
            state.fetched_at = None;
        }
        state.entries = entries.clone();
        state.source = Some(source);
        state.generation = state.generation.wrapping_add(1);
        RefreshOutcome { entries, source }
    }
}
