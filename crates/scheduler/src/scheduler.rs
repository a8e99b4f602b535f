//! 周期轮询
//!
//! 每个检查周期读取数据库中的轮询间隔，执行已到期的类别。

use crate::poller::InventoryPoller;
use crate::types::PollCategory;
use ixinventory_core::database::dao::{PollSettings, PollSettingsDao};
use ixinventory_core::database::{lock_db, DbConnection};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tokio_util::sync::CancellationToken;

/// 返回到期的类别：从未执行过，或距上次执行已超过间隔
pub fn due_categories(
    settings: &PollSettings,
    last_run: &HashMap<PollCategory, Instant>,
    now: Instant,
) -> Vec<PollCategory> {
    PollCategory::ALL
        .into_iter()
        .filter(|category| {
            let minutes = category.interval_minutes(settings);
            if minutes == 0 {
                return false;
            }
            match last_run.get(category) {
                Some(last) => {
                    now.saturating_duration_since(*last)
                        >= Duration::from_secs(u64::from(minutes) * 60)
                }
                None => true,
            }
        })
        .collect()
}

pub struct PollScheduler {
    poller: Arc<InventoryPoller>,
    db: DbConnection,
    tick: Duration,
    cancel_token: CancellationToken,
}

impl PollScheduler {
    pub fn new(poller: Arc<InventoryPoller>, db: DbConnection, tick: Duration) -> Self {
        Self {
            poller,
            db,
            tick,
            cancel_token: CancellationToken::new(),
        }
    }

    /// 在后台任务中启动检查循环
    pub fn start(&self) -> JoinHandle<()> {
        let poller = self.poller.clone();
        let db = self.db.clone();
        let tick = self.tick;
        let cancel_token = self.cancel_token.clone();

        tokio::spawn(async move {
            tracing::info!("[POLLER] 启动周期轮询，检查间隔: {} 秒", tick.as_secs());

            let mut ticker = interval(tick);
            let mut last_run: HashMap<PollCategory, Instant> = HashMap::new();

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        Self::run_due(&poller, &db, &mut last_run).await;
                    }
                    _ = cancel_token.cancelled() => {
                        tracing::info!("[POLLER] 收到取消信号，停止周期轮询");
                        break;
                    }
                }
            }

            tracing::info!("[POLLER] 周期轮询已停止");
        })
    }

    pub fn stop(&self) {
        tracing::info!("[POLLER] 请求停止周期轮询");
        self.cancel_token.cancel();
    }

    async fn run_due(
        poller: &InventoryPoller,
        db: &DbConnection,
        last_run: &mut HashMap<PollCategory, Instant>,
    ) {
        let settings = match Self::read_settings(db) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::error!("[POLLER] 读取轮询设置失败: {}", e);
                return;
            }
        };

        for category in due_categories(&settings, last_run, Instant::now()) {
            // 失败也记录执行时间，避免每个检查周期重复冲击不可达的机箱
            last_run.insert(category, Instant::now());
            if let Err(e) = poller.poll(category).await {
                tracing::error!("[POLLER] {} 周期轮询失败: {}", category, e);
            }
        }
    }

    fn read_settings(db: &DbConnection) -> Result<PollSettings, String> {
        let conn = lock_db(db)?;
        PollSettingsDao::get_poll_settings(&conn).map_err(|e| e.to_string())
    }
}
