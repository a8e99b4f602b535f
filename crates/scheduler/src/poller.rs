//! 库存轮询器
//!
//! 机箱列表取自凭证解析器当前映射的 ip 集合。所有机箱 I/O 完成后
//! 才获取数据库锁写入快照。

use crate::collector::{collect, CollectError, Collected};
use crate::types::{PollCategory, PollError, PollReport};
use ixinventory_core::credential::{ChassisCredentials, CredentialResolver, CredentialSourceKind};
use ixinventory_core::database::dao::{InventoryDao, TagDao, TagKind};
use ixinventory_core::database::{lock_db, DbConnection};
use ixinventory_core::models::{
    CardRecord, ChassisSummary, LicenseRecord, PerfRecord, PortRecord, SensorRecord,
};
use ixinventory_providers::chassis::{ChassisApi, ChassisConnector};
use std::collections::HashMap;
use std::sync::Arc;

/// 一次轮询收集到的全部记录
#[derive(Default)]
struct Batch {
    summaries: Vec<ChassisSummary>,
    cards: Vec<CardRecord>,
    ports: Vec<PortRecord>,
    licenses: Vec<LicenseRecord>,
    sensors: Vec<SensorRecord>,
    perf: Vec<PerfRecord>,
}

impl Batch {
    fn push(&mut self, collected: Collected) {
        match collected {
            Collected::Chassis(summary) => self.summaries.push(summary),
            Collected::Cards(records) => self.cards.extend(records),
            Collected::Ports(records) => self.ports.extend(records),
            Collected::Licensing(records) => self.licenses.extend(records),
            Collected::Sensors(records) => self.sensors.extend(records),
            Collected::Performance(record) => self.perf.push(record),
        }
    }
}

pub struct InventoryPoller {
    db: DbConnection,
    resolver: Arc<CredentialResolver>,
    connector: Arc<dyn ChassisConnector>,
    history_retention: usize,
}

impl InventoryPoller {
    pub fn new(
        db: DbConnection,
        resolver: Arc<CredentialResolver>,
        connector: Arc<dyn ChassisConnector>,
        history_retention: usize,
    ) -> Self {
        Self {
            db,
            resolver,
            connector,
            history_retention,
        }
    }

    pub fn resolver(&self) -> &Arc<CredentialResolver> {
        &self.resolver
    }

    pub fn db(&self) -> &DbConnection {
        &self.db
    }

    /// 已保存的机箱类型，未知时为 `NA`
    pub fn chassis_type(&self, ip: &str) -> Result<String, PollError> {
        let conn = lock_db(&self.db).map_err(PollError::Lock)?;
        Ok(InventoryDao::chassis_type_for(&conn, ip)?)
    }

    /// 打开机箱会话；未提供凭证时通过解析器获取
    pub async fn open_session(
        &self,
        ip: &str,
        credentials: Option<ChassisCredentials>,
    ) -> Result<Box<dyn ChassisApi>, CollectError> {
        let credentials = match credentials {
            Some(credentials) => credentials,
            None => self.resolver.resolve(ip).await?,
        };
        Ok(self.connector.connect(ip, &credentials).await?)
    }

    /// 实时采集单台机箱（不写库）
    pub async fn collect_one(
        &self,
        ip: &str,
        category: PollCategory,
        credentials: Option<ChassisCredentials>,
        chassis_type: &str,
    ) -> Result<Collected, CollectError> {
        let session = self.open_session(ip, credentials).await?;
        Ok(collect(session.as_ref(), category, chassis_type).await?)
    }

    /// 轮询一个类别并替换对应快照
    pub async fn poll(&self, category: PollCategory) -> Result<PollReport, PollError> {
        let fleet: Vec<String> = self.resolver.load(false).await.keys().cloned().collect();
        // 服务宕机且本地文件为空时不代表机箱已下线
        if fleet.is_empty() && self.resolver.source() == Some(CredentialSourceKind::File) {
            tracing::warn!(
                "[POLLER] 凭证服务不可用且本地文件为空，保留现有 {} 快照",
                category
            );
            return Ok(PollReport::new(category));
        }
        tracing::info!("[POLLER] 开始轮询 {}，共 {} 台机箱", category, fleet.len());

        let chassis_types: HashMap<String, String> = {
            let conn = lock_db(&self.db).map_err(PollError::Lock)?;
            let mut types = HashMap::with_capacity(fleet.len());
            for ip in &fleet {
                types.insert(ip.clone(), InventoryDao::chassis_type_for(&conn, ip)?);
            }
            types
        };

        let mut report = PollReport::new(category);
        let mut batch = Batch::default();
        for ip in &fleet {
            let chassis_type = chassis_types.get(ip).map(String::as_str).unwrap_or("NA");
            match self.collect_one(ip, category, None, chassis_type).await {
                Ok(collected) => {
                    report.polled += 1;
                    batch.push(collected);
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!("[POLLER] {} 采集 {} 失败: {}", ip, category, e);
                    if category == PollCategory::Chassis {
                        batch.push(Collected::unavailable(category, ip));
                    }
                }
            }
        }

        report.records = self.store(category, batch)?;
        tracing::info!(
            "[POLLER] {} 轮询完成: 成功 {}，失败 {}，写入 {} 条",
            category,
            report.polled,
            report.failed,
            report.records
        );
        Ok(report)
    }

    /// 依次轮询全部类别；单个类别失败不影响其他类别
    pub async fn poll_all(&self) -> Vec<Result<PollReport, PollError>> {
        let mut reports = Vec::with_capacity(PollCategory::ALL.len());
        for category in PollCategory::ALL {
            let result = self.poll(category).await;
            if let Err(e) = &result {
                tracing::error!("[POLLER] {} 轮询失败: {}", category, e);
            }
            reports.push(result);
        }
        reports
    }

    fn store(&self, category: PollCategory, mut batch: Batch) -> Result<usize, PollError> {
        let mut conn = lock_db(&self.db).map_err(PollError::Lock)?;
        let written = match category {
            PollCategory::Chassis => {
                let tags = TagDao::get_tags(&conn, TagKind::Chassis)?;
                for summary in &mut batch.summaries {
                    if let Some(list) = tags.get(&summary.chassis_ip) {
                        summary.tags = list.join(",");
                    }
                }
                InventoryDao::replace_summaries(&mut conn, &batch.summaries)?;
                batch.summaries.len()
            }
            PollCategory::Cards => {
                let tags = TagDao::get_tags(&conn, TagKind::Card)?;
                for card in &mut batch.cards {
                    if let Some(list) = tags.get(&card.serial_number) {
                        card.tags = list.join(",");
                    }
                }
                InventoryDao::replace_cards(&mut conn, &batch.cards)?;
                batch.cards.len()
            }
            PollCategory::Ports => {
                InventoryDao::replace_ports(&mut conn, &batch.ports)?;
                batch.ports.len()
            }
            PollCategory::Licensing => {
                InventoryDao::replace_licenses(&mut conn, &batch.licenses)?;
                batch.licenses.len()
            }
            PollCategory::Sensors => {
                InventoryDao::replace_sensors(&mut conn, &batch.sensors)?;
                batch.sensors.len()
            }
            PollCategory::Performance => {
                InventoryDao::replace_perf(&mut conn, &batch.perf)?;
                InventoryDao::append_perf_history(&mut conn, &batch.perf, self.history_retention)?;
                batch.perf.len()
            }
        };
        Ok(written)
    }
}
