//! 单台机箱的单类别采集

use ixinventory_core::credential::CredentialError;
use ixinventory_core::models::{
    CardRecord, ChassisSummary, LicenseRecord, PerfRecord, PortRecord, SensorRecord,
};
use ixinventory_providers::chassis::{ChassisApi, ChassisError};
use ixinventory_providers::normalizer;
use serde::Serialize;

use crate::types::PollCategory;

/// 采集失败原因
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Chassis(#[from] ChassisError),
}

/// 单台机箱某个类别的采集结果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Collected {
    Chassis(ChassisSummary),
    Cards(Vec<CardRecord>),
    Ports(Vec<PortRecord>),
    Licensing(Vec<LicenseRecord>),
    Sensors(Vec<SensorRecord>),
    Performance(PerfRecord),
}

impl Collected {
    /// 机箱不可达时各类别的占位结果
    pub fn unavailable(category: PollCategory, ip: &str) -> Self {
        match category {
            PollCategory::Chassis => Self::Chassis(ChassisSummary::unreachable(ip)),
            PollCategory::Cards => Self::Cards(vec![CardRecord::unavailable(ip)]),
            PollCategory::Ports => Self::Ports(vec![PortRecord::unavailable(ip)]),
            PollCategory::Licensing => Self::Licensing(vec![LicenseRecord::unavailable(ip)]),
            PollCategory::Sensors => Self::Sensors(vec![SensorRecord::unavailable(ip)]),
            PollCategory::Performance => Self::Performance(PerfRecord::unavailable(ip)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Chassis(_) | Self::Performance(_) => 1,
            Self::Cards(records) => records.len(),
            Self::Ports(records) => records.len(),
            Self::Licensing(records) => records.len(),
            Self::Sensors(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 在已认证会话上采集一个类别
///
/// `chassis_type` 来自已保存的机箱概要，未知时为 `NA`。
pub async fn collect(
    api: &dyn ChassisApi,
    category: PollCategory,
    chassis_type: &str,
) -> Result<Collected, ChassisError> {
    let ip = api.ip().to_string();
    let collected = match category {
        PollCategory::Chassis => {
            let chassis = api.chassis().await?;
            let perf = match api.perf_counters().await {
                Ok(perf) => Some(perf),
                Err(e) => {
                    tracing::debug!("[POLLER] {} 无性能计数器，按 Windows 机箱处理: {}", ip, e);
                    None
                }
            };
            Collected::Chassis(normalizer::normalize_summary(&ip, &chassis, perf.as_ref()))
        }
        PollCategory::Cards => {
            let cards = api.cards().await?;
            Collected::Cards(normalizer::normalize_cards(&ip, chassis_type, &cards))
        }
        PollCategory::Ports => {
            let ports = api.ports().await?;
            Collected::Ports(normalizer::normalize_ports(&ip, chassis_type, &ports))
        }
        PollCategory::Licensing => {
            let host_id = api.license_host_id().await?;
            let licenses = api.licenses().await?;
            Collected::Licensing(normalizer::normalize_licenses(
                &ip,
                chassis_type,
                &host_id,
                &licenses,
            ))
        }
        PollCategory::Sensors => {
            let sensors = api.sensors().await?;
            Collected::Sensors(normalizer::normalize_sensors(&ip, chassis_type, &sensors))
        }
        PollCategory::Performance => {
            let perf = api.perf_counters().await?;
            Collected::Performance(normalizer::normalize_perf(&ip, &perf))
        }
    };
    Ok(collected)
}
