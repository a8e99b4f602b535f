//! 轮询相关类型

use ixinventory_core::database::dao::PollSettings;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 轮询类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollCategory {
    Chassis,
    Cards,
    Ports,
    Licensing,
    Sensors,
    Performance,
}

impl PollCategory {
    /// 全类别，按执行顺序（机箱概要在前，为其他类别提供机箱类型）
    pub const ALL: [PollCategory; 6] = [
        PollCategory::Chassis,
        PollCategory::Cards,
        PollCategory::Ports,
        PollCategory::Licensing,
        PollCategory::Sensors,
        PollCategory::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chassis => "chassis",
            Self::Cards => "cards",
            Self::Ports => "ports",
            Self::Licensing => "licensing",
            Self::Sensors => "sensors",
            Self::Performance => "performance",
        }
    }

    /// 数据库中设置的轮询间隔（分钟，0 表示禁用）
    pub fn interval_minutes(&self, settings: &PollSettings) -> u32 {
        match self {
            Self::Chassis => settings.chassis,
            Self::Cards => settings.cards,
            Self::Ports => settings.ports,
            Self::Licensing => settings.licensing,
            Self::Sensors => settings.sensors,
            Self::Performance => settings.perf,
        }
    }
}

impl std::fmt::Display for PollCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PollCategory {
    type Err = PollError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chassis" | "summary" => Ok(Self::Chassis),
            "cards" => Ok(Self::Cards),
            "ports" => Ok(Self::Ports),
            "licensing" => Ok(Self::Licensing),
            "sensors" => Ok(Self::Sensors),
            "performance" | "perf" => Ok(Self::Performance),
            other => Err(PollError::UnknownCategory(other.to_string())),
        }
    }
}

/// 单次轮询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollReport {
    pub category: PollCategory,
    /// 成功采集的机箱数
    pub polled: usize,
    /// 失败的机箱数
    pub failed: usize,
    /// 写入快照表的记录数
    pub records: usize,
}

impl PollReport {
    pub fn new(category: PollCategory) -> Self {
        Self {
            category,
            polled: 0,
            failed: 0,
            records: 0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("获取数据库锁失败: {0}")]
    Lock(String),

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("未知轮询类别: {0}")]
    UnknownCategory(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_parse_and_display() {
        for category in PollCategory::ALL {
            assert_eq!(category.to_string().parse::<PollCategory>().unwrap(), category);
        }
        assert_eq!("PERF".parse::<PollCategory>().unwrap(), PollCategory::Performance);
        assert!(matches!(
            "fans".parse::<PollCategory>(),
            Err(PollError::UnknownCategory(_))
        ));
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&PollCategory::Licensing).unwrap();
        assert_eq!(json, "\"licensing\"");
    }

    #[test]
    fn test_interval_lookup() {
        let settings = PollSettings {
            chassis: 1,
            cards: 2,
            ports: 3,
            sensors: 4,
            licensing: 5,
            perf: 6,
        };
        assert_eq!(PollCategory::Sensors.interval_minutes(&settings), 4);
        assert_eq!(PollCategory::Performance.interval_minutes(&settings), 6);
    }
}
