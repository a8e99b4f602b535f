//! 库存记录数据模型
//!
//! 每个类别对应一种扁平记录。JSON 字段名沿用机箱 REST 返回和历史接口的
//! camelCase 命名，保证前端和脚本无需改动。

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 无数据时的占位值
pub const NOT_AVAILABLE: &str = "NA";

/// 机箱不可达时的状态
pub const NOT_REACHABLE: &str = "Not Reachable";

/// 记录时间戳格式（UTC）
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// 当前 UTC 时间的记录时间戳
pub fn utc_timestamp() -> String {
    Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

fn na() -> String {
    NOT_AVAILABLE.to_string()
}

/// 机箱概要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChassisSummary {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    #[serde(rename = "chassisSerial#")]
    pub chassis_serial: String,
    #[serde(rename = "controllerSerial#")]
    pub controller_serial: String,
    #[serde(rename = "chassisType")]
    pub chassis_type: String,
    #[serde(rename = "physicalCards#")]
    pub physical_cards: String,
    #[serde(rename = "chassisStatus")]
    pub chassis_status: String,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
    pub mem_bytes: String,
    pub mem_bytes_total: String,
    pub cpu_pert_usage: String,
    pub os: String,
    #[serde(default)]
    pub tags: String,
    /// 机箱上安装的应用及版本（IxOS、IxNetwork Protocols、IxOS REST 等）
    #[serde(flatten)]
    pub applications: BTreeMap<String, String>,
}

impl ChassisSummary {
    /// 机箱不可达时使用的占位记录
    pub fn unreachable(ip: &str) -> Self {
        let mut applications = BTreeMap::new();
        for name in [APP_IXOS, APP_IXNETWORK_PROTOCOLS, APP_IXOS_REST] {
            applications.insert(name.to_string(), na());
        }
        Self {
            chassis_ip: ip.to_string(),
            chassis_serial: na(),
            controller_serial: na(),
            chassis_type: na(),
            physical_cards: na(),
            chassis_status: NOT_REACHABLE.to_string(),
            last_updated_at: na(),
            mem_bytes: na(),
            mem_bytes_total: na(),
            cpu_pert_usage: na(),
            os: na(),
            tags: String::new(),
            applications,
        }
    }

    /// 获取应用版本，不存在时返回 `NA`
    pub fn application_version(&self, name: &str) -> String {
        self.applications.get(name).cloned().unwrap_or_else(na)
    }
}

pub const APP_IXOS: &str = "IxOS";
pub const APP_IXNETWORK_PROTOCOLS: &str = "IxNetwork Protocols";
pub const APP_IXOS_REST: &str = "IxOS REST";

/// 板卡记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRecord {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    #[serde(rename = "chassisType")]
    pub chassis_type: String,
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    #[serde(rename = "serialNumber")]
    pub serial_number: String,
    #[serde(rename = "cardType")]
    pub card_type: String,
    #[serde(rename = "cardState")]
    pub card_state: String,
    #[serde(rename = "numberOfPorts")]
    pub number_of_ports: String,
    #[serde(default)]
    pub tags: String,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
}

impl CardRecord {
    pub fn unavailable(ip: &str) -> Self {
        Self {
            chassis_ip: ip.to_string(),
            chassis_type: na(),
            card_number: na(),
            serial_number: na(),
            card_type: na(),
            card_state: na(),
            number_of_ports: na(),
            tags: String::new(),
            last_updated_at: utc_timestamp(),
        }
    }
}

/// 端口记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortRecord {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    #[serde(rename = "typeOfChassis")]
    pub type_of_chassis: String,
    #[serde(rename = "cardNumber")]
    pub card_number: String,
    #[serde(rename = "portNumber")]
    pub port_number: String,
    #[serde(rename = "linkState")]
    pub link_state: String,
    #[serde(rename = "phyMode")]
    pub phy_mode: String,
    #[serde(rename = "transceiverModel")]
    pub transceiver_model: String,
    #[serde(rename = "transceiverManufacturer")]
    pub transceiver_manufacturer: String,
    pub owner: String,
    pub speed: String,
    #[serde(rename = "type")]
    pub port_type: String,
    #[serde(rename = "totalPorts")]
    pub total_ports: usize,
    #[serde(rename = "ownedPorts")]
    pub owned_ports: usize,
    #[serde(rename = "freePorts")]
    pub free_ports: usize,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
}

impl PortRecord {
    pub fn unavailable(ip: &str) -> Self {
        Self {
            chassis_ip: ip.to_string(),
            type_of_chassis: na(),
            card_number: na(),
            port_number: na(),
            link_state: na(),
            phy_mode: na(),
            transceiver_model: na(),
            transceiver_manufacturer: na(),
            owner: na(),
            speed: na(),
            port_type: na(),
            total_ports: 0,
            owned_ports: 0,
            free_ports: 0,
            last_updated_at: utc_timestamp(),
        }
    }
}

/// License 记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LicenseRecord {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    #[serde(rename = "typeOfChassis")]
    pub type_of_chassis: String,
    #[serde(rename = "hostId")]
    pub host_id: String,
    #[serde(rename = "partNumber")]
    pub part_number: String,
    #[serde(rename = "activationCode")]
    pub activation_code: String,
    pub quantity: String,
    pub description: String,
    #[serde(rename = "maintenanceDate")]
    pub maintenance_date: String,
    #[serde(rename = "expiryDate")]
    pub expiry_date: String,
    #[serde(rename = "isExpired")]
    pub is_expired: String,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
}

impl LicenseRecord {
    pub fn unavailable(ip: &str) -> Self {
        Self {
            chassis_ip: ip.to_string(),
            type_of_chassis: na(),
            host_id: na(),
            part_number: na(),
            activation_code: na(),
            quantity: na(),
            description: na(),
            maintenance_date: na(),
            expiry_date: na(),
            is_expired: na(),
            last_updated_at: utc_timestamp(),
        }
    }
}

/// 传感器记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorRecord {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    #[serde(rename = "typeOfChassis")]
    pub type_of_chassis: String,
    #[serde(rename = "type")]
    pub sensor_type: String,
    pub name: String,
    pub value: String,
    /// 展示用单位（已做单位转换）
    pub unit: String,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
}

impl SensorRecord {
    pub fn unavailable(ip: &str) -> Self {
        Self {
            chassis_ip: ip.to_string(),
            type_of_chassis: na(),
            sensor_type: na(),
            name: na(),
            value: na(),
            unit: na(),
            last_updated_at: utc_timestamp(),
        }
    }
}

/// 性能记录（内存、CPU 利用率百分比）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerfRecord {
    #[serde(rename = "chassisIp")]
    pub chassis_ip: String,
    pub mem_utilization: f64,
    pub cpu_utilization: f64,
    #[serde(rename = "lastUpdatedAt_UTC")]
    pub last_updated_at: String,
}

impl PerfRecord {
    pub fn unavailable(ip: &str) -> Self {
        Self {
            chassis_ip: ip.to_string(),
            mem_utilization: 0.0,
            cpu_utilization: 0.0,
            last_updated_at: utc_timestamp(),
        }
    }
}
