//! 字段规整
//!
//! 把机箱返回的 JSON 转为扁平库存记录。全部为纯函数，不做 I/O；
//! 时间戳在转换时生成。

use ixinventory_core::models::{
    utc_timestamp, CardRecord, ChassisSummary, LicenseRecord, PerfRecord, PortRecord,
    SensorRecord, NOT_AVAILABLE,
};
use serde_json::Value;
use std::collections::BTreeMap;

/// 虚拟机箱的类型名（没有序列号）
pub const VIRTUAL_CHASSIS_TYPE: &str = "Ixia_Virtual_Test_Appliance";
const VIRTUAL_CHASSIS_SERIAL: &str = "IxiaVM";
const NO_PORT_DATA: &str = "No data";

const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// JSON 标量转字符串；布尔值沿用历史数据中的 `True`/`False`
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Null => NOT_AVAILABLE.to_string(),
        other => other.to_string(),
    }
}

fn field(value: &Value, key: &str) -> Option<String> {
    value.get(key).filter(|v| !v.is_null()).map(value_to_string)
}

fn field_or(value: &Value, key: &str, default: &str) -> String {
    field(value, key).unwrap_or_else(|| default.to_string())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 保留一位小数的整数值（`1.0`），其余按最短形式输出
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// 字节数转可读大小，以 1024 为底，保留两位小数
pub fn convert_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0B".to_string();
    }

    let mut index = 0;
    let mut power: u128 = 1;
    while index < SIZE_UNITS.len() - 1 && (bytes as u128) >= power * 1024 {
        power *= 1024;
        index += 1;
    }

    let scaled = round2(bytes as f64 / power as f64);
    format!("{} {}", format_decimal(scaled), SIZE_UNITS[index])
}

fn as_bytes(value: &Value, key: &str) -> u64 {
    value
        .get(key)
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.max(0.0) as u64)))
        .unwrap_or(0)
}

/// 机箱概要
///
/// `perf` 为 None 表示机箱不支持性能计数器（Windows 机箱）。
pub fn normalize_summary(ip: &str, chassis: &Value, perf: Option<&Value>) -> ChassisSummary {
    let raw_type = field(chassis, "type");
    let serial_default = match raw_type.as_deref() {
        Some(VIRTUAL_CHASSIS_TYPE) => VIRTUAL_CHASSIS_SERIAL,
        _ => "",
    };

    let mut applications = BTreeMap::new();
    if let Some(apps) = chassis.get("ixosApplications").and_then(Value::as_array) {
        for app in apps {
            if let (Some(name), Some(version)) = (field(app, "name"), field(app, "version")) {
                applications.insert(name, version);
            }
        }
    }

    let (mem_bytes, mem_bytes_total, cpu_pert_usage, os) = match perf {
        Some(perf) => (
            convert_size(as_bytes(perf, "memoryInUseBytes")),
            convert_size(as_bytes(perf, "memoryTotalBytes")),
            field_or(perf, "cpuUsagePercent", NOT_AVAILABLE),
            "Linux".to_string(),
        ),
        None => (
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            NOT_AVAILABLE.to_string(),
            "Windows".to_string(),
        ),
    };

    ChassisSummary {
        chassis_ip: ip.to_string(),
        chassis_serial: field_or(chassis, "serialNumber", serial_default),
        controller_serial: field_or(chassis, "controllerSerialNumber", NOT_AVAILABLE),
        chassis_type: raw_type
            .map(|t| t.replace(' ', "_"))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        physical_cards: field_or(chassis, "numberOfPhysicalCards", NOT_AVAILABLE),
        chassis_status: field_or(chassis, "state", NOT_AVAILABLE),
        last_updated_at: utc_timestamp(),
        mem_bytes,
        mem_bytes_total,
        cpu_pert_usage,
        os,
        tags: String::new(),
        applications,
    }
}

/// 板卡排序键：数字优先按数值排序
fn card_sort_key(card: &Value) -> (i64, String) {
    let number = card.get("cardNumber");
    let numeric = number
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .unwrap_or(i64::MAX);
    (numeric, number.map(value_to_string).unwrap_or_default())
}

pub fn normalize_cards(ip: &str, chassis_type: &str, cards: &[Value]) -> Vec<CardRecord> {
    let mut sorted: Vec<&Value> = cards.iter().collect();
    sorted.sort_by_key(|card| card_sort_key(card));

    let timestamp = utc_timestamp();
    sorted
        .into_iter()
        .map(|card| CardRecord {
            chassis_ip: ip.to_string(),
            chassis_type: chassis_type.to_string(),
            card_number: field_or(card, "cardNumber", NOT_AVAILABLE),
            serial_number: field_or(card, "serialNumber", NOT_AVAILABLE),
            card_type: field_or(card, "type", NOT_AVAILABLE),
            card_state: field_or(card, "state", NOT_AVAILABLE),
            number_of_ports: field_or(card, "numberOfPorts", NO_PORT_DATA),
            tags: String::new(),
            last_updated_at: timestamp.clone(),
        })
        .collect()
}

/// 端口是否被占用（owner 非空）
pub fn is_owned(port: &Value) -> bool {
    field(port, "owner").is_some_and(|owner| !owner.trim().is_empty())
}

pub fn normalize_ports(ip: &str, chassis_type: &str, ports: &[Value]) -> Vec<PortRecord> {
    let total_ports = ports.len();
    let owned_ports = ports.iter().filter(|port| is_owned(port)).count();
    let free_ports = total_ports - owned_ports;

    let timestamp = utc_timestamp();
    ports
        .iter()
        .map(|port| PortRecord {
            chassis_ip: ip.to_string(),
            type_of_chassis: chassis_type.to_string(),
            card_number: field_or(port, "cardNumber", NOT_AVAILABLE),
            port_number: field_or(port, "portNumber", NOT_AVAILABLE),
            link_state: field_or(port, "linkState", NOT_AVAILABLE),
            phy_mode: field_or(port, "phyMode", NOT_AVAILABLE),
            transceiver_model: field_or(port, "transceiverModel", NOT_AVAILABLE),
            transceiver_manufacturer: field_or(port, "transceiverManufacturer", NOT_AVAILABLE),
            owner: field_or(port, "owner", ""),
            speed: field_or(port, "speed", NOT_AVAILABLE),
            port_type: field_or(port, "type", NOT_AVAILABLE),
            total_ports,
            owned_ports,
            free_ports,
            last_updated_at: timestamp.clone(),
        })
        .collect()
}

pub fn normalize_licenses(
    ip: &str,
    chassis_type: &str,
    host_id: &str,
    licenses: &[Value],
) -> Vec<LicenseRecord> {
    let timestamp = utc_timestamp();
    licenses
        .iter()
        .map(|license| LicenseRecord {
            chassis_ip: ip.to_string(),
            type_of_chassis: chassis_type.to_string(),
            host_id: host_id.to_string(),
            part_number: field_or(license, "partNumber", NOT_AVAILABLE),
            activation_code: field_or(license, "activationCode", NOT_AVAILABLE),
            quantity: field_or(license, "quantity", NOT_AVAILABLE),
            description: field_or(license, "description", NOT_AVAILABLE).replace(',', "_"),
            maintenance_date: field_or(license, "maintenanceDate", NOT_AVAILABLE),
            expiry_date: field_or(license, "expiryDate", NOT_AVAILABLE),
            is_expired: field_or(license, "isExpired", NOT_AVAILABLE),
            last_updated_at: timestamp.clone(),
        })
        .collect()
}

/// 传感器单位展示：温度带上读数，电流统一为 AMP
pub fn display_unit(unit: &str, value: &str) -> String {
    match unit {
        "CELSIUS" => format!("{value} °C"),
        "AMPERSEND" => "AMP".to_string(),
        other => other.to_string(),
    }
}

pub fn normalize_sensors(ip: &str, chassis_type: &str, sensors: &[Value]) -> Vec<SensorRecord> {
    let timestamp = utc_timestamp();
    sensors
        .iter()
        .map(|sensor| {
            let value = field_or(sensor, "value", NOT_AVAILABLE);
            let unit = display_unit(&field_or(sensor, "unit", NOT_AVAILABLE), &value);
            SensorRecord {
                chassis_ip: ip.to_string(),
                type_of_chassis: chassis_type.to_string(),
                sensor_type: field_or(sensor, "type", NOT_AVAILABLE),
                name: field_or(sensor, "name", NOT_AVAILABLE),
                value,
                unit,
                last_updated_at: timestamp.clone(),
            }
        })
        .collect()
}

/// 内存占用百分比，总量为 0 时返回 0
pub fn memory_utilization(in_use: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(in_use as f64 / total as f64 * 100.0)
}

pub fn normalize_perf(ip: &str, perf: &Value) -> PerfRecord {
    PerfRecord {
        chassis_ip: ip.to_string(),
        mem_utilization: memory_utilization(
            as_bytes(perf, "memoryInUseBytes"),
            as_bytes(perf, "memoryTotalBytes"),
        ),
        cpu_utilization: perf
            .get("cpuUsagePercent")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
        last_updated_at: utc_timestamp(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixinventory_core::models::{APP_IXNETWORK_PROTOCOLS, APP_IXOS};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_convert_size() {
        assert_eq!(convert_size(0), "0B");
        assert_eq!(convert_size(512), "512.0 B");
        assert_eq!(convert_size(1024), "1.0 KB");
        assert_eq!(convert_size(1536), "1.5 KB");
        assert_eq!(convert_size(8 * 1024 * 1024 * 1024), "8.0 GB");
        assert_eq!(convert_size(1_288_490_189), "1.2 GB");
    }

    #[test]
    fn test_summary_linux_chassis() {
        let chassis = json!({
            "type": "Ixia XGS12",
            "serialNumber": "XGS-001",
            "controllerSerialNumber": "CTL-9",
            "numberOfPhysicalCards": 4,
            "state": "UP",
            "managementIp": "192.168.1.10",
            "ixosApplications": [
                {"name": "IxOS", "version": "10.00.1"},
                {"name": "IxNetwork Protocols", "version": "10.00.2"}
            ]
        });
        let perf = json!({
            "memoryInUseBytes": 2147483648u64,
            "memoryTotalBytes": 8589934592u64,
            "cpuUsagePercent": 12
        });

        let summary = normalize_summary("10.0.0.1", &chassis, Some(&perf));

        assert_eq!(summary.chassis_ip, "10.0.0.1");
        assert_eq!(summary.chassis_type, "Ixia_XGS12");
        assert_eq!(summary.chassis_serial, "XGS-001");
        assert_eq!(summary.physical_cards, "4");
        assert_eq!(summary.mem_bytes, "2.0 GB");
        assert_eq!(summary.mem_bytes_total, "8.0 GB");
        assert_eq!(summary.cpu_pert_usage, "12");
        assert_eq!(summary.os, "Linux");
        assert_eq!(summary.application_version(APP_IXOS), "10.00.1");
        assert_eq!(summary.application_version(APP_IXNETWORK_PROTOCOLS), "10.00.2");
    }

    #[test]
    fn test_summary_windows_virtual_chassis() {
        let chassis = json!({"type": "Ixia_Virtual_Test_Appliance", "state": "UP"});
        let summary = normalize_summary("10.0.0.2", &chassis, None);

        assert_eq!(summary.chassis_serial, "IxiaVM");
        assert_eq!(summary.controller_serial, "NA");
        assert_eq!(summary.os, "Windows");
        assert_eq!(summary.mem_bytes, "NA");
        assert_eq!(summary.cpu_pert_usage, "NA");

        let physical = normalize_summary("10.0.0.3", &json!({"type": "XGS2"}), None);
        assert_eq!(physical.chassis_serial, "");
    }

    #[test]
    fn test_cards_sorted_with_port_default() {
        let cards = vec![
            json!({"cardNumber": 10, "serialNumber": "S10", "type": "NOVUS", "numberOfPorts": 8}),
            json!({"cardNumber": 2, "serialNumber": "S2", "type": "K400", "state": "UP"}),
        ];
        let records = normalize_cards("10.0.0.1", "Ixia_XGS12", &cards);

        assert_eq!(records[0].card_number, "2");
        assert_eq!(records[0].number_of_ports, "No data");
        assert_eq!(records[0].card_state, "UP");
        assert_eq!(records[1].card_number, "10");
        assert_eq!(records[1].number_of_ports, "8");
        assert_eq!(records[1].chassis_type, "Ixia_XGS12");
    }

    #[test]
    fn test_ports_counts_and_kept_fields() {
        let ports = vec![
            json!({"cardNumber": 1, "portNumber": 1, "owner": "alice", "linkState": "UP",
                   "speed": "100000", "type": "QSFP", "extra": "dropped"}),
            json!({"cardNumber": 1, "portNumber": 2, "owner": ""}),
            json!({"cardNumber": 1, "portNumber": 3}),
        ];
        let records = normalize_ports("10.0.0.1", "XGS2", &ports);

        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.total_ports == 3));
        assert!(records.iter().all(|r| r.owned_ports == 1));
        assert!(records.iter().all(|r| r.free_ports == 2));
        assert_eq!(records[0].owner, "alice");
        assert_eq!(records[0].port_type, "QSFP");
        assert_eq!(records[2].link_state, "NA");

        let value = serde_json::to_value(&records[0]).unwrap();
        assert!(value.get("extra").is_none());
    }

    #[test]
    fn test_licenses() {
        let licenses = vec![json!({
            "partNumber": "909-1234",
            "activationCode": "ABCD",
            "quantity": 2,
            "description": "IxNetwork, VE, 10G",
            "maintenanceDate": "01-Jan-2027",
            "expiryDate": "Permanent",
            "isExpired": false
        })];
        let records = normalize_licenses("10.0.0.1", "XGS2", "HOST-1", &licenses);

        assert_eq!(records[0].host_id, "HOST-1");
        assert_eq!(records[0].description, "IxNetwork_ VE_ 10G");
        assert_eq!(records[0].quantity, "2");
        assert_eq!(records[0].is_expired, "False");

        let missing = normalize_licenses("10.0.0.1", "XGS2", "HOST-1", &[json!({})]);
        assert_eq!(missing[0].is_expired, "NA");
    }

    #[test]
    fn test_sensor_units() {
        let sensors = vec![
            json!({"type": "TEMPERATURE", "name": "cpu", "value": 45, "unit": "CELSIUS",
                   "criticalValue": 90, "id": 3}),
            json!({"type": "CURRENT", "name": "psu", "value": 2.5, "unit": "AMPERSEND"}),
            json!({"type": "VOLTAGE", "name": "rail", "value": 12, "unit": "VOLT"}),
        ];
        let records = normalize_sensors("10.0.0.1", "XGS2", &sensors);

        assert_eq!(records[0].unit, "45 °C");
        assert_eq!(records[1].unit, "AMP");
        assert_eq!(records[2].unit, "VOLT");
        assert_eq!(records[0].value, "45");
    }

    #[test]
    fn test_perf() {
        let record = normalize_perf(
            "10.0.0.1",
            &json!({"memoryInUseBytes": 1, "memoryTotalBytes": 3, "cpuUsagePercent": 7.5}),
        );
        assert_eq!(record.mem_utilization, 33.33);
        assert_eq!(record.cpu_utilization, 7.5);

        let empty = normalize_perf("10.0.0.1", &json!({"memoryTotalBytes": 0}));
        assert_eq!(empty.mem_utilization, 0.0);
    }

    proptest! {
        #[test]
        fn prop_convert_size_is_bounded(bytes in 1u64..u64::MAX) {
            let text = convert_size(bytes);
            let (number, unit) = text.split_once(' ').unwrap();
            let number: f64 = number.parse().unwrap();
            prop_assert!(SIZE_UNITS.contains(&unit));
            prop_assert!(number >= 1.0 && number <= 1024.0);
        }

        #[test]
        fn prop_port_counts_add_up(owners in proptest::collection::vec(proptest::option::of("[a-z]{0,4}"), 0..40)) {
            let ports: Vec<Value> = owners
                .iter()
                .enumerate()
                .map(|(i, owner)| match owner {
                    Some(owner) => json!({"portNumber": i, "owner": owner}),
                    None => json!({"portNumber": i}),
                })
                .collect();
            let expected_owned = owners
                .iter()
                .filter(|owner| owner.as_deref().is_some_and(|o| !o.is_empty()))
                .count();

            let records = normalize_ports("10.0.0.1", "XGS2", &ports);
            prop_assert_eq!(records.len(), ports.len());
            for record in &records {
                prop_assert_eq!(record.owned_ports, expected_owned);
                prop_assert_eq!(record.owned_ports + record.free_ports, record.total_ports);
            }
        }
    }
}
