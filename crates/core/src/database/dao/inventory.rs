//! 库存快照数据访问层
//!
//! 每个类别一张快照表，写入时在同一事务内先删后插。

use crate::models::{
    CardRecord, ChassisSummary, LicenseRecord, PerfRecord, PortRecord, SensorRecord,
    NOT_AVAILABLE,
};
use rusqlite::{params, Connection, Row};
use std::collections::BTreeMap;

pub struct InventoryDao;

fn json_error(e: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
}

impl InventoryDao {
    // ============ 机箱概要 ============

    pub fn replace_summaries(
        conn: &mut Connection,
        summaries: &[ChassisSummary],
    ) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chassis_summary_details", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chassis_summary_details (
                    ip, chassis_serial, controller_serial, type_of_chassis, physical_cards,
                    status, mem_bytes, mem_bytes_total, cpu_usage, os, applications, tags,
                    last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for summary in summaries {
                let applications =
                    serde_json::to_string(&summary.applications).map_err(json_error)?;
                stmt.execute(params![
                    summary.chassis_ip,
                    summary.chassis_serial,
                    summary.controller_serial,
                    summary.chassis_type,
                    summary.physical_cards,
                    summary.chassis_status,
                    summary.mem_bytes,
                    summary.mem_bytes_total,
                    summary.cpu_pert_usage,
                    summary.os,
                    applications,
                    summary.tags,
                    summary.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_summaries(conn: &Connection) -> Result<Vec<ChassisSummary>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT ip, chassis_serial, controller_serial, type_of_chassis, physical_cards,
                    status, mem_bytes, mem_bytes_total, cpu_usage, os, applications, tags,
                    last_updated
             FROM chassis_summary_details ORDER BY ip",
        )?;
        let rows = stmt.query_map([], Self::row_to_summary)?;
        rows.collect()
    }

    fn row_to_summary(row: &Row) -> Result<ChassisSummary, rusqlite::Error> {
        let applications_json: String = row.get(10)?;
        let applications: BTreeMap<String, String> = serde_json::from_str(&applications_json)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(ChassisSummary {
            chassis_ip: row.get(0)?,
            chassis_serial: row.get(1)?,
            controller_serial: row.get(2)?,
            chassis_type: row.get(3)?,
            physical_cards: row.get(4)?,
            chassis_status: row.get(5)?,
            mem_bytes: row.get(6)?,
            mem_bytes_total: row.get(7)?,
            cpu_pert_usage: row.get(8)?,
            os: row.get(9)?,
            applications,
            tags: row.get(11)?,
            last_updated_at: row.get(12)?,
        })
    }

    /// 机箱类型，未知 ip 返回 `NA`
    pub fn chassis_type_for(conn: &Connection, ip: &str) -> Result<String, rusqlite::Error> {
        let mut stmt =
            conn.prepare("SELECT type_of_chassis FROM chassis_summary_details WHERE ip = ?1")?;
        let mut rows = stmt.query([ip])?;
        match rows.next()? {
            Some(row) => row.get(0),
            None => Ok(NOT_AVAILABLE.to_string()),
        }
    }

    // ============ 板卡 ============

    pub fn replace_cards(conn: &mut Connection, cards: &[CardRecord]) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chassis_card_details", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chassis_card_details (
                    chassis_ip, chassis_type, card_number, serial_number, card_type,
                    card_state, number_of_ports, tags, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for card in cards {
                stmt.execute(params![
                    card.chassis_ip,
                    card.chassis_type,
                    card.card_number,
                    card.serial_number,
                    card.card_type,
                    card.card_state,
                    card.number_of_ports,
                    card.tags,
                    card.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_cards(conn: &Connection) -> Result<Vec<CardRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, chassis_type, card_number, serial_number, card_type,
                    card_state, number_of_ports, tags, last_updated
             FROM chassis_card_details ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CardRecord {
                chassis_ip: row.get(0)?,
                chassis_type: row.get(1)?,
                card_number: row.get(2)?,
                serial_number: row.get(3)?,
                card_type: row.get(4)?,
                card_state: row.get(5)?,
                number_of_ports: row.get(6)?,
                tags: row.get(7)?,
                last_updated_at: row.get(8)?,
            })
        })?;
        rows.collect()
    }

    // ============ 端口 ============

    pub fn replace_ports(conn: &mut Connection, ports: &[PortRecord]) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chassis_port_details", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chassis_port_details (
                    chassis_ip, type_of_chassis, card_number, port_number, link_state,
                    phy_mode, transceiver_model, transceiver_manufacturer, owner, speed,
                    port_type, total_ports, owned_ports, free_ports, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            )?;
            for port in ports {
                stmt.execute(params![
                    port.chassis_ip,
                    port.type_of_chassis,
                    port.card_number,
                    port.port_number,
                    port.link_state,
                    port.phy_mode,
                    port.transceiver_model,
                    port.transceiver_manufacturer,
                    port.owner,
                    port.speed,
                    port.port_type,
                    port.total_ports as i64,
                    port.owned_ports as i64,
                    port.free_ports as i64,
                    port.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_ports(conn: &Connection) -> Result<Vec<PortRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, type_of_chassis, card_number, port_number, link_state,
                    phy_mode, transceiver_model, transceiver_manufacturer, owner, speed,
                    port_type, total_ports, owned_ports, free_ports, last_updated
             FROM chassis_port_details ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PortRecord {
                chassis_ip: row.get(0)?,
                type_of_chassis: row.get(1)?,
                card_number: row.get(2)?,
                port_number: row.get(3)?,
                link_state: row.get(4)?,
                phy_mode: row.get(5)?,
                transceiver_model: row.get(6)?,
                transceiver_manufacturer: row.get(7)?,
                owner: row.get(8)?,
                speed: row.get(9)?,
                port_type: row.get(10)?,
                total_ports: row.get::<_, i64>(11)? as usize,
                owned_ports: row.get::<_, i64>(12)? as usize,
                free_ports: row.get::<_, i64>(13)? as usize,
                last_updated_at: row.get(14)?,
            })
        })?;
        rows.collect()
    }

    // ============ License ============

    pub fn replace_licenses(
        conn: &mut Connection,
        licenses: &[LicenseRecord],
    ) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM license_details_records", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO license_details_records (
                    chassis_ip, type_of_chassis, host_id, part_number, activation_code,
                    quantity, description, maintenance_date, expiry_date, is_expired,
                    last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for license in licenses {
                stmt.execute(params![
                    license.chassis_ip,
                    license.type_of_chassis,
                    license.host_id,
                    license.part_number,
                    license.activation_code,
                    license.quantity,
                    license.description,
                    license.maintenance_date,
                    license.expiry_date,
                    license.is_expired,
                    license.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_licenses(conn: &Connection) -> Result<Vec<LicenseRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, type_of_chassis, host_id, part_number, activation_code,
                    quantity, description, maintenance_date, expiry_date, is_expired,
                    last_updated
             FROM license_details_records ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(LicenseRecord {
                chassis_ip: row.get(0)?,
                type_of_chassis: row.get(1)?,
                host_id: row.get(2)?,
                part_number: row.get(3)?,
                activation_code: row.get(4)?,
                quantity: row.get(5)?,
                description: row.get(6)?,
                maintenance_date: row.get(7)?,
                expiry_date: row.get(8)?,
                is_expired: row.get(9)?,
                last_updated_at: row.get(10)?,
            })
        })?;
        rows.collect()
    }

    // ============ 传感器 ============

    pub fn replace_sensors(
        conn: &mut Connection,
        sensors: &[SensorRecord],
    ) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chassis_sensor_details", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chassis_sensor_details (
                    chassis_ip, type_of_chassis, sensor_type, sensor_name, sensor_value,
                    unit, last_updated
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for sensor in sensors {
                stmt.execute(params![
                    sensor.chassis_ip,
                    sensor.type_of_chassis,
                    sensor.sensor_type,
                    sensor.name,
                    sensor.value,
                    sensor.unit,
                    sensor.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_sensors(conn: &Connection) -> Result<Vec<SensorRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, type_of_chassis, sensor_type, sensor_name, sensor_value,
                    unit, last_updated
             FROM chassis_sensor_details ORDER BY rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SensorRecord {
                chassis_ip: row.get(0)?,
                type_of_chassis: row.get(1)?,
                sensor_type: row.get(2)?,
                name: row.get(3)?,
                value: row.get(4)?,
                unit: row.get(5)?,
                last_updated_at: row.get(6)?,
            })
        })?;
        rows.collect()
    }

    // ============ 性能 ============

    pub fn replace_perf(conn: &mut Connection, records: &[PerfRecord]) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chassis_utilization_details", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO chassis_utilization_details (
                    chassis_ip, mem_utilization, cpu_utilization, last_updated
                ) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.chassis_ip,
                    record.mem_utilization,
                    record.cpu_utilization,
                    record.last_updated_at,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn list_perf(conn: &Connection) -> Result<Vec<PerfRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, mem_utilization, cpu_utilization, last_updated
             FROM chassis_utilization_details ORDER BY chassis_ip",
        )?;
        let rows = stmt.query_map([], Self::row_to_perf)?;
        rows.collect()
    }

    fn row_to_perf(row: &Row) -> Result<PerfRecord, rusqlite::Error> {
        Ok(PerfRecord {
            chassis_ip: row.get(0)?,
            mem_utilization: row.get(1)?,
            cpu_utilization: row.get(2)?,
            last_updated_at: row.get(3)?,
        })
    }

    /// 追加性能历史，每台机箱只保留最近 `retention` 条
    pub fn append_perf_history(
        conn: &mut Connection,
        records: &[PerfRecord],
        retention: usize,
    ) -> Result<(), rusqlite::Error> {
        let tx = conn.transaction()?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO chassis_utilization_history (
                    chassis_ip, mem_utilization, cpu_utilization, last_updated
                ) VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut prune = tx.prepare(
                "DELETE FROM chassis_utilization_history
                 WHERE chassis_ip = ?1 AND id NOT IN (
                     SELECT id FROM chassis_utilization_history
                     WHERE chassis_ip = ?1 ORDER BY id DESC LIMIT ?2
                 )",
            )?;
            for record in records {
                insert.execute(params![
                    record.chassis_ip,
                    record.mem_utilization,
                    record.cpu_utilization,
                    record.last_updated_at,
                ])?;
                prune.execute(params![record.chassis_ip, retention as i64])?;
            }
        }
        tx.commit()
    }

    /// 机箱性能历史（按时间正序）
    pub fn perf_history(conn: &Connection, ip: &str) -> Result<Vec<PerfRecord>, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis_ip, mem_utilization, cpu_utilization, last_updated
             FROM chassis_utilization_history WHERE chassis_ip = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map([ip], Self::row_to_perf)?;
        rows.collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema::create_tables;
    use crate::models::APP_IXOS;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        conn
    }

    fn summary(ip: &str, chassis_type: &str) -> ChassisSummary {
        let mut summary = ChassisSummary::unreachable(ip);
        summary.chassis_type = chassis_type.to_string();
        summary.chassis_status = "UP".to_string();
        summary
            .applications
            .insert(APP_IXOS.to_string(), "10.00.1".to_string());
        summary
    }

    fn perf(ip: &str, mem: f64) -> PerfRecord {
        PerfRecord {
            chassis_ip: ip.to_string(),
            mem_utilization: mem,
            cpu_utilization: 5.0,
            last_updated_at: "01/01/2026, 00:00:00".to_string(),
        }
    }

    #[test]
    fn test_replace_summaries_overwrites_snapshot() {
        let mut conn = setup();
        InventoryDao::replace_summaries(
            &mut conn,
            &[summary("10.0.0.1", "Ixia_XGS12"), summary("10.0.0.2", "Ixia_XGS2")],
        )
        .unwrap();
        InventoryDao::replace_summaries(&mut conn, &[summary("10.0.0.3", "Ixia_XGS12")]).unwrap();

        let stored = InventoryDao::list_summaries(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].chassis_ip, "10.0.0.3");
        assert_eq!(stored[0].application_version(APP_IXOS), "10.00.1");
    }

    #[test]
    fn test_chassis_type_for() {
        let mut conn = setup();
        InventoryDao::replace_summaries(&mut conn, &[summary("10.0.0.1", "Ixia_XGS12")]).unwrap();

        assert_eq!(
            InventoryDao::chassis_type_for(&conn, "10.0.0.1").unwrap(),
            "Ixia_XGS12"
        );
        assert_eq!(InventoryDao::chassis_type_for(&conn, "10.9.9.9").unwrap(), "NA");
    }

    #[test]
    fn test_values_with_quotes_are_stored_verbatim() {
        let mut conn = setup();
        let mut license = LicenseRecord::unavailable("10.0.0.1");
        license.description = "IxNetwork 'VE' license; DROP TABLE x".to_string();
        InventoryDao::replace_licenses(&mut conn, &[license.clone()]).unwrap();

        let stored = InventoryDao::list_licenses(&conn).unwrap();
        assert_eq!(stored, vec![license]);
    }

    #[test]
    fn test_ports_roundtrip_counts() {
        let mut conn = setup();
        let mut port = PortRecord::unavailable("10.0.0.1");
        port.total_ports = 8;
        port.owned_ports = 3;
        port.free_ports = 5;
        InventoryDao::replace_ports(&mut conn, &[port]).unwrap();

        let stored = InventoryDao::list_ports(&conn).unwrap();
        assert_eq!(stored[0].owned_ports, 3);
        assert_eq!(stored[0].free_ports, 5);
    }

    #[test]
    fn test_perf_history_retention() {
        let mut conn = setup();
        for i in 0..5 {
            InventoryDao::append_perf_history(
                &mut conn,
                &[perf("10.0.0.1", i as f64), perf("10.0.0.2", 50.0)],
                3,
            )
            .unwrap();
        }

        let history = InventoryDao::perf_history(&conn, "10.0.0.1").unwrap();
        let values: Vec<f64> = history.iter().map(|r| r.mem_utilization).collect();
        assert_eq!(values, vec![2.0, 3.0, 4.0]);
        assert_eq!(InventoryDao::perf_history(&conn, "10.0.0.2").unwrap().len(), 3);
    }

    #[test]
    fn test_replace_perf_snapshot() {
        let mut conn = setup();
        InventoryDao::replace_perf(&mut conn, &[perf("10.0.0.1", 10.0)]).unwrap();
        InventoryDao::replace_perf(&mut conn, &[perf("10.0.0.1", 20.0)]).unwrap();

        let stored = InventoryDao::list_perf(&conn).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].mem_utilization, 20.0);
    }
}
