use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> Result<(), rusqlite::Error> {
    // 机箱概要快照
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_summary_details (
            ip TEXT NOT NULL,
            chassis_serial TEXT NOT NULL,
            controller_serial TEXT NOT NULL,
            type_of_chassis TEXT NOT NULL,
            physical_cards TEXT NOT NULL,
            status TEXT NOT NULL,
            mem_bytes TEXT NOT NULL,
            mem_bytes_total TEXT NOT NULL,
            cpu_usage TEXT NOT NULL,
            os TEXT NOT NULL,
            applications TEXT NOT NULL DEFAULT '{}',
            tags TEXT NOT NULL DEFAULT '',
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_chassis_summary_ip ON chassis_summary_details(ip)",
        [],
    )?;

    // 板卡快照
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_card_details (
            chassis_ip TEXT NOT NULL,
            chassis_type TEXT NOT NULL,
            card_number TEXT NOT NULL,
            serial_number TEXT NOT NULL,
            card_type TEXT NOT NULL,
            card_state TEXT NOT NULL,
            number_of_ports TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '',
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    // 端口快照
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_port_details (
            chassis_ip TEXT NOT NULL,
            type_of_chassis TEXT NOT NULL,
            card_number TEXT NOT NULL,
            port_number TEXT NOT NULL,
            link_state TEXT NOT NULL,
            phy_mode TEXT NOT NULL,
            transceiver_model TEXT NOT NULL,
            transceiver_manufacturer TEXT NOT NULL,
            owner TEXT NOT NULL,
            speed TEXT NOT NULL,
            port_type TEXT NOT NULL,
            total_ports INTEGER NOT NULL,
            owned_ports INTEGER NOT NULL,
            free_ports INTEGER NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    // License 快照
    conn.execute(
        "CREATE TABLE IF NOT EXISTS license_details_records (
            chassis_ip TEXT NOT NULL,
            type_of_chassis TEXT NOT NULL,
            host_id TEXT NOT NULL,
            part_number TEXT NOT NULL,
            activation_code TEXT NOT NULL,
            quantity TEXT NOT NULL,
            description TEXT NOT NULL,
            maintenance_date TEXT NOT NULL,
            expiry_date TEXT NOT NULL,
            is_expired TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    // 传感器快照
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_sensor_details (
            chassis_ip TEXT NOT NULL,
            type_of_chassis TEXT NOT NULL,
            sensor_type TEXT NOT NULL,
            sensor_name TEXT NOT NULL,
            sensor_value TEXT NOT NULL,
            unit TEXT NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    // 性能快照（每台机箱最新一条）
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_utilization_details (
            chassis_ip TEXT NOT NULL,
            mem_utilization REAL NOT NULL,
            cpu_utilization REAL NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    // 性能历史（只追加，按保留条数清理）
    conn.execute(
        "CREATE TABLE IF NOT EXISTS chassis_utilization_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            chassis_ip TEXT NOT NULL,
            mem_utilization REAL NOT NULL,
            cpu_utilization REAL NOT NULL,
            last_updated TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_utilization_history_ip ON chassis_utilization_history(chassis_ip)",
        [],
    )?;

    // 用户标签
    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_ip_tags (
            ip TEXT PRIMARY KEY,
            tags TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_card_tags (
            serialNumber TEXT PRIMARY KEY,
            tags TEXT NOT NULL
        )",
        [],
    )?;

    // 轮询间隔（分钟，0 表示禁用），单行
    conn.execute(
        "CREATE TABLE IF NOT EXISTS poll_setting (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            chassis INTEGER NOT NULL,
            cards INTEGER NOT NULL,
            ports INTEGER NOT NULL,
            sensors INTEGER NOT NULL,
            licensing INTEGER NOT NULL,
            perf INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        create_tables(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 10);
    }
}
