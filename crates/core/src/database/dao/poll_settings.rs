//! 轮询间隔设置（单行表）

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

/// 各类别轮询间隔（分钟），0 表示禁用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSettings {
    pub chassis: u32,
    pub cards: u32,
    pub ports: u32,
    pub sensors: u32,
    pub licensing: u32,
    pub perf: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            chassis: 60,
            cards: 60,
            ports: 60,
            sensors: 10,
            licensing: 1440,
            perf: 10,
        }
    }
}

pub struct PollSettingsDao;

impl PollSettingsDao {
    /// 读取设置，未保存过时返回默认值
    pub fn get_poll_settings(conn: &Connection) -> Result<PollSettings, rusqlite::Error> {
        let mut stmt = conn.prepare(
            "SELECT chassis, cards, ports, sensors, licensing, perf FROM poll_setting WHERE id = 1",
        )?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(PollSettings {
                chassis: row.get(0)?,
                cards: row.get(1)?,
                ports: row.get(2)?,
                sensors: row.get(3)?,
                licensing: row.get(4)?,
                perf: row.get(5)?,
            }),
            None => Ok(PollSettings::default()),
        }
    }

    pub fn set_poll_settings(
        conn: &Connection,
        settings: &PollSettings,
    ) -> Result<(), rusqlite::Error> {
        conn.execute(
            "INSERT OR REPLACE INTO poll_setting (id, chassis, cards, ports, sensors, licensing, perf)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                settings.chassis,
                settings.cards,
                settings.ports,
                settings.sensors,
                settings.licensing,
                settings.perf,
            ],
        )?;
        tracing::info!("[DATABASE] 轮询设置已更新: {:?}", settings);
        Ok(())
    }
}
