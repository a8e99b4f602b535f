//! 用户标签数据访问层
//!
//! 机箱标签以 ip 为键，板卡标签以序列号为键，均以逗号分隔存储。
//! 标签变更同步写入对应的快照表，使下一次读取快照即可看到。

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("未知标签类型: {0}")]
    UnknownKind(String),

    #[error("未知标签操作: {0}")]
    UnknownOperation(String),

    #[error("标签键不能为空")]
    EmptyKey,

    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Chassis,
    Card,
}

impl TagKind {
    fn table(self) -> &'static str {
        match self {
            TagKind::Chassis => "user_ip_tags",
            TagKind::Card => "user_card_tags",
        }
    }

    fn key_column(self) -> &'static str {
        match self {
            TagKind::Chassis => "ip",
            TagKind::Card => "serialNumber",
        }
    }

    /// 需要同步标签的快照表和键列
    fn snapshot_target(self) -> (&'static str, &'static str) {
        match self {
            TagKind::Chassis => ("chassis_summary_details", "ip"),
            TagKind::Card => ("chassis_card_details", "serial_number"),
        }
    }
}

impl FromStr for TagKind {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chassis" => Ok(TagKind::Chassis),
            "card" => Ok(TagKind::Card),
            other => Err(TagError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagOperation {
    Add,
    Remove,
}

impl FromStr for TagOperation {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" => Ok(TagOperation::Add),
            "remove" => Ok(TagOperation::Remove),
            other => Err(TagError::UnknownOperation(other.to_string())),
        }
    }
}

/// 逗号分隔字符串 -> 标签列表（去空白、去空项）
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct TagDao;

impl TagDao {
    /// 获取某类全部标签：键 -> 标签列表
    pub fn get_tags(
        conn: &Connection,
        kind: TagKind,
    ) -> Result<BTreeMap<String, Vec<String>>, rusqlite::Error> {
        let sql = format!("SELECT {}, tags FROM {}", kind.key_column(), kind.table());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let tags: String = row.get(1)?;
            Ok((key, split_tags(&tags)))
        })?;
        rows.collect()
    }

    /// 单个键的标签，逗号连接
    pub fn tags_for(conn: &Connection, kind: TagKind, key: &str) -> Result<String, rusqlite::Error> {
        let sql = format!(
            "SELECT tags FROM {} WHERE {} = ?1",
            kind.table(),
            kind.key_column()
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => row.get(0),
            None => Ok(String::new()),
        }
    }

    /// 添加或删除标签，返回更新后的标签列表
    ///
    /// - `Add`: 追加不存在的标签
    /// - `Remove`: 删除列出的标签（不存在的忽略）
    pub fn update_tags(
        conn: &mut Connection,
        kind: TagKind,
        key: &str,
        tags: &str,
        operation: TagOperation,
    ) -> Result<Vec<String>, TagError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(TagError::EmptyKey);
        }

        let mut current = split_tags(&Self::tags_for(conn, kind, key)?);
        let requested = split_tags(tags);
        match operation {
            TagOperation::Add => {
                for tag in requested {
                    if !current.contains(&tag) {
                        current.push(tag);
                    }
                }
            }
            TagOperation::Remove => current.retain(|tag| !requested.contains(tag)),
        }
        let joined = current.join(",");

        let tx = conn.transaction()?;
        if current.is_empty() {
            tx.execute(
                &format!("DELETE FROM {} WHERE {} = ?1", kind.table(), kind.key_column()),
                params![key],
            )?;
        } else {
            tx.execute(
                &format!(
                    "INSERT INTO {table} ({column}, tags) VALUES (?1, ?2)
                     ON CONFLICT({column}) DO UPDATE SET tags = excluded.tags",
                    table = kind.table(),
                    column = kind.key_column()
                ),
                params![key, joined],
            )?;
        }

        let (snapshot_table, snapshot_key) = kind.snapshot_target();
        tx.execute(
            &format!("UPDATE {snapshot_table} SET tags = ?1 WHERE {snapshot_key} = ?2"),
            params![joined, key],
        )?;
        tx.commit()?;

        tracing::info!("[DATABASE] 标签已更新: {:?} {} -> [{}]", kind, key, joined);
        Ok(current)
    }
}
