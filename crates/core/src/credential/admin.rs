//! 本地凭证文件维护
//!
//! 上传内容每行一条操作：`OPERATION,ip,username,password`
//! - `ADD`: ip 不存在时新增，已存在时忽略
//! - `UPDATE`: 替换已存在 ip 的用户名密码
//! - `DELETE`: 删除 ip（可省略用户名密码）
//!
//! 所有行先解析并在内存中应用，任意一行失败则不写文件。

use super::source::{FileCredentialSource, SourceError};
use super::types::{CredentialMap, CredentialRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CredentialUpdateError {
    #[error("第 {line} 行格式无效: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("第 {line} 行未知操作: {operation}")]
    UnknownOperation { line: usize, operation: String },

    #[error("第 {line} 行更新的机箱不存在: {ip}")]
    UnknownIp { line: usize, ip: String },

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("写入凭证文件失败: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperation {
    Add,
    Update,
    Delete,
}

/// 解析后的单行操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub line: usize,
    pub operation: UpdateOperation,
    pub ip: String,
    pub username: String,
    pub password: String,
}

/// 应用结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    /// 被忽略的操作（ADD 已存在 / DELETE 不存在）
    pub skipped: usize,
    /// 应用后文件中的机箱数量
    pub chassis_count: usize,
}

/// 解析上传文本
pub fn parse_updates(text: &str) -> Result<Vec<CredentialUpdate>, CredentialUpdateError> {
    let mut updates = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        let operation = match fields[0].to_ascii_uppercase().as_str() {
            "ADD" => UpdateOperation::Add,
            "UPDATE" => UpdateOperation::Update,
            "DELETE" => UpdateOperation::Delete,
            other => {
                return Err(CredentialUpdateError::UnknownOperation {
                    line,
                    operation: other.to_string(),
                })
            }
        };

        let expected_ok = match operation {
            UpdateOperation::Delete => fields.len() == 2 || fields.len() == 4,
            _ => fields.len() == 4,
        };
        if !expected_ok {
            return Err(CredentialUpdateError::Malformed {
                line,
                reason: format!("字段数量为 {}", fields.len()),
            });
        }

        let ip = fields[1];
        if ip.is_empty() {
            return Err(CredentialUpdateError::Malformed {
                line,
                reason: "ip 为空".to_string(),
            });
        }

        updates.push(CredentialUpdate {
            line,
            operation,
            ip: ip.to_string(),
            username: fields.get(2).copied().unwrap_or_default().to_string(),
            password: fields.get(3).copied().unwrap_or_default().to_string(),
        });
    }

    Ok(updates)
}

/// 在内存映射上依次应用操作
pub fn apply_updates(
    map: &mut CredentialMap,
    updates: &[CredentialUpdate],
) -> Result<UpdateSummary, CredentialUpdateError> {
    let mut summary = UpdateSummary::default();

    for update in updates {
        match update.operation {
            UpdateOperation::Add => {
                if map.contains_key(&update.ip) {
                    summary.skipped += 1;
                } else {
                    map.insert(
                        update.ip.clone(),
                        CredentialRecord::new(
                            update.ip.as_str(),
                            update.username.as_str(),
                            update.password.as_str(),
                        ),
                    );
                    summary.added += 1;
                }
            }
            UpdateOperation::Update => {
                let record =
                    map.get_mut(&update.ip)
                        .ok_or_else(|| CredentialUpdateError::UnknownIp {
                            line: update.line,
                            ip: update.ip.clone(),
                        })?;
                record.username = update.username.clone();
                record.password = update.password.clone();
                summary.updated += 1;
            }
            UpdateOperation::Delete => {
                if map.remove(&update.ip).is_some() {
                    summary.deleted += 1;
                } else {
                    summary.skipped += 1;
                }
            }
        }
    }

    summary.chassis_count = map.len();
    Ok(summary)
}

/// 解析并应用到本地凭证文件
///
/// 调用方随后应调用 `CredentialResolver::invalidate`，让下一次加载重新读取来源。
pub fn apply_credential_updates(
    file: &FileCredentialSource,
    text: &str,
) -> Result<UpdateSummary, CredentialUpdateError> {
    let updates = parse_updates(text)?;
    let summary = file.update_map(|map| apply_updates(map, &updates))?;

    tracing::info!(
        "[CREDENTIAL] 凭证文件已更新: 新增 {}，修改 {}，删除 {}，共 {} 台",
        summary.added,
        summary.updated,
        summary.deleted,
        summary.chassis_count
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_file(dir: &tempfile::TempDir) -> FileCredentialSource {
        let source = FileCredentialSource::new(dir.path().join("credentials.json"));
        let mut map = CredentialMap::new();
        map.insert(
            "10.0.0.1".to_string(),
            CredentialRecord::new("10.0.0.1", "admin", "old"),
        );
        source.write_map(&map).unwrap();
        source
    }

    #[test]
    fn test_parse_trims_and_skips_blank_lines() {
        let updates = parse_updates(" add , 10.0.0.2 , admin , pw \n\nDELETE,10.0.0.3\n").unwrap();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].operation, UpdateOperation::Add);
        assert_eq!(updates[0].ip, "10.0.0.2");
        assert_eq!(updates[0].password, "pw");
        assert_eq!(updates[1].operation, UpdateOperation::Delete);
        assert_eq!(updates[1].line, 3);
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(
            parse_updates("ADD,10.0.0.2,admin"),
            Err(CredentialUpdateError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            parse_updates("ADD,10.0.0.2,a,b\nRENAME,10.0.0.2,a,b"),
            Err(CredentialUpdateError::UnknownOperation { line: 2, .. })
        ));
        assert!(matches!(
            parse_updates("ADD,,a,b"),
            Err(CredentialUpdateError::Malformed { .. })
        ));
    }

    #[test]
    fn test_apply_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_file(&dir);

        let summary = apply_credential_updates(
            &source,
            "ADD,10.0.0.1,ignored,ignored\nADD,10.0.0.2,root,p2\nUPDATE,10.0.0.1,admin,new",
        )
        .unwrap();

        assert_eq!(summary.added, 1);
        assert_eq!(summary.updated, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.chassis_count, 2);

        let map = source.read_map().unwrap();
        assert_eq!(map["10.0.0.1"].password, "new");
        assert_eq!(map["10.0.0.2"].username, "root");
    }

    #[test]
    fn test_failed_line_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_file(&dir);

        let result = apply_credential_updates(
            &source,
            "DELETE,10.0.0.1\nUPDATE,10.0.0.9,admin,pw",
        );
        assert!(matches!(
            result,
            Err(CredentialUpdateError::UnknownIp { line: 2, .. })
        ));

        let map = source.read_map().unwrap();
        assert_eq!(map["10.0.0.1"].password, "old");
    }

    #[test]
    fn test_concurrent_uploads_keep_every_line() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded_file(&dir);

        for round in 0..20 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = (0..4)
                    .map(|i| {
                        let source = &source;
                        scope.spawn(move || {
                            apply_credential_updates(source, &format!("ADD,10.0.{round}.{i},u,p"))
                        })
                    })
                    .collect();
                for handle in handles {
                    assert_eq!(handle.join().unwrap().unwrap().added, 1);
                }
            });
        }

        let map = source.read_map().unwrap();
        assert_eq!(map.len(), 1 + 20 * 4);
        assert!(!source.path().with_extension("json.tmp").exists());
    }
}
