pub mod dao;
pub mod schema;

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub type DbConnection = Arc<Mutex<Connection>>;

/// 获取数据库连接锁（自动处理 poisoned lock）
pub fn lock_db(db: &DbConnection) -> Result<std::sync::MutexGuard<'_, Connection>, String> {
    match db.lock() {
        Ok(guard) => Ok(guard),
        Err(poisoned) => {
            tracing::warn!("[DATABASE] 检测到数据库锁被污染，尝试恢复: {}", poisoned);
            db.clear_poison();
            Ok(poisoned.into_inner())
        }
    }
}

/// 打开（必要时创建）数据库文件并建表
pub fn init_database(path: &Path) -> Result<DbConnection, String> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("无法创建数据库目录 {dir:?}: {e}"))?;
        }
    }

    let conn = Connection::open(path).map_err(|e| e.to_string())?;

    // 轮询写入与 API 读取并发时避免 "database is locked"
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(|e| format!("设置 busy_timeout 失败: {e}"))?;

    schema::create_tables(&conn).map_err(|e| e.to_string())?;
    tracing::info!("[DATABASE] 数据库已就绪: {:?}", path);

    Ok(Arc::new(Mutex::new(conn)))
}

/// 内存数据库（测试和一次性命令使用）
pub fn open_in_memory() -> Result<DbConnection, rusqlite::Error> {
    let conn = Connection::open_in_memory()?;
    schema::create_tables(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}
