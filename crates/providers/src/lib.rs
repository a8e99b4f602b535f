//! IxInventory Providers Crate
//!
//! 机箱数据来源：
//! - `chassis`: IxOS REST 客户端（会话认证、只读查询、异步操作轮询）
//! - `normalizer`: 把机箱返回的 JSON 转换为扁平库存记录

pub mod chassis;
pub mod normalizer;

pub use chassis::{
    ChassisApi, ChassisClientSettings, ChassisConnector, ChassisError, RestChassisConnector,
};
