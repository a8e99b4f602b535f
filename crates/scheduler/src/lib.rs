//! IxInventory Poller
//!
//! 按类别轮询全部已配置凭证的机箱，把规整后的记录写入快照表。
//!
//! ## 功能
//! - 单类别 / 全类别按需轮询
//! - 单台机箱的实时采集（HTTP 接口复用）
//! - 按数据库中的轮询间隔周期执行
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use ixinventory_scheduler::{InventoryPoller, PollCategory};
//!
//! # async fn example(poller: InventoryPoller) -> Result<(), ixinventory_scheduler::PollError> {
//! let report = poller.poll(PollCategory::Cards).await?;
//! println!("{} 台成功, {} 台失败", report.polled, report.failed);
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod poller;
pub mod scheduler;
pub mod types;

pub use collector::{collect, CollectError, Collected};
pub use poller::InventoryPoller;
pub use scheduler::PollScheduler;
pub use types::{PollCategory, PollError, PollReport};
