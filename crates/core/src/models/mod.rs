//! 核心数据模型

pub mod inventory_model;

pub use inventory_model::*;
