pub mod inventory;
pub mod poll_settings;
pub mod tags;

pub use inventory::InventoryDao;
pub use poll_settings::{PollSettings, PollSettingsDao};
pub use tags::{TagDao, TagError, TagKind, TagOperation};
