//! 机箱凭证
//!
//! 包含凭证类型、凭证来源（服务 / 文件）、带缓存的解析器和凭证文件维护。

pub mod admin;
pub mod resolver;
pub mod source;
pub mod types;

pub use admin::{apply_credential_updates, CredentialUpdateError, UpdateSummary};
pub use resolver::{CredentialResolver, RefreshOutcome, ResolverSettings};
pub use source::{CredentialSource, FileCredentialSource, ServiceCredentialSource, SourceError};
pub use types::{
    ChassisCredentials, CredentialError, CredentialMap, CredentialRecord, CredentialSourceKind,
    ResolverStatus,
};
