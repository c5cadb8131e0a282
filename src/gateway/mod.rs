//! Remote batch gateway: the admin API that creates records and runs regex edits.
//!
//! The pipeline depends only on the [`BatchGateway`] trait. Two
//! implementations ship with the crate:
//!
//! - [`HttpGateway`]: talks to the admin HTTP API with `reqwest`
//! - [`MemoryGateway`]: an in-process store with the same semantics, used by
//!   tests and dry runs

mod http;
mod memory;

pub use http::HttpGateway;
pub use memory::{CreateCall, MemoryGateway, StoredRecord};

use crate::regex_edit::{RegexApplyResponse, RegexEditRequest, RegexPreviewResponse};
use crate::types::{CanonicalItem, ContentKind, GroupMeta, ItemResult};
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Response of one batch-create call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateResponse {
    #[serde(default)]
    pub results: Vec<ItemResult>,
}

#[async_trait]
pub trait BatchGateway: Send + Sync {
    /// Create one unit of items. `Err` means the call as a whole failed;
    /// per-item problems come back as `ItemResult::error`.
    async fn create(
        &self,
        kind: ContentKind,
        items: &[CanonicalItem],
        meta: Option<&GroupMeta>,
    ) -> Result<CreateResponse>;

    /// Read-only: compute what `regex_apply` would change.
    async fn regex_preview(&self, request: &RegexEditRequest) -> Result<RegexPreviewResponse>;

    /// Durable rewrite; must receive the tuple of the preview shown to the user.
    async fn regex_apply(&self, request: &RegexEditRequest) -> Result<RegexApplyResponse>;
}
