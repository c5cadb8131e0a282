//! Per-item outcomes.

use serde::{Deserialize, Serialize};

/// Outcome of one submitted item as reported by the gateway.
///
/// After correlation every result has exactly one of `id` / `error` set;
/// [`ItemResult::normalized`] enforces that for whatever the remote sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub merged: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub updated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Created,
    Merged,
    Updated,
    Failed,
}

impl ItemResult {
    pub fn created(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn merged(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            merged: true,
            ..Self::created(title, id)
        }
    }

    pub fn updated(title: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            updated: true,
            ..Self::created(title, id)
        }
    }

    pub fn failed(title: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            error: Some(error.into()),
            ..Self::default()
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.id.is_some()
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    pub fn outcome(&self) -> Outcome {
        if !self.is_success() {
            Outcome::Failed
        } else if self.merged {
            Outcome::Merged
        } else if self.updated {
            Outcome::Updated
        } else {
            Outcome::Created
        }
    }

    /// Key used to match this result against items and earlier results.
    pub fn key(&self) -> &str {
        self.client_id.as_deref().unwrap_or(&self.title)
    }

    /// Enforce `id` xor `error`. An error wins over an id; a result with
    /// neither becomes a failure.
    pub fn normalized(mut self) -> Self {
        match (&self.id, &self.error) {
            (Some(_), None) => {}
            (_, Some(_)) => {
                self.id = None;
                self.merged = false;
                self.updated = false;
            }
            (None, None) => {
                self.error = Some("no id returned for item".to_string());
                self.merged = false;
                self.updated = false;
            }
        }
        self
    }
}
