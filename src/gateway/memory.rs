//! In-process gateway with the admin API's observable semantics:
//!
//! - an item without a title, or a video without `videoUrl`, fails validation
//! - an incoming video whose `videoUrl` already exists is merged into that record
//! - an incoming game whose title already exists updates that record
//! - regex preview/apply run the same [`CompiledRewrite`] engine the editor
//!   validates with, so `apply().count == preview().total_matched`
//!
//! Failure injection and call recording make scheduler behavior observable in
//! tests.

use super::{BatchGateway, CreateResponse};
use crate::regex_edit::{
    CompiledRewrite, RegexApplyResponse, RegexEditRequest, RegexPreviewResponse,
};
use crate::types::{CanonicalItem, ContentKind, GroupMeta, ItemResult};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub description: String,
    pub cover_url: String,
    pub video_url: String,
    pub tags: Vec<String>,
    pub fields: Map<String, Value>,
    pub series_id: Option<String>,
}

impl StoredRecord {
    pub fn text(&self, field: &str) -> Option<&str> {
        match field {
            "title" => Some(&self.title),
            "description" => Some(&self.description),
            "coverUrl" => Some(&self.cover_url),
            "videoUrl" => Some(&self.video_url),
            other => Some(self.fields.get(other).and_then(Value::as_str).unwrap_or("")),
        }
    }

    fn set_text(&mut self, field: &str, value: String) {
        match field {
            "title" => self.title = value,
            "description" => self.description = value,
            "coverUrl" => self.cover_url = value,
            "videoUrl" => self.video_url = value,
            other => {
                self.fields.insert(other.to_string(), Value::String(value));
            }
        }
    }

    fn absorb(&mut self, item: &CanonicalItem) {
        if !item.description.is_empty() {
            self.description = item.description.clone();
        }
        if !item.cover_url.is_empty() {
            self.cover_url = item.cover_url.clone();
        }
        for tag in &item.tags {
            if !self.tags.contains(tag) {
                self.tags.push(tag.clone());
            }
        }
        for (k, v) in &item.fields {
            self.fields.insert(k.clone(), v.clone());
        }
    }
}

/// One recorded `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub kind: ContentKind,
    pub titles: Vec<String>,
    pub series: Option<String>,
}

#[derive(Debug, Default)]
struct Store {
    records: Vec<StoredRecord>,
    series: HashMap<String, String>,
    next_id: u64,
}

impl Store {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    /// Any create call containing one of these titles fails as a whole.
    create_titles: HashSet<String>,
    /// Remaining apply calls that fail.
    apply_failures: usize,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    store: Mutex<Store>,
    faults: Mutex<Faults>,
    calls: Mutex<Vec<CreateCall>>,
    latency: Option<Duration>,
    echo_client_ids: bool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    preview_calls: AtomicUsize,
    apply_calls: AtomicUsize,
}

fn lock<T>(m: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    m.lock().map_err(|_| {
        Error::runtime_with_context(
            "memory gateway lock poisoned",
            ErrorContext::new().with_source("memory_gateway"),
        )
    })
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self {
            echo_client_ids: true,
            ..Self::default()
        }
    }

    /// Delay every create call, making concurrency observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Answer without `clientId`, forcing correlation by title.
    pub fn without_client_ids(mut self) -> Self {
        self.echo_client_ids = false;
        self
    }

    /// Seed a record directly and return its id.
    pub fn insert(&self, item: CanonicalItem) -> Result<String> {
        let mut store = lock(&self.store)?;
        let prefix = match item.kind {
            ContentKind::Video => "v",
            ContentKind::Game => "g",
        };
        let id = store.next_id(prefix);
        store.records.push(StoredRecord {
            id: id.clone(),
            kind: item.kind,
            title: item.title,
            description: item.description,
            cover_url: item.cover_url,
            video_url: item.video_url,
            tags: item.tags,
            fields: item.fields,
            series_id: None,
        });
        Ok(id)
    }

    pub fn fail_units_containing(&self, title: impl Into<String>) {
        if let Ok(mut f) = lock(&self.faults) {
            f.create_titles.insert(title.into());
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut f) = lock(&self.faults) {
            *f = Faults::default();
        }
    }

    pub fn fail_next_applies(&self, n: usize) {
        if let Ok(mut f) = lock(&self.faults) {
            f.apply_failures = n;
        }
    }

    pub fn record(&self, id: &str) -> Option<StoredRecord> {
        lock(&self.store)
            .ok()?
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    pub fn records(&self, kind: ContentKind) -> Vec<StoredRecord> {
        lock(&self.store)
            .map(|s| s.records.iter().filter(|r| r.kind == kind).cloned().collect())
            .unwrap_or_default()
    }

    pub fn series_id(&self, title: &str) -> Option<String> {
        lock(&self.store).ok()?.series.get(title).cloned()
    }

    pub fn create_calls(&self) -> Vec<CreateCall> {
        lock(&self.calls).map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }

    pub fn preview_calls(&self) -> usize {
        self.preview_calls.load(Ordering::Acquire)
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::Acquire)
    }

    fn create_locked(
        &self,
        store: &mut Store,
        kind: ContentKind,
        items: &[CanonicalItem],
        meta: Option<&GroupMeta>,
    ) -> Vec<ItemResult> {
        let series_id = meta.and_then(|m| m.title.as_ref()).map(|title| {
            if let Some(id) = store.series.get(title) {
                return id.clone();
            }
            let id = store.next_id("s");
            store.series.insert(title.clone(), id.clone());
            id
        });

        items
            .iter()
            .map(|item| {
                let result = self.create_one(store, kind, item, series_id.as_deref());
                if self.echo_client_ids {
                    result.with_client_id(item.client_id.clone())
                } else {
                    result
                }
            })
            .collect()
    }

    fn create_one(
        &self,
        store: &mut Store,
        kind: ContentKind,
        item: &CanonicalItem,
        series_id: Option<&str>,
    ) -> ItemResult {
        if item.title.trim().is_empty() {
            return ItemResult::failed(&item.title, "title required");
        }
        if kind == ContentKind::Video && item.video_url.trim().is_empty() {
            return ItemResult::failed(&item.title, "videoUrl required");
        }

        let existing = store.records.iter_mut().find(|r| {
            r.kind == kind
                && match kind {
                    ContentKind::Video => r.video_url == item.video_url,
                    ContentKind::Game => r.title == item.title,
                }
        });
        if let Some(rec) = existing {
            rec.absorb(item);
            if series_id.is_some() {
                rec.series_id = series_id.map(str::to_string);
            }
            return match kind {
                ContentKind::Video => ItemResult::merged(&item.title, &rec.id),
                ContentKind::Game => ItemResult::updated(&item.title, &rec.id),
            };
        }

        let prefix = match kind {
            ContentKind::Video => "v",
            ContentKind::Game => "g",
        };
        let id = store.next_id(prefix);
        store.records.push(StoredRecord {
            id: id.clone(),
            kind,
            title: item.title.clone(),
            description: item.description.clone(),
            cover_url: item.cover_url.clone(),
            video_url: item.video_url.clone(),
            tags: item.tags.clone(),
            fields: item.fields.clone(),
            series_id: series_id.map(str::to_string),
        });
        ItemResult::created(&item.title, id)
    }

    fn run_regex(&self, request: &RegexEditRequest, write: bool) -> Result<RegexPreviewResponse> {
        if !request.kind.editable_fields().contains(&request.field.as_str()) {
            return Err(Error::validation_with_context(
                format!("field `{}` cannot be bulk edited", request.field),
                ErrorContext::new()
                    .with_field_path(request.field.clone())
                    .with_source("memory_gateway"),
            ));
        }
        let rewrite = CompiledRewrite::compile(&request.pattern, &request.replacement, &request.flags)?;

        let mut selected: Vec<&str> = Vec::new();
        for id in &request.target_ids {
            if !selected.contains(&id.as_str()) {
                selected.push(id);
            }
        }

        let mut store = lock(&self.store)?;
        let mut previews = Vec::new();
        for rec in store
            .records
            .iter_mut()
            .filter(|r| r.kind == request.kind && selected.contains(&r.id.as_str()))
        {
            let value = rec.text(&request.field).unwrap_or_default().to_string();
            if let Some(entry) = rewrite.preview(&rec.id, &rec.title, &value) {
                if write {
                    rec.set_text(&request.field, entry.after.clone());
                }
                previews.push(entry);
            }
        }

        Ok(RegexPreviewResponse {
            total_matched: previews.len(),
            total_selected: selected.len(),
            previews,
        })
    }
}

#[async_trait]
impl BatchGateway for MemoryGateway {
    async fn create(
        &self,
        kind: ContentKind,
        items: &[CanonicalItem],
        meta: Option<&GroupMeta>,
    ) -> Result<CreateResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::AcqRel);

        lock(&self.calls)?.push(CreateCall {
            kind,
            titles: items.iter().map(|i| i.title.clone()).collect(),
            series: meta.and_then(|m| m.title.clone()),
        });

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let should_fail = {
            let faults = lock(&self.faults)?;
            items.iter().any(|i| faults.create_titles.contains(&i.title))
        };
        if should_fail {
            return Err(Error::Remote {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        let mut store = lock(&self.store)?;
        let results = self.create_locked(&mut store, kind, items, meta);
        Ok(CreateResponse { results })
    }

    async fn regex_preview(&self, request: &RegexEditRequest) -> Result<RegexPreviewResponse> {
        self.preview_calls.fetch_add(1, Ordering::AcqRel);
        self.run_regex(request, false)
    }

    async fn regex_apply(&self, request: &RegexEditRequest) -> Result<RegexApplyResponse> {
        self.apply_calls.fetch_add(1, Ordering::AcqRel);
        {
            let mut faults = lock(&self.faults)?;
            if faults.apply_failures > 0 {
                faults.apply_failures -= 1;
                return Err(Error::transport("connection reset by peer"));
            }
        }
        let resp = self.run_regex(request, true)?;
        Ok(RegexApplyResponse {
            count: resp.total_matched,
        })
    }
}
