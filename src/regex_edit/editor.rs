//! Preview-then-apply state machine for regex bulk edits.
//!
//! ```text
//! Idle ──edit──▶ PatternEntered ──preview──▶ Previewed ──apply──▶ Applying ──ok──▶ Idle
//!                      ▲                         │                    │
//!                      └────────── edit ─────────┘◀──── apply error ──┘
//! (Error is reachable from any state; an edit or a new preview leaves it.)
//! ```
//!
//! Gateway calls are split into `begin_*` / `complete_*` halves so the editor
//! can be driven from a UI event loop; [`RegexBulkEditor::preview`] and
//! [`RegexBulkEditor::apply`] wrap both halves for direct use.
//!
//! The record selection is owned by the caller and passed into every call.

use super::pattern::CompiledRewrite;
use super::request::{
    RegexApplyResponse, RegexEditRequest, RegexEditStats, RegexPreviewEntry,
    RegexPreviewResponse,
};
use crate::config::DEFAULT_REGEX_SIZE_LIMIT;
use crate::gateway::BatchGateway;
use crate::types::ContentKind;
use crate::{Error, ErrorContext, Result};
use std::collections::HashSet;
use tracing::{info, warn};

pub const DEFAULT_FLAGS: &str = "g";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Idle,
    PatternEntered,
    Previewed,
    Applying,
    Error,
}

/// Preview together with the exact tuple that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPreview {
    pub request: RegexEditRequest,
    pub previews: Vec<RegexPreviewEntry>,
    pub stats: RegexEditStats,
}

/// Handle for an outstanding preview request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTicket {
    generation: u64,
    pub request: RegexEditRequest,
}

#[derive(Debug, Clone)]
pub struct RegexBulkEditor {
    kind: ContentKind,
    field: String,
    pattern: String,
    replacement: String,
    flags: String,
    size_limit: usize,
    state: EditorState,
    preview: Option<CachedPreview>,
    /// Bumped on every parameter edit; outstanding previews for older
    /// generations are discarded when they complete.
    generation: u64,
    pending_preview: Option<u64>,
    last_error: Option<String>,
}

impl RegexBulkEditor {
    pub fn new(kind: ContentKind, field: impl Into<String>) -> Self {
        Self {
            kind,
            field: field.into(),
            pattern: String::new(),
            replacement: String::new(),
            flags: DEFAULT_FLAGS.to_string(),
            size_limit: DEFAULT_REGEX_SIZE_LIMIT,
            state: EditorState::Idle,
            preview: None,
            generation: 0,
            pending_preview: None,
            last_error: None,
        }
    }

    pub fn with_size_limit(mut self, bytes: usize) -> Self {
        self.size_limit = bytes;
        self
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn preview_result(&self) -> Option<&CachedPreview> {
        self.preview.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_preview_pending(&self) -> bool {
        self.pending_preview.is_some()
    }

    /// Apply is offered only for a fresh preview that matched something.
    pub fn can_apply(&self) -> bool {
        self.state == EditorState::Previewed
            && self
                .preview
                .as_ref()
                .map(|p| p.stats.total_matched > 0)
                .unwrap_or(false)
    }

    pub fn set_field(&mut self, field: impl Into<String>) -> Result<()> {
        let field = field.into();
        self.edit(|e| std::mem::replace(&mut e.field, field.clone()) != field)
    }

    pub fn set_pattern(&mut self, pattern: impl Into<String>) -> Result<()> {
        let pattern = pattern.into();
        self.edit(|e| std::mem::replace(&mut e.pattern, pattern.clone()) != pattern)
    }

    pub fn set_replacement(&mut self, replacement: impl Into<String>) -> Result<()> {
        let replacement = replacement.into();
        self.edit(|e| std::mem::replace(&mut e.replacement, replacement.clone()) != replacement)
    }

    pub fn set_flags(&mut self, flags: impl Into<String>) -> Result<()> {
        let flags = flags.into();
        self.edit(|e| std::mem::replace(&mut e.flags, flags.clone()) != flags)
    }

    fn edit<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> bool,
    {
        if self.state == EditorState::Applying {
            return Err(Error::invalid_state("cannot edit while an apply is in progress"));
        }
        if !change(self) {
            return Ok(());
        }
        self.invalidate();
        Ok(())
    }

    /// Drop the cached preview and any outstanding one.
    fn invalidate(&mut self) {
        self.generation += 1;
        self.preview = None;
        self.pending_preview = None;
        self.last_error = None;
        self.state = if self.pattern.is_empty() {
            EditorState::Idle
        } else {
            EditorState::PatternEntered
        };
    }

    fn fail(&mut self, err: &Error) {
        self.state = EditorState::Error;
        self.last_error = Some(err.to_string());
    }

    fn current_request(&self, selection: &[String]) -> RegexEditRequest {
        RegexEditRequest::new(
            self.kind,
            self.field.clone(),
            self.pattern.clone(),
            self.replacement.clone(),
            self.flags.clone(),
            selection.to_vec(),
        )
    }

    /// Validate locally and reserve the preview slot.
    ///
    /// A pattern that fails to compile moves the editor to `Error` and no
    /// request is produced.
    pub fn begin_preview(&mut self, selection: &[String]) -> Result<PreviewTicket> {
        match self.state {
            EditorState::Applying => {
                return Err(Error::invalid_state("cannot preview while an apply is in progress"))
            }
            _ if self.pending_preview.is_some() => {
                return Err(Error::invalid_state("a preview is already in progress"))
            }
            EditorState::Idle if self.pattern.is_empty() => {
                return Err(Error::invalid_state("enter a pattern first"))
            }
            _ => {}
        }
        if selection.is_empty() {
            return Err(Error::invalid_state("no records selected"));
        }
        if !self.kind.editable_fields().contains(&self.field.as_str()) {
            let err = Error::validation_with_context(
                format!("field `{}` cannot be bulk edited", self.field),
                ErrorContext::new()
                    .with_field_path(self.field.clone())
                    .with_details(format!("editable: {}", self.kind.editable_fields().join(", ")))
                    .with_source("regex_editor"),
            );
            self.fail(&err);
            return Err(err);
        }
        if let Err(err) = CompiledRewrite::compile_with_limit(
            &self.pattern,
            &self.replacement,
            &self.flags,
            self.size_limit,
        ) {
            self.fail(&err);
            return Err(err);
        }

        self.pending_preview = Some(self.generation);
        Ok(PreviewTicket {
            generation: self.generation,
            request: self.current_request(selection),
        })
    }

    /// Store the gateway's answer for `ticket`.
    ///
    /// Answers for tickets issued before the last edit are discarded with
    /// [`Error::StalePreview`] and leave the editor untouched.
    pub fn complete_preview(
        &mut self,
        ticket: PreviewTicket,
        outcome: Result<RegexPreviewResponse>,
    ) -> Result<&CachedPreview> {
        if self.pending_preview != Some(ticket.generation) || ticket.generation != self.generation {
            return Err(Error::StalePreview {
                message: "parameters changed while the preview was running".to_string(),
            });
        }
        self.pending_preview = None;

        match outcome {
            Ok(resp) => {
                let stats = resp.stats();
                info!(
                    kind = %self.kind,
                    field = ticket.request.field.as_str(),
                    matched = stats.total_matched,
                    selected = stats.total_selected,
                    "regex preview computed"
                );
                self.last_error = None;
                self.state = EditorState::Previewed;
                Ok(self.preview.insert(CachedPreview {
                    request: ticket.request,
                    previews: resp.previews,
                    stats,
                }))
            }
            Err(err) => {
                warn!(error = %err, "regex preview failed");
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Return the exact request behind the displayed preview and lock the editor.
    ///
    /// The selection is compared as a set of ids: reordering it keeps the
    /// preview, adding or removing an id invalidates it.
    pub fn begin_apply(&mut self, selection: &[String]) -> Result<RegexEditRequest> {
        if self.state != EditorState::Previewed {
            return Err(Error::invalid_state("a fresh preview is required before apply"));
        }
        let preview = self
            .preview
            .as_ref()
            .ok_or_else(|| Error::invalid_state("a fresh preview is required before apply"))?;
        if !same_selection(&preview.request.target_ids, selection) {
            self.invalidate();
            return Err(Error::StalePreview {
                message: "selection changed since the preview was computed".to_string(),
            });
        }
        if preview.stats.total_matched == 0 {
            return Err(Error::invalid_state("the preview matched no records"));
        }
        let request = preview.request.clone();
        self.state = EditorState::Applying;
        Ok(request)
    }

    /// On success the dialog state resets to `Idle`; on failure the preview
    /// is kept so apply can be retried without recomputing it.
    pub fn complete_apply(
        &mut self,
        outcome: Result<RegexApplyResponse>,
    ) -> Result<RegexApplyResponse> {
        if self.state != EditorState::Applying {
            return Err(Error::invalid_state("no apply in progress"));
        }
        match outcome {
            Ok(resp) => {
                info!(kind = %self.kind, field = self.field.as_str(), count = resp.count, "regex edit applied");
                self.reset();
                Ok(resp)
            }
            Err(err) => {
                warn!(error = %err, "regex apply failed; preview kept");
                self.state = EditorState::Previewed;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn preview(
        &mut self,
        gateway: &dyn BatchGateway,
        selection: &[String],
    ) -> Result<&CachedPreview> {
        let ticket = self.begin_preview(selection)?;
        let outcome = gateway.regex_preview(&ticket.request).await;
        self.complete_preview(ticket, outcome)
    }

    pub async fn apply(
        &mut self,
        gateway: &dyn BatchGateway,
        selection: &[String],
    ) -> Result<RegexApplyResponse> {
        let request = self.begin_apply(selection)?;
        let outcome = gateway.regex_apply(&request).await;
        self.complete_apply(outcome)
    }

    /// Closing the dialog discards everything except kind and field.
    pub fn close(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.pattern.clear();
        self.replacement.clear();
        self.flags = DEFAULT_FLAGS.to_string();
        self.generation += 1;
        self.preview = None;
        self.pending_preview = None;
        self.last_error = None;
        self.state = EditorState::Idle;
    }
}

fn same_selection(previewed: &[String], selection: &[String]) -> bool {
    let previewed: HashSet<&str> = previewed.iter().map(String::as_str).collect();
    let selection: HashSet<&str> = selection.iter().map(String::as_str).collect();
    previewed == selection
}
