//! Draft validation and normalization for optimistic publish.
//!
//! Validation is synchronous and local: failures short-circuit before any
//! network call or store mutation. Errors are machine-readable codes;
//! warnings never block.

use crate::{FeedItem, ItemId, ItemKind, ItemStatus, Quantity, Source, Timestamp, TradeMode};
use serde::{Deserialize, Serialize};

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 160;
pub const SUMMARY_MIN: usize = 10;
pub const SUMMARY_MAX: usize = 5000;

/// Prefix of temporary optimistic item ids.
pub const OPTIMISTIC_ID_PREFIX: &str = "optimistic-";

/// Content patterns that trigger a moderation warning (never a hard error).
const MODERATION_PATTERNS: &[&str] = &[
    "guaranteed profit",
    "wire transfer only",
    "no questions asked",
    "advance fee",
];

/// A user-authored draft, pre-validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedDraft {
    pub title: String,
    pub summary: String,
    pub kind: Option<ItemKind>,
    pub sector_id: Option<String>,
    pub from_province_id: Option<String>,
    pub to_province_id: Option<String>,
    pub mode: TradeMode,
    pub quantity: Option<Quantity>,
    pub tags: Vec<String>,
}

/// Machine-readable validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationCode {
    TitleTooShort,
    TitleTooLong,
    SummaryTooShort,
    SummaryTooLong,
    MissingKind,
    MissingSector,
    InvalidQuantity,
}

/// Non-blocking validation warnings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Mode is directional but both province endpoints are not set.
    IncompleteRoute,
    /// Content matched a moderation pattern.
    ModerationFlag,
}

/// Outcome of draft validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    pub errors: Vec<ValidationCode>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A validated, trimmed draft ready for the wire.
///
/// Unset optional relations serialize as `null` rather than being omitted,
/// matching the publish body contract.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDraft {
    pub title: String,
    pub summary: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub sector_id: String,
    pub from_province_id: Option<String>,
    pub to_province_id: Option<String>,
    pub mode: TradeMode,
    pub quantity: Option<Quantity>,
    pub tags: Vec<String>,
}

impl FeedDraft {
    /// Validate and normalize this draft.
    ///
    /// On failure the report carries every error found, not just the
    /// first. Warnings ride along on both paths; a caller that wants them
    /// on success can call [`FeedDraft::warnings`].
    pub fn validate(&self) -> Result<NormalizedDraft, ValidationReport> {
        let mut report = ValidationReport::default();

        let title = self.title.trim().to_string();
        let summary = self.summary.trim().to_string();

        let title_chars = title.chars().count();
        if title_chars < TITLE_MIN {
            report.errors.push(ValidationCode::TitleTooShort);
        } else if title_chars > TITLE_MAX {
            report.errors.push(ValidationCode::TitleTooLong);
        }

        let summary_chars = summary.chars().count();
        if summary_chars < SUMMARY_MIN {
            report.errors.push(ValidationCode::SummaryTooShort);
        } else if summary_chars > SUMMARY_MAX {
            report.errors.push(ValidationCode::SummaryTooLong);
        }

        if self.kind.is_none() {
            report.errors.push(ValidationCode::MissingKind);
        }

        let sector = self
            .sector_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        if sector.is_none() {
            report.errors.push(ValidationCode::MissingSector);
        }

        if let Some(quantity) = &self.quantity {
            if !quantity.value.is_finite()
                || quantity.value <= 0.0
                || quantity.unit.trim().is_empty()
            {
                report.errors.push(ValidationCode::InvalidQuantity);
            }
        }

        report.warnings = self.warnings();

        match (self.kind, sector) {
            (Some(kind), Some(sector)) if report.is_valid() => Ok(NormalizedDraft {
                title,
                summary,
                kind,
                sector_id: sector.to_string(),
                from_province_id: trimmed_opt(&self.from_province_id),
                to_province_id: trimmed_opt(&self.to_province_id),
                mode: self.mode,
                quantity: self.quantity.clone(),
                tags: self
                    .tags
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect(),
            }),
            _ => Err(report),
        }
    }

    /// Non-blocking warnings for this draft.
    pub fn warnings(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if self.mode != TradeMode::Both
            && (trimmed_opt(&self.from_province_id).is_none()
                || trimmed_opt(&self.to_province_id).is_none())
        {
            warnings.push(ValidationWarning::IncompleteRoute);
        }

        let haystack = format!("{} {}", self.title, self.summary).to_lowercase();
        if MODERATION_PATTERNS.iter().any(|p| haystack.contains(p)) {
            warnings.push(ValidationWarning::ModerationFlag);
        }

        warnings
    }
}

fn trimmed_opt(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl NormalizedDraft {
    /// Synthesize the temporary optimistic item inserted before the write
    /// request is sent.
    pub fn into_pending_item(&self, key: &str, now: Timestamp) -> FeedItem {
        FeedItem {
            id: optimistic_id(key),
            created_at: now,
            updated_at: None,
            kind: self.kind,
            sector_id: self.sector_id.clone(),
            from_province_id: self.from_province_id.clone(),
            to_province_id: self.to_province_id.clone(),
            mode: self.mode,
            title: self.title.clone(),
            summary: self.summary.clone(),
            quantity: self.quantity.clone(),
            urgency: None,
            credibility: None,
            tags: self.tags.clone(),
            source: Source {
                kind: "user".to_string(),
                label: String::new(),
            },
            status: Some(ItemStatus::Pending),
            idempotency_key: Some(key.to_string()),
        }
    }
}

/// Temporary id derived from an idempotency key.
pub fn optimistic_id(key: &str) -> ItemId {
    format!("{OPTIMISTIC_ID_PREFIX}{key}")
}
