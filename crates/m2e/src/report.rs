//! 📊 report.rs: "Did it work?" answered per document, then all at once.
//!
//! Every trip through the migration loop ends in a [`DocumentOutcome`].
//! The loop folds them into a [`MigrationReport`], and the CLI renders that
//! as a comfy table so the last thing on screen is a number, not a wall of logs.

use std::collections::BTreeMap;

use comfy_table::{Cell, CellAlignment, ContentArrangement, Table, presets::NOTHING};

use crate::backends::IndexError;

/// ⚠️ Why a document didn't make it. None of these stop the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("error decoding document: {0}")]
    Decode(String),
    #[error("document has no _id field")]
    MissingId,
    #[error("error asserting _id to ObjectId: found {found}")]
    IdNotObjectId { found: String },
    #[error("error marshaling document: {0}")]
    Serialize(String),
    #[error("error indexing document: {0}")]
    Index(#[from] IndexError),
}

impl SkipReason {
    /// 🏷️ Short bucket name for the summary table.
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::Decode(_) => "decode",
            SkipReason::MissingId => "missing _id",
            SkipReason::IdNotObjectId { .. } => "_id not ObjectId",
            SkipReason::Serialize(_) => "serialize",
            SkipReason::Index(IndexError::Transport(_)) => "transport",
            SkipReason::Index(IndexError::Rejected { .. }) => "rejected",
            SkipReason::Index(IndexError::UnreadableRejection { .. }) => "rejected (unreadable)",
        }
    }
}

/// 🎯 What happened to one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentOutcome {
    Indexed {
        id: String,
    },
    /// `id` is `None` when the document fell out before we could read its `_id`.
    Skipped {
        id: Option<String>,
        reason: SkipReason,
    },
}

impl DocumentOutcome {
    pub(crate) fn skipped(id: Option<String>, reason: impl Into<SkipReason>) -> Self {
        DocumentOutcome::Skipped {
            id,
            reason: reason.into(),
        }
    }
}

/// 📦 The run, summarized. Counts only, no documents retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub indexed: u64,
    pub skipped: u64,
    pub skipped_by_kind: BTreeMap<&'static str, u64>,
}

impl MigrationReport {
    pub(crate) fn record(&mut self, outcome: &DocumentOutcome) {
        match outcome {
            DocumentOutcome::Indexed { .. } => self.indexed += 1,
            DocumentOutcome::Skipped { reason, .. } => {
                self.skipped += 1;
                *self.skipped_by_kind.entry(reason.kind()).or_default() += 1;
            }
        }
    }

    /// 🔢 Everything the cursor handed us, good or bad.
    pub fn seen(&self) -> u64 {
        self.indexed + self.skipped
    }

    /// 🍽️ Two columns, right-aligned, no borders (preset: NOTHING). Minimalists, us.
    pub fn to_table(&self) -> Table {
        let mut table = Table::new();
        table.load_preset(NOTHING);
        table.set_content_arrangement(ContentArrangement::Dynamic);

        let mut row = |label: String, count: u64| {
            table.add_row(vec![
                Cell::new(label),
                Cell::new(count.to_string()).set_alignment(CellAlignment::Right),
            ]);
        };

        row("documents seen".to_string(), self.seen());
        row("indexed".to_string(), self.indexed);
        row("skipped".to_string(), self.skipped);
        for (kind, count) in &self.skipped_by_kind {
            row(format!("  {kind}"), *count);
        }
        table
    }
}
