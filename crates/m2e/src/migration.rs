//! 🎬 *[camera pans across a dimly lit server room]*
//! 🎬 "In a world where documents sat unsearchable..."
//! 🎬 "One loop dared to move them. One at a time. With refresh."
//! 🎬 *[record scratch]* 🦆
//!
//! 📦 The migration loop: verify both ends, open the cursor, and walk it.
//!
//! ```text
//!  Idle ──verify source──▶ SourceConnected ──verify sink──▶ BothConnected ──query──▶ Iterating ──▶ Done
//!    │                          │                                                     │
//!    └──────── fatal ───────────┴──────────────── fatal ──────────────── cursor error ─▶ Draining ─▶ fatal
//! ```
//!
//! Inside `Iterating`, every document gets the same treatment:
//! decode, take `_id`, render body, index, log. Any of those can fail for one
//! document, and when they do we log it and keep walking. Only the cursor
//! itself breaking ends the walk early.

use anyhow::{Context, Result};
use futures::StreamExt;
use mongodb::bson::RawDocumentBuf;
use tracing::{debug, info, warn};

use crate::backends::{Sink, Source};
use crate::report::{DocumentOutcome, MigrationReport};
use crate::transforms::{decode_document, render_body, take_document_id};

/// 🚦 Where the run is. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MigrationState {
    Idle,
    SourceConnected,
    BothConnected,
    Iterating,
    Draining,
    Done,
}

/// 🧵 One run of the pipeline, from first ping to last document.
///
/// Borrows its source and sink: connecting them is the caller's job,
/// verifying and using them is ours.
#[derive(Debug)]
pub(crate) struct Migration<'a, S: Source, K: Sink> {
    source: &'a S,
    sink: &'a K,
    index: &'a str,
    state: MigrationState,
}

impl<'a, S: Source, K: Sink> Migration<'a, S, K> {
    pub(crate) fn new(source: &'a S, sink: &'a K, index: &'a str) -> Self {
        Self {
            source,
            sink,
            index,
            state: MigrationState::Idle,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> MigrationState {
        self.state
    }

    fn transition(&mut self, next: MigrationState) {
        debug!("🚦 migration state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// 🚀 Run to completion. `Ok` means the cursor was exhausted; skips are in the report.
    /// `Err` means something fatal: a failed liveness check, a failed query, or a broken cursor.
    pub(crate) async fn run(&mut self) -> Result<MigrationReport> {
        self.source.verify().await.with_context(|| {
            format!("💀 Could not verify the {} connection", self.source.name())
        })?;
        info!("✅ Connected to {}!", self.source.name());
        self.transition(MigrationState::SourceConnected);

        self.sink.verify().await.with_context(|| {
            format!("💀 Could not verify the {} connection", self.sink.name())
        })?;
        info!("✅ Connected to {}!", self.sink.name());
        self.transition(MigrationState::BothConnected);

        let mut cursor = self.source.query_all().await?;
        self.transition(MigrationState::Iterating);

        let mut report = MigrationReport::default();
        while let Some(item) = cursor.next().await {
            let raw = match item {
                Ok(raw) => raw,
                Err(err) => {
                    self.transition(MigrationState::Draining);
                    return Err(err.context(format!(
                        "💀 The cursor failed after {} documents. Everything before this point was attempted; nothing after it was read.",
                        report.seen()
                    )));
                }
            };

            let outcome = self.migrate_document(&raw).await;
            log_outcome(&outcome);
            report.record(&outcome);
        }

        // 🗑️ cursor first, then the connection it was borrowed from
        drop(cursor);
        self.source.close().await?;
        self.sink.close().await?;

        self.transition(MigrationState::Done);
        info!(
            "🏁 Finished indexing data from {} to {}",
            self.source.name(),
            self.sink.name()
        );
        Ok(report)
    }

    /// 🔄 One document, start to finish. Never fails, only reports.
    async fn migrate_document(&self, raw: &RawDocumentBuf) -> DocumentOutcome {
        let mut document = match decode_document(raw) {
            Ok(document) => document,
            Err(reason) => return DocumentOutcome::skipped(None, reason),
        };
        let id = match take_document_id(&mut document) {
            Ok(id) => id,
            Err(reason) => return DocumentOutcome::skipped(None, reason),
        };
        let body = match render_body(document) {
            Ok(body) => body,
            Err(reason) => return DocumentOutcome::skipped(Some(id), reason),
        };

        match self.sink.index_document(self.index, &id, body).await {
            Ok(()) => DocumentOutcome::Indexed { id },
            Err(err) => DocumentOutcome::skipped(Some(id), err),
        }
    }
}

fn log_outcome(outcome: &DocumentOutcome) {
    match outcome {
        DocumentOutcome::Indexed { id } => info!("Document ID {} indexed successfully.", id),
        DocumentOutcome::Skipped {
            id: Some(id),
            reason,
        } => warn!(document_id = %id, "⚠️ Skipping document ID {}: {}", id, reason),
        DocumentOutcome::Skipped { id: None, reason } => warn!("⚠️ Skipping document: {}", reason),
    }
}
