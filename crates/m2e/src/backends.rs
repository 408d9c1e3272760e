//! 🔌 Backends: where the real I/O happens.
//!
//! 🚰 The Source pours documents out of MongoDB, the Sink slurps them into Elasticsearch.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 This module is the casting agency. Two traits, two real actors, and a pair of
//! in-memory understudies that only show up for rehearsals (`cfg(test)`).
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use mongodb::bson::RawDocumentBuf;

pub(crate) mod elasticsearch_sink;
pub(crate) mod mongodb_source;

#[cfg(test)]
pub(crate) mod in_mem_sink;
#[cfg(test)]
pub(crate) mod in_mem_source;

// 🎯 Re-export backend-specific configs so callers can do `backends::MongoSourceConfig`
// instead of spelunking into `backends::mongodb_source::MongoSourceConfig`.
pub use elasticsearch_sink::ElasticsearchSinkConfig;
pub use mongodb_source::MongoSourceConfig;

// ===== Source Trait =====

/// 🌊 The cursor: a lazy, forward-only stream of raw documents.
///
/// `Ok(raw)` is one document, still in its BSON wrapper, not yet decoded.
/// `Err(..)` is a cursor-level failure. Not "this document is weird",
/// but "the stream itself broke". Those end the run.
pub(crate) type SourceCursor = BoxStream<'static, Result<RawDocumentBuf>>;

/// 🚰 A source that produces documents.
///
/// # Contract
/// - `verify` must succeed before anyone calls `query_all`. No ping, no party.
/// - `query_all` hands back a fresh cursor over the whole collection. Empty filter. Full scan.
///   The cursor can't be rewound. Want the documents again? Ask again.
/// - `close` releases the connection once the cursor is gone.
#[async_trait]
pub(crate) trait Source: std::fmt::Debug + Send + Sync {
    /// 🏷️ Human name for log lines. "Connected to {name}!"
    fn name(&self) -> &'static str;

    /// 📡 Liveness check. Any error here is fatal, there is no retry.
    async fn verify(&self) -> Result<()>;

    /// 📦 Open the cursor over every document in the configured collection.
    async fn query_all(&self) -> Result<SourceCursor>;

    /// 🗑️ Let go of the connection. Call after the cursor has been dropped.
    async fn close(&self) -> Result<()>;
}

// ===== Sink Trait =====

/// 💀 Why a single write didn't land. Every variant is per-document: log it, skip it, move on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// 📡 The request never got an answer. Network, DNS, timeout, the usual suspects.
    #[error("transport failure: {0}")]
    Transport(String),
    /// 🙅 Elasticsearch answered, and the answer was no.
    #[error("[{status}] {error_type}: {reason}")]
    Rejected {
        status: u16,
        error_type: String,
        reason: String,
    },
    /// 🤷 Elasticsearch answered no, but not in a shape we could read.
    #[error("[{status}] error parsing the response body: {detail}")]
    UnreadableRejection { status: u16, detail: String },
}

/// 🕳️ A sink that accepts documents, one at a time.
///
/// # Contract
/// - `verify` must succeed before the first write. Fatal otherwise.
/// - `index_document` writes or overwrites the document at `id`. Same id twice, same slot twice.
///   Errors are typed, because the migration loop treats every one of them as "skip and continue".
#[async_trait]
pub(crate) trait Sink: std::fmt::Debug + Send + Sync {
    /// 🏷️ Human name for log lines.
    fn name(&self) -> &'static str;

    /// 📡 Liveness check (an info call). Fatal on failure.
    async fn verify(&self) -> Result<()>;

    /// 📥 Write one JSON body at `index/id`.
    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Vec<u8>,
    ) -> std::result::Result<(), IndexError>;

    /// 🗑️ Flush, finalize, release. Nothing buffers today, but the slot is there.
    async fn close(&self) -> Result<()>;
}
