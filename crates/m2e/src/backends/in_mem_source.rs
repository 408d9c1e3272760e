use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{Document, RawDocumentBuf};

use crate::backends::{Source, SourceCursor};

/// 📦 A collection that lives in a Vec. The understudy for MongoDB.
///
/// 🎯 Designed entirely for testing. Each entry is either a raw document or a
/// cursor-level failure, replayed in order every time `query_all` is called.
///
/// The flags are `Arc<AtomicBool>` so a test can keep a clone and peek
/// after handing the source to the migration. Nosy, but effective.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySource {
    items: Vec<std::result::Result<RawDocumentBuf, String>>,
    ping_fails: bool,
    /// 🏷️ What `name()` answers. Lets a test read log lines that look like production.
    display_name: Option<&'static str>,
    pub(crate) queried: Arc<AtomicBool>,
    pub(crate) closed: Arc<AtomicBool>,
}

impl InMemorySource {
    pub(crate) fn with_documents(documents: Vec<Document>) -> Self {
        let mut source = Self::default();
        for document in documents {
            source = source.then_document(document);
        }
        source
    }

    pub(crate) fn then_document(mut self, document: Document) -> Self {
        let raw = RawDocumentBuf::from_document(&document)
            .expect("💀 a bson::Document should always encode");
        self.items.push(Ok(raw));
        self
    }

    /// 🧨 Raw bytes, for when the test needs a document that won't decode.
    pub(crate) fn then_raw(mut self, raw: RawDocumentBuf) -> Self {
        self.items.push(Ok(raw));
        self
    }

    /// 💥 The cursor itself breaks at this point in the stream.
    pub(crate) fn then_cursor_error(mut self, message: &str) -> Self {
        self.items.push(Err(message.to_string()));
        self
    }

    pub(crate) fn named(mut self, name: &'static str) -> Self {
        self.display_name = Some(name);
        self
    }

    pub(crate) fn failing_ping(mut self) -> Self {
        self.ping_fails = true;
        self
    }
}

#[async_trait]
impl Source for InMemorySource {
    fn name(&self) -> &'static str {
        self.display_name.unwrap_or("InMemorySource")
    }

    async fn verify(&self) -> Result<()> {
        if self.ping_fails {
            bail!("💀 in-memory ping refused (as requested)");
        }
        Ok(())
    }

    async fn query_all(&self) -> Result<SourceCursor> {
        self.queried.store(true, Ordering::SeqCst);
        let items: Vec<Result<RawDocumentBuf>> = self
            .items
            .iter()
            .cloned()
            .map(|item| item.map_err(|message| anyhow!(message)))
            .collect();
        Ok(futures::stream::iter(items).boxed())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
