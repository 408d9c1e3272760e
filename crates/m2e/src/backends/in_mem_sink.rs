use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;

use crate::backends::{IndexError, Sink};

/// 📦 A sink that never forgets. Unlike my dad, who forgot my soccer game in 1998.
///
/// Stores `index -> (id -> body)` behind `Arc<Mutex<..>>` so a test can keep a clone
/// and inspect what landed after the migration walks away with the original.
/// Overwrites on the same id, same as the real thing.
///
/// 🧪 Failure injection: ids in `transport_failures` never arrive,
/// ids in `rejections` arrive and get told no.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemorySink {
    pub(crate) indices: Arc<tokio::sync::Mutex<BTreeMap<String, BTreeMap<String, Value>>>>,
    /// 🧾 Every id we were asked to write, in order, including the ones we failed.
    pub(crate) attempts: Arc<tokio::sync::Mutex<Vec<String>>>,
    transport_failures: HashSet<String>,
    rejections: HashSet<String>,
    verify_fails: bool,
    /// 🏷️ What `name()` answers. Lets a test read log lines that look like production.
    display_name: Option<&'static str>,
}

impl InMemorySink {
    pub(crate) fn failing_transport_for(mut self, id: &str) -> Self {
        self.transport_failures.insert(id.to_string());
        self
    }

    pub(crate) fn rejecting(mut self, id: &str) -> Self {
        self.rejections.insert(id.to_string());
        self
    }

    pub(crate) fn named(mut self, name: &'static str) -> Self {
        self.display_name = Some(name);
        self
    }

    pub(crate) fn failing_verify(mut self) -> Self {
        self.verify_fails = true;
        self
    }

    /// 🔍 Snapshot of one index. Empty map if nothing was ever written there.
    pub(crate) async fn index_snapshot(&self, index: &str) -> BTreeMap<String, Value> {
        self.indices
            .lock()
            .await
            .get(index)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn attempted_ids(&self) -> Vec<String> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl Sink for InMemorySink {
    fn name(&self) -> &'static str {
        self.display_name.unwrap_or("InMemorySink")
    }

    async fn verify(&self) -> Result<()> {
        if self.verify_fails {
            bail!("💀 in-memory info call refused (as requested)");
        }
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Vec<u8>,
    ) -> std::result::Result<(), IndexError> {
        self.attempts.lock().await.push(id.to_string());

        if self.transport_failures.contains(id) {
            return Err(IndexError::Transport("connection reset by peer".to_string()));
        }
        if self.rejections.contains(id) {
            return Err(IndexError::Rejected {
                status: 400,
                error_type: "mapper_parsing_exception".to_string(),
                reason: "failed to parse".to_string(),
            });
        }

        let value: Value = serde_json::from_slice(&body).map_err(|err| {
            IndexError::Rejected {
                status: 400,
                error_type: "parse_exception".to_string(),
                reason: err.to_string(),
            }
        })?;
        // 🔒 The Mutex is load-bearing. Do not remove. I know it looks optional. It isn't.
        self.indices
            .lock()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), value);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
