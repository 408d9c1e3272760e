//! 🍃 The MongoDB source: one client, one ping, one cursor.
//!
//! The driver does the heavy lifting (pooling, paging with `getMore`, server selection).
//! We just ask for everything and hand the cursor downstream as a stream.

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use mongodb::bson::{RawDocumentBuf, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::Deserialize;
use tracing::debug;

use crate::backends::{Source, SourceCursor};

/// 🍃 Where the documents live and which pile of them we want.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MongoSourceConfig {
    /// 🔒 Connection string. Credentials, if any, live in here and nowhere else.
    pub uri: String,
    pub database: String,
    pub collection: String,
}

/// 📦 The source side of the pipeline, backed by the official driver.
///
/// ⚠️ `connect` does not touch the network. The driver connects lazily,
/// so the first real handshake is `verify()`. That's where bad hosts get caught.
#[derive(Debug)]
pub(crate) struct MongoSource {
    client: Client,
    config: MongoSourceConfig,
}

impl MongoSource {
    /// 🚀 Parse the URI and build a client. Malformed URIs die here, unreachable hosts die in `verify`.
    pub(crate) async fn connect(config: MongoSourceConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.uri)
            .await
            .context("💀 The MongoDB connection string didn't parse. It should look like mongodb://host:port or mongodb+srv://cluster. This one looks like a riddle.")?;
        // 🏷️ Shows up in the server logs, so the DBA knows who's doing the full scan.
        options.app_name = Some("m2e".to_string());

        let client = Client::with_options(options)
            .context("💀 The MongoDB client refused to be born. The options parsed, the driver disagreed.")?;

        debug!(
            "🍃 MongoDB client ready for {}.{}",
            config.database, config.collection
        );
        Ok(Self { client, config })
    }

    fn collection(&self) -> Collection<RawDocumentBuf> {
        self.client
            .database(&self.config.database)
            .collection::<RawDocumentBuf>(&self.config.collection)
    }
}

#[async_trait]
impl Source for MongoSource {
    fn name(&self) -> &'static str {
        "MongoDB"
    }

    /// 📡 `{ ping: 1 }`. The cheapest question a server can answer.
    async fn verify(&self) -> Result<()> {
        self.client
            .database(&self.config.database)
            .run_command(doc! { "ping": 1 })
            .await
            .context("💀 Error pinging MongoDB. The server didn't answer, or answered with a no. Is mongod running? Is the URI pointing at it?")?;
        Ok(())
    }

    /// 🌊 Empty filter, full scan. Raw documents come out; decoding happens per document downstream,
    /// so one cursed document can't take the cursor down with it.
    async fn query_all(&self) -> Result<SourceCursor> {
        let cursor = self
            .collection()
            .find(doc! {})
            .await
            .with_context(|| {
                format!(
                    "💀 Error finding documents in {}.{}. The query never got off the ground.",
                    self.config.database, self.config.collection
                )
            })?;

        Ok(cursor
            .map(|item| item.context("💀 Error with cursor. The stream broke mid-scan."))
            .boxed())
    }

    /// 🗑️ Waits for in-flight operations, then tears down pools and monitors.
    async fn close(&self) -> Result<()> {
        self.client.clone().shutdown().await;
        debug!("🗑️ MongoDB client shut down");
        Ok(())
    }
}
