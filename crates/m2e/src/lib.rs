//! 🍃➡️🔍 m2e: every document in one MongoDB collection, indexed into one Elasticsearch index.
//!
//! The `_id` becomes the Elasticsearch document id (hex), so running it twice overwrites
//! instead of duplicating. One thread, one document at a time, no batching, no retries.

pub mod app_config;
pub mod backends;
mod migration;
pub mod report;
mod transforms;

use anyhow::Result;

use crate::app_config::AppConfig;
use crate::backends::elasticsearch_sink::ElasticsearchSink;
use crate::backends::mongodb_source::MongoSource;
use crate::migration::Migration;
use crate::report::MigrationReport;

/// 🚀 Connect both ends and run the migration to completion.
///
/// Both connectors are built from the same immutable config, then handed to the loop,
/// which verifies them in order (source first) before reading a single document.
pub async fn run(app_config: &AppConfig) -> Result<MigrationReport> {
    let source = MongoSource::connect(app_config.mongo_source_config()).await?;
    let sink = ElasticsearchSink::connect(app_config.elasticsearch_sink_config()?)?;

    Migration::new(&source, &sink, &app_config.elasticsearch_index_name)
        .run()
        .await
}
