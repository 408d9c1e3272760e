//! 📡 The Elasticsearch sink: one document in, one `PUT` out.
//!
//! 🎬 INT. SERVER ROOM, 3:47 AM. Somebody asked for "just index them one at a time, with refresh".
//! This is that sink. It does not buffer. It does not batch. It knocks on the door once per document
//! and waits for the door to say "created" or "updated" before knocking again.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::app_config::RefreshPolicy;
use crate::backends::{IndexError, Sink};

/// 🔍 Where to send the documents and how loudly to demand they be searchable.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ElasticsearchSinkConfig {
    /// 📡 Base URL, scheme and port included. No trailing slash (we trim it anyway).
    pub url: String,
    /// 🔄 Sent as `?refresh=` on every write.
    #[serde(default)]
    pub refresh: RefreshPolicy,
}

/// 📡 The sink side of the pipeline. Pure I/O, zero buffering.
///
/// Internally holds:
/// - `client`: the HTTP muscle 💪, reused across requests
/// - `sink_config`: URL and refresh policy
#[derive(Debug)]
pub(crate) struct ElasticsearchSink {
    client: reqwest::Client,
    sink_config: ElasticsearchSinkConfig,
}

impl ElasticsearchSink {
    /// 🚀 Build the HTTP client. No request goes out yet; that's `verify`'s job.
    ///
    /// 10 second connect timeout because if ES can't handshake in 10 seconds, it's not having
    /// a good time and neither are we. 30 seconds per request because refresh=true is not free.
    pub(crate) fn connect(config: ElasticsearchSinkConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .context("💀 Error creating Elasticsearch client. We tried to build a reqwest::Client and the universe said 'no'. Probably TLS. It's always TLS.")?;

        Ok(Self {
            client,
            sink_config: config,
        })
    }

    fn base_url(&self) -> &str {
        self.sink_config.url.trim_end_matches('/')
    }

    /// 🧭 `PUT <base>/<index>/_doc/<id>?refresh=<policy>`
    ///
    /// Ids are 24 hex chars and index names can't carry URL-hostile characters,
    /// so plain formatting is enough here.
    pub(crate) fn document_url(&self, index: &str, id: &str) -> String {
        format!(
            "{}/{}/_doc/{}?refresh={}",
            self.base_url(),
            index,
            id,
            self.sink_config.refresh.as_query_value()
        )
    }
}

/// 📜 The shape of an Elasticsearch error body: `{"error": {"type": .., "reason": ..}, "status": ..}`.
/// Sometimes `error` is just a string. Elasticsearch contains multitudes.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Structured {
        #[serde(rename = "type")]
        error_type: String,
        #[serde(default)]
        reason: Option<String>,
    },
    Plain(String),
}

/// 🔬 Turn a non-2xx body into the most specific error we can.
/// 🧅 reqwest's own message is "error sending request for url (...)". The part worth
/// reading (refused, dns, timeout) sits further down the `source()` chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    message
}

fn rejection_from_body(status: u16, body: &[u8]) -> IndexError {
    match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(ErrorEnvelope {
            error: ErrorDetail::Structured { error_type, reason },
        }) => IndexError::Rejected {
            status,
            error_type,
            reason: reason.unwrap_or_default(),
        },
        Ok(ErrorEnvelope {
            error: ErrorDetail::Plain(reason),
        }) => IndexError::Rejected {
            status,
            error_type: "error".to_string(),
            reason,
        },
        Err(err) => IndexError::UnreadableRejection {
            status,
            detail: err.to_string(),
        },
    }
}

#[async_trait]
impl Sink for ElasticsearchSink {
    fn name(&self) -> &'static str {
        "Elasticsearch"
    }

    /// 📡 `GET /`: the cluster info call. "Hello? Is this thing on?"
    async fn verify(&self) -> Result<()> {
        let response = self
            .client
            .get(self.base_url())
            .send()
            .await
            .with_context(|| {
                format!(
                    "💀 Error pinging Elasticsearch at '{}'. Nobody picked up.",
                    self.base_url()
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "💀 Error pinging Elasticsearch at '{}': it answered '{}' with '{}'. Alive, but not happy.",
                self.base_url(),
                status,
                body
            );
        }
        debug!("✅ Elasticsearch answered the info call with {}", status);
        Ok(())
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        body: Vec<u8>,
    ) -> std::result::Result<(), IndexError> {
        let url = self.document_url(index, id);
        trace!("📡 PUT {} ({} bytes)", url, body.len());

        let response = self
            .client
            .put(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| IndexError::Transport(error_chain(&err)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        // -- 💀 We got a response! It just... wasn't good news.
        let status = status.as_u16();
        match response.bytes().await {
            Ok(bytes) => Err(rejection_from_body(status, &bytes)),
            Err(err) => Err(IndexError::UnreadableRejection {
                status,
                detail: err.to_string(),
            }),
        }
    }

    /// 🗑️ Nothing to flush. We don't buffer. The connection pool says goodbye on drop.
    async fn close(&self) -> Result<()> {
        debug!("🗑️ Elasticsearch sink closing. No buffer to flush, just vibes to release");
        Ok(())
    }
}
