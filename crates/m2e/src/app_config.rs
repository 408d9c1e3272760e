//! 🔧 App Configuration: the sacred env-var-to-struct pipeline.
//!
//! 📡 "MONGODB_URI is not set: We looked everywhere. Under the couch. Behind the fridge.
//! In the .env file. Nothing." (every developer, at 3am) 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! 🧠 Knowledge graph:
//! - Five canonical settings come from the environment (see [`ENV_KEYS`]).
//! - An optional TOML file layers on top. TOML wins on conflicts.
//! - The `.env` file is NOT loaded here. The CLI does that before calling
//!   [`load_config`], so tests stay hermetic and the library stays pure.
//! - The result is immutable. Built once. Passed by reference. Never mutated. Like a vow.

use std::fmt;
use std::path::Path;

use anyhow::{Context, bail};
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use serde::de::{self, Deserializer, Visitor};
use tracing::info;

use crate::backends::{ElasticsearchSinkConfig, MongoSourceConfig};

/// 📋 Every environment variable we are willing to listen to. The guest list.
/// Anything else in the environment is background noise (and there is a LOT of it).
pub const ENV_KEYS: [&str; 7] = [
    "MONGODB_URI",
    "ELASTICSEARCH_PORT",
    "MONGO_DB_NAME",
    "MONGO_COLLECTION_NAME",
    "ELASTICSEARCH_INDEX_NAME",
    "ELASTICSEARCH_URL",
    "ELASTICSEARCH_REFRESH",
];

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
///
/// Field names are the lowercased env var names, because figment lowercases
/// env keys and we'd rather not fight it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// 🍃 Where the documents live. Credentials ride inside the URI, if any.
    #[serde(deserialize_with = "scalar_string")]
    pub mongodb_uri: String,
    /// 📡 The Elasticsearch port on localhost. Optional only when `elasticsearch_url` is set.
    #[serde(default)]
    pub elasticsearch_port: Option<u16>,
    /// 🗄️ Source database.
    #[serde(deserialize_with = "scalar_string")]
    pub mongo_db_name: String,
    /// 📚 Source collection. Every document in it gets the full scan treatment.
    #[serde(deserialize_with = "scalar_string")]
    pub mongo_collection_name: String,
    /// 🔍 Target index.
    #[serde(deserialize_with = "scalar_string")]
    pub elasticsearch_index_name: String,
    /// 🌐 Full sink address. Beats `http://localhost:<port>` when present.
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub elasticsearch_url: Option<String>,
    /// 🔄 Refresh policy sent with every write.
    #[serde(default)]
    pub elasticsearch_refresh: RefreshPolicy,
}

/// 🔄 How hard do we ask Elasticsearch to make each write visible?
///
/// `True` is the default: every write is searchable the moment it's acknowledged.
/// Slow at scale, honest at any scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    #[default]
    True,
    False,
    WaitFor,
}

impl RefreshPolicy {
    /// 🏷️ The value of the `refresh` query parameter.
    pub fn as_query_value(self) -> &'static str {
        match self {
            RefreshPolicy::True => "true",
            RefreshPolicy::False => "false",
            RefreshPolicy::WaitFor => "wait_for",
        }
    }
}

// 🧵 figment reads `MONGO_DB_NAME=2024` as a number and `ELASTICSEARCH_INDEX_NAME=true`
// as a bool. Both are perfectly good names, so names take any scalar and keep its text.
struct ScalarStringVisitor;

impl Visitor<'_> for ScalarStringVisitor {
    type Value = String;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(v)
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }

    // -- ⚠️ `1.50` comes back as `1.5`. Nobody names an index 1.50. We hope.
    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(v.to_string())
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(ScalarStringVisitor)
}

fn optional_scalar_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    scalar_string(deserializer).map(Some)
}

// 🎭 Hand-rolled because figment parses `ELASTICSEARCH_REFRESH=true` into a bool,
// and a derived enum would look at that bool and file a complaint.
impl<'de> Deserialize<'de> for RefreshPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RefreshPolicyVisitor;

        impl Visitor<'_> for RefreshPolicyVisitor {
            type Value = RefreshPolicy;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("one of `true`, `false` or `wait_for`")
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(if v { RefreshPolicy::True } else { RefreshPolicy::False })
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                match v.trim().to_ascii_lowercase().as_str() {
                    "true" => Ok(RefreshPolicy::True),
                    "false" => Ok(RefreshPolicy::False),
                    "wait_for" => Ok(RefreshPolicy::WaitFor),
                    _ => Err(E::invalid_value(de::Unexpected::Str(v), &self)),
                }
            }
        }

        deserializer.deserialize_any(RefreshPolicyVisitor)
    }
}

impl AppConfig {
    /// 🔒 Reject the configs that parse but can't possibly connect anywhere.
    ///
    /// serde already caught the missing fields and the port that isn't a u16.
    /// This catches the empty strings and the sink with no address at all.
    pub fn validate(&self) -> anyhow::Result<()> {
        let required = [
            ("MONGODB_URI", &self.mongodb_uri),
            ("MONGO_DB_NAME", &self.mongo_db_name),
            ("MONGO_COLLECTION_NAME", &self.mongo_collection_name),
            ("ELASTICSEARCH_INDEX_NAME", &self.elasticsearch_index_name),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                bail!("💀 {name} is set but empty. An empty string is not a value, it's a shrug.");
            }
        }

        self.elasticsearch_address()?;
        Ok(())
    }

    /// 📡 The address the sink talks to: the explicit URL, or `http://localhost:<port>`.
    /// Neither one set is an error. We don't make up ports.
    pub fn elasticsearch_address(&self) -> anyhow::Result<String> {
        match (
            self.elasticsearch_url.as_deref().map(str::trim),
            self.elasticsearch_port,
        ) {
            (Some(url), _) if !url.is_empty() => Ok(url.trim_end_matches('/').to_string()),
            (_, Some(port)) => Ok(format!("http://localhost:{port}")),
            _ => bail!(
                "💀 ELASTICSEARCH_PORT is not set (and neither is ELASTICSEARCH_URL). \
                 We know Elasticsearch lives on localhost. We just don't know which door to knock on."
            ),
        }
    }

    /// 🍃 The slice of config the source connector cares about.
    pub fn mongo_source_config(&self) -> MongoSourceConfig {
        MongoSourceConfig {
            uri: self.mongodb_uri.clone(),
            database: self.mongo_db_name.clone(),
            collection: self.mongo_collection_name.clone(),
        }
    }

    /// 🔍 The slice of config the sink connector cares about.
    pub fn elasticsearch_sink_config(&self) -> anyhow::Result<ElasticsearchSinkConfig> {
        Ok(ElasticsearchSinkConfig {
            url: self.elasticsearch_address()?,
            refresh: self.elasticsearch_refresh,
        })
    }
}

/// 🚀 Load the config from env vars, plus an optional TOML file.
///
/// 📐 DESIGN NOTE (no cap, this is tribal knowledge):
///   - `config_file_name` is None → env vars only.
///   - `config_file_name` is Some → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if a required setting is missing, malformed, or empty.
/// The run cannot start without knowing where the data is. We don't guess.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    // 🏗️ Env vars as the base layer. Only the guest list gets in.
    let config = Figment::new().merge(Env::raw().only(&ENV_KEYS));

    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables ({}). \
             Something required is missing or doesn't look like what it should.",
            path.display(),
            ENV_KEYS.join(", ")
        ),
        None => format!(
            "💀 Failed to parse configuration from environment variables ({}). \
             No file was provided, so this one's all on the environment. Classic.",
            ENV_KEYS.join(", ")
        ),
    };

    let app_config: AppConfig = config.extract().context(context_msg)?;
    app_config
        .validate()
        .context("💀 Configuration parsed, but it can't take us anywhere")?;
    Ok(app_config)
}
