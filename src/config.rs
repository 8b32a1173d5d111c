use std::{env, path::PathBuf};

use anyhow::Context as _;
use url::Url;

use crate::serialization::WireFormat;

/// Default live endpoint of the storage API.
pub const DEFAULT_ENDPOINT: &str = "https://storage.scrapinghub.com";

/// Client configuration: where to talk, as whom, and in which wire format.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    pub auth: String,
    pub project_id: String,
    pub wire_format: WireFormat,
}

impl Config {
    pub fn new(endpoint: &str, auth: &str, project_id: &str) -> anyhow::Result<Self> {
        let endpoint =
            Url::parse(endpoint).with_context(|| format!("parse endpoint `{endpoint}`"))?;
        Ok(Self {
            endpoint,
            auth: auth.to_owned(),
            project_id: project_id.to_owned(),
            wire_format: WireFormat::MsgPack,
        })
    }

    /// Reads `HS_ENDPOINT`, `HS_AUTH`, `HS_PROJECT_ID` and
    /// `HS_DISABLE_MSGPACK`. Unset variables fall back to the live endpoint
    /// and the test placeholder credentials.
    pub fn from_env() -> anyhow::Result<Self> {
        let endpoint = env_or("HS_ENDPOINT", DEFAULT_ENDPOINT);
        let auth = env_or("HS_AUTH", crate::replay::PLACEHOLDER_AUTH);
        let project_id = env_or("HS_PROJECT_ID", crate::replay::CANONICAL_PROJECT_ID);

        let mut config = Self::new(&endpoint, &auth, &project_id)?;
        if env_flag("HS_DISABLE_MSGPACK") {
            config.wire_format = WireFormat::Json;
        }
        Ok(config)
    }

    pub fn wire_format(mut self, wire_format: WireFormat) -> Self {
        self.wire_format = wire_format;
        self
    }
}

/// How the replay transport treats cassettes for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Replay an existing cassette; record one only when none exists yet.
    Once,
    /// Wipe the cassette library up front and re-record everything. Cassettes
    /// are rebuilt wholesale, never merged, so they cannot grow unbounded.
    Rebuild,
    /// Hit the live service and persist nothing.
    Ignore,
}

/// Cassette configuration, passed explicitly into the replay transport and
/// the test session. There is deliberately no module-level mutable default.
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub cassette_dir: PathBuf,
    pub mode: RecordMode,
    /// Scrub endpoint, project id and credentials before persisting, so
    /// cassettes are diff-stable and shareable across machines and CI.
    pub normalize: bool,
}

impl ReplayConfig {
    pub fn new(cassette_dir: impl Into<PathBuf>) -> Self {
        Self {
            cassette_dir: cassette_dir.into(),
            mode: RecordMode::Once,
            normalize: false,
        }
    }

    /// Reads `HS_CASSETTE_DIR`, `HS_UPDATE_CASSETTES`, `HS_IGNORE_CASSETTES`
    /// and `NORMALIZE_CASSETTES`. Update mode wins over ignore mode when both
    /// are set.
    pub fn from_env() -> Self {
        let cassette_dir = env_or("HS_CASSETTE_DIR", "tests/cassettes");
        let mode = if env_flag("HS_UPDATE_CASSETTES") {
            RecordMode::Rebuild
        } else if env_flag("HS_IGNORE_CASSETTES") {
            RecordMode::Ignore
        } else {
            RecordMode::Once
        };

        Self {
            cassette_dir: PathBuf::from(cassette_dir),
            mode,
            normalize: env_flag("NORMALIZE_CASSETTES"),
        }
    }

    pub fn mode(mut self, mode: RecordMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Rebuild and ignore modes both run against the real backend; replay
    /// mode never touches the network.
    pub fn uses_real_services(&self) -> bool {
        matches!(self.mode, RecordMode::Rebuild | RecordMode::Ignore)
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => {
            let value = value.trim().to_ascii_lowercase();
            !(value.is_empty() || value == "0" || value == "false")
        }
        Err(_) => false,
    }
}
