use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::client::{HttpRequest, HttpResponse};

use super::serializer;

/// A recorded request. Headers carry raw byte values so binary-valued headers
/// survive the round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub uri: String,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

/// One request/response pair of a recorded run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub request: RecordedRequest,
    pub response: RecordedResponse,
}

impl Interaction {
    pub fn record(request: &HttpRequest, response: &HttpResponse) -> Self {
        Self {
            request: RecordedRequest {
                method: request.method.clone(),
                uri: request.url.to_string(),
                headers: request.headers.clone(),
                body: request.body.clone(),
            },
            response: RecordedResponse {
                status: response.status,
                headers: response.headers.clone(),
                body: response.body.clone(),
            },
        }
    }
}

impl From<&RecordedResponse> for HttpResponse {
    fn from(recorded: &RecordedResponse) -> Self {
        Self {
            status: recorded.status,
            headers: recorded.headers.clone(),
            body: recorded.body.clone(),
        }
    }
}

/// The ordered interaction set of one test run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cassette {
    pub interactions: Vec<Interaction>,
}

/// Flat-file cassette library: one file per test under the library root,
/// addressed by relative names like `test_items/test_iter-json.gz`.
#[derive(Debug, Clone)]
pub struct CassetteStore {
    dir: PathBuf,
}

impl CassetteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    pub fn load(&self, name: &str) -> anyhow::Result<Cassette> {
        let path = self.path_for(name);
        let blob = fs::read_to_string(&path)
            .with_context(|| format!("read cassette {}", path.display()))?;
        serializer::deserialize(&blob)
            .with_context(|| format!("decode cassette {}", path.display()))
    }

    pub fn save(&self, name: &str, cassette: &Cassette) -> anyhow::Result<()> {
        let path = self.path_for(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create cassette dir {}", parent.display()))?;
        }
        let blob = serializer::serialize(cassette)?;
        fs::write(&path, blob).with_context(|| format!("write cassette {}", path.display()))?;
        Ok(())
    }

    /// Removes the whole library. Rebuild mode wipes rather than merging into
    /// existing cassettes, which would only ever grow.
    pub fn wipe(&self) -> anyhow::Result<()> {
        if self.dir.exists() {
            fs::remove_dir_all(&self.dir)
                .with_context(|| format!("remove cassette dir {}", self.dir.display()))?;
        }
        Ok(())
    }
}
