use std::{fmt, str::FromStr, sync::Arc};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::{
    client::{ClientInner, Error},
    items::{Items, Logs},
};

/// Composite job identifier `<project_id>/<spider_id>/<job_id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    project_id: String,
    spider_id: u64,
    job_id: u64,
}

impl JobKey {
    pub fn new(project_id: &str, spider_id: u64, job_id: u64) -> Self {
        Self {
            project_id: project_id.to_owned(),
            spider_id,
            job_id,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn spider_id(&self) -> u64 {
        self.spider_id
    }

    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// The spider-scoped part, `<spider_id>/<job_id>`, as the raw job-data
    /// endpoints expect it after the project id.
    pub fn spider_and_job(&self) -> String {
        format!("{}/{}", self.spider_id, self.job_id)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project_id, self.spider_id, self.job_id)
    }
}

impl FromStr for JobKey {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Error::Key(format!(
                "invalid job key `{raw}`; expected <project>/<spider>/<job>"
            ))
        };

        let mut parts = raw.split('/');
        let project_id = parts.next().filter(|part| !part.is_empty()).ok_or_else(invalid)?;
        let spider_id = parts
            .next()
            .and_then(|part| part.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        let job_id = parts
            .next()
            .and_then(|part| part.parse::<u64>().ok())
            .ok_or_else(invalid)?;
        if parts.next().is_some() {
            return Err(invalid());
        }

        Ok(Self::new(project_id, spider_id, job_id))
    }
}

impl Serialize for JobKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for JobKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

/// One job and its associated record streams.
pub struct Job {
    client: Arc<ClientInner>,
    key: JobKey,
}

impl Job {
    pub(crate) fn new(client: Arc<ClientInner>, key: JobKey) -> Self {
        Self { client, key }
    }

    pub fn key(&self) -> &JobKey {
        &self.key
    }

    pub fn items(&self) -> Items {
        Items::new(Arc::clone(&self.client), self.key.to_string())
    }

    pub fn logs(&self) -> Logs {
        Logs::new(Arc::clone(&self.client), self.key.to_string())
    }

    /// The job's metadata document (state, spider, timestamps, ...).
    pub fn metadata(&self) -> Result<Value, Error> {
        let url = self.client.build_url(&["jobs", &self.key.to_string()])?;
        let response = self.client.get(url)?;
        serde_json::from_slice(&response.body)
            .map_err(|err| Error::Decode(format!("decode metadata for job {}: {err}", self.key)))
    }
}
