use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{
    client::{ClientInner, Error},
    job::JobKey,
};

/// The three queue states a job moves through before deletion.
pub const QUEUE_NAMES: [&str; 3] = ["pending", "running", "finished"];

#[derive(Debug, Clone, Deserialize)]
pub struct QueueSummary {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub summary: Vec<JobSummary>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobSummary {
    pub key: JobKey,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// A job handed out by `start`: its key, per-job auth token and the initial
/// metadata the queue assigned.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingJob {
    pub key: JobKey,
    pub auth: String,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Proxy over the remote job-queue subsystem.
pub struct JobQ {
    client: Arc<ClientInner>,
    project_id: String,
}

impl JobQ {
    pub(crate) fn new(client: Arc<ClientInner>, project_id: String) -> Self {
        Self { client, project_id }
    }

    pub fn summary(&self, queue: &str) -> Result<QueueSummary, Error> {
        let url = self
            .client
            .build_url(&["jobq", &self.project_id, "summary", queue])?;
        let response = self.client.get(url)?;
        serde_json::from_slice(&response.body)
            .map_err(|err| Error::Decode(format!("decode `{queue}` queue summary: {err}")))
    }

    /// Pops the next pending job and marks it running. `None` when the queue
    /// has nothing to hand out (the server answers with an empty body).
    pub fn start(&self, params: &Value) -> Result<Option<PendingJob>, Error> {
        let url = self.client.build_url(&["jobq", &self.project_id, "start"])?;
        let body = serde_json::to_vec(params)
            .map_err(|err| Error::Request(format!("encode jobq start params: {err}")))?;
        let response = self.client.post(url, body, "application/json")?;

        let text = std::str::from_utf8(&response.body).unwrap_or("").trim();
        if text.is_empty() || text == "null" {
            return Ok(None);
        }
        serde_json::from_str(text)
            .map(Some)
            .map_err(|err| Error::Decode(format!("decode started job: {err}")))
    }

    pub fn finish(&self, key: &JobKey) -> Result<(), Error> {
        self.post_key("finish", key)
    }

    pub fn delete(&self, key: &JobKey) -> Result<(), Error> {
        self.post_key("delete", key)
    }

    fn post_key(&self, action: &str, key: &JobKey) -> Result<(), Error> {
        let url = self
            .client
            .build_url(&["jobq", &self.project_id, action])?;
        let body = serde_json::to_vec(&serde_json::json!({ "key": key }))
            .map_err(|err| Error::Request(format!("encode jobq {action} body: {err}")))?;
        self.client.post(url, body, "application/json")?;
        Ok(())
    }
}
