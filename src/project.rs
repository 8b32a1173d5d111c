use std::sync::Arc;

use crate::{
    client::{ClientInner, Error},
    collections::Collections,
    frontier::Frontier,
    job::{Job, JobKey},
    jobq::JobQ,
    settings::Settings,
};

/// A project and its resource proxies. All accessors are cheap; nothing talks
/// to the network until a proxy method is called.
pub struct Project {
    client: Arc<ClientInner>,
    project_id: String,
}

impl Project {
    pub(crate) fn new(client: Arc<ClientInner>, project_id: &str) -> Self {
        Self {
            client,
            project_id: project_id.to_owned(),
        }
    }

    pub fn id(&self) -> &str {
        &self.project_id
    }

    pub fn settings(&self) -> Settings {
        Settings::new(Arc::clone(&self.client), self.project_id.clone())
    }

    pub fn jobq(&self) -> JobQ {
        JobQ::new(Arc::clone(&self.client), self.project_id.clone())
    }

    pub fn collections(&self) -> Collections {
        Collections::new(Arc::clone(&self.client), self.project_id.clone())
    }

    pub fn frontier(&self) -> Frontier {
        Frontier::new(Arc::clone(&self.client), self.project_id.clone())
    }

    pub fn get_job(&self, key: JobKey) -> Job {
        Job::new(Arc::clone(&self.client), key)
    }

    /// Resolves (and optionally creates) the numeric id for a spider name.
    pub fn spider_id(&self, name: &str, create: bool) -> Result<u64, Error> {
        let mut url = self
            .client
            .build_url(&["ids", &self.project_id, "spider", name])?;
        if create {
            url.query_pairs_mut().append_pair("create", "1");
        }
        let response = self.client.get(url.clone())?;
        let text = String::from_utf8_lossy(&response.body);
        text.trim()
            .parse()
            .map_err(|_| Error::Decode(format!("decode spider id for `{name}`: `{}`", text.trim())))
    }

    /// Deletes the job's stored data (items, logs, metadata). This is the raw
    /// data-deletion endpoint, distinct from the queue's `delete` transition.
    pub fn delete_job_data(&self, key: &JobKey) -> Result<(), Error> {
        let url = self
            .client
            .build_url(&["jobs", &self.project_id, &key.spider_and_job()])?;
        self.client.delete(url)?;
        Ok(())
    }

    pub(crate) fn client(&self) -> &Arc<ClientInner> {
        &self.client
    }
}
