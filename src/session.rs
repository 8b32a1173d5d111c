use std::sync::Arc;

use crate::{
    client::{Error, HubstorageClient, NetTransport, Transport},
    collections::Collection,
    config::{Config, RecordMode, ReplayConfig},
    jobq::QUEUE_NAMES,
    project::Project,
    replay::{CassetteStore, NormalizeRules, ReplayTransport},
    serialization::WireFormat,
};

pub const TEST_SPIDER_NAME: &str = "hs-test-spider";
pub const TEST_FRONTIER_SLOT: &str = "site.com";
pub const TEST_BOTGROUP: &str = "rust-hubstorage-test";
pub const TEST_COLLECTION_NAME: &str = "test_collection_123";

/// Cassette name for one test: `<module>/<test>[-json].gz`. Module paths are
/// reduced to their last segment so `hubstorage::tests::items` and plain
/// `items` name the same directory.
pub fn cassette_name(module: &str, test: &str, wire_format: WireFormat) -> String {
    let module = module.rsplit("::").next().unwrap_or(module);
    format!("{module}/{test}{}.gz", wire_format.cassette_suffix())
}

/// Clears every job out of a project, plus every project setting except the
/// `botgroups` list.
///
/// The three queues are walked twice because queue state can shift while the
/// cleanup runs; one pass is known to miss jobs that transition between
/// queues mid-iteration.
pub fn remove_all_jobs(project: &Project) -> Result<(), Error> {
    let mut settings = project.settings();
    for key in settings.keys()? {
        if key != "botgroups" {
            settings.delete(&key)?;
        }
    }
    settings.save()?;

    for pass in 0..2 {
        for queue in QUEUE_NAMES {
            let info = project.jobq().summary(queue)?;
            tracing::debug!(queue, pass, jobs = info.summary.len(), "clearing job queue");
            for job in &info.summary {
                remove_job(project, &job.key)?;
            }
        }
    }
    Ok(())
}

fn remove_job(project: &Project, key: &crate::job::JobKey) -> Result<(), Error> {
    project.jobq().finish(key)?;
    project.jobq().delete(key)?;
    // Deleting job data is irreversible; refuse anything outside the test
    // project rather than trusting the queue listing.
    assert_eq!(
        key.project_id(),
        project.id(),
        "job {key} does not belong to project {}",
        project.id()
    );
    project.delete_job_data(key)
}

/// Deletes every entry of a collection by its `_key`. A collection that does
/// not exist yet answers 404, which counts as already clean; any other error
/// propagates.
pub fn clean_collection(collection: &Collection) -> Result<(), Error> {
    match clean_collection_entries(collection) {
        Err(Error::Status { status: 404, .. }) => Ok(()),
        result => result,
    }
}

fn clean_collection_entries(collection: &Collection) -> Result<(), Error> {
    for entry in collection.iter_values()? {
        let entry = entry?;
        let key = entry
            .get("_key")
            .and_then(|value| value.as_str())
            .ok_or_else(|| {
                Error::Decode(format!(
                    "collection `{}` entry is missing `_key`",
                    collection.name()
                ))
            })?;
        collection.delete(key)?;
    }
    Ok(())
}

/// Assigns the test bot group to the project. The settings document and the
/// job queue's botgroup table are separate subsystems and must agree, so both
/// are written.
pub fn set_test_botgroup(project: &Project) -> Result<(), Error> {
    let mut settings = project.settings();
    settings.apipost(&serde_json::json!({ "botgroups": [TEST_BOTGROUP] }))?;

    let client = project.client();
    let url = client.build_url(&["botgroups", TEST_BOTGROUP, "max_running"])?;
    client.post(url, b"null".to_vec(), "application/json")?;

    settings.expire();
    Ok(())
}

pub fn unset_test_botgroup(project: &Project) -> Result<(), Error> {
    let mut settings = project.settings();
    settings.apidelete("botgroups")?;
    settings.expire();

    let client = project.client();
    let url = client.build_url(&["botgroups", TEST_BOTGROUP])?;
    client.delete(url)?;
    Ok(())
}

/// Session-scoped fixture state: one client/project pair shared by every test
/// of a run, with per-test cassettes layered on top.
///
/// Against the real backend (rebuild or ignore mode) `configure` force-cleans
/// the project and provisions the bot group; in replay mode setup touches
/// nothing. `teardown` releases the client.
pub struct TestSession {
    config: Config,
    replay: ReplayConfig,
    base_transport: Arc<dyn Transport>,
    client: HubstorageClient,
}

/// One test's replay scope: a client whose every request goes through the
/// test's cassette. Call [`finish`](TestCassette::finish) at the end of the
/// test to persist a freshly recorded cassette.
pub struct TestCassette {
    client: HubstorageClient,
    recorder: Arc<ReplayTransport>,
}

impl TestCassette {
    pub fn client(&self) -> &HubstorageClient {
        &self.client
    }

    pub fn project(&self, project_id: &str) -> Project {
        self.client.get_project(project_id)
    }

    pub fn is_replaying(&self) -> bool {
        self.recorder.is_replaying()
    }

    pub fn finish(self) -> Result<(), Error> {
        self.recorder.finish()
    }
}

impl TestSession {
    /// Builds the session fixtures. In rebuild mode the cassette library is
    /// deleted up front and rebuilt by the run, never merged into.
    pub fn configure(config: Config, replay: ReplayConfig) -> Result<Self, Error> {
        if replay.mode == RecordMode::Rebuild {
            CassetteStore::new(&replay.cassette_dir)
                .wipe()
                .map_err(|err| Error::Cassette(format!("wipe cassette library: {err:#}")))?;
        }

        let base_transport: Arc<dyn Transport> = Arc::new(NetTransport::new()?);
        let client = HubstorageClient::with_transport(&config, Arc::clone(&base_transport))?;

        let session = Self {
            config,
            replay,
            base_transport,
            client,
        };

        if session.uses_real_services() {
            let project = session.project();
            tracing::info!(project = project.id(), "cleaning test project");
            set_test_botgroup(&project)?;
            remove_all_jobs(&project)?;
            clean_collection(&session.collection())?;
        }
        Ok(session)
    }

    /// Session setup from the environment; the common entry point for the
    /// integration suites.
    pub fn from_env() -> Result<Self, Error> {
        let config = Config::from_env()
            .map_err(|err| Error::Request(format!("read client config from env: {err:#}")))?;
        Self::configure(config, ReplayConfig::from_env())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn uses_real_services(&self) -> bool {
        self.replay.uses_real_services()
    }

    pub fn client(&self) -> &HubstorageClient {
        &self.client
    }

    pub fn project(&self) -> Project {
        self.client.get_project(&self.config.project_id)
    }

    pub fn collection(&self) -> Collection {
        self.project().collections().new_store(TEST_COLLECTION_NAME)
    }

    /// Opens the per-test cassette scope. Against the real backend the
    /// project is re-cleaned first so every recording starts from an empty
    /// job queue.
    pub fn cassette(
        &self,
        module: &str,
        test: &str,
        wire_format: WireFormat,
    ) -> Result<TestCassette, Error> {
        if self.uses_real_services() {
            remove_all_jobs(&self.project())?;
        }

        let name = cassette_name(module, test, wire_format);
        let rules = self.replay.normalize.then(|| {
            NormalizeRules::new(self.config.endpoint.as_str(), &self.config.project_id)
        });
        let recorder = Arc::new(ReplayTransport::new(
            Arc::clone(&self.base_transport),
            &self.replay,
            &name,
            rules,
        )?);

        let config = self.config.clone().wire_format(wire_format);
        let client =
            HubstorageClient::with_transport(&config, Arc::clone(&recorder) as Arc<dyn Transport>)?;
        Ok(TestCassette { client, recorder })
    }

    /// Releases the session client and its connection pool.
    pub fn teardown(self) {
        self.client.close();
    }
}
