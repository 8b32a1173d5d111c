use std::sync::{Arc, Mutex, MutexGuard};

use crate::{
    client::{Error, HttpRequest, HttpResponse, Transport},
    config::{RecordMode, ReplayConfig},
};

use super::{
    cassette::{Cassette, CassetteStore, Interaction},
    matching::request_matches,
    normalize::{normalize_cassette, NormalizeRules},
};

/// Transport wrapper implementing the cassette lifecycle.
///
/// In `Once` mode an existing cassette is replayed: each interaction is
/// consumed at most once, in recording order among equal matches, and a
/// request with no match left is an [`Error::Cassette`] rather than a network
/// call. Without an existing cassette (or in `Rebuild` mode) requests write
/// through to the inner transport and are collected until [`finish`] persists
/// them. `Ignore` mode writes through and persists nothing.
///
/// [`finish`]: ReplayTransport::finish
pub struct ReplayTransport {
    inner: Arc<dyn Transport>,
    store: CassetteStore,
    cassette_name: String,
    mode: RecordMode,
    normalize: Option<NormalizeRules>,
    state: Mutex<ReplayState>,
}

struct ReplayState {
    playback: Option<Playback>,
    recorded: Vec<Interaction>,
}

struct Playback {
    interactions: Vec<Interaction>,
    consumed: Vec<bool>,
}

impl ReplayTransport {
    pub fn new(
        inner: Arc<dyn Transport>,
        config: &ReplayConfig,
        cassette_name: &str,
        normalize: Option<NormalizeRules>,
    ) -> Result<Self, Error> {
        let store = CassetteStore::new(&config.cassette_dir);

        let playback = match config.mode {
            RecordMode::Once if store.exists(cassette_name) => {
                let cassette = store.load(cassette_name).map_err(|err| {
                    Error::Cassette(format!("load cassette `{cassette_name}`: {err:#}"))
                })?;
                tracing::debug!(
                    cassette = cassette_name,
                    interactions = cassette.interactions.len(),
                    "replaying cassette"
                );
                let consumed = vec![false; cassette.interactions.len()];
                Some(Playback {
                    interactions: cassette.interactions,
                    consumed,
                })
            }
            RecordMode::Once | RecordMode::Rebuild | RecordMode::Ignore => None,
        };

        Ok(Self {
            inner,
            store,
            cassette_name: cassette_name.to_owned(),
            mode: config.mode,
            normalize,
            state: Mutex::new(ReplayState {
                playback,
                recorded: Vec::new(),
            }),
        })
    }

    pub fn cassette_name(&self) -> &str {
        &self.cassette_name
    }

    pub fn is_replaying(&self) -> bool {
        self.state()
            .map(|state| state.playback.is_some())
            .unwrap_or(false)
    }

    /// Persists the recorded interactions, normalized first when the rules
    /// were provided. A replayed or `Ignore`-mode run persists nothing.
    pub fn finish(&self) -> Result<(), Error> {
        let recorded = {
            let mut state = self.state()?;
            if state.playback.is_some() || state.recorded.is_empty() {
                return Ok(());
            }
            std::mem::take(&mut state.recorded)
        };
        if self.mode == RecordMode::Ignore {
            return Ok(());
        }

        let mut cassette = Cassette {
            interactions: recorded,
        };
        if let Some(rules) = &self.normalize {
            normalize_cassette(&mut cassette, rules);
        }
        self.store
            .save(&self.cassette_name, &cassette)
            .map_err(|err| {
                Error::Cassette(format!("persist cassette `{}`: {err:#}", self.cassette_name))
            })?;
        tracing::info!(
            cassette = %self.cassette_name,
            interactions = cassette.interactions.len(),
            "recorded cassette"
        );
        Ok(())
    }

    fn state(&self) -> Result<MutexGuard<'_, ReplayState>, Error> {
        self.state
            .lock()
            .map_err(|_| Error::Cassette("replay state lock poisoned".to_owned()))
    }
}

impl Transport for ReplayTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let mut state = self.state()?;

        if let Some(playback) = &mut state.playback {
            for (index, interaction) in playback.interactions.iter().enumerate() {
                if playback.consumed[index] || !request_matches(&interaction.request, request) {
                    continue;
                }
                playback.consumed[index] = true;
                tracing::debug!(
                    cassette = %self.cassette_name,
                    method = %request.method,
                    url = %request.url,
                    "replayed interaction"
                );
                return Ok(HttpResponse::from(&interaction.response));
            }
            return Err(Error::Cassette(format!(
                "no recorded interaction in `{}` matches {} {}",
                self.cassette_name, request.method, request.url
            )));
        }

        let response = self.inner.execute(request)?;
        if self.mode != RecordMode::Ignore {
            state.recorded.push(Interaction::record(request, &response));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    };

    use url::Url;

    use super::ReplayTransport;
    use crate::{
        client::{Error, HttpRequest, HttpResponse, Transport},
        config::{RecordMode, ReplayConfig},
        replay::normalize::NormalizeRules,
    };

    /// Inner transport double: serves canned responses and counts calls.
    struct ScriptedTransport {
        responses: Mutex<Vec<HttpResponse>>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(Error::Cassette("scripted transport exhausted".to_owned()));
            }
            Ok(responses.remove(0))
        }
    }

    fn response(body: &[u8]) -> HttpResponse {
        HttpResponse {
            status: 200,
            headers: vec![("content-type".to_owned(), b"application/json".to_vec())],
            body: body.to_vec(),
        }
    }

    fn request(url: &str) -> HttpRequest {
        HttpRequest::new("GET", Url::parse(url).unwrap())
    }

    #[test]
    fn records_then_replays_without_touching_the_network() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path());

        let live = ScriptedTransport::new(vec![response(b"{\"a\":1}"), response(b"{\"b\":2}")]);
        let recorder =
            ReplayTransport::new(live.clone(), &config, "mod/test.gz", None).unwrap();

        let first = recorder.execute(&request("http://h.example/a")).unwrap();
        let second = recorder.execute(&request("http://h.example/b")).unwrap();
        assert_eq!(first.body, b"{\"a\":1}");
        assert_eq!(second.body, b"{\"b\":2}");
        recorder.finish().unwrap();
        assert_eq!(live.calls(), 2);

        // Same cassette, fresh transport: everything must come from disk.
        let offline = ScriptedTransport::new(Vec::new());
        let replayer =
            ReplayTransport::new(offline.clone(), &config, "mod/test.gz", None).unwrap();
        assert!(replayer.is_replaying());

        let replayed = replayer.execute(&request("http://h.example/b")).unwrap();
        assert_eq!(replayed.body, b"{\"b\":2}");
        let replayed = replayer.execute(&request("http://h.example/a")).unwrap();
        assert_eq!(replayed.body, b"{\"a\":1}");
        assert_eq!(offline.calls(), 0);
    }

    #[test]
    fn equal_requests_consume_interactions_in_recording_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path());

        let live = ScriptedTransport::new(vec![response(b"first"), response(b"second")]);
        let recorder = ReplayTransport::new(live, &config, "mod/dup.gz", None).unwrap();
        recorder.execute(&request("http://h.example/same")).unwrap();
        recorder.execute(&request("http://h.example/same")).unwrap();
        recorder.finish().unwrap();

        let replayer = ReplayTransport::new(
            ScriptedTransport::new(Vec::new()),
            &config,
            "mod/dup.gz",
            None,
        )
        .unwrap();
        let first = replayer.execute(&request("http://h.example/same")).unwrap();
        let second = replayer.execute(&request("http://h.example/same")).unwrap();
        assert_eq!(first.body, b"first");
        assert_eq!(second.body, b"second");

        let miss = replayer.execute(&request("http://h.example/same"));
        assert!(matches!(miss, Err(Error::Cassette(_))));
    }

    #[test]
    fn replay_miss_is_an_error_not_a_network_call() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path());

        let recorder = ReplayTransport::new(
            ScriptedTransport::new(vec![response(b"x")]),
            &config,
            "mod/miss.gz",
            None,
        )
        .unwrap();
        recorder.execute(&request("http://h.example/known")).unwrap();
        recorder.finish().unwrap();

        let offline = ScriptedTransport::new(vec![response(b"should-not-be-served")]);
        let replayer =
            ReplayTransport::new(offline.clone(), &config, "mod/miss.gz", None).unwrap();
        let miss = replayer.execute(&request("http://h.example/unknown"));
        assert!(matches!(miss, Err(Error::Cassette(_))));
        assert_eq!(offline.calls(), 0);
    }

    #[test]
    fn ignore_mode_passes_through_and_persists_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path()).mode(RecordMode::Ignore);

        let live = ScriptedTransport::new(vec![response(b"live")]);
        let transport =
            ReplayTransport::new(live.clone(), &config, "mod/ignored.gz", None).unwrap();
        let served = transport.execute(&request("http://h.example/a")).unwrap();
        assert_eq!(served.body, b"live");
        transport.finish().unwrap();

        assert_eq!(live.calls(), 1);
        assert!(!temp_dir.path().join("mod/ignored.gz").exists());
    }

    #[test]
    fn normalization_rules_apply_at_persist_time() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path()).normalize(true);
        let rules = NormalizeRules::new("http://h.example", "7770001");

        let live = ScriptedTransport::new(vec![response(b"ok")]);
        let recorder =
            ReplayTransport::new(live, &config, "mod/norm.gz", Some(rules)).unwrap();
        let secret_request = request("http://h.example/items/7770001/1/3")
            .header("authorization", b"Basic real-secret".to_vec());
        recorder.execute(&secret_request).unwrap();
        recorder.finish().unwrap();

        let cassette = crate::replay::cassette::CassetteStore::new(temp_dir.path())
            .load("mod/norm.gz")
            .unwrap();
        let recorded = &cassette.interactions[0].request;
        assert_eq!(
            recorded.uri,
            "http://storage.vm.scrapinghub.com/items/2222222/1/3"
        );
        assert!(!recorded
            .headers
            .iter()
            .any(|(_, value)| value == b"Basic real-secret"));
    }

    #[test]
    fn replayed_runs_never_rewrite_the_cassette() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = ReplayConfig::new(temp_dir.path());

        let recorder = ReplayTransport::new(
            ScriptedTransport::new(vec![response(b"x")]),
            &config,
            "mod/stable.gz",
            None,
        )
        .unwrap();
        recorder.execute(&request("http://h.example/a")).unwrap();
        recorder.finish().unwrap();

        let before = std::fs::read(temp_dir.path().join("mod/stable.gz")).unwrap();
        let replayer = ReplayTransport::new(
            ScriptedTransport::new(Vec::new()),
            &config,
            "mod/stable.gz",
            None,
        )
        .unwrap();
        replayer.execute(&request("http://h.example/a")).unwrap();
        replayer.finish().unwrap();
        let after = std::fs::read(temp_dir.path().join("mod/stable.gz")).unwrap();
        assert_eq!(before, after);
    }
}
