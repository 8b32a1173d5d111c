mod common;

use std::{path::Path, sync::Arc};

use serde_json::json;

use common::{msgpack_ok, ok, test_config, ScriptedTransport};
use hubstorage::{
    replay::{
        normalize::{normalize_cassette, placeholder_authorization},
        CassetteStore, NormalizeRules, ReplayTransport, CANONICAL_ENDPOINT, CANONICAL_PROJECT_ID,
    },
    session::{cassette_name, TestSession},
    Config, HttpResponse, HubstorageClient, IterParams, JobKey, RecordMode, ReplayConfig,
    Transport, WireFormat,
};

/// Two records, `{"a":1}` and `{"a":2}`, as a concatenated msgpack stream.
const ITEM_STREAM_MSGPACK: &[u8] = &[0x81, 0xa1, b'a', 0x01, 0x81, 0xa1, b'a', 0x02];

/// Records a cassette offline: a client backed by scripted responses runs
/// through a recording transport, then the cassette is persisted.
fn record(
    library: &Path,
    name: &str,
    config: &Config,
    responses: Vec<HttpResponse>,
    rules: Option<NormalizeRules>,
    drive: impl FnOnce(&HubstorageClient),
) {
    let replay = ReplayConfig::new(library);
    let live = ScriptedTransport::new(responses);
    let recorder = Arc::new(ReplayTransport::new(live, &replay, name, rules).unwrap());
    assert!(!recorder.is_replaying());

    let client =
        HubstorageClient::with_transport(config, Arc::clone(&recorder) as Arc<dyn Transport>)
            .unwrap();
    drive(&client);
    recorder.finish().unwrap();
}

fn test_job(client: &HubstorageClient) -> hubstorage::job::Job {
    client
        .get_project(CANONICAL_PROJECT_ID)
        .get_job(JobKey::new(CANONICAL_PROJECT_ID, 1, 3))
}

#[test]
fn recorded_sessions_replay_end_to_end_without_a_network() {
    let library = tempfile::tempdir().unwrap();
    let name = cassette_name("test_items", "test_list", WireFormat::MsgPack);
    let params = IterParams::new().count(2);

    record(
        library.path(),
        &name,
        &test_config(),
        vec![msgpack_ok(ITEM_STREAM_MSGPACK)],
        None,
        |client| {
            let records = test_job(client).items().list(&params).unwrap();
            assert_eq!(records.len(), 2);
        },
    );

    let session =
        TestSession::configure(test_config(), ReplayConfig::new(library.path())).unwrap();
    let cassette = session
        .cassette("test_items", "test_list", WireFormat::MsgPack)
        .unwrap();
    assert!(cassette.is_replaying());

    let records = test_job(cassette.client()).items().list(&params).unwrap();
    assert_eq!(records, vec![json!({"a": 1}), json!({"a": 2})]);

    cassette.finish().unwrap();
    session.teardown();
}

#[test]
fn json_and_msgpack_cassettes_live_side_by_side() {
    let library = tempfile::tempdir().unwrap();
    let expected = vec![json!({"a": 1}), json!({"a": 2})];

    record(
        library.path(),
        &cassette_name("test_items", "test_parity", WireFormat::Json),
        &test_config().wire_format(WireFormat::Json),
        vec![ok("{\"a\":1}\n{\"a\":2}\n")],
        None,
        |client| {
            test_job(client).items().list(&IterParams::new()).unwrap();
        },
    );
    record(
        library.path(),
        &cassette_name("test_items", "test_parity", WireFormat::MsgPack),
        &test_config(),
        vec![msgpack_ok(ITEM_STREAM_MSGPACK)],
        None,
        |client| {
            test_job(client).items().list(&IterParams::new()).unwrap();
        },
    );

    assert!(library.path().join("test_items/test_parity-json.gz").is_file());
    assert!(library.path().join("test_items/test_parity.gz").is_file());

    let session =
        TestSession::configure(test_config(), ReplayConfig::new(library.path())).unwrap();
    for wire_format in [WireFormat::Json, WireFormat::MsgPack] {
        let cassette = session
            .cassette("test_items", "test_parity", wire_format)
            .unwrap();
        assert!(cassette.is_replaying());
        let records = test_job(cassette.client())
            .items()
            .list(&IterParams::new())
            .unwrap();
        assert_eq!(records, expected);
        cassette.finish().unwrap();
    }
    session.teardown();
}

#[test]
fn cassettes_persist_no_credentials_and_replay_under_the_canonical_identity() {
    let library = tempfile::tempdir().unwrap();
    let real_endpoint = "http://storage.internal.example:8002";
    let real_project = "7770001";
    let real_config = Config::new(real_endpoint, "realuser:realpass", real_project).unwrap();
    let name = cassette_name("test_items", "test_normalized", WireFormat::MsgPack);

    record(
        library.path(),
        &name,
        &real_config,
        vec![msgpack_ok(ITEM_STREAM_MSGPACK)],
        Some(NormalizeRules::new(real_endpoint, real_project)),
        |client| {
            client
                .get_project(real_project)
                .get_job(JobKey::new(real_project, 1, 3))
                .items()
                .list(&IterParams::new())
                .unwrap();
        },
    );

    let stored = CassetteStore::new(library.path()).load(&name).unwrap();
    let request = &stored.interactions[0].request;
    assert!(request.uri.starts_with(CANONICAL_ENDPOINT));
    assert!(request
        .uri
        .contains(&format!("/items/{CANONICAL_PROJECT_ID}/")));
    assert!(!request.uri.contains(real_project));
    for (header, value) in &request.headers {
        if header.eq_ignore_ascii_case("authorization") {
            assert_eq!(value, &placeholder_authorization());
        }
    }

    // Renormalizing under the canonical identity changes nothing.
    let mut renormalized = stored.clone();
    let canonical_rules = NormalizeRules::new(CANONICAL_ENDPOINT, CANONICAL_PROJECT_ID);
    assert!(!normalize_cassette(&mut renormalized, &canonical_rules));
    assert_eq!(renormalized, stored);

    // The canonical identity replays what a different one recorded.
    let session =
        TestSession::configure(test_config(), ReplayConfig::new(library.path())).unwrap();
    let cassette = session
        .cassette("test_items", "test_normalized", WireFormat::MsgPack)
        .unwrap();
    assert!(cassette.is_replaying());
    let records = test_job(cassette.client())
        .items()
        .list(&IterParams::new())
        .unwrap();
    assert_eq!(records, vec![json!({"a": 1}), json!({"a": 2})]);
    cassette.finish().unwrap();
    session.teardown();
}

#[test]
fn rebuild_mode_re_records_over_an_existing_cassette() {
    let library = tempfile::tempdir().unwrap();
    let name = "test_rebuild/test_overwrite.gz";
    let stale = ScriptedTransport::new(vec![ok("stale")]);
    let fresh = ScriptedTransport::new(vec![ok("fresh")]);
    let request = hubstorage::HttpRequest::new(
        "GET",
        url::Url::parse("http://storage.vm.scrapinghub.com/jobq/2222222/summary/pending").unwrap(),
    );

    let recorder =
        ReplayTransport::new(stale, &ReplayConfig::new(library.path()), name, None).unwrap();
    recorder.execute(&request).unwrap();
    recorder.finish().unwrap();

    let rebuild = ReplayConfig::new(library.path()).mode(RecordMode::Rebuild);
    let recorder =
        ReplayTransport::new(Arc::clone(&fresh) as Arc<dyn Transport>, &rebuild, name, None)
            .unwrap();
    assert!(!recorder.is_replaying());
    let served = recorder.execute(&request).unwrap();
    assert_eq!(served.body, b"fresh");
    recorder.finish().unwrap();
    assert_eq!(fresh.remaining(), 0);

    let rebuilt = CassetteStore::new(library.path()).load(name).unwrap();
    assert_eq!(rebuilt.interactions.len(), 1);
    assert_eq!(rebuilt.interactions[0].response.body, b"fresh");
}
