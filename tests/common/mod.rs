#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use hubstorage::{
    replay::{CANONICAL_ENDPOINT, CANONICAL_PROJECT_ID, PLACEHOLDER_AUTH},
    Config, Error, HttpRequest, HttpResponse, Transport,
};

/// Transport double: serves canned responses in order and keeps every request
/// it saw for later assertions.
pub struct ScriptedTransport {
    responses: Mutex<Vec<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<HttpResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        self.requests.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(Error::Request(format!(
                "no scripted response left for {} {}",
                request.method, request.url
            )));
        }
        Ok(responses.remove(0))
    }
}

pub fn response(status: u16, body: &[u8]) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("content-type".to_owned(), b"application/json".to_vec())],
        body: body.to_vec(),
    }
}

pub fn ok(body: &str) -> HttpResponse {
    response(200, body.as_bytes())
}

pub fn msgpack_ok(body: &[u8]) -> HttpResponse {
    HttpResponse {
        status: 200,
        headers: vec![("content-type".to_owned(), b"application/x-msgpack".to_vec())],
        body: body.to_vec(),
    }
}

/// Client configuration under the canonical test identity, the one persisted
/// cassettes are normalized to.
pub fn test_config() -> Config {
    Config::new(CANONICAL_ENDPOINT, PLACEHOLDER_AUTH, CANONICAL_PROJECT_ID).unwrap()
}

pub fn query_pairs(request: &HttpRequest) -> Vec<(String, String)> {
    request
        .url
        .query_pairs()
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}
