use std::sync::Arc;

use serde_json::Value;

use crate::client::{ClientInner, Error};

/// Minimal proxy over the crawl-frontier API: per-frontier, per-slot request
/// queues.
pub struct Frontier {
    client: Arc<ClientInner>,
    project_id: String,
}

impl Frontier {
    pub(crate) fn new(client: Arc<ClientInner>, project_id: String) -> Self {
        Self { client, project_id }
    }

    /// Enqueues fingerprint records onto a slot, one JSON line each.
    pub fn push(&self, frontier: &str, slot: &str, fingerprints: &[Value]) -> Result<(), Error> {
        let url = self
            .client
            .build_url(&["hcf", &self.project_id, frontier, "s", slot])?;
        let mut body = Vec::new();
        for fingerprint in fingerprints {
            serde_json::to_writer(&mut body, fingerprint)
                .map_err(|err| Error::Request(format!("encode frontier fingerprint: {err}")))?;
            body.push(b'\n');
        }
        self.client.post(url, body, "application/x-jsonlines")?;
        Ok(())
    }

    /// Reads the queued batches of a slot.
    pub fn read(&self, frontier: &str, slot: &str) -> Result<Vec<Value>, Error> {
        let url = self
            .client
            .build_url(&["hcf", &self.project_id, frontier, "s", slot, "q"])?;
        let response = self.client.get(url)?;
        crate::serialization::WireFormat::Json
            .decode_records(response.body)
            .collect()
    }

    pub fn delete_slot(&self, frontier: &str, slot: &str) -> Result<(), Error> {
        let url = self
            .client
            .build_url(&["hcf", &self.project_id, frontier, "s", slot])?;
        self.client.delete(url)?;
        Ok(())
    }
}
