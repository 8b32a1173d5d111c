use std::sync::Arc;

use serde_json::Value;

use crate::{
    client::{ClientInner, Error},
    serialization::RecordIter,
};

/// Entry point for a project's named collection stores.
pub struct Collections {
    client: Arc<ClientInner>,
    project_id: String,
}

impl Collections {
    pub(crate) fn new(client: Arc<ClientInner>, project_id: String) -> Self {
        Self { client, project_id }
    }

    /// A regular key/value store. The handle is lazy; the collection itself
    /// is created server-side on first write.
    pub fn new_store(&self, name: &str) -> Collection {
        Collection {
            client: Arc::clone(&self.client),
            project_id: self.project_id.clone(),
            name: name.to_owned(),
        }
    }
}

/// A named collection of key/value entries scoped to a project. Every entry
/// carries a mandatory `_key` field and is addressed by it.
pub struct Collection {
    client: Arc<ClientInner>,
    project_id: String,
    name: String,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn base_segments(&self) -> [&str; 4] {
        // "s" is the regular-store kind in the collections URI scheme.
        ["collections", &self.project_id, "s", &self.name]
    }

    /// Iterates every entry's value. A collection that was never written to
    /// answers 404 here.
    pub fn iter_values(&self) -> Result<RecordIter, Error> {
        let url = self.client.build_url(&self.base_segments())?;
        let response = self.client.get_records(url)?;
        Ok(self.client.wire_format.decode_records(response.body))
    }

    pub fn get(&self, key: &str) -> Result<Value, Error> {
        let segments = self.base_segments();
        let mut parts: Vec<&str> = segments.to_vec();
        parts.push(key);
        let url = self.client.build_url(&parts)?;
        let response = self.client.get(url)?;
        serde_json::from_slice(&response.body)
            .map_err(|err| Error::Decode(format!("decode collection entry `{key}`: {err}")))
    }

    /// Writes one entry. The entry must carry its `_key`.
    pub fn set(&self, entry: &Value) -> Result<(), Error> {
        let url = self.client.build_url(&self.base_segments())?;
        let body = serde_json::to_vec(entry)
            .map_err(|err| Error::Request(format!("encode collection entry: {err}")))?;
        self.client.post(url, body, "application/json")?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<(), Error> {
        let segments = self.base_segments();
        let mut parts: Vec<&str> = segments.to_vec();
        parts.push(key);
        let url = self.client.build_url(&parts)?;
        self.client.delete(url)?;
        Ok(())
    }
}
