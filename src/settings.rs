use std::sync::Arc;

use serde_json::{Map, Value};

use crate::client::{ClientInner, Error};

/// Dict-like proxy over a project's settings.
///
/// Reads go through a local cache filled on first access; mutations stay
/// local until `save`. `apipost`/`apidelete` bypass the cache and talk to the
/// API directly, and `expire` drops the cache so the next read refetches.
pub struct Settings {
    client: Arc<ClientInner>,
    project_id: String,
    cached: Option<Map<String, Value>>,
}

impl Settings {
    pub(crate) fn new(client: Arc<ClientInner>, project_id: String) -> Self {
        Self {
            client,
            project_id,
            cached: None,
        }
    }

    fn base_url(&self) -> Result<url::Url, Error> {
        self.client
            .build_url(&["projects", &self.project_id, "settings"])
    }

    fn load(&mut self) -> Result<&mut Map<String, Value>, Error> {
        if self.cached.is_none() {
            let response = self.client.get(self.base_url()?)?;
            let settings: Map<String, Value> = if response.body.is_empty() {
                Map::new()
            } else {
                serde_json::from_slice(&response.body)
                    .map_err(|err| Error::Decode(format!("decode project settings: {err}")))?
            };
            self.cached = Some(settings);
        }
        Ok(self.cached.get_or_insert_with(Map::new))
    }

    pub fn keys(&mut self) -> Result<Vec<String>, Error> {
        Ok(self.load()?.keys().cloned().collect())
    }

    pub fn get(&mut self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.load()?.get(key).cloned())
    }

    pub fn set(&mut self, key: &str, value: Value) -> Result<(), Error> {
        self.load()?.insert(key.to_owned(), value);
        Ok(())
    }

    /// Removes a key from the cached view. Takes effect remotely on `save`.
    pub fn delete(&mut self, key: &str) -> Result<bool, Error> {
        Ok(self.load()?.remove(key).is_some())
    }

    /// Posts the cached state back as the new settings document.
    pub fn save(&mut self) -> Result<(), Error> {
        let settings = self.load()?.clone();
        let body = serde_json::to_vec(&Value::Object(settings))
            .map_err(|err| Error::Request(format!("encode project settings: {err}")))?;
        self.client
            .post(self.base_url()?, body, "application/json")?;
        Ok(())
    }

    /// Direct POST of a partial settings document, bypassing the cache.
    pub fn apipost(&mut self, value: &Value) -> Result<(), Error> {
        let body = serde_json::to_vec(value)
            .map_err(|err| Error::Request(format!("encode settings update: {err}")))?;
        self.client
            .post(self.base_url()?, body, "application/json")?;
        self.expire();
        Ok(())
    }

    /// Direct DELETE of a single key, bypassing the cache.
    pub fn apidelete(&mut self, key: &str) -> Result<(), Error> {
        let url = self
            .client
            .build_url(&["projects", &self.project_id, "settings", key])?;
        self.client.delete(url)?;
        self.expire();
        Ok(())
    }

    pub fn expire(&mut self) {
        self.cached = None;
    }
}
