use std::sync::Arc;

use serde_json::Value;

use crate::{
    client::{ClientInner, Error},
    proxy::{IterParams, ResourceProxy},
    serialization::RecordIter,
};

/// Paginated view of a job's scraped items.
///
/// `list` materializes the whole result and can use a lot of memory for large
/// jobs; prefer `iter`, which decodes records one at a time. Both accept the
/// same parameters and filters.
pub struct Items {
    proxy: ResourceProxy,
}

impl Items {
    pub(crate) fn new(client: Arc<ClientInner>, key: String) -> Self {
        Self {
            proxy: ResourceProxy::new(client, "items", key),
        }
    }

    /// Lazy, single-pass, forward-only iteration over the matching items.
    pub fn iter(&self, params: &IterParams) -> Result<RecordIter, Error> {
        self.proxy.fetch(self.rewrite_pairs(params)?)
    }

    /// Eagerly collects the same sequence `iter` would yield.
    pub fn list(&self, params: &IterParams) -> Result<Vec<Value>, Error> {
        self.iter(params)?.collect()
    }

    /// The items endpoint has no numeric `offset` parameter; the cursor is a
    /// `start` value of the form `<key>/<offset>`. The literal `offset` pair
    /// never goes out on the wire.
    fn rewrite_pairs(&self, params: &IterParams) -> Result<Vec<(String, String)>, Error> {
        let offset = params.offset;
        let mut reduced = params.clone();
        reduced.offset = None;
        let mut pairs = reduced.query_pairs()?;
        if let Some(offset) = offset {
            pairs.retain(|(name, _)| name != "start");
            pairs.push(("start".to_owned(), format!("{}/{}", self.proxy.key(), offset)));
        }
        Ok(pairs)
    }
}

/// Paginated view of a job's log entries. Unlike items, logs page with the
/// plain numeric `offset` parameter.
pub struct Logs {
    proxy: ResourceProxy,
}

impl Logs {
    pub(crate) fn new(client: Arc<ClientInner>, key: String) -> Self {
        Self {
            proxy: ResourceProxy::new(client, "logs", key),
        }
    }

    pub fn iter(&self, params: &IterParams) -> Result<RecordIter, Error> {
        self.proxy.fetch(params.query_pairs()?)
    }

    pub fn list(&self, params: &IterParams) -> Result<Vec<Value>, Error> {
        self.iter(params)?.collect()
    }
}
