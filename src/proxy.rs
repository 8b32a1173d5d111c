use std::sync::Arc;

use serde_json::Value;

use crate::{
    client::{ClientInner, Error},
    serialization::RecordIter,
};

/// One pagination filter: `(field, operator, values)`. Filters on a request
/// are combined conjunctively by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: String,
    pub values: Vec<Value>,
}

impl Filter {
    pub fn new(field: &str, op: &str, values: Vec<Value>) -> Self {
        Self {
            field: field.to_owned(),
            op: op.to_owned(),
            values,
        }
    }

    /// Wire encoding: a JSON triple, one `filter` query parameter per filter.
    fn encode(&self) -> Result<String, Error> {
        serde_json::to_string(&serde_json::json!([self.field, self.op, self.values]))
            .map_err(|err| Error::Request(format!("encode filter for `{}`: {err}", self.field)))
    }
}

/// Parameters recognized by the paginated record endpoints.
#[derive(Debug, Clone, Default)]
pub struct IterParams {
    pub count: Option<u64>,
    pub offset: Option<u64>,
    pub start: Option<String>,
    pub filter: Vec<Filter>,
    /// Passthrough pairs for endpoint-specific parameters (`startts`, ...).
    pub extra: Vec<(String, String)>,
}

impl IterParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn start(mut self, start: &str) -> Self {
        self.start = Some(start.to_owned());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter.push(filter);
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.extra.push((name.to_owned(), value.to_owned()));
        self
    }

    /// Flattens into query pairs. `offset` is emitted literally here; proxies
    /// that speak a cursor dialect rewrite it before the request goes out.
    pub(crate) fn query_pairs(&self) -> Result<Vec<(String, String)>, Error> {
        let mut pairs = Vec::new();
        if let Some(count) = self.count {
            pairs.push(("count".to_owned(), count.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_owned(), offset.to_string()));
        }
        if let Some(start) = &self.start {
            pairs.push(("start".to_owned(), start.clone()));
        }
        for filter in &self.filter {
            pairs.push(("filter".to_owned(), filter.encode()?));
        }
        for (name, value) in &self.extra {
            pairs.push((name.clone(), value.clone()));
        }
        Ok(pairs)
    }
}

/// Shared plumbing of the paginated record proxies (items, logs). Holds the
/// resource name and the key it is scoped to, builds the request and hands
/// the body to the wire-format decoder.
pub(crate) struct ResourceProxy {
    client: Arc<ClientInner>,
    resource: &'static str,
    key: String,
}

impl ResourceProxy {
    pub(crate) fn new(client: Arc<ClientInner>, resource: &'static str, key: String) -> Self {
        Self {
            client,
            resource,
            key,
        }
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn fetch(&self, pairs: Vec<(String, String)>) -> Result<RecordIter, Error> {
        let mut url = self.client.build_url(&[self.resource, &self.key])?;
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &pairs {
                query.append_pair(name, value);
            }
            drop(query);
        }
        let response = self.client.get_records(url)?;
        Ok(self.client.wire_format.decode_records(response.body))
    }
}
