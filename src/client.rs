use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use url::Url;

use crate::{config::Config, project::Project, serialization::WireFormat};

const STATUS_BODY_SNIPPET_LEN: usize = 256;

/// A plain HTTP request as the client issues it: method, full URL, header
/// pairs (values are raw bytes, headers are not guaranteed to be UTF-8) and
/// body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: Url,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    pub fn new(method: &str, url: Url) -> Self {
        Self {
            method: method.to_owned(),
            url,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push((name.to_owned(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_slice())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, Vec<u8>)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The seam between resource proxies and the wire. The live client goes
/// through [`NetTransport`]; the cassette engine substitutes
/// [`crate::replay::ReplayTransport`] here without the proxies noticing.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error>;
}

#[derive(Debug)]
pub enum Error {
    /// Non-2xx response. The body snippet is truncated for logging.
    Status {
        status: u16,
        url: String,
        body: String,
    },
    Transport(reqwest::Error),
    Request(String),
    Decode(String),
    Key(String),
    Cassette(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status { status, url, body } => {
                if body.is_empty() {
                    write!(f, "HTTP {status} from {url}")
                } else {
                    write!(f, "HTTP {status} from {url}: {body}")
                }
            }
            Self::Transport(_) => write!(f, "http transport failed"),
            Self::Request(message)
            | Self::Decode(message)
            | Self::Key(message)
            | Self::Cassette(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(source) => Some(source),
            _ => None,
        }
    }
}

/// Blocking transport over `reqwest`. No retries and no timeout beyond the
/// client defaults; errors surface as [`Error::Transport`].
pub struct NetTransport {
    client: reqwest::blocking::Client,
}

impl NetTransport {
    pub fn new() -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .build()
            .map_err(Error::Transport)?;
        Ok(Self { client })
    }
}

impl Transport for NetTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| Error::Request(format!("invalid http method `{}`", request.method)))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_slice());
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().map_err(Error::Transport)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_owned(), value.as_bytes().to_vec()))
            .collect();
        let body = response.bytes().map_err(Error::Transport)?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Shared client state handed to every resource proxy.
pub(crate) struct ClientInner {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) endpoint: Url,
    pub(crate) authorization: Vec<u8>,
    pub(crate) wire_format: WireFormat,
}

impl ClientInner {
    /// Joins path segments onto the endpoint. Segments may themselves contain
    /// slashes (job keys do), so this is plain string joining rather than
    /// percent-encoding segment pushes.
    pub(crate) fn build_url(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut raw = self.endpoint.as_str().trim_end_matches('/').to_owned();
        for segment in segments {
            raw.push('/');
            raw.push_str(segment);
        }
        Url::parse(&raw).map_err(|err| Error::Request(format!("invalid request url `{raw}`: {err}")))
    }

    pub(crate) fn request(&self, method: &str, url: Url) -> HttpRequest {
        HttpRequest::new(method, url)
            .header("authorization", self.authorization.clone())
            .header("accept", "application/json")
    }

    pub(crate) fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, Error> {
        tracing::debug!(method = %request.method, url = %request.url, "issuing request");
        let response = self.transport.execute(request)?;
        if response.is_success() {
            return Ok(response);
        }

        let mut body = String::from_utf8_lossy(&response.body).into_owned();
        if body.len() > STATUS_BODY_SNIPPET_LEN {
            body.truncate(STATUS_BODY_SNIPPET_LEN);
        }
        Err(Error::Status {
            status: response.status,
            url: request.url.to_string(),
            body,
        })
    }

    pub(crate) fn get(&self, url: Url) -> Result<HttpResponse, Error> {
        let request = self.request("GET", url);
        self.execute(&request)
    }

    /// GET for record streams (items, logs, collection entries). These are the
    /// endpoints the msgpack toggle applies to; everything else speaks JSON.
    pub(crate) fn get_records(&self, url: Url) -> Result<HttpResponse, Error> {
        let request = HttpRequest::new("GET", url)
            .header("authorization", self.authorization.clone())
            .header("accept", self.wire_format.accept());
        self.execute(&request)
    }

    pub(crate) fn post(
        &self,
        url: Url,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<HttpResponse, Error> {
        let request = self
            .request("POST", url)
            .header("content-type", content_type)
            .body(body);
        self.execute(&request)
    }

    pub(crate) fn delete(&self, url: Url) -> Result<HttpResponse, Error> {
        let request = self.request("DELETE", url);
        self.execute(&request)
    }
}

/// Entry point for the HubStorage API. Cheap to clone; all resource proxies
/// share the same transport and credentials.
#[derive(Clone)]
pub struct HubstorageClient {
    inner: Arc<ClientInner>,
}

impl HubstorageClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let transport = Arc::new(NetTransport::new()?);
        Self::with_transport(config, transport)
    }

    /// Builds a client over an explicit transport. This is how the replay
    /// harness routes every request through a cassette.
    pub fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self, Error> {
        Ok(Self {
            inner: Arc::new(ClientInner {
                transport,
                endpoint: config.endpoint.clone(),
                authorization: basic_authorization(&config.auth),
                wire_format: config.wire_format,
            }),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    pub fn wire_format(&self) -> WireFormat {
        self.inner.wire_format
    }

    pub fn get_project(&self, project_id: &str) -> Project {
        Project::new(Arc::clone(&self.inner), project_id)
    }

    /// Releases the client. Connections are pooled inside the transport and
    /// dropped with it.
    pub fn close(self) {}
}

/// HTTP Basic credentials the way the platform expects them: the API token as
/// username and an empty password.
pub(crate) fn basic_authorization(auth: &str) -> Vec<u8> {
    format!("Basic {}", STANDARD.encode(format!("{auth}:"))).into_bytes()
}
