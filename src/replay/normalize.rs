use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::cassette::Cassette;

/// Project id every persisted cassette refers to.
pub const CANONICAL_PROJECT_ID: &str = "2222222";

/// Endpoint every persisted cassette refers to.
pub const CANONICAL_ENDPOINT: &str = "http://storage.vm.scrapinghub.com";

/// Placeholder API token: 32 `f`s, the documented throwaway credential.
pub const PLACEHOLDER_AUTH: &str = "ffffffffffffffffffffffffffffffff";

/// The Basic-auth header value derived from [`PLACEHOLDER_AUTH`].
pub fn placeholder_authorization() -> Vec<u8> {
    format!("Basic {}", STANDARD.encode(format!("{PLACEHOLDER_AUTH}:"))).into_bytes()
}

/// The environment-specific values to scrub out of a cassette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeRules {
    /// The real endpoint requests were issued against, without a trailing
    /// slash.
    pub endpoint: String,
    /// The real project id used during recording.
    pub project_id: String,
}

impl NormalizeRules {
    pub fn new(endpoint: &str, project_id: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_owned(),
            project_id: project_id.to_owned(),
        }
    }
}

/// Rewrites every interaction so the cassette is stable across environments:
/// the real endpoint and project id become their canonical stand-ins and any
/// `Authorization` header is replaced with the placeholder credential.
///
/// Substituting fixed values makes this idempotent, and the output carries
/// neither the real auth header nor the real project id anywhere. Returns
/// whether anything changed.
pub fn normalize_cassette(cassette: &mut Cassette, rules: &NormalizeRules) -> bool {
    let mut changed = false;
    let placeholder = placeholder_authorization();

    for interaction in &mut cassette.interactions {
        let request = &mut interaction.request;

        let uri = request
            .uri
            .replace(&rules.endpoint, CANONICAL_ENDPOINT)
            .replace(&rules.project_id, CANONICAL_PROJECT_ID);
        if uri != request.uri {
            request.uri = uri;
            changed = true;
        }

        for (name, value) in &mut request.headers {
            if name.eq_ignore_ascii_case("authorization") && *value != placeholder {
                *value = placeholder.clone();
                changed = true;
            }
        }
    }

    changed
}
