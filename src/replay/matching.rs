use url::Url;

use crate::client::HttpRequest;

use super::cassette::RecordedRequest;

/// Decides whether a recorded interaction answers a live request.
///
/// A request matches on method, scheme, host, port, path, query and the
/// `Accept` header. Query comparison works on raw `name=value` pairs sorted
/// by name then value (no percent-decoding), so parameter order never
/// matters. The `Accept` dimension keeps the JSON and msgpack variants of the
/// same call apart inside one cassette.
pub(crate) fn request_matches(recorded: &RecordedRequest, request: &HttpRequest) -> bool {
    if !recorded.method.eq_ignore_ascii_case(&request.method) {
        return false;
    }

    let Ok(recorded_url) = Url::parse(&recorded.uri) else {
        return false;
    };
    let url = &request.url;

    recorded_url.scheme() == url.scheme()
        && recorded_url.host_str() == url.host_str()
        && recorded_url.port_or_known_default() == url.port_or_known_default()
        && recorded_url.path() == url.path()
        && query_params_sorted(recorded_url.query()) == query_params_sorted(url.query())
        && accept_header(&recorded.headers) == request.header_value("accept")
}

fn query_params_sorted(query: Option<&str>) -> Vec<(&str, &str)> {
    let mut out = Vec::new();
    let Some(query) = query else { return out };

    for segment in query.split('&') {
        if segment.is_empty() {
            continue;
        }
        let mut parts = segment.splitn(2, '=');
        let name = parts.next().unwrap_or_default();
        let value = parts.next().unwrap_or_default();
        out.push((name, value));
    }

    out.sort_unstable_by(|(a_name, a_value), (b_name, b_value)| {
        a_name.cmp(b_name).then_with(|| a_value.cmp(b_value))
    });
    out
}

fn accept_header(headers: &[(String, Vec<u8>)]) -> Option<&[u8]> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("accept"))
        .map(|(_, value)| value.as_slice())
}
