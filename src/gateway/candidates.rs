//! Candidate retrieval URLs for an identifier.
//!
//! Candidates are ordered most-likely-to-succeed first:
//!
//! 1. the known direct URL, then the same URL without its query string
//! 2. path-style, without and with a trailing slash
//! 3. subdomain-style, with and without a trailing slash
//! 4. filename-hinted variants of both styles
//! 5. the identifier directly under the gateway root (no namespace)
//! 6. raw / format / type query variants, plus a `raw/` sub-path for v0 ids
//!
//! The list is de-duplicated, keeping the first occurrence.

use std::collections::HashSet;

use super::classifier::{classify, is_url, CidScheme};
use super::GatewayConfig;

/// Order-preserving, duplicate-free URL list
#[derive(Debug, Default)]
struct CandidateList {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl CandidateList {
    fn push(&mut self, url: impl Into<String>) {
        let url = url.into();
        if !url.is_empty() && self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }

    fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Generate the ordered candidate URLs for an identifier.
///
/// Deterministic: the same `(id, known_direct_url)` always yields the same
/// list. Identifiers of unknown scheme only yield the direct URL variants, and
/// the identifier itself when it is already an http(s) URL.
pub fn generate_candidates(
    config: &GatewayConfig,
    id: &str,
    known_direct_url: Option<&str>,
) -> Vec<String> {
    let id = id.trim();
    let mut list = CandidateList::default();

    if let Some(direct) = known_direct_url.map(str::trim).filter(|d| !d.is_empty()) {
        list.push(direct);
        if let Some((without_query, _)) = direct.split_once('?') {
            list.push(without_query);
        }
    }

    let scheme = classify(id);
    if !scheme.is_content_id() {
        if is_url(id) {
            list.push(id);
        }
        return list.into_vec();
    }

    let endpoint = config.endpoint();
    let path = endpoint.path_url(id);
    let subdomain = endpoint.subdomain_url(id);
    let hint = config.filename_hint.trim_matches('/');

    list.push(path.clone());
    list.push(format!("{}/", path));

    list.push(format!("{}/", subdomain));
    list.push(subdomain.clone());

    if !hint.is_empty() {
        list.push(format!("{}?filename={}", path, hint));
        list.push(format!("{}/{}", path, hint));
        list.push(format!("{}/?filename={}", subdomain, hint));
        list.push(format!("{}/{}", subdomain, hint));
    }

    list.push(endpoint.root_url(id));

    list.push(format!("{}?raw=true", path));
    if scheme == CidScheme::V0 {
        list.push(endpoint.raw_path_url(id));
    }
    if let Some(ext) = config.hint_extension() {
        list.push(format!("{}?format={}", path, ext));
    }
    if let Some(mime) = config.hint_mime() {
        list.push(format!("{}?type={}", path, mime));
    }

    list.into_vec()
}

/// The single URL used when only one fetch is attempted per identifier.
///
/// Returns `None` for identifiers of unknown scheme.
pub fn preferred_url(config: &GatewayConfig, id: &str) -> Option<String> {
    if !classify(id).is_content_id() {
        return None;
    }
    generate_candidates(config, id, None).into_iter().next()
}
