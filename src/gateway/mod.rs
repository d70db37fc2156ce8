//! Gateway addressing for content identifiers.
//!
//! A gateway is an HTTP front end that serves content by identifier. Two URL
//! families are supported:
//!
//! ```text
//! path-style:      https://<gateway-host>/<namespace>/<id>[/][?filename=...]
//! subdomain-style: https://<id>.<namespace>.<gateway-host>[/][?filename=...]
//! ```

pub mod candidates;
pub mod classifier;

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

pub use candidates::{generate_candidates, preferred_url};
pub use classifier::{classify, is_url, CidScheme};

/// Gateway settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Scheme and host (optionally port) of the gateway
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path namespace (`ipfs`)
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Substrings that mark an identifier as an already complete gateway URL
    #[serde(default = "default_known_domains")]
    pub known_domains: Vec<String>,

    /// Filename appended by the filename-hinted candidate variants
    #[serde(default = "default_filename_hint")]
    pub filename_hint: String,
}

fn default_base_url() -> String {
    "https://spfs-gateway.thestratos.net".to_string()
}
fn default_namespace() -> String {
    "ipfs".to_string()
}
fn default_known_domains() -> Vec<String> {
    vec!["stratos".to_string()]
}
fn default_filename_hint() -> String {
    "video.mp4".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            namespace: default_namespace(),
            known_domains: default_known_domains(),
            filename_hint: default_filename_hint(),
        }
    }
}

impl GatewayConfig {
    /// Gateway at a given base URL with default namespace and hints
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Whether an identifier string already names a gateway URL
    pub fn is_gateway_url(&self, s: &str) -> bool {
        let lower = s.to_ascii_lowercase();
        self.known_domains
            .iter()
            .filter(|d| !d.is_empty())
            .any(|d| lower.contains(&d.to_ascii_lowercase()))
    }

    /// File extension of the filename hint (`mp4`)
    pub fn hint_extension(&self) -> Option<&str> {
        Path::new(&self.filename_hint)
            .extension()
            .and_then(|e| e.to_str())
    }

    /// MIME type implied by the filename hint (`video/mp4`)
    pub fn hint_mime(&self) -> Option<&'static str> {
        mime_guess::from_path(&self.filename_hint).first_raw()
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        let trimmed = self.base_url.trim().trim_end_matches('/');

        if let Ok(url) = Url::parse(trimmed) {
            if let Some(host) = url.host_str() {
                let authority = match url.port() {
                    Some(port) => format!("{}:{}", host, port),
                    None => host.to_string(),
                };
                return Endpoint {
                    scheme: url.scheme().to_string(),
                    authority,
                    namespace: self.namespace.trim_matches('/').to_string(),
                };
            }
        }

        // Bare host without a scheme
        Endpoint {
            scheme: "https".to_string(),
            authority: trimmed.to_string(),
            namespace: self.namespace.trim_matches('/').to_string(),
        }
    }
}

/// Ensure a URL carries a scheme, defaulting to https
pub fn normalize_url(s: &str) -> String {
    let s = s.trim();
    if is_url(s) {
        s.to_string()
    } else {
        format!("https://{}", s.trim_start_matches("//"))
    }
}

/// Parsed gateway base used to format candidate URLs
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    scheme: String,
    authority: String,
    namespace: String,
}

impl Endpoint {
    /// `<scheme>://<host>/<namespace>/<id>`
    pub(crate) fn path_url(&self, id: &str) -> String {
        format!("{}://{}/{}/{}", self.scheme, self.authority, self.namespace, id)
    }

    /// `<scheme>://<id>.<namespace>.<host>`
    pub(crate) fn subdomain_url(&self, id: &str) -> String {
        format!("{}://{}.{}.{}", self.scheme, id, self.namespace, self.authority)
    }

    /// `<scheme>://<host>/<id>`
    pub(crate) fn root_url(&self, id: &str) -> String {
        format!("{}://{}/{}", self.scheme, self.authority, id)
    }

    /// `<scheme>://<host>/<namespace>/raw/<id>`
    pub(crate) fn raw_path_url(&self, id: &str) -> String {
        format!("{}://{}/{}/raw/{}", self.scheme, self.authority, self.namespace, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_default() {
        let ep = GatewayConfig::default().endpoint();
        assert_eq!(ep.path_url("Qm1"), "https://spfs-gateway.thestratos.net/ipfs/Qm1");
        assert_eq!(
            ep.subdomain_url("bafy1"),
            "https://bafy1.ipfs.spfs-gateway.thestratos.net"
        );
    }

    #[test]
    fn test_endpoint_keeps_port_and_scheme() {
        let ep = GatewayConfig::with_base_url("http://127.0.0.1:8080/").endpoint();
        assert_eq!(ep.path_url("Qm1"), "http://127.0.0.1:8080/ipfs/Qm1");
        assert_eq!(ep.root_url("Qm1"), "http://127.0.0.1:8080/Qm1");
    }

    #[test]
    fn test_endpoint_bare_host() {
        let ep = GatewayConfig::with_base_url("gw.example.org").endpoint();
        assert_eq!(ep.raw_path_url("Qm1"), "https://gw.example.org/ipfs/raw/Qm1");
    }

    #[test]
    fn test_hints() {
        let config = GatewayConfig::default();
        assert_eq!(config.hint_extension(), Some("mp4"));
        assert_eq!(config.hint_mime(), Some("video/mp4"));
    }

    #[test]
    fn test_is_gateway_url() {
        let config = GatewayConfig::default();
        assert!(config.is_gateway_url("spfs-gateway.theStratos.net/ipfs/Qm1"));
        assert!(!config.is_gateway_url("QmAbc"));
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("https://a/b"), "https://a/b");
        assert_eq!(normalize_url("http://a/b"), "http://a/b");
        assert_eq!(normalize_url("a.stratos.net/x"), "https://a.stratos.net/x");
    }
}
