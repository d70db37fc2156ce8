//! Gateway Candidate Integration Tests
//!
//! Tests for identifier classification and candidate URL ordering.

use cidshare::gateway::{classify, generate_candidates, preferred_url, CidScheme, GatewayConfig};

#[test]
fn test_classify_prefix_families() {
    assert_eq!(classify("QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG"), CidScheme::V0);
    assert_eq!(
        classify("bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi"),
        CidScheme::V1
    );
    assert_eq!(classify("https://example.com/file"), CidScheme::Unknown);
    assert_eq!(classify(""), CidScheme::Unknown);
}

#[test]
fn test_path_style_comes_first() {
    let urls = generate_candidates(&GatewayConfig::default(), "Qm1234", None);

    let first = &urls[0];
    assert!(first.contains("/ipfs/Qm1234"));
    assert!(first.starts_with("https://spfs-gateway.thestratos.net/"));
    assert!(!first.contains("Qm1234.ipfs."));
}

#[test]
fn test_generation_is_deterministic_and_unique() {
    let config = GatewayConfig::default();
    let a = generate_candidates(&config, "bafyXYZ", Some("https://cdn.example/v.mp4?sig=1"));
    let b = generate_candidates(&config, "bafyXYZ", Some("https://cdn.example/v.mp4?sig=1"));
    assert_eq!(a, b);

    let mut sorted = a.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), a.len());

    assert_eq!(a[0], "https://cdn.example/v.mp4?sig=1");
    assert_eq!(a[1], "https://cdn.example/v.mp4");
}

#[test]
fn test_direct_url_matching_a_gateway_variant_is_not_repeated() {
    let config = GatewayConfig::default();
    let path = "https://spfs-gateway.thestratos.net/ipfs/Qm1234";
    let urls = generate_candidates(&config, "Qm1234", Some(path));

    assert_eq!(urls[0], path);
    assert_eq!(urls.iter().filter(|u| u.as_str() == path).count(), 1);
}

#[test]
fn test_v0_only_raw_variant() {
    let config = GatewayConfig::default();
    let v0 = generate_candidates(&config, "Qm1234", None);
    let v1 = generate_candidates(&config, "bafy1234", None);

    assert!(v0.iter().any(|u| u.contains("/ipfs/raw/")));
    assert!(!v1.iter().any(|u| u.contains("/ipfs/raw/")));
    assert_eq!(v0.len(), v1.len() + 1);
}

#[test]
fn test_unknown_identifier() {
    let config = GatewayConfig::default();
    assert!(generate_candidates(&config, "not-a-cid", None).is_empty());
    assert_eq!(
        generate_candidates(&config, "https://example.com/a.png", None),
        vec!["https://example.com/a.png"]
    );
    assert_eq!(preferred_url(&config, "not-a-cid"), None);
}

#[test]
fn test_custom_gateway_with_port() {
    let config = GatewayConfig::with_base_url("http://127.0.0.1:8080/");
    assert_eq!(
        preferred_url(&config, "QmA").as_deref(),
        Some("http://127.0.0.1:8080/ipfs/QmA")
    );
}
