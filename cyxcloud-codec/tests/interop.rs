//! Cross-checks against other implementations and serialized profiles

use cyxcloud_codec::gf::{self, Gf256};
use cyxcloud_codec::{CodecConfig, ErasureCodec, Profile, ReedSolomonCodec, RlncCodec};
use reed_solomon_erasure::galois_8;

#[test]
fn test_field_matches_reed_solomon_erasure() {
    for a in 0..=255u8 {
        for b in 0..=255u8 {
            assert_eq!(gf::mul(a, b), galois_8::mul(a, b), "{} * {}", a, b);
        }
    }
}

#[test]
fn test_inverse_matches_reed_solomon_erasure() {
    for a in 1..=255u8 {
        let inv = Gf256(a).inv().unwrap();
        assert_eq!(inv.0, galois_8::div(1, a), "1 / {}", a);
    }
}

#[test]
fn test_profile_from_json() {
    let json = r#"{
        "plugin": "cc",
        "k": "4",
        "m": "3",
        "ruleset-failure-domain": "host",
        "technique": "ignored"
    }"#;
    let profile: Profile = serde_json::from_str(json).unwrap();
    assert_eq!(profile.get("k"), Some("4"));

    let mut codec = ReedSolomonCodec::default();
    codec.init(&profile, &mut String::new()).unwrap();
    assert_eq!(codec.chunk_count(), 7);
    assert_eq!(codec.config().failure_domain.as_deref(), Some("host"));

    let mut rlnc = RlncCodec::new();
    rlnc.init(&profile, &mut String::new()).unwrap();
    assert_eq!(rlnc.chunk_count(), 7);
}

#[test]
fn test_config_serde_round_trip() {
    let config = CodecConfig::new(10, 4).unwrap();
    let json = serde_json::to_string(&config).unwrap();
    let parsed: CodecConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
    assert!(json.contains("\"data_chunks\":10"));
}
