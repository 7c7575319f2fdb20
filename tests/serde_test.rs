// tests/serde_test.rs
#![cfg(feature = "serde-support")]

use qkd_protocol::{AbortReason, CascadeStats, ProtocolConfig, Role, TagWidth};

#[test]
fn test_config_json_round_trip() {
    let mut config = ProtocolConfig::high_noise();
    config.cascade.initial_block_size = Some(32);
    config.verification.tag_width = TagWidth::Bits64;

    let json = serde_json::to_string(&config).unwrap();
    let back: ProtocolConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
    assert!(back.validate().is_ok());
}

#[test]
fn test_reports_serialize() {
    let reason = AbortReason::KeyTooShort { length: 0, minimum: 1 };
    let json = serde_json::to_value(&reason).unwrap();
    assert_eq!(json["KeyTooShort"]["minimum"], 1);

    let stats = CascadeStats {
        leakage: 29,
        errors_corrected: 2,
        backtrack_corrections: 1,
        passes_completed: 2,
        initial_block_size: 4,
        blocks_checked: 24,
    };
    let json = serde_json::to_string(&stats).unwrap();
    assert_eq!(serde_json::from_str::<CascadeStats>(&json).unwrap(), stats);

    assert_eq!(serde_json::to_string(&Role::Responder).unwrap(), "\"Responder\"");
}
