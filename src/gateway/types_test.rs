use super::*;

// =========================================================================
// roles + turns
// =========================================================================

#[test]
fn role_serde_is_lowercase() {
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
    assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
    let role: Role = serde_json::from_str("\"system\"").unwrap();
    assert_eq!(role, Role::System);
}

#[test]
fn chat_turn_round_trip() {
    let turn: ChatTurn = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).unwrap();
    assert_eq!(turn, ChatTurn::new(Role::User, "hi"));
    let json = serde_json::to_string(&turn).unwrap();
    assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
}

// =========================================================================
// mode selection
// =========================================================================

#[test]
fn mode_follows_flag_only() {
    // Content that smells like an image request must not flip the mode:
    // dispatch is driven exclusively by the caller's flag.
    let turns = vec![ChatTurn::new(Role::User, "please generate an image of a cat")];
    let request = GatewayRequest { turns: turns.clone(), image_mode: false };
    assert_eq!(request.mode(), RequestMode::Text);

    let request = GatewayRequest { turns, image_mode: true };
    assert_eq!(request.mode(), RequestMode::Image);
}

// =========================================================================
// error kinds
// =========================================================================

#[test]
fn error_kind_wire_names() {
    assert_eq!(serde_json::to_string(&ErrorKind::MissingConfig).unwrap(), "\"missing_config\"");
    assert_eq!(serde_json::to_string(&ErrorKind::Unauthorized).unwrap(), "\"upstream_unauthorized\"");
    assert_eq!(serde_json::to_string(&ErrorKind::NotFound).unwrap(), "\"upstream_not_found\"");
    assert_eq!(serde_json::to_string(&ErrorKind::RateLimited).unwrap(), "\"upstream_rate_limited\"");
    assert_eq!(serde_json::to_string(&ErrorKind::Timeout).unwrap(), "\"upstream_timeout\"");
    assert_eq!(serde_json::to_string(&ErrorKind::MalformedResult).unwrap(), "\"upstream_malformed_result\"");
    assert_eq!(serde_json::to_string(&ErrorKind::Unknown).unwrap(), "\"unknown\"");
}

#[test]
fn every_kind_has_a_remediation_hint() {
    for kind in [
        ErrorKind::MissingConfig,
        ErrorKind::Unauthorized,
        ErrorKind::NotFound,
        ErrorKind::RateLimited,
        ErrorKind::Timeout,
        ErrorKind::MalformedResult,
        ErrorKind::Unknown,
    ] {
        assert!(!kind.remediation().is_empty());
    }
}

// =========================================================================
// envelope
// =========================================================================

#[test]
fn success_envelope_skips_optional_fields() {
    let json = serde_json::to_value(GatewayResponse::text("hello")).unwrap();
    assert_eq!(json, serde_json::json!({ "isImage": false, "content": "hello" }));
}

#[test]
fn image_envelope_carries_url_as_content() {
    let json = serde_json::to_value(GatewayResponse::image("https://x/y.png")).unwrap();
    assert_eq!(json, serde_json::json!({ "isImage": true, "content": "https://x/y.png" }));
}

#[test]
fn not_configured_envelope_shape() {
    let envelope = GatewayResponse::not_configured("missing things");
    assert_eq!(envelope.is_configured, Some(false));
    assert_eq!(envelope.error, Some(ErrorKind::MissingConfig));
    assert!(!envelope.is_image);

    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json.get("isConfigured"), Some(&serde_json::json!(false)));
    assert_eq!(json.get("error"), Some(&serde_json::json!("missing_config")));
}

#[test]
fn diagnostics_serialize_camel_case() {
    let envelope = GatewayResponse::failure(ErrorKind::NotFound, "nope").with_diagnostics(
        Some("gpt-chat"),
        Some("https://example.test"),
        "2023-05-15",
    );
    let json = serde_json::to_value(&envelope).unwrap();
    assert_eq!(json.get("deploymentName"), Some(&serde_json::json!("gpt-chat")));
    assert_eq!(json.get("endpoint"), Some(&serde_json::json!("https://example.test")));
    assert_eq!(json.get("apiVersion"), Some(&serde_json::json!("2023-05-15")));
}
