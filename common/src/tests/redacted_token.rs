use crate::RedactedToken;

/// **VALUE**: Verifies the credential never shows up in Debug or Display output.
///
/// **WHY THIS MATTERS**: The connector logs its configuration and errors liberally.
/// A token that formats as itself ends up in log files.
///
/// **BUG THIS CATCHES**: Would catch a derived Debug sneaking back in.
#[test]
fn given_token_when_formatted_then_value_is_hidden() {
    // GIVEN: A token
    let token = RedactedToken::new("super-secret-value");

    // WHEN: Formatting both ways
    let debug = format!("{:?}", token);
    let display = format!("{}", token);

    // THEN: Neither contains the secret
    assert!(!debug.contains("super-secret-value"));
    assert!(!display.contains("super-secret-value"));
    assert_eq!(token.as_str(), "super-secret-value");
    assert_eq!(token.len(), 18);
}

/// **VALUE**: Verifies the token can be read from config but refuses to be written back out.
///
/// **WHY THIS MATTERS**: Config is deserialized from YAML/TOML; dumping a config struct
/// for diagnostics must not leak the credential.
///
/// **BUG THIS CATCHES**: Would catch a Serialize impl that writes the raw value.
#[test]
fn given_token_when_round_tripped_through_serde_then_only_deserialize_succeeds() {
    // GIVEN: A JSON string
    let token: RedactedToken =
        serde_json::from_str("\"abc123\"").expect("Token should deserialize from a string");

    // THEN: Value is intact
    assert_eq!(token.as_str(), "abc123");

    // WHEN: Serializing it
    let result = serde_json::to_string(&token);

    // THEN: Serialization is refused
    assert!(result.is_err(), "Serializing a RedactedToken must fail");
}
