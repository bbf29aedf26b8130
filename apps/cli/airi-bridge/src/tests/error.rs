use crate::error::CliError;

use bridge_core::error::{ConfigError, ConnectionError};

/// **VALUE**: Verifies library errors keep their message and gain a CLI location.
///
/// **WHY THIS MATTERS**: The CLI prints these to the user. The inner message says what
/// went wrong; dropping it leaves only "Config Error" with no hint.
///
/// **BUG THIS CATCHES**: Would catch a `From` impl that discards the source message.
#[test]
fn given_library_errors_when_converted_then_message_preserved() {
    let config: CliError = ConfigError::validation("heartbeatInterval must be greater than 0").into();
    let bridge: CliError = ConnectionError::stopped().into();
    let io: CliError = std::io::Error::other("disk gone").into();

    let config = config.to_string();
    assert!(config.starts_with("Config Error: "), "{config}");
    assert!(config.contains("heartbeatInterval"));
    assert!(config.contains("tests"), "Location should point at the caller: {config}");

    assert!(bridge.to_string().starts_with("Bridge Error: "));
    assert!(matches!(io, CliError::Io { ref message, .. } if message == "disk gone"));
}
