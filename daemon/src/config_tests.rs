use super::config::*;

#[test]
fn test_default_config() {
    let config = DaemonConfig::default();
    assert_eq!(config.server.bind.port(), 8080);
    assert_eq!(config.server.route, "/send");
    assert!(config.security.key.is_none());
    assert!(config.relay.device.is_none());
    assert_eq!(config.relay.baud_rate, 9600);
    assert!(!config.monitoring.prometheus_enabled);
}

#[test]
fn test_parse_full_file() {
    let config = DaemonConfig::parse(
        r#"
[server]
bind = "127.0.0.1:9000"

[security]
key = "0123456789abcdef0123456789abcdef"
min_response_ms = 150

[relay]
device = "/dev/ttyUSB0"
baud_rate = 19200

[logging]
path = "/var/log/smsgate"

[monitoring]
prometheus_enabled = true
"#,
    )
    .unwrap();

    assert_eq!(config.server.bind.port(), 9000);
    assert_eq!(config.server.route, "/send");
    assert_eq!(config.security.key_bytes().map(<[u8]>::len), Some(32));
    assert_eq!(config.security.min_response_ms, 150);
    assert_eq!(config.relay.device.as_deref(), Some("/dev/ttyUSB0"));
    assert_eq!(config.relay.baud_rate, 19200);
    assert_eq!(config.relay.write_timeout_ms, 1000);
    assert!(config.logging.path.is_some());
    assert!(config.monitoring.prometheus_enabled);
}

#[test]
fn test_empty_file_is_default() {
    let config = DaemonConfig::parse("").unwrap();
    assert_eq!(config.server.bind, DaemonConfig::default().server.bind);
}

#[test]
fn test_empty_key_is_insecure() {
    let config = DaemonConfig::parse("[security]\nkey = \"\"\n").unwrap();
    assert!(config.security.key_bytes().is_none());
}

#[test]
fn test_debug_redacts_key() {
    let mut config = DaemonConfig::default();
    config.security.key = Some("supersecretsupersecretsupersecre".to_string());
    let printed = format!("{:?}", config);
    assert!(!printed.contains("supersecret"));
}

#[test]
fn test_merge_scalars() {
    let mut config = DaemonConfig::default();
    let mut other = DaemonConfig::default();
    other.server.bind = "127.0.0.1:1234".parse().unwrap();
    other.relay.baud_rate = 115200;

    config.merge(other);

    assert_eq!(config.server.bind.port(), 1234);
    assert_eq!(config.relay.baud_rate, 115200);
    assert_eq!(config.server.route, "/send");
}

#[test]
fn test_merge_keeps_values_on_default() {
    let mut config = DaemonConfig::default();
    config.server.bind = "127.0.0.1:1234".parse().unwrap();
    config.security.key = Some("k".repeat(16));

    config.merge(DaemonConfig::default());

    assert_eq!(config.server.bind.port(), 1234);
    assert_eq!(config.security.key.as_deref(), Some("kkkkkkkkkkkkkkkk"));
}

#[test]
fn test_merge_options() {
    let mut config = DaemonConfig::default();
    let mut other = DaemonConfig::default();
    other.relay.device = Some("/dev/ttyACM0".to_string());
    other.security.key = Some("k".repeat(32));

    config.merge(other);
    assert_eq!(config.relay.device.as_deref(), Some("/dev/ttyACM0"));
    assert_eq!(config.security.key_bytes().map(<[u8]>::len), Some(32));
}
