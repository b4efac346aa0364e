use sh_domain::config::Config;

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
}

#[test]
fn explicit_host_and_port_parse() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 9000
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
    assert_eq!(config.server.port, 9000);
}

#[test]
fn orchestrator_defaults_match_spec_limits() {
    let config = Config::default();
    assert_eq!(config.orchestrator.max_loops, 10);
    assert_eq!(config.orchestrator.max_repeats, 2);
}

#[test]
fn sessions_defaults_match_spec_bounds() {
    let config = Config::default();
    assert_eq!(config.sessions.max_sessions, 500);
    assert_eq!(config.sessions.idle_timeout_secs, 1800);
}
