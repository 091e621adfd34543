use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use ripshelf_config::{Config, ConfigError};
use ripshelf_domain::DriveId;

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_from_home_only() {
    let config = Config::from_lookup(lookup(&[("HOME", "/Users/pat")])).unwrap();
    assert_eq!(config.workspace_root, PathBuf::from("/Users/pat/DVDWorkspace"));
    assert_eq!(config.poll_interval, Duration::from_secs(15));
    assert_eq!(config.auto_approve_threshold, 0.85);
    assert_eq!(config.bind, "127.0.0.1:7979");
    assert!(config.drives.is_empty());
    assert!(config.movies_root.is_none());
    assert!(config.tmdb_token.is_none());
    assert!(!config.notifications_enabled());
}

#[test]
fn explicit_workspace_skips_home() {
    let config = Config::from_lookup(lookup(&[("RIPSHELF_WORKSPACE", "/srv/rips")])).unwrap();
    assert_eq!(config.workspace_root, PathBuf::from("/srv/rips"));
    assert_eq!(config.staging_dir(), PathBuf::from("/srv/rips/staging"));
    assert_eq!(config.encoding_dir(), PathBuf::from("/srv/rips/encoding"));
    assert_eq!(config.store_path(), PathBuf::from("/srv/rips/data/ripshelf.redb"));
}

#[test]
fn missing_home_and_workspace_is_an_error() {
    let err = Config::from_lookup(lookup(&[])).unwrap_err();
    assert!(matches!(err, ConfigError::MissingVar(ref v) if v == "HOME"));
}

#[test]
fn drives_parse_comma_separated() {
    let config = Config::from_lookup(lookup(&[
        ("HOME", "/h"),
        ("RIPSHELF_DRIVES", "0, 1 ,2,"),
    ]))
    .unwrap();
    assert_eq!(
        config.drives,
        vec![DriveId::new("0"), DriveId::new("1"), DriveId::new("2")]
    );
}

#[test]
fn empty_values_are_unset() {
    let config = Config::from_lookup(lookup(&[
        ("HOME", "/h"),
        ("RIPSHELF_TMDB_TOKEN", "  "),
        ("RIPSHELF_PUSHOVER_USER", ""),
    ]))
    .unwrap();
    assert!(config.tmdb_token.is_none());
    assert!(config.pushover_user.is_none());
}

#[test]
fn bad_poll_interval_rejected() {
    for bad in ["abc", "0", "-5"] {
        let err = Config::from_lookup(lookup(&[
            ("HOME", "/h"),
            ("RIPSHELF_POLL_INTERVAL_SECS", bad),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref var, .. }
            if var == "RIPSHELF_POLL_INTERVAL_SECS"));
    }
}

#[test]
fn threshold_must_be_a_proportion() {
    let err = Config::from_lookup(lookup(&[
        ("HOME", "/h"),
        ("RIPSHELF_AUTO_APPROVE_THRESHOLD", "1.5"),
    ]))
    .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));

    let config = Config::from_lookup(lookup(&[
        ("HOME", "/h"),
        ("RIPSHELF_AUTO_APPROVE_THRESHOLD", "0.6"),
    ]))
    .unwrap();
    assert_eq!(config.auto_approve_threshold, 0.6);
}

#[test]
fn serving_requires_movies_root_and_drives() {
    let base = [("HOME", "/h")];
    let config = Config::from_lookup(lookup(&base)).unwrap();
    assert!(config.validate_for_serving().is_err());

    let with_root = [("HOME", "/h"), ("RIPSHELF_MOVIES_ROOT", "/Volumes/Movies")];
    let config = Config::from_lookup(lookup(&with_root)).unwrap();
    assert!(config.validate_for_serving().is_err());

    let full = [
        ("HOME", "/h"),
        ("RIPSHELF_MOVIES_ROOT", "/Volumes/Movies"),
        ("RIPSHELF_DRIVES", "0"),
    ];
    let config = Config::from_lookup(lookup(&full)).unwrap();
    assert!(config.validate_for_serving().is_ok());
}

#[test]
fn notifications_need_both_keys() {
    let one = [("HOME", "/h"), ("RIPSHELF_PUSHOVER_USER", "u-key")];
    assert!(!Config::from_lookup(lookup(&one)).unwrap().notifications_enabled());

    let both = [
        ("HOME", "/h"),
        ("RIPSHELF_PUSHOVER_USER", "u-key"),
        ("RIPSHELF_PUSHOVER_TOKEN", "a-token"),
    ];
    assert!(Config::from_lookup(lookup(&both)).unwrap().notifications_enabled());
}
