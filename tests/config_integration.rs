use std::path::PathBuf;

use richdoc::config::{load_config_flags, parse_flag_tokens, save_config_flags, ThemeMode};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".richdocrc");
    let content = r#"
# comment
--watch

--theme light

--store=records.json
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.watch);
    assert_eq!(flags.theme, Some(ThemeMode::Light));
    assert_eq!(flags.store, Some(PathBuf::from("records.json")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".richdocrc");
    let content = "--watch\n--theme light\n--debounce-ms 500\n--blob-dir img\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "richdoc".to_string(),
        "edit".to_string(),
        "app-1".to_string(),
        "--theme".to_string(),
        "dark".to_string(),
        "--debounce-ms".to_string(),
        "2000".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.watch, "file flags should remain enabled");
    assert_eq!(effective.theme, Some(ThemeMode::Dark), "cli should override theme");
    assert_eq!(effective.host_config().debounce_ms, 2000);
    assert_eq!(
        effective.blob_dir(),
        PathBuf::from("img"),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_parse_flag_tokens_handles_equals_syntax() {
    let args = vec![
        "richdoc".to_string(),
        "--theme=dark".to_string(),
        "--public-url=https://cdn.example.com/".to_string(),
        "--max-heading=2".to_string(),
    ];
    let flags = parse_flag_tokens(&args);
    assert_eq!(flags.theme, Some(ThemeMode::Dark));
    assert_eq!(flags.public_url.as_deref(), Some("https://cdn.example.com/"));
    assert_eq!(flags.host_config().session.max_heading_level, 2);
}

#[test]
fn test_saved_flags_load_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config");
    let flags = parse_flag_tokens(&[
        "--history-limit".to_string(),
        "25".to_string(),
        "--theme".to_string(),
        "light".to_string(),
    ]);
    save_config_flags(&path, &flags).unwrap();

    let loaded = load_config_flags(&path).unwrap();
    assert_eq!(loaded, flags);
    assert_eq!(loaded.host_config().session.history_limit, 25);
}

#[test]
fn test_missing_config_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let flags = load_config_flags(&dir.path().join("absent")).unwrap();
    assert_eq!(flags, Default::default());
    assert_eq!(flags.host_config().session.max_heading_level, 3);
}
