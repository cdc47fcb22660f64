use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::editor::{SessionConfig, DEFAULT_DEBOUNCE_MS};
use crate::host::HostConfig;

pub const DEFAULT_STORE_FILE: &str = "richdoc-store.json";
pub const DEFAULT_BLOB_DIR: &str = "richdoc-blobs";

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Defaults read from rc files, in the same `--flag value` form the CLI
/// takes. Unset options fall back to built-in defaults.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub debounce_ms: Option<u64>,
    pub history_limit: Option<usize>,
    pub max_heading: Option<u8>,
    pub store: Option<PathBuf>,
    pub blob_dir: Option<PathBuf>,
    pub public_url: Option<String>,
    pub theme: Option<ThemeMode>,
}

impl ConfigFlags {
    /// Merge with `other` taking precedence.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            debounce_ms: other.debounce_ms.or(self.debounce_ms),
            history_limit: other.history_limit.or(self.history_limit),
            max_heading: other.max_heading.or(self.max_heading),
            store: other.store.clone().or_else(|| self.store.clone()),
            blob_dir: other.blob_dir.clone().or_else(|| self.blob_dir.clone()),
            public_url: other.public_url.clone().or_else(|| self.public_url.clone()),
            theme: other.theme.or(self.theme),
        }
    }

    pub fn host_config(&self) -> HostConfig {
        let defaults = SessionConfig::default();
        HostConfig {
            session: SessionConfig {
                history_limit: self.history_limit.unwrap_or(defaults.history_limit),
                max_heading_level: self
                    .max_heading
                    .unwrap_or(defaults.max_heading_level)
                    .clamp(1, 6),
            },
            debounce_ms: self.debounce_ms.unwrap_or(DEFAULT_DEBOUNCE_MS),
        }
    }

    pub fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_FILE))
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.blob_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BLOB_DIR))
    }

    /// Base URL uploaded blobs are served from; the blob directory itself
    /// unless configured.
    pub fn public_url(&self) -> String {
        self.public_url
            .clone()
            .unwrap_or_else(|| format!("file://{}", self.blob_dir().display()))
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme.unwrap_or(ThemeMode::Dark)
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("richdoc").join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("richdoc")
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join("richdoc").join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join(".config")
                .join("richdoc")
                .join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(".richdocrc")
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# richdoc defaults (saved with --save)".to_string()];
    if flags.watch {
        lines.push("--watch".to_string());
    }
    if let Some(ms) = flags.debounce_ms {
        lines.push(format!("--debounce-ms {ms}"));
    }
    if let Some(limit) = flags.history_limit {
        lines.push(format!("--history-limit {limit}"));
    }
    if let Some(level) = flags.max_heading {
        lines.push(format!("--max-heading {level}"));
    }
    if let Some(store) = &flags.store {
        lines.push(format!("--store {}", store.display()));
    }
    if let Some(dir) = &flags.blob_dir {
        lines.push(format!("--blob-dir {}", dir.display()));
    }
    if let Some(url) = &flags.public_url {
        lines.push(format!("--public-url {url}"));
    }
    if let Some(theme) = flags.theme {
        lines.push(format!("--theme {}", theme.as_str()));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick known flags out of a token list. Unknown tokens and unparsable
/// values are skipped.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i].as_str();
        if token == "--watch" {
            flags.watch = true;
            i += 1;
            continue;
        }
        let (name, value, consumed) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value), 1),
            None => (token, tokens.get(i + 1).map(String::as_str), 2),
        };
        let matched = match name {
            "--debounce-ms" => {
                flags.debounce_ms = value.and_then(|v| v.parse().ok());
                true
            }
            "--history-limit" => {
                flags.history_limit = value.and_then(|v| v.parse().ok());
                true
            }
            "--max-heading" => {
                flags.max_heading = value.and_then(|v| v.parse().ok());
                true
            }
            "--store" => {
                flags.store = value.map(PathBuf::from);
                true
            }
            "--blob-dir" => {
                flags.blob_dir = value.map(PathBuf::from);
                true
            }
            "--public-url" => {
                flags.public_url = value.map(ToOwned::to_owned);
                true
            }
            "--theme" => {
                flags.theme = value.and_then(parse_theme);
                true
            }
            _ => false,
        };
        i += if matched { consumed } else { 1 };
    }
    flags
}

fn parse_theme(s: &str) -> Option<ThemeMode> {
    match s {
        "light" => Some(ThemeMode::Light),
        "dark" => Some(ThemeMode::Dark),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&tokens(&[
            "richdoc",
            "--watch",
            "--debounce-ms",
            "250",
            "--max-heading=2",
            "--store",
            "apps.json",
            "--theme",
            "light",
            "view",
            "page.html",
        ]));
        assert!(flags.watch);
        assert_eq!(flags.debounce_ms, Some(250));
        assert_eq!(flags.max_heading, Some(2));
        assert_eq!(flags.store, Some(PathBuf::from("apps.json")));
        assert_eq!(flags.theme, Some(ThemeMode::Light));
        assert_eq!(flags.history_limit, None);
    }

    #[test]
    fn test_bad_number_is_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--history-limit", "lots"]));
        assert_eq!(flags.history_limit, None);
    }

    #[test]
    fn test_config_union_prefers_later_options() {
        let file = ConfigFlags {
            watch: true,
            debounce_ms: Some(500),
            theme: Some(ThemeMode::Light),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            debounce_ms: Some(100),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert_eq!(merged.debounce_ms, Some(100));
        assert_eq!(merged.theme, Some(ThemeMode::Light));
    }

    #[test]
    fn test_host_config_defaults_and_clamps() {
        let config = ConfigFlags::default().host_config();
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(config.session.max_heading_level, 3);

        let flags = ConfigFlags {
            max_heading: Some(9),
            history_limit: Some(5),
            ..ConfigFlags::default()
        };
        let config = flags.host_config();
        assert_eq!(config.session.max_heading_level, 6);
        assert_eq!(config.session.history_limit, 5);
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".richdocrc");
        let flags = ConfigFlags {
            watch: true,
            debounce_ms: Some(750),
            history_limit: Some(20),
            max_heading: Some(2),
            store: Some(PathBuf::from("apps.json")),
            blob_dir: Some(PathBuf::from("blobs")),
            public_url: Some("https://cdn.example.com".to_string()),
            theme: Some(ThemeMode::Dark),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
    }
}
