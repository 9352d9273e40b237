#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::MgitError;
use crate::output::style::ColorMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub color: ColorMode,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry JSON location; empty means the well-known default next to
    /// the config file.
    pub file: String,
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
    pub registry_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let dir = config_dir()?;
    Ok(ConfigPaths {
        config_file: dir.join("config.toml"),
        registry_file: dir.join("registry.json"),
    })
}

fn config_dir() -> anyhow::Result<PathBuf> {
    let unix = home_dir()
        .unwrap_or_else(|| PathBuf::from("~"))
        .join(".config")
        .join("mgit");
    if !cfg!(windows) || unix.exists() {
        // Prefer the Unix-style path (always on Unix, and on Windows when it
        // already exists, for portability of synced dotfiles).
        return Ok(unix);
    }
    let proj = ProjectDirs::from("com", "mgit", "mgit")
        .context("failed to determine platform config directory")?;
    Ok(proj.config_dir().to_path_buf())
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

/// Where the registry lives: the `registry.file` override when set, else the
/// default location.
pub fn registry_file(cfg: &Config, paths: &ConfigPaths) -> anyhow::Result<PathBuf> {
    let configured = cfg.registry.file.trim();
    if configured.is_empty() {
        return Ok(paths.registry_file.clone());
    }
    expand_path(configured)
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

/// Replaces a leading home-directory prefix with `~` for display.
#[must_use]
pub fn tilde_path(input: &str) -> String {
    let Some(home) = home_dir() else {
        return input.to_owned();
    };
    let home_str = home.to_string_lossy();
    if let Some(rest) = input.strip_prefix(home_str.as_ref()) {
        if rest.is_empty() {
            return "~".to_owned();
        }
        if rest.starts_with(std::path::MAIN_SEPARATOR) {
            return format!("~{rest}");
        }
    }
    input.to_owned()
}

/// Tilde- and env-expands `input` and makes it absolute against the cwd.
pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    expand_env_vars_with(input, |key| std::env::var(key).ok())
}

fn expand_env_vars_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    // Expand $VAR and ${VAR}. Leave unknown vars untouched.
    let re = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?")
        .unwrap_or_else(|_| regex::Regex::new("$^").unwrap());
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        lookup(key).unwrap_or_else(|| caps[0].to_owned())
    })
    .to_string()
}

pub fn load() -> anyhow::Result<(Config, ConfigPaths)> {
    let paths = default_paths()?;
    let cfg = load_from_file(&paths.config_file)?;
    cfg.validate()?;
    Ok((cfg, paths))
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok(cfg)
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let cfg = load_from_file(path)?;
    cfg.validate()?;
    let value = lookup_value(&cfg, key);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let cfg = load_from_file(path)?;
    cfg.validate()?;

    let mut doc = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?
            .parse::<toml_edit::DocumentMut>()
            .with_context(|| format!("failed to parse TOML in {}", path.display()))?
    } else {
        toml_edit::DocumentMut::new()
    };

    let item = parse_value(key, value, &cfg)?;
    apply_set(&mut doc, key, item)?;

    // Validate by re-parsing the updated doc into a Config.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), MgitError> {
        if !self.registry.file.is_empty() && self.registry.file.trim().is_empty() {
            return Err(MgitError::Config(
                "registry.file must not be blank".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    String,
    Enum(&'static [&'static str]),
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "registry.file" => KeyType::String,
        "ui.color" => KeyType::Enum(&["auto", "always", "never"]),
        _ => return None,
    })
}

fn parse_value(key: &str, value: &str, _cfg: &Config) -> anyhow::Result<toml_edit::Item> {
    let key_type = key_type(key).ok_or_else(|| MgitError::InvalidConfigKey(key.to_owned()))?;
    let item = match key_type {
        KeyType::String => toml_edit::value(value),
        KeyType::Enum(allowed) => {
            let v = value.trim();
            if !allowed.contains(&v) {
                return Err(MgitError::InvalidConfigValue {
                    key: key.to_owned(),
                    msg: format!("must be one of: {}", allowed.join(", ")),
                }
                .into());
            }
            toml_edit::value(v)
        }
    };
    Ok(item)
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    if parts.is_empty() {
        return Err(MgitError::InvalidConfigKey(key.to_owned()).into());
    }

    let mut cur = doc.as_table_mut();
    for seg in &parts[..parts.len().saturating_sub(1)] {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[seg].as_table_mut().ok_or_else(|| {
            MgitError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    let leaf = parts[parts.len() - 1];
    cur.insert(leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}
