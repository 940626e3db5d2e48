//! Controller configuration stored in `config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::types::Deltas;

pub const APP_DIR: &str = "xrandrctl";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const STATE_FILE_NAME: &str = "outputs.json";

/// Controller configuration (TOML).
///
/// Every field is optional in the file; missing fields take the defaults
/// below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlConfig {
    /// Program plus any leading arguments used to apply levels.
    pub program: Vec<String>,

    /// Kill the display tool after this many seconds.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of the tool's stdout/stderr.
    pub output_limit_bytes: usize,

    /// State document location; overridden by `--state`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_path: Option<PathBuf>,

    /// Step sizes for entries that do not set their own.
    pub defaults: Deltas,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            program: vec!["xrandr".to_string()],
            timeout_secs: 5,
            output_limit_bytes: 64 * 1024,
            state_path: None,
            defaults: Deltas::default(),
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<()> {
        if self.program.is_empty() || self.program[0].trim().is_empty() {
            return Err(anyhow!("program must be a non-empty array"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        let defaults = &self.defaults;
        if !defaults.brightness_delta.is_finite() || defaults.gamma_delta.iter().any(|d| !d.is_finite())
        {
            return Err(anyhow!("defaults must be finite numbers"));
        }
        Ok(())
    }

    /// Resolve the state document path: explicit override, then config, then
    /// the per-user config directory.
    pub fn resolve_state_path(&self, explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        if let Some(path) = &self.state_path {
            return Ok(path.clone());
        }
        default_app_dir().map(|dir| dir.join(STATE_FILE_NAME))
    }
}

/// `$XDG_CONFIG_HOME/xrandrctl` (or the platform equivalent).
pub fn default_app_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| anyhow!("cannot determine user config directory"))
}

pub fn default_config_path() -> Result<PathBuf> {
    default_app_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `ControlConfig::default()`.
pub fn load_config(path: &Path) -> Result<ControlConfig> {
    if !path.exists() {
        let cfg = ControlConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: ControlConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("validate {}", path.display()))?;
    Ok(cfg)
}

/// Load the config named on the command line, else the per-user one.
///
/// With neither (no `--config` and no user config directory) the defaults
/// apply; `--state` can still point at a document.
pub fn load_effective_config(
    explicit: Option<&Path>,
    user_default: Option<PathBuf>,
) -> Result<ControlConfig> {
    match (explicit, user_default) {
        (Some(path), _) => load_config(path),
        (None, Some(path)) => load_config(&path),
        (None, None) => {
            debug!("no user config directory, using defaults");
            let cfg = ControlConfig::default();
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, ControlConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            "timeout_secs = 2\n\n[defaults]\nbrightness_delta = 0.05\n",
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.timeout_secs, 2);
        assert_eq!(cfg.program, vec!["xrandr".to_string()]);
        assert_eq!(cfg.defaults.brightness_delta, 0.05);
        assert_eq!(cfg.defaults.gamma_delta, Deltas::default().gamma_delta);
    }

    #[test]
    fn serialized_default_loads_back() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        let cfg = ControlConfig::default();
        fs::write(&path, toml::to_string_pretty(&cfg).expect("serialize")).expect("write");
        assert_eq!(load_config(&path).expect("load"), cfg);
    }

    #[test]
    fn rejects_empty_program_and_zero_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("config.toml");
        fs::write(&path, "program = []\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("program must be a non-empty array"));

        fs::write(&path, "timeout_secs = 0\n").expect("write");
        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("timeout_secs must be > 0"));
    }

    #[test]
    fn state_path_prefers_explicit_then_config() {
        let cfg = ControlConfig {
            state_path: Some(PathBuf::from("/etc/xrandrctl/outputs.json")),
            ..ControlConfig::default()
        };
        let explicit = Path::new("/tmp/other.json");
        assert_eq!(
            cfg.resolve_state_path(Some(explicit)).expect("resolve"),
            explicit
        );
        assert_eq!(
            cfg.resolve_state_path(None).expect("resolve"),
            PathBuf::from("/etc/xrandrctl/outputs.json")
        );
    }

    #[test]
    fn missing_user_config_dir_falls_back_to_defaults() {
        let cfg = load_effective_config(None, None).expect("load");
        assert_eq!(cfg, ControlConfig::default());
        let explicit = Path::new("/tmp/outputs.json");
        assert_eq!(
            cfg.resolve_state_path(Some(explicit)).expect("resolve"),
            explicit
        );
    }

    #[test]
    fn explicit_config_wins_over_user_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let explicit = temp.path().join("explicit.toml");
        let user = temp.path().join("user.toml");
        fs::write(&explicit, "timeout_secs = 2\n").expect("write");
        fs::write(&user, "timeout_secs = 9\n").expect("write");

        let cfg = load_effective_config(Some(&explicit), Some(user.clone())).expect("load");
        assert_eq!(cfg.timeout_secs, 2);
        let cfg = load_effective_config(None, Some(user)).expect("load");
        assert_eq!(cfg.timeout_secs, 9);
    }
}
