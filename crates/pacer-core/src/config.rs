// SPDX-License-Identifier: CEPL-1.0
//! `pacer.toml` loading.
//!
//! Every field has a default, so an empty or missing file yields a working
//! configuration. A file that exists but does not parse is an error: startup
//! should not silently run with settings the user did not ask for.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{fs, io};
use tracing::info;

pub const DEFAULT_CONFIG_PATH: &str = "pacer.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowCfg,
    #[serde(default)]
    pub render: RenderCfg,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WindowCfg {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
}

impl Default for WindowCfg {
    fn default() -> Self {
        WindowCfg {
            title: "pacer".to_string(),
            width: 800,
            height: 600,
            resizable: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RenderCfg {
    pub clear_color: [f32; 4],
    pub present_mode: PresentModeCfg,
    pub surface_format: SurfaceFormatCfg,
    /// `None` means "follow the build mode".
    pub validation: Option<bool>,
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
}

impl Default for RenderCfg {
    fn default() -> Self {
        RenderCfg {
            clear_color: default_clear(),
            present_mode: PresentModeCfg::default(),
            surface_format: SurfaceFormatCfg::default(),
            validation: None,
            vertex_shader: None,
            fragment_shader: None,
        }
    }
}

impl RenderCfg {
    pub fn validation_enabled(&self) -> bool {
        self.validation.unwrap_or(cfg!(debug_assertions))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeCfg {
    Fifo,
    #[default]
    Mailbox,
    Immediate,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceFormatCfg {
    #[default]
    Bgra8Srgb,
    Bgra8Unorm,
    Rgba8Srgb,
}

fn default_clear() -> [f32; 4] {
    [0.02, 0.02, 0.04, 1.0]
}

pub fn parse_config(src: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    toml::from_str::<AppConfig>(src).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(s) => parse_config(&s, path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!("{} not found, using defaults", path.display());
            Ok(AppConfig::default())
        }
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = parse_config("", Path::new("pacer.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.window.width, 800);
        assert_eq!(cfg.render.present_mode, PresentModeCfg::Mailbox);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let src = r#"
[window]
title = "demo"

[render]
present_mode = "fifo"
clear_color = [1.0, 0.0, 0.0, 1.0]
validation = false
"#;
        let cfg = parse_config(src, Path::new("pacer.toml")).unwrap();
        assert_eq!(cfg.window.title, "demo");
        assert_eq!(cfg.window.height, 600);
        assert!(cfg.window.resizable);
        assert_eq!(cfg.render.present_mode, PresentModeCfg::Fifo);
        assert_eq!(cfg.render.surface_format, SurfaceFormatCfg::Bgra8Srgb);
        assert_eq!(cfg.render.clear_color, [1.0, 0.0, 0.0, 1.0]);
        assert!(!cfg.render.validation_enabled());
    }

    #[test]
    fn validation_follows_build_mode_when_unset() {
        let cfg = RenderCfg::default();
        assert_eq!(cfg.validation_enabled(), cfg!(debug_assertions));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let err = parse_config("[render]\nvsync = true\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("x.toml"));
    }

    #[test]
    fn bad_enum_value_is_a_parse_error() {
        let err = parse_config("[render]\npresent_mode = \"turbo\"\n", Path::new("x.toml"));
        assert!(err.is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\nsurface_format = \"rgba8_srgb\"").unwrap();
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.render.surface_format, SurfaceFormatCfg::Rgba8Srgb);
    }
}
