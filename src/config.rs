//! Configuration handling for the form host

use crate::presets::{FormKind, DEFAULT_MARGIN_MINUTES, MAX_MARGIN_MINUTES};
use crate::state::SessionContext;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// User configuration for the form host
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// Form opened at startup
    pub default_form: Option<FormKind>,
    /// Margin a new pointing hour starts with
    pub default_margin_minutes: Option<i64>,
    /// Where submissions are written
    pub submissions_dir: Option<PathBuf>,
    /// Acting user
    pub user_id: Option<String>,
    pub display_name: Option<String>,
    pub organization_id: Option<String>,
}

impl AppConfig {
    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("io", "checkin", "checkin-form")
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn form(&self) -> FormKind {
        self.default_form.unwrap_or_default()
    }

    /// Margins outside `0..=MAX_MARGIN_MINUTES` are ignored
    pub fn margin_minutes(&self) -> i64 {
        match self.default_margin_minutes {
            Some(m) if (0..=MAX_MARGIN_MINUTES).contains(&m) => m,
            Some(m) => {
                tracing::warn!("ignoring configured margin of {m} minutes");
                DEFAULT_MARGIN_MINUTES
            }
            None => DEFAULT_MARGIN_MINUTES,
        }
    }

    pub fn submissions_dir(&self) -> PathBuf {
        if let Some(dir) = &self.submissions_dir {
            return dir.clone();
        }
        Self::project_dirs()
            .map(|dirs| dirs.data_dir().join("submissions"))
            .unwrap_or_else(|| PathBuf::from("submissions"))
    }

    /// The acting user, falling back to `$USER`
    pub fn session_context(&self) -> SessionContext {
        let user_id = self
            .user_id
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_default();
        SessionContext {
            display_name: self.display_name.clone().unwrap_or_else(|| user_id.clone()),
            user_id,
            organization_id: self.organization_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.form(), FormKind::PointingHour);
        assert_eq!(config.margin_minutes(), DEFAULT_MARGIN_MINUTES);
        assert!(config.organization_id.is_none());
    }

    #[test]
    fn test_deserialize_from_empty_json() {
        let parsed: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, AppConfig::default());
    }

    #[test]
    fn test_deserialize_with_extra_fields() {
        let json = r#"{"default_form": "role", "theme": "dark"}"#;
        let parsed: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.form(), FormKind::Role);
    }

    #[test]
    fn test_negative_margin_falls_back() {
        let config = AppConfig {
            default_margin_minutes: Some(-5),
            ..Default::default()
        };
        assert_eq!(config.margin_minutes(), DEFAULT_MARGIN_MINUTES);
    }

    #[test]
    fn test_margin_above_a_day_falls_back() {
        let huge = AppConfig {
            default_margin_minutes: Some(200_000_000_000),
            ..Default::default()
        };
        assert_eq!(huge.margin_minutes(), DEFAULT_MARGIN_MINUTES);

        let full_day = AppConfig {
            default_margin_minutes: Some(MAX_MARGIN_MINUTES),
            ..Default::default()
        };
        assert_eq!(full_day.margin_minutes(), MAX_MARGIN_MINUTES);
    }

    #[test]
    fn test_session_context_prefers_configured_user() {
        let config = AppConfig {
            user_id: Some("u-3".into()),
            organization_id: Some("org-2".into()),
            ..Default::default()
        };
        let ctx = config.session_context();
        assert_eq!(ctx.user_id, "u-3");
        assert_eq!(ctx.display_name, "u-3");
        assert_eq!(ctx.organization_id.as_deref(), Some("org-2"));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("checkin-form-config-{}", Uuid::new_v4()))
            .join("config.json");
        let config = AppConfig {
            default_form: Some(FormKind::OrganizationAssignment),
            default_margin_minutes: Some(30),
            submissions_dir: Some(PathBuf::from("/tmp/out")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(AppConfig::load_from(&path).unwrap(), config);
        if let Some(parent) = path.parent() {
            fs::remove_dir_all(parent).unwrap();
        }
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("missing-{}.json", Uuid::new_v4()));
        assert_eq!(AppConfig::load_from(&path).unwrap(), AppConfig::default());
    }
}
