use anyhow::{Context, Result};
use extrato_core::ExtratoError;
use extrato_finance::ExportOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::{ensure_extrato_home, extrato_home};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub list: ListSection,
    pub export: ExportSection,
    pub ocr: OcrSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListSection {
    pub authority_host: String,
    pub graph_base: String,
    pub scope: String,
    pub site_id: Option<String>,
    pub list_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ExportSection {
    pub total_row: bool,
    pub styled_table: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrSection {
    /// Tesseract language code(s), e.g. "por" or "por+eng"
    pub language: String,
    pub dpi: u32,
}

impl Default for ListSection {
    fn default() -> Self {
        Self {
            authority_host: "https://login.microsoftonline.com".to_string(),
            graph_base: "https://graph.microsoft.com/v1.0".to_string(),
            scope: "https://graph.microsoft.com/.default".to_string(),
            site_id: None,
            list_id: None,
        }
    }
}

impl Default for OcrSection {
    fn default() -> Self {
        Self {
            language: "por".to_string(),
            dpi: 300,
        }
    }
}

impl ExportSection {
    /// Config defaults, switched on by command-line flags.
    pub fn options(&self, total_flag: bool, styled_flag: bool) -> ExportOptions {
        ExportOptions {
            total_row: self.total_row || total_flag,
            styled_table: self.styled_table || styled_flag,
        }
    }
}

/// Where list items go: `site_id`/`list_id` from flags, else from config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListTarget {
    pub site_id: String,
    pub list_id: String,
}

impl ListSection {
    pub fn target(&self, site_flag: Option<String>, list_flag: Option<String>) -> Result<ListTarget> {
        let site_id = site_flag
            .or_else(|| self.site_id.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExtratoError::MissingConfig("list.site_id (or --site-id)".into()))?;
        let list_id = list_flag
            .or_else(|| self.list_id.clone())
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ExtratoError::MissingConfig("list.list_id (or --list-id)".into()))?;
        Ok(ListTarget { site_id, list_id })
    }
}

/// OAuth identifiers read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    pub client_id: String,
    pub tenant_id: String,
    pub client_secret: Option<String>,
}

pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";

impl Secrets {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());
        Ok(Self {
            client_id: get(CLIENT_ID_VAR).ok_or_else(|| ExtratoError::MissingConfig(CLIENT_ID_VAR.into()))?,
            tenant_id: get(TENANT_ID_VAR).ok_or_else(|| ExtratoError::MissingConfig(TENANT_ID_VAR.into()))?,
            client_secret: get(CLIENT_SECRET_VAR),
        })
    }

    pub fn require_secret(&self) -> Result<&str> {
        self.client_secret
            .as_deref()
            .ok_or_else(|| ExtratoError::MissingConfig(CLIENT_SECRET_VAR.into()).into())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(extrato_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config(cfg: &Config) -> Result<PathBuf> {
    let p = ensure_extrato_home()?.join("config.toml");
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(p)
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    let p = save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    println!("Set list.site_id and list.list_id before uploading.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
[list]
site_id = "contoso.sharepoint.com,1,2"
list_id = "abc"

[export]
total_row = true
"#,
        )
        .unwrap();
        assert_eq!(cfg.list.graph_base, "https://graph.microsoft.com/v1.0");
        assert_eq!(cfg.list.list_id.as_deref(), Some("abc"));
        assert!(cfg.export.total_row);
        assert!(!cfg.export.styled_table);
        assert_eq!(cfg.ocr.language, "por");
    }

    #[test]
    fn test_missing_file_is_default() {
        let cfg = load_config_from(Path::new("/nonexistent/extrato/config.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let cfg = Config::default();
        let s = toml::to_string_pretty(&cfg).unwrap();
        let back: Config = toml::from_str(&s).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_target_prefers_flags() {
        let mut list = ListSection::default();
        list.site_id = Some("cfg-site".into());
        list.list_id = Some("cfg-list".into());

        let t = list.target(Some("flag-site".into()), None).unwrap();
        assert_eq!(t.site_id, "flag-site");
        assert_eq!(t.list_id, "cfg-list");

        let err = ListSection::default().target(None, None).unwrap_err();
        assert!(err.to_string().contains("site_id"));
    }

    #[test]
    fn test_secrets_lookup() {
        let env: HashMap<&str, &str> = [(CLIENT_ID_VAR, "cid"), (TENANT_ID_VAR, "tid")].into();
        let s = Secrets::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(s.client_id, "cid");
        assert!(s.require_secret().is_err());

        let err = Secrets::from_lookup(|_| None).unwrap_err();
        assert!(err.to_string().contains(CLIENT_ID_VAR));
    }

    #[test]
    fn test_export_flags_switch_on() {
        let opts = ExportSection::default().options(true, false);
        assert!(opts.total_row);
        assert!(!opts.styled_table);
    }
}
