use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::email_screening::DisposableDomainRules;
use crate::error::SettingsError;
use crate::order_aggregates::DEFAULT_TOP_PRODUCTS;
use crate::rules_store::{
    default_disposable_domains_path, load_disposable_domain_rules, read_disposable_domain_rules,
};

pub const SETTINGS_ENV_VAR: &str = "STOREFRONT_DASHBOARD_SETTINGS";

fn default_top_products_limit() -> usize {
    DEFAULT_TOP_PRODUCTS
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardSettings {
    #[serde(default = "default_top_products_limit")]
    pub top_products_limit: usize,
    /// Inline list; wins over `disposable_domains_file` when present.
    pub disposable_domains: Option<Vec<String>>,
    pub disposable_domains_file: Option<PathBuf>,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_products_limit: DEFAULT_TOP_PRODUCTS,
            disposable_domains: None,
            disposable_domains_file: None,
        }
    }
}

impl DashboardSettings {
    pub fn from_json_str(raw: &str, origin: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(raw).map_err(|source| SettingsError::Parse {
            path: origin.to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SettingsError> {
        let origin = path.to_string_lossy().to_string();
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: origin.clone(),
            source,
        })?;
        Self::from_json_str(&raw, &origin)
    }

    /// Reads the file named by `STOREFRONT_DASHBOARD_SETTINGS`, or defaults.
    pub fn from_env() -> Result<Self, SettingsError> {
        match std::env::var(SETTINGS_ENV_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::from_json_file(Path::new(path.trim())),
            _ => Ok(Self::default()),
        }
    }

    /// A configured rules file must be readable; only the shipped default
    /// may fall back to the built-in list.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.top_products_limit == 0 {
            return Err(SettingsError::InvalidTopProductsLimit);
        }
        self.disposable_domain_rules()?;
        Ok(())
    }

    pub fn disposable_domain_rules(&self) -> Result<DisposableDomainRules, SettingsError> {
        if let Some(domains) = &self.disposable_domains {
            return Ok(DisposableDomainRules::from_domains(
                domains.iter().map(|d| d.trim().to_string()),
            ));
        }
        match &self.disposable_domains_file {
            Some(path) => read_disposable_domain_rules(path).map_err(|source| SettingsError::Rules {
                path: path.to_string_lossy().to_string(),
                source,
            }),
            None => Ok(load_disposable_domain_rules(&default_disposable_domains_path())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let settings = DashboardSettings::from_json_str("{}", "inline").expect("parse");
        assert_eq!(settings, DashboardSettings::default());
        assert_eq!(settings.top_products_limit, 10);
        assert_eq!(
            settings.disposable_domain_rules().expect("rules"),
            DisposableDomainRules::default()
        );
    }

    #[test]
    fn inline_domains_override_the_rules_file() {
        let settings = DashboardSettings::from_json_str(
            r#"{"top_products_limit": 5, "disposable_domains": ["burner.io"]}"#,
            "inline",
        )
        .expect("parse");
        assert_eq!(settings.top_products_limit, 5);
        assert_eq!(
            settings.disposable_domain_rules().expect("rules").domains(),
            vec!["burner.io"]
        );
    }

    #[test]
    fn zero_limit_and_unknown_keys_are_rejected() {
        assert!(matches!(
            DashboardSettings::from_json_str(r#"{"top_products_limit": 0}"#, "inline"),
            Err(SettingsError::InvalidTopProductsLimit)
        ));
        assert!(matches!(
            DashboardSettings::from_json_str(r#"{"top_n": 3}"#, "inline"),
            Err(SettingsError::Parse { .. })
        ));
    }

    #[test]
    fn configured_rules_file_must_exist() {
        let err = DashboardSettings::from_json_str(
            r#"{"disposable_domains_file": "/nonexistent/typo.csv"}"#,
            "inline",
        )
        .expect_err("missing rules file");
        assert!(matches!(
            err,
            SettingsError::Rules { ref path, .. } if path == "/nonexistent/typo.csv"
        ));

        let settings = DashboardSettings {
            disposable_domains_file: Some(PathBuf::from("/nonexistent/typo.csv")),
            ..Default::default()
        };
        assert!(settings.disposable_domain_rules().is_err());
    }

    #[test]
    fn configured_rules_file_is_used_as_listed() {
        let path = std::env::temp_dir().join(format!(
            "storefront_settings_rules_{}_{}.csv",
            std::process::id(),
            uuid::Uuid::new_v4()
        ));
        fs::write(&path, "domain,is_active,note\nburner.io,1,\nmailinator.com,0,\n")
            .expect("write rules");
        let settings = DashboardSettings {
            disposable_domains_file: Some(path.clone()),
            ..Default::default()
        };
        settings.validate().expect("readable rules file");
        let rules = settings.disposable_domain_rules().expect("rules");
        assert_eq!(rules.domains(), vec!["burner.io"]);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = DashboardSettings::from_json_file(Path::new("/nonexistent/settings.json"))
            .expect_err("missing file");
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
