use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::email_screening::DisposableDomainRules;

const DEFAULT_REPO_RULES_RELATIVE_DIR: &str = "data/rules";
pub const DISPOSABLE_DOMAINS_FILE_NAME: &str = "disposable_domains.csv";

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn resolve_repo_rules_dir() -> PathBuf {
    repo_root().join(DEFAULT_REPO_RULES_RELATIVE_DIR)
}

pub fn default_disposable_domains_path() -> PathBuf {
    resolve_repo_rules_dir().join(DISPOSABLE_DOMAINS_FILE_NAME)
}

fn boolish_text(s: &str) -> bool {
    matches!(
        s.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

struct DomainRows {
    active: Vec<String>,
    listed: usize,
}

fn read_domain_rows(path: &Path) -> Result<DomainRows, csv::Error> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = DomainRows {
        active: Vec::new(),
        listed: 0,
    };
    for (idx, row) in rdr.deserialize::<HashMap<String, String>>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                log::warn!(
                    "skipping malformed rule row {} in {}: {err}",
                    idx + 2,
                    path.to_string_lossy()
                );
                continue;
            }
        };
        let domain = row
            .get("domain")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if domain.is_empty() {
            continue;
        }
        rows.listed += 1;
        let active = row
            .get("is_active")
            .map(|s| boolish_text(s))
            .unwrap_or(true);
        if active {
            rows.active.push(domain);
        }
    }
    Ok(rows)
}

/// Reads `domain,is_active,note` rows exactly as listed; an unreadable file is
/// an error and deactivating every row leaves an empty rule set.
pub fn read_disposable_domain_rules(path: &Path) -> Result<DisposableDomainRules, csv::Error> {
    let rows = read_domain_rows(path)?;
    log::debug!(
        "loaded {} of {} disposable domains from {}",
        rows.active.len(),
        rows.listed,
        path.to_string_lossy()
    );
    Ok(DisposableDomainRules::from_domains(rows.active))
}

/// Lenient variant for the shipped rules file: a missing or unreadable file,
/// or one listing no domains at all, falls back to the built-in list.
pub fn load_disposable_domain_rules(path: &Path) -> DisposableDomainRules {
    match read_domain_rows(path) {
        Ok(rows) if rows.listed > 0 => {
            log::debug!(
                "loaded {} of {} disposable domains",
                rows.active.len(),
                rows.listed
            );
            DisposableDomainRules::from_domains(rows.active)
        }
        Ok(_) => {
            log::info!(
                "no domains listed in {}, using built-in disposable domain list",
                path.to_string_lossy()
            );
            DisposableDomainRules::default()
        }
        Err(err) => {
            log::warn!(
                "disposable domain rules unavailable ({}): {err}",
                path.to_string_lossy()
            );
            DisposableDomainRules::default()
        }
    }
}
