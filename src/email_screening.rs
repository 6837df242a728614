//! Lightweight email screening: flags orders whose customer email uses a
//! known throwaway domain or carries a `+` alias. Not a fraud model; it only
//! looks at those two surface patterns.

use serde::Serialize;
use std::collections::HashSet;

use crate::order_record::OrderRecord;

pub const DEFAULT_DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "temp-mail.org",
    "10minutemail.com",
    "guerrillamail.com",
];

/// Single label shared by both rules; see [`EmailRuleHits`] for which one fired.
pub const SUSPICIOUS_EMAIL_REASON: &str = "Disposable Domain or Email Alias";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisposableDomainRules {
    domains: HashSet<String>,
}

impl Default for DisposableDomainRules {
    fn default() -> Self {
        Self::from_domains(DEFAULT_DISPOSABLE_DOMAINS.iter().copied())
    }
}

impl DisposableDomainRules {
    /// Domains are kept exactly as given; matching is case-sensitive.
    pub fn from_domains<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(Into::into)
                .filter(|d: &String| !d.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.domains.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.domains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domains.is_empty()
    }

    /// Sorted, for stable payloads.
    pub fn domains(&self) -> Vec<&str> {
        let mut out = self.domains.iter().map(String::as_str).collect::<Vec<_>>();
        out.sort_unstable();
        out
    }
}

/// Local part and domain split at the last `@`. No `@` means no domain.
fn split_email(email: &str) -> (&str, Option<&str>) {
    match email.rsplit_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (email, None),
    }
}

pub fn is_disposable_domain(email: &str, rules: &DisposableDomainRules) -> bool {
    split_email(email)
        .1
        .map(|domain| rules.contains(domain))
        .unwrap_or(false)
}

pub fn has_alias_marker(email: &str) -> bool {
    split_email(email).0.contains('+')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmailRuleHits {
    pub disposable_domain: bool,
    pub alias_marker: bool,
}

impl EmailRuleHits {
    pub fn evaluate(email: &str, rules: &DisposableDomainRules) -> Self {
        Self {
            disposable_domain: is_disposable_domain(email, rules),
            alias_marker: has_alias_marker(email),
        }
    }

    pub fn any(&self) -> bool {
        self.disposable_domain || self.alias_marker
    }
}

/// A flagged order. The record is borrowed, never annotated in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuspiciousOrder<'a> {
    pub record: &'a OrderRecord,
    pub fraud_reason: &'static str,
    pub hits: EmailRuleHits,
}

/// Flagged orders in input order.
pub fn find_suspicious_emails<'a, I>(orders: I, rules: &DisposableDomainRules) -> Vec<SuspiciousOrder<'a>>
where
    I: IntoIterator<Item = &'a OrderRecord>,
{
    let flagged = orders
        .into_iter()
        .filter_map(|record| {
            let hits = EmailRuleHits::evaluate(&record.customer_email, rules);
            hits.any().then_some(SuspiciousOrder {
                record,
                fraud_reason: SUSPICIOUS_EMAIL_REASON,
                hits,
            })
        })
        .collect::<Vec<_>>();
    log::debug!("email screening flagged {} orders", flagged.len());
    flagged
}

pub fn suspicious_summary_message(count: usize) -> String {
    format!("Found {count} orders with suspicious email patterns.")
}
