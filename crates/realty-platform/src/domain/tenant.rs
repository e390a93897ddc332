//! Tenant entity
//!
//! A tenant is an isolated customer context reached through one primary
//! domain and any number of additional domains.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(rename = "_id")]
    pub id: String,

    /// Display name
    pub name: String,

    /// Unique identifier
    pub slug: String,

    /// Primary domain (e.g. "tenant1.com"), stored lower-case
    pub domain: String,

    #[serde(default)]
    pub additional_domains: Vec<String>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn domain_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-_.]*[a-zA-Z0-9]$").expect("domain pattern is valid")
    })
}

impl Tenant {
    pub fn new(name: impl Into<String>, domain: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            id: super::new_id(),
            slug: super::slugify(&name),
            name,
            domain: domain.into().trim().to_lowercase(),
            additional_domains: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn with_additional_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_domains = domains
            .into_iter()
            .map(|d| d.into().trim().to_lowercase())
            .collect();
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Primary domain followed by the additional domains
    pub fn all_domains(&self) -> Vec<&str> {
        std::iter::once(self.domain.as_str())
            .chain(self.additional_domains.iter().map(String::as_str))
            .collect()
    }

    pub fn serves_domain(&self, host: &str) -> bool {
        self.all_domains().iter().any(|d| d.eq_ignore_ascii_case(host))
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.updated_at = Utc::now();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.updated_at = Utc::now();
    }

    /// Hostname shape accepted for primary and additional domains
    pub fn is_valid_domain(domain: &str) -> bool {
        domain_pattern().is_match(domain)
    }
}

impl std::fmt::Display for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.domain)
    }
}
