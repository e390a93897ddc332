//! User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Permissions every new account receives on creation
pub const DEFAULT_PROPERTY_PERMISSIONS: [&str; 4] = [
    "property.add",
    "property.change",
    "property.delete",
    "property.view",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    /// Unique login identity
    pub email: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default)]
    pub phone_number: String,

    /// Argon2id PHC string; `None` for accounts without a usable password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// False until the email address is verified
    pub is_active: bool,

    #[serde(default)]
    pub is_staff: bool,

    #[serde(default)]
    pub is_superuser: bool,

    /// Agency this user works for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agency_id: Option<String>,

    #[serde(default)]
    pub permissions: Vec<String>,

    pub date_joined: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,

    pub updated_at: DateTime<Utc>,
}

/// Trim and lower-case the domain part; the local part is kept as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

impl User {
    /// New, inactive account
    pub fn new(email: impl AsRef<str>) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            email: normalize_email(email.as_ref()),
            first_name: String::new(),
            last_name: String::new(),
            phone_number: String::new(),
            password_hash: None,
            is_active: false,
            is_staff: false,
            is_superuser: false,
            agency_id: None,
            permissions: Vec::new(),
            date_joined: now,
            last_login: None,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    pub fn with_password_hash(mut self, hash: impl Into<String>) -> Self {
        self.password_hash = Some(hash.into());
        self
    }

    pub fn with_agency(mut self, agency_id: impl Into<String>) -> Self {
        self.agency_id = Some(agency_id.into());
        self
    }

    pub fn active(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn activate(&mut self) {
        self.is_active = true;
        self.touch();
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
        self.touch();
    }

    pub fn set_password_hash(&mut self, hash: impl Into<String>) {
        self.password_hash = Some(hash.into());
        self.touch();
    }

    pub fn record_login(&mut self) {
        self.last_login = Some(Utc::now());
    }

    pub fn grant_permission(&mut self, permission: impl Into<String>) {
        let permission = permission.into();
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superuser || self.permissions.iter().any(|p| p == permission)
    }

    /// Grant the property permissions every new account starts with
    pub fn grant_default_permissions(&mut self) {
        for permission in DEFAULT_PROPERTY_PERMISSIONS {
            self.grant_permission(permission);
        }
        self.touch();
    }

    pub fn is_agency_staff(&self) -> bool {
        self.agency_id.is_some() && self.is_staff
    }

    pub fn is_superadmin(&self) -> bool {
        self.is_superuser
    }

    /// Name used to greet the user in emails
    pub fn display_name(&self) -> &str {
        if self.first_name.is_empty() {
            &self.email
        } else {
            &self.first_name
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
