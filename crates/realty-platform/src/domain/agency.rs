//! Agency entity
//!
//! A real-estate brokerage. Each tenant owns exactly one agency; the
//! `tenantId` unique index enforces it in storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Administrative area (wilaya or commune)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub id: String,
    pub name: String,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    Phone,
    Whatsapp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgencyContact {
    pub contact_type: ContactType,
    pub number: String,
    /// e.g. Sales, Rentals, Office
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub is_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agency {
    #[serde(rename = "_id")]
    pub id: String,

    pub tenant_id: String,

    /// Primary contact/owner
    pub owner_id: String,

    pub name: String,
    pub slug: String,

    #[serde(default)]
    pub description: String,

    pub email: String,

    pub wilaya: Location,
    pub commune: Location,

    #[serde(default)]
    pub address: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub instagram: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tiktok: Option<String>,

    #[serde(default)]
    pub contacts: Vec<AgencyContact>,

    pub is_active: bool,

    pub created_at: DateTime<Utc>,
}

impl Agency {
    pub fn new(
        tenant_id: impl Into<String>,
        owner_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        wilaya: Location,
        commune: Location,
    ) -> Self {
        let name = name.into();
        Self {
            id: super::new_id(),
            tenant_id: tenant_id.into(),
            owner_id: owner_id.into(),
            slug: super::slugify(&name),
            name,
            description: String::new(),
            email: email.into(),
            wilaya,
            commune,
            address: String::new(),
            logo_url: None,
            cover_image_url: None,
            facebook: None,
            instagram: None,
            tiktok: None,
            contacts: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Add a contact; a new primary contact demotes the previous primary of the same type.
    pub fn add_contact(&mut self, contact: AgencyContact) {
        if contact.is_primary {
            for existing in self
                .contacts
                .iter_mut()
                .filter(|c| c.contact_type == contact.contact_type)
            {
                existing.is_primary = false;
            }
        }
        self.contacts.push(contact);
    }

    pub fn primary_contact(&self, contact_type: ContactType) -> Option<&AgencyContact> {
        self.contacts
            .iter()
            .find(|c| c.contact_type == contact_type && c.is_primary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agency() -> Agency {
        Agency::new(
            "tenant-1",
            "owner-1",
            "Acme Immobilier",
            "contact@acme.test",
            Location::new("16", "Alger"),
            Location::new("1601", "Alger Centre"),
        )
    }

    fn phone(number: &str, primary: bool) -> AgencyContact {
        AgencyContact {
            contact_type: ContactType::Phone,
            number: number.to_string(),
            label: String::new(),
            is_primary: primary,
        }
    }

    #[test]
    fn test_new_agency_slug() {
        assert_eq!(agency().slug, "acme-immobilier");
    }

    #[test]
    fn test_single_primary_contact_per_type() {
        let mut agency = agency();
        agency.add_contact(phone("0550 00 00 01", true));
        agency.add_contact(AgencyContact {
            contact_type: ContactType::Whatsapp,
            number: "0550 00 00 09".into(),
            label: "Sales".into(),
            is_primary: true,
        });
        agency.add_contact(phone("0550 00 00 02", true));

        let primaries: Vec<_> = agency
            .contacts
            .iter()
            .filter(|c| c.contact_type == ContactType::Phone && c.is_primary)
            .collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(agency.primary_contact(ContactType::Phone).unwrap().number, "0550 00 00 02");
        assert!(agency.primary_contact(ContactType::Whatsapp).is_some());
    }
}
