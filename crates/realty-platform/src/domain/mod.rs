//! Domain Models
//!
//! Core entities of the platform. Every entity uses a UUID v4 string id
//! stored as the document `_id`.

pub mod agency;
pub mod property;
pub mod tenant;
pub mod user;

pub use agency::*;
pub use property::*;
pub use tenant::*;
pub use user::*;

/// Generate a new entity id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// URL-safe slug: lower-case ASCII alphanumerics separated by single hyphens.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_hyphen = false;
    for c in value.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' || c == '_' {
            pending_hyphen = true;
        }
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Acme Realty"), "acme-realty");
        assert_eq!(slugify("  Dar  El_Beida -- Homes "), "dar-el-beida-homes");
        assert_eq!(slugify("L'Agence #1"), "lagence-1");
        assert_eq!(slugify("---"), "");
    }
}
