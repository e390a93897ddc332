//! Password Service
//!
//! Argon2id hashing plus the password strength policy applied at
//! registration, reset and change-password time.

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;

use crate::error::{PlatformError, Result};

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "123456", "12345678", "123456789",
    "1234567890", "qwerty", "qwerty123", "azerty", "azerty123", "abc123",
    "abcd1234", "letmein", "welcome", "welcome1", "iloveyou", "admin",
    "admin123", "monkey", "dragon", "sunshine", "football", "baseball",
    "master", "passw0rd", "trustno1", "superman", "princess", "qwertyuiop",
    "111111", "000000", "changeme", "secret", "starwars",
];

const MAX_SIMILARITY: f64 = 0.7;

/// Hashed once and verified against when there is no real hash to check
const DUMMY_PASSWORD: &str = "realty-unknown-account";

#[derive(Debug, Clone)]
pub struct PasswordPolicy {
    pub min_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self { min_length: 8 }
    }
}

impl PasswordPolicy {
    /// Problems with `password`; empty when it is acceptable.
    /// `email` feeds the similarity check.
    pub fn check(&self, password: &str, email: Option<&str>) -> Vec<String> {
        let mut problems = Vec::new();

        if password.chars().count() < self.min_length {
            problems.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }

        let lowered = password.to_lowercase();
        if COMMON_PASSWORDS.contains(&lowered.as_str()) {
            problems.push("This password is too common.".to_string());
        }

        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            problems.push("This password is entirely numeric.".to_string());
        }

        if let Some(email) = email {
            let local = email.split('@').next().unwrap_or(email).to_lowercase();
            if !local.is_empty() && similarity(&lowered, &local) >= MAX_SIMILARITY {
                problems.push("The password is too similar to the email address.".to_string());
            }
        }

        problems
    }
}

/// 2 * longest common substring / total length, in `[0, 1]`
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let mut longest = 0;
    let mut previous = vec![0usize; b.len() + 1];
    for ca in &a {
        let mut current = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                current[j + 1] = previous[j] + 1;
                longest = longest.max(current[j + 1]);
            }
        }
        previous = current;
    }

    (2 * longest) as f64 / (a.len() + b.len()) as f64
}

#[derive(Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
    policy: PasswordPolicy,
    dummy_hash: OnceLock<Option<String>>,
}

impl PasswordService {
    pub fn new(policy: PasswordPolicy) -> Self {
        Self {
            argon2: Argon2::default(),
            policy,
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Field-level validation error under `field` if the policy rejects the password
    pub fn validate(&self, field: &str, password: &str, email: Option<&str>) -> Result<()> {
        let problems = self.policy.check(password, email);
        if problems.is_empty() {
            return Ok(());
        }
        let mut fields = crate::error::FieldErrors::new();
        fields.insert(field.to_string(), problems);
        Err(PlatformError::InvalidFields { fields })
    }

    pub fn hash(&self, password: &str) -> Result<String> {
        let mut salt_bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| PlatformError::internal(format!("Failed to encode salt: {}", e)))?;

        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PlatformError::internal(format!("Failed to hash password: {}", e)))
    }

    /// False for a mismatch and for unparsable hashes.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        match PasswordHash::new(hash) {
            Ok(parsed) => self.argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }

    /// Spend the cost of a real verification when the account has no hash
    /// or does not exist. Always false.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let dummy = self.dummy_hash.get_or_init(|| self.hash(DUMMY_PASSWORD).ok());
        if let Some(hash) = dummy {
            self.verify(password, hash);
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::default();
        let hash = service.hash("Tr1cky-Horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(service.verify("Tr1cky-Horse", &hash));
        assert!(!service.verify("tr1cky-horse", &hash));
        assert!(!service.verify("Tr1cky-Horse", "garbage"));
    }

    #[test]
    fn test_verify_dummy_never_matches() {
        let service = PasswordService::default();
        assert!(!service.verify_dummy(DUMMY_PASSWORD));
        let first = service.dummy_hash.get().cloned().flatten().unwrap();
        assert!(first.starts_with("$argon2id$"));

        assert!(!service.verify_dummy("anything"));
        assert_eq!(service.dummy_hash.get().cloned().flatten().unwrap(), first);
    }

    #[test]
    fn test_policy_accepts_reasonable_password() {
        let policy = PasswordPolicy::default();
        assert!(policy.check("Tr1cky-Horse", Some("jane@x.com")).is_empty());
    }

    #[test]
    fn test_policy_rejections() {
        let policy = PasswordPolicy::default();
        assert_eq!(policy.check("short", None).len(), 1);
        assert!(policy.check("12345678", None).iter().any(|p| p.contains("entirely numeric")));
        assert!(policy.check("Password123", None).iter().any(|p| p.contains("too common")));
        assert!(policy
            .check("janedoe99", Some("janedoe@x.com"))
            .iter()
            .any(|p| p.contains("too similar")));
    }

    #[test]
    fn test_validate_reports_field() {
        let service = PasswordService::default();
        match service.validate("password", "1234", None) {
            Err(PlatformError::InvalidFields { fields }) => {
                assert_eq!(fields["password"].len(), 2);
            }
            other => panic!("expected field errors, got {:?}", other),
        }
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
        assert_eq!(similarity("", "abc"), 0.0);
    }
}
