//! Throwaway account credentials
//!
//! Every run signs up a brand-new account, so the email carries a random
//! lowercase identifier. With the default length of 10 there are 26^10
//! possible addresses, which keeps repeated runs from tripping over
//! duplicate-account rejection.

use rand::Rng;
use serde::{Deserialize, Serialize};

const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// How throwaway credentials are composed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialPolicy {
    /// Local-part prefix placed before the random identifier
    pub email_prefix: String,

    /// Domain of the generated address
    pub email_domain: String,

    /// Number of random lowercase characters
    pub identifier_len: usize,

    /// Literal password used for every account
    pub password: String,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            email_prefix: "testuser_".to_string(),
            email_domain: "example.com".to_string(),
            identifier_len: 10,
            password: "password123".to_string(),
        }
    }
}

/// Email and password for one sign-up
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password: String,
}

impl Credentials {
    /// Draw a fresh email address under `policy`
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, policy: &CredentialPolicy) -> Self {
        let identifier = random_identifier(rng, policy.identifier_len);
        Self {
            email: format!("{}{}@{}", policy.email_prefix, identifier, policy.email_domain),
            password: policy.password.clone(),
        }
    }
}

/// Random string of `len` characters from `a..=z`
pub fn random_identifier<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| LOWERCASE[rng.gen_range(0..LOWERCASE.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_identifier_is_lowercase_of_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = random_identifier(&mut rng, 10);

        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn test_zero_length_identifier_is_empty() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(random_identifier(&mut rng, 0).is_empty());
    }

    #[test]
    fn test_generated_email_shape() {
        let mut rng = StdRng::seed_from_u64(42);
        let creds = Credentials::generate(&mut rng, &CredentialPolicy::default());

        let local = creds
            .email
            .strip_suffix("@example.com")
            .expect("default domain");
        let id = local.strip_prefix("testuser_").expect("default prefix");
        assert_eq!(id.len(), 10);
        assert_eq!(creds.password, "password123");
    }

    #[test]
    fn test_consecutive_emails_differ() {
        let mut rng = StdRng::seed_from_u64(1);
        let policy = CredentialPolicy::default();

        let first = Credentials::generate(&mut rng, &policy);
        let second = Credentials::generate(&mut rng, &policy);
        assert_ne!(first.email, second.email);
    }

    #[test]
    fn test_password_is_not_serialized() {
        let creds = Credentials {
            email: "a@example.com".to_string(),
            password: "secret".to_string(),
        };
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("secret"));
    }
}
