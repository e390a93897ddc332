//! Social provider verification
//!
//! Each provider is described as data: the userinfo endpoint that accepts
//! the access token, extra query parameters, and where the email and
//! display name live in its response.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::{PlatformError, Result};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SocialProvider {
    Google,
    Facebook,
    #[serde(rename = "github")]
    GitHub,
}

/// Endpoint and response field mapping for one provider
#[derive(Debug, Clone)]
pub struct ProviderSpec {
    pub verify_url: String,
    pub params: Vec<(&'static str, &'static str)>,
    pub email_field: &'static str,
    pub name_field: &'static str,
}

impl SocialProvider {
    pub const ALL: [SocialProvider; 3] = [Self::Google, Self::Facebook, Self::GitHub];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Facebook => "facebook",
            Self::GitHub => "github",
        }
    }

    pub fn default_spec(&self) -> ProviderSpec {
        match self {
            Self::Google => ProviderSpec {
                verify_url: "https://www.googleapis.com/oauth2/v3/userinfo".to_string(),
                params: Vec::new(),
                email_field: "email",
                name_field: "name",
            },
            Self::Facebook => ProviderSpec {
                verify_url: "https://graph.facebook.com/me".to_string(),
                params: vec![("fields", "id,name,email")],
                email_field: "email",
                name_field: "name",
            },
            Self::GitHub => ProviderSpec {
                verify_url: "https://api.github.com/user".to_string(),
                params: Vec::new(),
                email_field: "email",
                name_field: "name",
            },
        }
    }
}

impl fmt::Display for SocialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialProvider {
    type Err = PlatformError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| PlatformError::field("provider", format!("Unsupported provider: {}", s)))
    }
}

/// Identity fields extracted from a provider response
#[derive(Debug, Clone, PartialEq)]
pub struct SocialProfile {
    pub provider: SocialProvider,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl SocialProfile {
    /// First word of the display name
    pub fn first_name(&self) -> String {
        self.name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
            .unwrap_or_default()
            .to_string()
    }
}

pub struct SocialAuthService {
    client: reqwest::Client,
    specs: HashMap<SocialProvider, ProviderSpec>,
}

impl SocialAuthService {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROVIDER_TIMEOUT)
            .user_agent(concat!("realty-platform/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        let specs = SocialProvider::ALL
            .into_iter()
            .map(|p| (p, p.default_spec()))
            .collect();
        Self { client, specs }
    }

    /// Point a provider at a different userinfo endpoint.
    pub fn with_endpoint(mut self, provider: SocialProvider, url: impl Into<String>) -> Self {
        let mut spec = provider.default_spec();
        spec.verify_url = url.into();
        self.specs.insert(provider, spec);
        self
    }

    /// Apply `provider name -> url` overrides; unknown names are skipped.
    pub fn with_endpoints<'a>(mut self, overrides: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (name, url) in overrides {
            match name.parse::<SocialProvider>() {
                Ok(provider) => self = self.with_endpoint(provider, url.clone()),
                Err(_) => warn!(provider = %name, "Ignoring endpoint override for unknown provider"),
            }
        }
        self
    }

    fn spec(&self, provider: SocialProvider) -> ProviderSpec {
        self.specs
            .get(&provider)
            .cloned()
            .unwrap_or_else(|| provider.default_spec())
    }

    /// Call the provider with the access token and map the response.
    pub async fn verify_token(&self, provider: SocialProvider, access_token: &str) -> Result<SocialProfile> {
        let spec = self.spec(provider);
        let failure = |message: String| PlatformError::SocialAuth {
            provider: provider.to_string(),
            message,
        };

        let response = self
            .client
            .get(&spec.verify_url)
            .bearer_auth(access_token)
            .query(&spec.params)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?
            .error_for_status()
            .map_err(|e| failure(e.to_string()))?;

        let body: serde_json::Value = response.json().await.map_err(|e| failure(e.to_string()))?;
        debug!(provider = %provider, "Provider token verified");

        let field = |name: &str| {
            body.get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(SocialProfile {
            provider,
            email: field(spec.email_field),
            name: field(spec.name_field),
        })
    }
}

impl Default for SocialAuthService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_provider_parsing() {
        assert_eq!("github".parse::<SocialProvider>().unwrap(), SocialProvider::GitHub);
        assert!("myspace".parse::<SocialProvider>().is_err());
        assert_eq!(
            serde_json::from_str::<SocialProvider>("\"github\"").unwrap(),
            SocialProvider::GitHub
        );
    }

    #[test]
    fn test_first_name() {
        let profile = SocialProfile {
            provider: SocialProvider::Google,
            email: None,
            name: Some("Jane Q Doe".to_string()),
        };
        assert_eq!(profile.first_name(), "Jane");
    }

    #[tokio::test]
    async fn test_facebook_sends_fields_and_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/me"))
            .and(query_param("fields", "id,name,email"))
            .and(header("authorization", "Bearer fb-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1", "name": "Jane Doe", "email": "jane@x.com"
            })))
            .mount(&server)
            .await;

        let service = SocialAuthService::new()
            .with_endpoint(SocialProvider::Facebook, format!("{}/me", server.uri()));
        let profile = service.verify_token(SocialProvider::Facebook, "fb-token").await.unwrap();
        assert_eq!(profile.email.as_deref(), Some("jane@x.com"));
        assert_eq!(profile.name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_non_success_is_auth_failure_with_provider() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let service = SocialAuthService::new().with_endpoint(SocialProvider::GitHub, server.uri());
        let err = service.verify_token(SocialProvider::GitHub, "bad").await.unwrap_err();
        match err {
            PlatformError::SocialAuth { provider, message } => {
                assert_eq!(provider, "github");
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_null_email_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "login": "jane", "name": null, "email": null
            })))
            .mount(&server)
            .await;

        let service = SocialAuthService::new().with_endpoint(SocialProvider::GitHub, server.uri());
        let profile = service.verify_token(SocialProvider::GitHub, "t").await.unwrap();
        assert!(profile.email.is_none());
        assert!(profile.name.is_none());
    }
}
