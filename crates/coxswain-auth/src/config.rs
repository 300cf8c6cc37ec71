//! Declarative authentication configuration
//!
//! The configuration document names an ordered list of credential
//! extractors and an ordered list of identity providers. It is loaded once
//! at startup and validated by [`AuthenticationConfig::build`], which
//! compiles every CEL expression up front -- an invalid configuration must
//! prevent the server from starting rather than failing requests at
//! runtime.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::authenticator::{Authenticator, Provider};
use crate::credentials::{
    BasicAuthExtractor, BearerTokenExtractor, CredentialExtractor, CustomHeaderExtractor,
};
use crate::error::{Error, Result};
use crate::oidc::OidcProvider;

/// Top-level authentication configuration document
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthenticationConfig {
    /// Ordered credential extractor specs; the first extractor that matches
    /// a request wins
    #[serde(default)]
    pub credentials: Vec<CredentialSpec>,
    /// Ordered provider specs; the first provider that authenticates the
    /// extracted credentials wins
    #[serde(default)]
    pub providers: Vec<ProviderSpec>,
}

/// A single credential extractor spec
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CredentialSpec {
    /// Extraction strategy discriminator
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Header names for the `CustomHTTPHeader` strategy
    #[serde(default)]
    pub headers: Option<CustomHeadersSpec>,
}

/// Credential extraction strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CredentialType {
    /// `Authorization: Bearer <token>`
    BearerToken,
    /// `Authorization: Basic <base64>`
    BasicAuth,
    /// Operator-named headers carrying username/password/token
    #[serde(rename = "CustomHTTPHeader")]
    CustomHttpHeader,
}

/// Header names for the `CustomHTTPHeader` strategy
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CustomHeadersSpec {
    /// Header carrying the username
    #[serde(default)]
    pub username: Option<String>,
    /// Header carrying the password
    #[serde(default)]
    pub password: Option<String>,
    /// Header carrying the token
    #[serde(default)]
    pub token: Option<String>,
}

/// A single identity provider spec
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProviderSpec {
    /// Unique provider name, used in logs and error reporting
    #[serde(default)]
    pub name: String,
    /// Provider type discriminator
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// OIDC issuer URL; must be an absolute https URL
    #[serde(rename = "issuerURL", default)]
    pub issuer_url: String,
    /// Expected token audience (OIDC client ID)
    #[serde(default)]
    pub audience: String,
    /// Ordered derived-variable bindings; later variables may reference
    /// earlier ones
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    /// Ordered validation assertions, evaluated after all variables are
    /// bound
    #[serde(default)]
    pub validations: Vec<ValidationSpec>,
    /// Impersonation identity expressions
    #[serde(default)]
    pub impersonation: Option<ImpersonationSpec>,
    /// Authorization scopes expression
    #[serde(default)]
    pub scopes: Option<ScopesSpec>,
}

/// Identity provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ProviderType {
    /// OpenID Connect token verification
    #[serde(rename = "OIDC")]
    Oidc,
}

/// A named CEL expression bound into the `variables` map
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VariableSpec {
    /// Variable name, referenced as `variables.<name>`
    #[serde(default)]
    pub name: String,
    /// CEL expression producing the variable's value
    #[serde(default)]
    pub expression: String,
}

/// A boolean CEL assertion with an operator-supplied failure message
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidationSpec {
    /// CEL expression that must evaluate to true
    #[serde(default)]
    pub expression: String,
    /// Human-readable message reported when the expression is false
    #[serde(default)]
    pub message: String,
}

/// Impersonation identity expressions; at least one must be set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ImpersonationSpec {
    /// CEL expression producing the impersonation username
    #[serde(default)]
    pub username: String,
    /// CEL expression producing the impersonation groups
    #[serde(default)]
    pub groups: String,
}

/// Authorization scopes expression
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScopesSpec {
    /// CEL expression producing the session's scope list
    #[serde(default)]
    pub expression: String,
}

impl AuthenticationConfig {
    /// Load a configuration document from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "failed to read authentication config {}: {e}",
                path.display()
            ))
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse a configuration document from YAML text
    pub fn from_yaml(raw: &str) -> Result<Self> {
        serde_yaml::from_str(raw)
            .map_err(|e| Error::Config(format!("failed to parse authentication config: {e}")))
    }

    /// Validate the configuration and wire up the authenticator
    ///
    /// Compiles every CEL expression and constructs every extractor and
    /// provider. Any error here is fatal to startup.
    pub fn build(&self) -> Result<Authenticator> {
        if self.credentials.is_empty() {
            return Err(Error::Config(
                "at least one credential must be configured".to_string(),
            ));
        }
        if self.providers.is_empty() {
            return Err(Error::Config(
                "at least one provider must be configured".to_string(),
            ));
        }

        let mut extractors: Vec<Box<dyn CredentialExtractor>> = Vec::new();
        for (index, spec) in self.credentials.iter().enumerate() {
            match spec.credential_type {
                CredentialType::BearerToken => extractors.push(Box::new(BearerTokenExtractor)),
                CredentialType::BasicAuth => extractors.push(Box::new(BasicAuthExtractor)),
                CredentialType::CustomHttpHeader => {
                    let headers = spec.headers.as_ref().ok_or_else(|| {
                        Error::Config(format!(
                            "missing headers configuration for CustomHTTPHeader credential at index {index}"
                        ))
                    })?;
                    extractors.push(Box::new(CustomHeaderExtractor::new(
                        headers.username.clone(),
                        headers.password.clone(),
                        headers.token.clone(),
                    )));
                }
            }
        }

        let mut seen = HashSet::new();
        let mut providers: Vec<Arc<dyn Provider>> = Vec::new();
        for spec in &self.providers {
            if spec.name.is_empty() {
                return Err(Error::Config("provider name must not be empty".to_string()));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "duplicate provider name '{}'",
                    spec.name
                )));
            }
            match spec.provider_type {
                ProviderType::Oidc => providers.push(Arc::new(OidcProvider::new(spec)?)),
            }
        }

        Ok(Authenticator::new(extractors, providers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bearer_credential() -> CredentialSpec {
        CredentialSpec {
            credential_type: CredentialType::BearerToken,
            headers: None,
        }
    }

    fn oidc_provider(name: &str) -> ProviderSpec {
        ProviderSpec {
            name: name.to_string(),
            provider_type: ProviderType::Oidc,
            issuer_url: "https://idp.example.com".to_string(),
            audience: "test-client-id".to_string(),
            variables: Vec::new(),
            validations: Vec::new(),
            impersonation: None,
            scopes: None,
        }
    }

    #[test]
    fn test_build_requires_credentials() {
        let config = AuthenticationConfig {
            credentials: Vec::new(),
            providers: vec![oidc_provider("test")],
        };
        let err = config.build().unwrap_err();
        assert!(err
            .to_string()
            .contains("at least one credential must be configured"));
    }

    #[test]
    fn test_build_requires_providers() {
        let config = AuthenticationConfig {
            credentials: vec![bearer_credential()],
            providers: Vec::new(),
        };
        let err = config.build().unwrap_err();
        assert!(err
            .to_string()
            .contains("at least one provider must be configured"));
    }

    #[test]
    fn test_build_rejects_duplicate_provider_names() {
        let config = AuthenticationConfig {
            credentials: vec![bearer_credential()],
            providers: vec![oidc_provider("same"), oidc_provider("same")],
        };
        let err = config.build().unwrap_err();
        assert!(err.to_string().contains("duplicate provider name 'same'"));
    }

    #[test]
    fn test_build_rejects_custom_header_without_headers() {
        let config = AuthenticationConfig {
            credentials: vec![CredentialSpec {
                credential_type: CredentialType::CustomHttpHeader,
                headers: None,
            }],
            providers: vec![oidc_provider("test")],
        };
        let err = config.build().unwrap_err();
        assert!(err.to_string().contains(
            "missing headers configuration for CustomHTTPHeader credential at index 0"
        ));
    }

    #[test]
    fn test_build_valid_config() {
        let config = AuthenticationConfig {
            credentials: vec![bearer_credential()],
            providers: vec![oidc_provider("test")],
        };
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_from_yaml_full_document() {
        let config = AuthenticationConfig::from_yaml(
            r#"
credentials:
  - type: BearerToken
  - type: CustomHTTPHeader
    headers:
      token: X-Api-Token
providers:
  - name: corporate
    type: OIDC
    issuerURL: https://idp.example.com
    audience: coxswain
    variables:
      - name: domain
        expression: "claims.email.split('@')[1]"
    validations:
      - expression: "variables.domain == 'trusted.com'"
        message: untrusted email domain
    impersonation:
      username: claims.sub
      groups: "claims.groups"
    scopes:
      expression: "['read']"
"#,
        )
        .unwrap();

        assert_eq!(config.credentials.len(), 2);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, "corporate");
        assert_eq!(config.providers[0].variables.len(), 1);
        assert!(config.build().is_ok());
    }

    #[test]
    fn test_from_yaml_unknown_credential_type() {
        let err = AuthenticationConfig::from_yaml(
            r#"
credentials:
  - type: Kerberos
providers: []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("failed to parse authentication config"));
    }
}
