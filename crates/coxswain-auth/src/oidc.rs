//! OIDC identity provider
//!
//! Verifies bearer tokens against a discovered OIDC issuer, then runs the
//! extracted claims through the variable/validation/impersonation/scopes
//! pipeline to derive the session identity.
//!
//! All CEL expressions are compiled at construction time; no network calls
//! happen until a token is authenticated. Discovery and JWKS retrieval run
//! per call rather than being cached, so an unreachable issuer fails each
//! request until it is reachable again.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::Deserialize;
use serde_json::Map as JsonMap;
use tracing::{debug, warn};
use url::Url;

use crate::authenticator::Provider;
use crate::config::ProviderSpec;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::expr::Expression;
use crate::session::Session;

/// HTTP timeout for discovery and JWKS requests
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// A named variable binding evaluated during the claims pipeline
#[derive(Debug)]
struct Variable {
    /// Name under which the result is stored in the `variables` map
    name: String,
    /// Compiled expression
    expression: Expression,
}

/// A compiled validation assertion
#[derive(Debug)]
struct ValidationRule {
    /// Compiled boolean expression
    expression: Expression,
    /// Operator-supplied failure message
    message: String,
}

/// OIDC provider compiled from a validated spec
///
/// Immutable after construction and safe for concurrent use by many
/// requests simultaneously.
#[derive(Debug)]
pub struct OidcProvider {
    /// Provider name from the configuration
    name: String,
    /// Issuer URL as configured (validated to be absolute https)
    issuer_url: String,
    /// Expected token audience (OIDC client ID)
    audience: String,
    /// Ordered variable bindings
    variables: Vec<Variable>,
    /// Ordered validation assertions
    validations: Vec<ValidationRule>,
    /// Impersonation username expression, if configured
    username: Option<Expression>,
    /// Impersonation groups expression, if configured
    groups: Option<Expression>,
    /// Scopes expression, if configured
    scopes: Option<Expression>,
    /// HTTP client for discovery and JWKS retrieval
    http_client: reqwest::Client,
}

/// OIDC discovery document
#[derive(Debug, Deserialize)]
struct OidcDiscovery {
    issuer: String,
    jwks_uri: String,
}

/// JWKS document
#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkKey>,
}

/// Individual JWK key
#[derive(Debug, Deserialize)]
struct JwkKey {
    /// Key type (RSA, EC)
    kty: String,
    /// Key ID
    kid: Option<String>,
    /// RSA modulus (for RSA keys)
    n: Option<String>,
    /// RSA exponent (for RSA keys)
    e: Option<String>,
    /// EC curve (for EC keys)
    crv: Option<String>,
    /// EC x coordinate (for EC keys)
    x: Option<String>,
    /// EC y coordinate (for EC keys)
    y: Option<String>,
}

impl OidcProvider {
    /// Compile a provider from its spec
    ///
    /// Validates the issuer URL and audience and compiles every CEL
    /// expression. No network calls occur here.
    pub fn new(spec: &ProviderSpec) -> Result<Self> {
        if spec.issuer_url.is_empty() {
            return Err(Error::Config(
                "issuer URL must use https scheme".to_string(),
            ));
        }
        let issuer_url = match Url::parse(&spec.issuer_url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Err(Error::Config(
                    "issuer URL must use https scheme".to_string(),
                ));
            }
            Err(e) => {
                return Err(Error::Config(format!("failed to parse issuer URL: {e}")));
            }
        };
        if issuer_url.scheme() != "https" || issuer_url.host_str().is_none() {
            return Err(Error::Config(
                "issuer URL must use https scheme".to_string(),
            ));
        }

        if spec.audience.is_empty() {
            return Err(Error::Config("audience must be provided".to_string()));
        }

        let mut variables = Vec::with_capacity(spec.variables.len());
        for variable in &spec.variables {
            if variable.name.is_empty() {
                return Err(Error::Config("variable name must not be empty".to_string()));
            }
            if variable.expression.is_empty() {
                return Err(Error::Config(format!(
                    "variable '{}' expression must not be empty",
                    variable.name
                )));
            }
            let expression = Expression::compile(&variable.expression).map_err(|e| match e {
                Error::Config(msg) => {
                    Error::Config(format!("variable '{}': {msg}", variable.name))
                }
                other => other,
            })?;
            variables.push(Variable {
                name: variable.name.clone(),
                expression,
            });
        }

        let mut validations = Vec::with_capacity(spec.validations.len());
        for validation in &spec.validations {
            if validation.expression.is_empty() {
                return Err(Error::Config(
                    "validation expression must not be empty".to_string(),
                ));
            }
            if validation.message.is_empty() {
                return Err(Error::Config(
                    "validation message must not be empty".to_string(),
                ));
            }
            validations.push(ValidationRule {
                expression: Expression::compile(&validation.expression)?,
                message: validation.message.clone(),
            });
        }

        let (username, groups) = match &spec.impersonation {
            Some(impersonation) => {
                if impersonation.username.is_empty() && impersonation.groups.is_empty() {
                    return Err(Error::Config(
                        "impersonation must have at least one of username or groups expressions"
                            .to_string(),
                    ));
                }
                let username = if impersonation.username.is_empty() {
                    None
                } else {
                    Some(Expression::compile(&impersonation.username)?)
                };
                let groups = if impersonation.groups.is_empty() {
                    None
                } else {
                    Some(Expression::compile(&impersonation.groups)?)
                };
                (username, groups)
            }
            None => (None, None),
        };

        let scopes = match &spec.scopes {
            Some(scopes) => {
                if scopes.expression.is_empty() {
                    return Err(Error::Config(
                        "scopes expression must not be empty".to_string(),
                    ));
                }
                Some(Expression::compile(&scopes.expression)?)
            }
            None => None,
        };

        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: spec.name.clone(),
            issuer_url: spec.issuer_url.clone(),
            audience: spec.audience.clone(),
            variables,
            validations,
            username,
            groups,
            scopes,
            http_client,
        })
    }

    /// Fetch the discovery document and JWKS, returning keys indexed by kid
    async fn fetch_keys(&self) -> Result<HashMap<String, DecodingKey>> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            self.issuer_url.trim_end_matches('/')
        );

        debug!(url = %discovery_url, "Fetching OIDC discovery document");

        let discovery: OidcDiscovery = self
            .http_client
            .get(&discovery_url)
            .send()
            .await
            .map_err(|e| {
                Error::ProviderDiscovery(format!("failed to fetch OIDC discovery document: {e}"))
            })?
            .json()
            .await
            .map_err(|e| {
                Error::ProviderDiscovery(format!("invalid OIDC discovery response: {e}"))
            })?;

        if discovery.issuer != self.issuer_url {
            return Err(Error::ProviderDiscovery(format!(
                "issuer mismatch: expected {}, got {}",
                self.issuer_url, discovery.issuer
            )));
        }

        debug!(url = %discovery.jwks_uri, "Fetching JWKS");

        let jwks: JwksDocument = self
            .http_client
            .get(&discovery.jwks_uri)
            .send()
            .await
            .map_err(|e| Error::ProviderDiscovery(format!("failed to fetch JWKS: {e}")))?
            .json()
            .await
            .map_err(|e| Error::ProviderDiscovery(format!("invalid JWKS response: {e}")))?;

        let mut keys = HashMap::new();
        for jwk in jwks.keys {
            if let Some(key) = jwk_to_decoding_key(&jwk)? {
                let kid = jwk.kid.unwrap_or_else(|| "default".to_string());
                keys.insert(kid, key);
            }
        }

        if keys.is_empty() {
            return Err(Error::ProviderDiscovery(
                "no usable keys found in JWKS".to_string(),
            ));
        }

        Ok(keys)
    }

    /// Verify a token's signature, issuer, audience, and expiry, returning
    /// the full claim set as an untyped mapping
    async fn verify(&self, token: &str) -> Result<JsonMap<String, serde_json::Value>> {
        let keys = self.fetch_keys().await?;

        let header =
            decode_header(token).map_err(|e| Error::TokenVerification(e.to_string()))?;

        let key = match header.kid.as_deref() {
            Some(kid) => keys.get(kid),
            None => keys.values().next(),
        }
        .ok_or_else(|| {
            Error::TokenVerification(format!(
                "no matching key found in JWKS for kid {:?}",
                header.kid
            ))
        })?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer_url]);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;

        let token_data = decode::<JsonMap<String, serde_json::Value>>(token, key, &validation)
            .map_err(|e| Error::TokenVerification(e.to_string()))?;

        Ok(token_data.claims)
    }

    /// Run the claims pipeline: variables, validations, impersonation,
    /// scopes
    ///
    /// Deterministic and side-effect-free for a fixed claim set. Public so
    /// claims obtained by other means (tests, alternate token formats) can
    /// be authenticated without a network round-trip.
    pub fn authenticate_claims(
        &self,
        claims: &JsonMap<String, serde_json::Value>,
    ) -> Result<Session> {
        let mut variables = JsonMap::new();
        for variable in &self.variables {
            let value = variable
                .expression
                .eval(claims, &variables)
                .map_err(|e| Error::VariableEvaluation {
                    name: variable.name.clone(),
                    cause: e.to_string(),
                })?;
            variables.insert(variable.name.clone(), value);
        }

        for validation in &self.validations {
            let passed = validation
                .expression
                .eval_bool(claims, &variables)
                .map_err(|e| Error::ValidationEvaluation(e.to_string()))?;
            if !passed {
                return Err(Error::ValidationFailed(validation.message.clone()));
            }
        }

        let user_name = match &self.username {
            Some(expression) => expression
                .eval_string(claims, &variables)
                .map_err(|e| Error::UsernameEvaluation(e.to_string()))?,
            None => String::new(),
        };

        let groups = match &self.groups {
            Some(expression) => Some(
                expression
                    .eval_string_list(claims, &variables)
                    .map_err(|e| Error::GroupsEvaluation(e.to_string()))?,
            ),
            None => None,
        };

        let scopes = match &self.scopes {
            Some(expression) => Some(
                expression
                    .eval_string_list(claims, &variables)
                    .map_err(|e| Error::ScopesEvaluation(e.to_string()))?,
            ),
            None => None,
        };

        debug!(
            provider = %self.name,
            user = %user_name,
            groups = ?groups,
            "Derived session from claims"
        );

        Ok(Session {
            user_name,
            groups,
            scopes,
        })
    }
}

#[async_trait]
impl Provider for OidcProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<Session> {
        let token = credentials.token_or_password().unwrap_or_default();
        let claims = self.verify(token).await?;
        self.authenticate_claims(&claims)
    }
}

/// Convert a JWK to a decoding key
///
/// Unsupported key types and curves are skipped rather than failing the
/// whole JWKS.
fn jwk_to_decoding_key(jwk: &JwkKey) -> Result<Option<DecodingKey>> {
    match jwk.kty.as_str() {
        "RSA" => {
            let n = jwk.n.as_ref().ok_or_else(|| {
                Error::ProviderDiscovery("RSA key missing 'n'".to_string())
            })?;
            let e = jwk.e.as_ref().ok_or_else(|| {
                Error::ProviderDiscovery("RSA key missing 'e'".to_string())
            })?;

            DecodingKey::from_rsa_components(n, e)
                .map(Some)
                .map_err(|e| Error::ProviderDiscovery(format!("invalid RSA key: {e}")))
        }
        "EC" => {
            let crv = jwk.crv.as_ref().ok_or_else(|| {
                Error::ProviderDiscovery("EC key missing 'crv'".to_string())
            })?;
            let x = jwk.x.as_ref().ok_or_else(|| {
                Error::ProviderDiscovery("EC key missing 'x'".to_string())
            })?;
            let y = jwk.y.as_ref().ok_or_else(|| {
                Error::ProviderDiscovery("EC key missing 'y'".to_string())
            })?;

            match crv.as_str() {
                "P-256" | "P-384" => DecodingKey::from_ec_components(x, y)
                    .map(Some)
                    .map_err(|e| Error::ProviderDiscovery(format!("invalid EC key: {e}"))),
                _ => {
                    warn!(crv = %crv, "Unsupported EC curve");
                    Ok(None)
                }
            }
        }
        kty => {
            warn!(kty = %kty, "Unsupported key type");
            Ok(None)
        }
    }
}
