//! Identity gate: turns a bearer credential into a verified
//! [`ClientInfo`] before a connection is admitted.
//!
//! Verification is pure: no I/O, no side effects. Tokens are HMAC
//! JWTs signed with a shared secret; `exp` is honored when present
//! but not required (the issuing backend always sets one, older
//! tooling does not). The identity claim must be a JSON number and is
//! rejected otherwise; the role claim is lax and falls back to
//! [`Role::Unknown`]. That asymmetry is intentional.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use fleettrack_core::{AuthError, ClientInfo, Role};

/// Raw claims as they appear on the wire. Extra claims (`name`, `iat`,
/// ...) are ignored; `id` and `role` are kept untyped so that a wrong
/// type can be handled per claim instead of failing the whole decode.
#[derive(Debug, Deserialize)]
struct TokenClaims {
    #[serde(default)]
    id: Option<serde_json::Value>,
    #[serde(default)]
    role: Option<serde_json::Value>,
}

/// Verifies connection credentials against a shared HMAC secret.
pub struct IdentityGate {
    key: DecodingKey,
    validation: Validation,
}

impl IdentityGate {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Any HMAC variant is acceptable; other families are not.
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        // Validate `exp` when the token carries one, but do not demand it.
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verify a credential and derive the connection's identity.
    ///
    /// `None` or an empty string is [`AuthError::Missing`]; anything
    /// that fails signature, algorithm, expiry, or identity-claim
    /// checks is [`AuthError::Invalid`].
    pub fn authenticate(&self, credential: Option<&str>) -> Result<ClientInfo, AuthError> {
        let token = match credential {
            Some(t) if !t.is_empty() => t,
            _ => return Err(AuthError::Missing),
        };

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::Invalid(e.to_string()))?;

        let user_id = numeric_id(data.claims.id.as_ref())?;
        let role = Role::from_claim(data.claims.role.as_ref().and_then(|v| v.as_str()));

        Ok(ClientInfo { user_id, role })
    }
}

/// The identity claim must be a JSON number. Fractional values
/// truncate toward zero; strings and missing claims are rejected
/// outright rather than coerced.
fn numeric_id(claim: Option<&serde_json::Value>) -> Result<i64, AuthError> {
    match claim {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| AuthError::Invalid("id claim out of integer range".into())),
        Some(_) => Err(AuthError::Invalid("id claim is not numeric".into())),
        None => Err(AuthError::Invalid("id claim missing".into())),
    }
}
