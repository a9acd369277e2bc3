//! Claims extracted from a validated access token.

use std::collections::HashMap;

use serde::Deserialize;

/// Grant type the issuer stamps on machine-to-machine tokens.
pub const MACHINE_GRANT_TYPE: &str = "client-credentials";

/// Claims of a validated access token.
///
/// Registered claims that the validator already checked (`exp`, `aud`, `nbf`)
/// are kept in `extra` along with any custom claims.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Subject: the identity provider's user or client id.
    pub sub: String,
    /// Space-delimited permissions.
    #[serde(default)]
    pub scope: String,
    /// Issuer as it appears in the token.
    #[serde(default)]
    pub iss: Option<String>,
    /// Email address (advisory, never used for authorization).
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the subject's email is verified, when the token says so.
    #[serde(default)]
    pub email_verified: Option<bool>,
    /// Grant type, present on machine-to-machine tokens.
    #[serde(default, rename = "gty")]
    pub grant_type: Option<String>,
    /// Everything else in the payload.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Claims {
    /// Check whether `required` appears as a whole, case-sensitive token in `scope`.
    #[must_use]
    pub fn has_scope(&self, required: &str) -> bool {
        self.scope.split_whitespace().any(|granted| granted == required)
    }

    /// Whether the token was issued through the client-credentials grant.
    #[must_use]
    pub fn is_machine(&self) -> bool {
        self.grant_type.as_deref() == Some(MACHINE_GRANT_TYPE)
    }

    /// Fill `email_verified` and `email` from namespaced custom claims
    /// (`{namespace}email_verified`) when the plain claims are absent.
    pub fn apply_namespace(&mut self, namespace: &str) {
        if self.email_verified.is_none() {
            self.email_verified = self
                .extra
                .get(&format!("{namespace}email_verified"))
                .and_then(serde_json::Value::as_bool);
        }
        if self.email.is_none() {
            self.email = self
                .extra
                .get(&format!("{namespace}email"))
                .and_then(serde_json::Value::as_str)
                .map(String::from);
        }
    }
}
