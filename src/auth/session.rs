// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token verification.

use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session-token";

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Claims of a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    #[serde(default)]
    pub iat: i64,
}

/// Authenticated user extracted from a verified session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Canonical user id (`sub`)
    pub user_id: String,
    /// Session expiry (unix seconds)
    pub expires_at: i64,
}

/// Verifies session tokens signed with the shared secret.
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedToken,
            }
        })?;

        let user_id = data.claims.sub.trim();
        if user_id.is_empty() {
            return Err(AuthError::MissingSubject);
        }

        Ok(AuthenticatedUser {
            user_id: user_id.to_string(),
            expires_at: data.claims.exp,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{issue_session, issue_session_with_exp, SESSION_SECRET};

    #[test]
    fn valid_token_yields_subject() {
        let verifier = SessionVerifier::new(SESSION_SECRET);
        let user = verifier.verify(&issue_session("user_123")).unwrap();
        assert_eq!(user.user_id, "user_123");
    }

    #[test]
    fn wrong_secret_is_invalid_signature() {
        let verifier = SessionVerifier::new(b"another-secret");
        assert!(matches!(
            verifier.verify(&issue_session("user_123")),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let verifier = SessionVerifier::new(SESSION_SECRET);
        let token = issue_session_with_exp("user_123", chrono::Utc::now().timestamp() - 3600);
        assert!(matches!(verifier.verify(&token), Err(AuthError::TokenExpired)));
    }

    #[test]
    fn garbage_is_malformed() {
        let verifier = SessionVerifier::new(SESSION_SECRET);
        assert!(matches!(
            verifier.verify("not.a.jwt"),
            Err(AuthError::MalformedToken)
        ));
    }

    #[test]
    fn empty_subject_is_rejected() {
        let verifier = SessionVerifier::new(SESSION_SECRET);
        assert!(matches!(
            verifier.verify(&issue_session("  ")),
            Err(AuthError::MissingSubject)
        ));
    }
}
