//! Actor context and JWT claims
//!
//! Token issuance lives in the external identity provider; this server only
//! verifies tokens and enforces the staff/patron distinction per operation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Role carried by an authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Staff,
    Patron,
}

/// JWT claims for authenticated actors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorClaims {
    pub sub: String,
    /// Patron id, when the actor is (or acts as) a library member
    pub patron_id: Option<i32>,
    pub role: ActorRole,
    pub exp: i64,
    pub iat: i64,
}

impl ActorClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_staff(&self) -> bool {
        self.role == ActorRole::Staff
    }

    /// Require staff privileges
    pub fn require_staff(&self) -> Result<(), AppError> {
        if self.is_staff() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Staff privileges required".to_string()))
        }
    }

    /// Require that the actor is staff or is the patron in question
    pub fn require_self_or_staff(&self, patron_id: i32) -> Result<(), AppError> {
        if self.is_staff() || self.patron_id == Some(patron_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Patrons may only act on their own account".to_string(),
            ))
        }
    }
}
