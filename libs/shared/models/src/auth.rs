use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::UserType;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtHeader {
    pub alg: String,
    pub typ: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub practice_id: Option<String>,
    pub sid: Option<String>,
    pub iat: Option<u64>,
}

/// The authenticated caller, decoded from a bearer token by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
    pub user_type: Option<UserType>,
    pub practice_id: Option<Uuid>,
    pub session_id: Option<String>,
}

impl AuthUser {
    pub fn is_patient(&self) -> bool {
        self.user_type == Some(UserType::Patient)
    }

    /// True when the caller is a dentist account attached to `practice_id`.
    pub fn is_dentist_of(&self, practice_id: Uuid) -> bool {
        self.user_type == Some(UserType::Dentist) && self.practice_id == Some(practice_id)
    }
}
