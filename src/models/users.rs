use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub display_name: String,
    pub referred_by: Option<String>,
    pub referral_code: Option<String>,
    pub created_at: chrono::NaiveDateTime,
    pub updated_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub display_name: String,
    /// Referral code of the referring user, if the new user arrived via a share link.
    pub referral_code: Option<String>,
}
