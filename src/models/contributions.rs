use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, sqlx::FromRow)]
pub struct Contribution {
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub amount_in_cents: i64,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewContribution {
    /// Absent for guest contributions; a user is provisioned on the fly.
    pub user_id: Option<String>,
    /// Referral code used to attribute a guest contribution to a referrer.
    pub referral_code: Option<String>,
    pub display_name: Option<String>,
    pub project_id: String,
    pub amount_in_cents: i64,
}
