use crate::downline::tree::ChildSource;
use crate::models::users;

use anyhow::bail;
use async_trait::async_trait;
use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

const CODE_LEN: usize = 8;
const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
/// Collisions on an 8-char code are vanishingly rare; a handful of retries is
/// plenty before giving up with a retryable error.
const MAX_CODE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct UserRepository {
    conn: PgPool,
}

impl UserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    /// The parent pointer is resolved from the referral code here, at creation,
    /// and never updated afterwards. An unknown code yields a parentless user
    /// rather than an error.
    pub async fn insert_user(
        &self,
        display_name: &str,
        referral_code: Option<&str>,
    ) -> Result<users::User, anyhow::Error> {
        let user_id = Uuid::new_v4().hyphenated().to_string();

        let referred_by = match referral_code {
            Some(code) => self
                .get_user_by_referral_code(code)
                .await?
                .map(|referrer| referrer.id),
            None => None,
        };

        let user = sqlx::query_as::<_, users::User>(
            r#"
                INSERT INTO users (id, display_name, referred_by)
                VALUES ($1, $2, $3)
                RETURNING *
            "#,
        )
        .bind(&user_id)
        .bind(display_name)
        .bind(&referred_by)
        .fetch_one(&self.conn)
        .await?;

        Ok(user)
    }

    pub async fn get_user_by_id(
        &self,
        user_id: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        let user = sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(user)
    }

    pub async fn get_user_by_referral_code(
        &self,
        code: &str,
    ) -> Result<Option<users::User>, anyhow::Error> {
        let user =
            sqlx::query_as::<_, users::User>("SELECT * FROM users WHERE referral_code = $1")
                .bind(code)
                .fetch_optional(&self.conn)
                .await?;

        Ok(user)
    }

    pub async fn get_children(
        &self,
        parent_id: &str,
    ) -> Result<Vec<users::User>, anyhow::Error> {
        let children = sqlx::query_as::<_, users::User>(
            "SELECT * FROM users WHERE referred_by = $1 ORDER BY created_at",
        )
        .bind(parent_id)
        .fetch_all(&self.conn)
        .await?;

        Ok(children)
    }

    /// Return the user's referral code, generating one on first access. The
    /// UPDATE is guarded by the unique index on `referral_code` and by the
    /// `IS NULL` check, so a concurrent caller either wins the write or reads
    /// back the winner's code.
    pub async fn ensure_referral_code(&self, user_id: &str) -> Result<String, anyhow::Error> {
        let Some(user) = self.get_user_by_id(user_id).await? else {
            bail!("User not found")
        };
        if let Some(code) = user.referral_code {
            return Ok(code);
        }

        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_referral_code();
            let result = sqlx::query(
                r#"
                    UPDATE users
                    SET referral_code = $1, updated_at = CURRENT_TIMESTAMP
                    WHERE id = $2 AND referral_code IS NULL
                "#,
            )
            .bind(&code)
            .bind(user_id)
            .execute(&self.conn)
            .await;

            match result {
                Ok(done) if done.rows_affected() == 1 => return Ok(code),
                Ok(_) => {
                    // another request assigned a code first
                    if let Some(user) = self.get_user_by_id(user_id).await? {
                        if let Some(code) = user.referral_code {
                            return Ok(code);
                        }
                    }
                }
                Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                    log::warn!("Referral code collision for {}, regenerating", user_id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        bail!("ReferralCodeExhausted")
    }
}

#[async_trait]
impl ChildSource for UserRepository {
    async fn children_of(&self, parent_id: &str) -> Result<Vec<users::User>, anyhow::Error> {
        self.get_children(parent_id).await
    }
}

pub(crate) fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}
