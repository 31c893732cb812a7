use crate::models::contributions;

use anyhow::bail;
use chrono::NaiveDateTime;
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ContributionRepository {
    conn: PgPool,
}

impl ContributionRepository {
    pub fn new(conn: PgPool) -> Self {
        ContributionRepository { conn }
    }

    /// Single attempt, no silent retry: a retried insert on a flaky connection
    /// could record a payment twice.
    pub async fn insert_contribution(
        &self,
        user_id: &str,
        project_id: &str,
        amount_in_cents: i64,
    ) -> Result<contributions::Contribution, anyhow::Error> {
        if amount_in_cents < 0 {
            bail!("NegativeContributionAmount")
        }

        let contribution_id = Uuid::new_v4().hyphenated().to_string();

        let contribution = sqlx::query_as::<_, contributions::Contribution>(
            r#"
                INSERT INTO contributions (id, user_id, project_id, amount_in_cents)
                VALUES ($1, $2, $3, $4)
                RETURNING *
            "#,
        )
        .bind(&contribution_id)
        .bind(user_id)
        .bind(project_id)
        .bind(amount_in_cents)
        .fetch_one(&self.conn)
        .await?;

        Ok(contribution)
    }

    /// One broad fetch for every member of a resolved tree. `since` only trims
    /// volume at the same day boundary the compiled predicate uses; the
    /// predicate stays the single source of filtering truth.
    pub async fn get_for_users(
        &self,
        user_ids: &[String],
        since: Option<NaiveDateTime>,
    ) -> Result<Vec<contributions::Contribution>, anyhow::Error> {
        let rows = sqlx::query_as::<_, contributions::Contribution>(
            r#"
                SELECT * FROM contributions
                WHERE user_id = ANY($1)
                AND ($2::timestamp IS NULL OR created_at >= $2)
                ORDER BY created_at DESC
            "#,
        )
        .bind(user_ids)
        .bind(since)
        .fetch_all(&self.conn)
        .await?;

        Ok(rows)
    }
}
