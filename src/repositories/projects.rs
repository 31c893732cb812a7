use crate::models::projects;

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectRepository {
    conn: PgPool,
}

impl ProjectRepository {
    pub fn new(conn: PgPool) -> Self {
        ProjectRepository { conn }
    }

    pub async fn insert_project(&self, name: &str) -> Result<projects::Project, anyhow::Error> {
        let project_id = Uuid::new_v4().hyphenated().to_string();

        let project = sqlx::query_as::<_, projects::Project>(
            "INSERT INTO projects (id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(&project_id)
        .bind(name)
        .fetch_one(&self.conn)
        .await?;

        Ok(project)
    }

    pub async fn get_project(
        &self,
        id: &str,
    ) -> Result<Option<projects::Project>, anyhow::Error> {
        let project = sqlx::query_as::<_, projects::Project>("SELECT * FROM projects WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.conn)
            .await?;

        Ok(project)
    }

    pub async fn list_projects(&self) -> Result<Vec<projects::Project>, anyhow::Error> {
        let projects =
            sqlx::query_as::<_, projects::Project>("SELECT * FROM projects ORDER BY name")
                .fetch_all(&self.conn)
                .await?;

        Ok(projects)
    }
}
