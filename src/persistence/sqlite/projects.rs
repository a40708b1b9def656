//! `ProjectRegistry` implementation for [`SqliteStore`].

use async_trait::async_trait;

use crate::{
    models::Project,
    persistence::{error::PersistenceError, sqlite::SqliteStore, traits::ProjectRegistry},
};

#[async_trait]
impl ProjectRegistry for SqliteStore {
    #[tracing::instrument(skip(self), level = "debug")]
    async fn project_by_id(&self, project_id: &str) -> Result<Option<Project>, PersistenceError> {
        self.execute_query_with_error_handling(
            "query project by id",
            sqlx::query_as::<_, Project>("SELECT id, slug, name FROM projects WHERE id = ?")
                .bind(project_id)
                .fetch_optional(self.pool()),
        )
        .await
    }
}

impl SqliteStore {
    /// Registers a project. The registry is owned by the platform's CRUD
    /// surface; this writer exists for seeding and tests.
    pub async fn insert_project(&self, project: &Project) -> Result<(), PersistenceError> {
        self.execute_query_with_error_handling(
            "insert project",
            sqlx::query("INSERT OR REPLACE INTO projects (id, slug, name) VALUES (?, ?, ?)")
                .bind(&project.id)
                .bind(&project.slug)
                .bind(&project.name)
                .execute(self.pool()),
        )
        .await?;
        Ok(())
    }
}
