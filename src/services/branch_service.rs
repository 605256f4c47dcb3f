use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::info;
use uuid::Uuid;

use crate::database::entities::branches;
use crate::errors::{is_unique_violation, BranchError, BranchResult};
use crate::services::validation::ValidationService;

/// Registry of named branches scoped to a project.
///
/// A branch supplies the scoping key the object store uses to isolate
/// divergent edits; creating or deleting one never touches graph object
/// rows.
#[derive(Clone)]
pub struct BranchService {
    db: DatabaseConnection,
}

impl BranchService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Register a new branch name for a project.
    ///
    /// Name uniqueness is case-sensitive per project. The parent branch, if
    /// given, must exist in the same project; it records lineage only.
    pub async fn create_branch(
        &self,
        project_id: Uuid,
        name: &str,
        parent_branch_id: Option<Uuid>,
    ) -> BranchResult<branches::Model> {
        let name = ValidationService::validate_branch_name(name)
            .map_err(|e| BranchError::Validation(e.to_string()))?;

        if let Some(parent_id) = parent_branch_id {
            self.require_branch(project_id, parent_id)
                .await
                .map_err(|_| BranchError::ParentNotFound(parent_id))?;
        }

        let existing = branches::Entity::find()
            .filter(branches::Column::ProjectId.eq(project_id))
            .filter(branches::Column::Name.eq(name.clone()))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(BranchError::DuplicateName(name));
        }

        let branch = branches::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(name.clone()),
            parent_branch_id: Set(parent_branch_id),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };

        // Two concurrent creates can both pass the existence check; the
        // unique index decides and the loser gets a typed conflict.
        let branch = branch.insert(&self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                BranchError::DuplicateName(name.clone())
            } else {
                BranchError::Database(err)
            }
        })?;

        info!(
            "Created branch '{}' ({}) in project {}",
            branch.name, branch.id, project_id
        );

        Ok(branch)
    }

    /// Get a branch by id within a project.
    pub async fn get_branch(
        &self,
        project_id: Uuid,
        branch_id: Uuid,
    ) -> BranchResult<branches::Model> {
        self.require_branch(project_id, branch_id).await
    }

    /// List branches for a project, newest first.
    pub async fn list_branches(&self, project_id: Uuid) -> BranchResult<Vec<branches::Model>> {
        let branches = branches::Entity::find()
            .filter(branches::Column::ProjectId.eq(project_id))
            .order_by_desc(branches::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(branches)
    }

    /// Rename a branch; the new name must be free in the project.
    pub async fn rename_branch(
        &self,
        project_id: Uuid,
        branch_id: Uuid,
        name: &str,
    ) -> BranchResult<branches::Model> {
        let name = ValidationService::validate_branch_name(name)
            .map_err(|e| BranchError::Validation(e.to_string()))?;

        let branch = self.require_branch(project_id, branch_id).await?;

        let taken = branches::Entity::find()
            .filter(branches::Column::ProjectId.eq(project_id))
            .filter(branches::Column::Name.eq(name.clone()))
            .filter(branches::Column::Id.ne(branch_id))
            .one(&self.db)
            .await?;
        if taken.is_some() {
            return Err(BranchError::DuplicateName(name));
        }

        let mut active: branches::ActiveModel = branch.into();
        active.name = Set(name.clone());
        active.updated_at = Set(Utc::now());

        let branch = active.update(&self.db).await.map_err(|err| {
            if is_unique_violation(&err) {
                BranchError::DuplicateName(name.clone())
            } else {
                BranchError::Database(err)
            }
        })?;

        Ok(branch)
    }

    /// Remove a branch from the registry.
    ///
    /// Object rows written under this branch keep their `branch_id`; their
    /// version history is untouched.
    pub async fn delete_branch(&self, project_id: Uuid, branch_id: Uuid) -> BranchResult<()> {
        self.require_branch(project_id, branch_id).await?;

        branches::Entity::delete_by_id(branch_id)
            .exec(&self.db)
            .await?;

        info!("Deleted branch {} from project {}", branch_id, project_id);

        Ok(())
    }

    async fn require_branch(
        &self,
        project_id: Uuid,
        branch_id: Uuid,
    ) -> BranchResult<branches::Model> {
        let branch = branches::Entity::find_by_id(branch_id)
            .one(&self.db)
            .await?
            .filter(|branch| branch.project_id == project_id);

        branch.ok_or(BranchError::NotFound(branch_id))
    }
}
