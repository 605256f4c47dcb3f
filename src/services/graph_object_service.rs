use std::collections::HashMap;

use chrono::Utc;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::entities::graph_objects;
use crate::errors::{GraphStoreError, GraphStoreResult};
use crate::services::validation::ValidationService;

/// Tenancy scope applied by the calling layer before reaching the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TenantScope {
    pub organization_id: Uuid,
    pub project_id: Uuid,
}

/// Service owning object identity, version chains, and soft deletion.
///
/// Every write appends exactly one `graph_objects` row inside its own
/// transaction; the transaction boundary is what serialises concurrent
/// read-max/write-max+1 version assignments for a canonical identity.
#[derive(Clone)]
pub struct GraphObjectService {
    db: DatabaseConnection,
}

impl GraphObjectService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a new logical object at version 1.
    ///
    /// The new row's `canonical_id` equals its own id. Fails with
    /// `KeyConflict` when a live identity already holds the same
    /// `(org, project, branch, type, key)` tuple.
    pub async fn create(
        &self,
        scope: TenantScope,
        input: GraphObjectCreate,
    ) -> GraphStoreResult<graph_objects::Model> {
        let object_type = ValidationService::validate_object_type(&input.object_type)
            .map_err(|e| GraphStoreError::Validation(e.to_string()))?;
        let object_key = ValidationService::validate_object_key(&input.object_key)
            .map_err(|e| GraphStoreError::Validation(e.to_string()))?;
        ValidationService::validate_properties(&input.properties)
            .map_err(|e| GraphStoreError::Validation(e.to_string()))?;

        let txn = self.db.begin().await?;

        if key_tuple_is_live(&txn, scope, input.branch_id, &object_type, &object_key).await? {
            return Err(GraphStoreError::KeyConflict {
                object_type,
                object_key,
            });
        }

        let id = Uuid::new_v4();
        let object = graph_objects::ActiveModel {
            id: Set(id),
            canonical_id: Set(id),
            organization_id: Set(scope.organization_id),
            project_id: Set(scope.project_id),
            branch_id: Set(input.branch_id),
            object_type: Set(object_type),
            object_key: Set(object_key),
            version: Set(1),
            status: Set(input.status),
            labels: Set(json!(input.labels)),
            properties: Set(input.properties),
            supersedes_id: Set(None),
            deleted_at: Set(None),
            created_at: Set(Utc::now()),
        };

        let object = object.insert(&txn).await?;
        txn.commit().await?;

        info!(
            "Created graph object {} ({}/{}) in project {}",
            object.id, object.object_type, object.object_key, scope.project_id
        );

        Ok(object)
    }

    /// Fetch a specific version row, deleted or not.
    pub async fn get(
        &self,
        scope: TenantScope,
        version_id: Uuid,
    ) -> GraphStoreResult<graph_objects::Model> {
        find_version_in_scope(&self.db, scope, version_id).await
    }

    /// Append a new version carrying the delta over the current head.
    ///
    /// `properties` in the delta are shallow-merged over the head's
    /// properties; `status` and `labels` are replaced only when given. The
    /// canonical identity and branch lineage never change.
    pub async fn patch(
        &self,
        scope: TenantScope,
        version_id: Uuid,
        delta: GraphObjectPatch,
    ) -> GraphStoreResult<graph_objects::Model> {
        if let Some(properties) = &delta.properties {
            ValidationService::validate_properties(properties)
                .map_err(|e| GraphStoreError::Validation(e.to_string()))?;
        }

        let txn = self.db.begin().await?;

        let resolved = find_version_in_scope(&txn, scope, version_id).await?;
        let head = live_head(&txn, resolved.canonical_id)
            .await?
            .ok_or(GraphStoreError::NotFound(version_id))?;

        let properties = match &delta.properties {
            Some(incoming) => merge_properties(&head.properties, incoming),
            None => head.properties.clone(),
        };
        let labels = match delta.labels {
            Some(labels) => json!(labels),
            None => head.labels.clone(),
        };
        let status = match delta.status {
            Some(status) => Some(status),
            None => head.status.clone(),
        };

        let object = graph_objects::ActiveModel {
            id: Set(Uuid::new_v4()),
            canonical_id: Set(head.canonical_id),
            organization_id: Set(head.organization_id),
            project_id: Set(head.project_id),
            branch_id: Set(head.branch_id),
            object_type: Set(head.object_type.clone()),
            object_key: Set(head.object_key.clone()),
            version: Set(head.version + 1),
            status: Set(status),
            labels: Set(labels),
            properties: Set(properties),
            supersedes_id: Set(Some(head.id)),
            deleted_at: Set(None),
            created_at: Set(Utc::now()),
        };

        let object = object.insert(&txn).await?;
        txn.commit().await?;

        debug!(
            "Patched graph object {} to version {}",
            object.canonical_id, object.version
        );

        Ok(object)
    }

    /// Soft-delete the identity by appending a tombstone version.
    ///
    /// Historical versions stay addressable; `head_version` and `search`
    /// stop returning the identity.
    pub async fn soft_delete(&self, scope: TenantScope, version_id: Uuid) -> GraphStoreResult<()> {
        let txn = self.db.begin().await?;

        let resolved = find_version_in_scope(&txn, scope, version_id).await?;
        let head = live_head(&txn, resolved.canonical_id)
            .await?
            .ok_or(GraphStoreError::NotFound(version_id))?;

        let tombstone = graph_objects::ActiveModel {
            id: Set(Uuid::new_v4()),
            canonical_id: Set(head.canonical_id),
            organization_id: Set(head.organization_id),
            project_id: Set(head.project_id),
            branch_id: Set(head.branch_id),
            object_type: Set(head.object_type.clone()),
            object_key: Set(head.object_key.clone()),
            version: Set(head.version + 1),
            status: Set(head.status.clone()),
            labels: Set(head.labels.clone()),
            properties: Set(head.properties.clone()),
            supersedes_id: Set(Some(head.id)),
            deleted_at: Set(Some(Utc::now())),
            created_at: Set(Utc::now()),
        };

        tombstone.insert(&txn).await?;
        txn.commit().await?;

        info!("Soft-deleted graph object {}", head.canonical_id);

        Ok(())
    }

    /// Bring a deleted identity back by appending a live version.
    ///
    /// Fails with `KeyConflict` when another live identity claimed the key
    /// tuple in the meantime.
    pub async fn restore(
        &self,
        scope: TenantScope,
        version_id: Uuid,
    ) -> GraphStoreResult<graph_objects::Model> {
        let txn = self.db.begin().await?;

        let resolved = find_version_in_scope(&txn, scope, version_id).await?;
        let head = head_row(&txn, resolved.canonical_id)
            .await?
            .ok_or(GraphStoreError::NotFound(version_id))?;

        if head.deleted_at.is_none() {
            return Err(GraphStoreError::Validation(
                "Object is not deleted".to_string(),
            ));
        }

        if key_tuple_is_live(
            &txn,
            scope,
            head.branch_id,
            &head.object_type,
            &head.object_key,
        )
        .await?
        {
            return Err(GraphStoreError::KeyConflict {
                object_type: head.object_type.clone(),
                object_key: head.object_key.clone(),
            });
        }

        let object = graph_objects::ActiveModel {
            id: Set(Uuid::new_v4()),
            canonical_id: Set(head.canonical_id),
            organization_id: Set(head.organization_id),
            project_id: Set(head.project_id),
            branch_id: Set(head.branch_id),
            object_type: Set(head.object_type.clone()),
            object_key: Set(head.object_key.clone()),
            version: Set(head.version + 1),
            status: Set(head.status.clone()),
            labels: Set(head.labels.clone()),
            properties: Set(head.properties.clone()),
            supersedes_id: Set(Some(head.id)),
            deleted_at: Set(None),
            created_at: Set(Utc::now()),
        };

        let object = object.insert(&txn).await?;
        txn.commit().await?;

        info!("Restored graph object {}", object.canonical_id);

        Ok(object)
    }

    /// Current head for a canonical identity on an exact branch partition.
    ///
    /// `None` when the identity does not exist on that partition or its
    /// highest version is a tombstone.
    pub async fn head_version(
        &self,
        scope: TenantScope,
        canonical_id: Uuid,
        branch_id: Option<Uuid>,
    ) -> GraphStoreResult<Option<graph_objects::Model>> {
        let mut query = graph_objects::Entity::find()
            .filter(graph_objects::Column::OrganizationId.eq(scope.organization_id))
            .filter(graph_objects::Column::ProjectId.eq(scope.project_id))
            .filter(graph_objects::Column::CanonicalId.eq(canonical_id));
        query = filter_branch_partition(query, branch_id);

        let head = query
            .order_by_desc(graph_objects::Column::Version)
            .one(&self.db)
            .await?;

        Ok(head.filter(|row| row.deleted_at.is_none()))
    }

    /// Every version of the canonical identity, newest first.
    pub async fn history(
        &self,
        scope: TenantScope,
        version_id: Uuid,
    ) -> GraphStoreResult<Vec<graph_objects::Model>> {
        let resolved = find_version_in_scope(&self.db, scope, version_id).await?;

        let versions = graph_objects::Entity::find()
            .filter(graph_objects::Column::CanonicalId.eq(resolved.canonical_id))
            .order_by_desc(graph_objects::Column::Version)
            .all(&self.db)
            .await?;

        Ok(versions)
    }

    /// Branch-isolated listing of current head rows.
    ///
    /// `branch_id: None` and a concrete branch id are mutually exclusive
    /// partitions; nothing is inherited across them.
    pub async fn search(
        &self,
        scope: TenantScope,
        filters: ObjectSearchFilters,
    ) -> GraphStoreResult<Vec<graph_objects::Model>> {
        let mut query = graph_objects::Entity::find()
            .filter(graph_objects::Column::OrganizationId.eq(scope.organization_id))
            .filter(graph_objects::Column::ProjectId.eq(scope.project_id));
        query = filter_branch_partition(query, filters.branch_id);
        if let Some(object_type) = &filters.object_type {
            query = query.filter(graph_objects::Column::ObjectType.eq(object_type.clone()));
        }

        let rows = query.all(&self.db).await?;

        // Reduce version rows to the head of each canonical identity.
        let mut heads: HashMap<Uuid, graph_objects::Model> = HashMap::new();
        for row in rows {
            match heads.get(&row.canonical_id) {
                Some(existing) if existing.version >= row.version => {}
                _ => {
                    heads.insert(row.canonical_id, row);
                }
            }
        }

        let mut items: Vec<graph_objects::Model> = heads
            .into_values()
            .filter(|head| filters.include_deleted || head.deleted_at.is_none())
            .filter(|head| {
                filters.labels.is_empty() || {
                    let labels = head.label_strings();
                    filters.labels.iter().all(|label| labels.contains(label))
                }
            })
            .collect();

        items.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        if let Some(limit) = filters.limit {
            items.truncate(limit as usize);
        }

        Ok(items)
    }
}

/// Input for creating a graph object
pub struct GraphObjectCreate {
    pub object_type: String,
    pub object_key: String,
    pub branch_id: Option<Uuid>,
    pub status: Option<String>,
    pub labels: Vec<String>,
    pub properties: Value,
}

/// Delta applied by a patch; unset fields carry forward from the head
#[derive(Default)]
pub struct GraphObjectPatch {
    pub status: Option<String>,
    pub labels: Option<Vec<String>>,
    pub properties: Option<Value>,
}

/// Filters for branch-isolated object listing
#[derive(Default)]
pub struct ObjectSearchFilters {
    pub branch_id: Option<Uuid>,
    pub object_type: Option<String>,
    pub labels: Vec<String>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
}

fn filter_branch_partition(
    query: Select<graph_objects::Entity>,
    branch_id: Option<Uuid>,
) -> Select<graph_objects::Entity> {
    match branch_id {
        Some(id) => query.filter(graph_objects::Column::BranchId.eq(id)),
        None => query.filter(graph_objects::Column::BranchId.is_null()),
    }
}

async fn find_version_in_scope<C>(
    conn: &C,
    scope: TenantScope,
    version_id: Uuid,
) -> GraphStoreResult<graph_objects::Model>
where
    C: ConnectionTrait,
{
    let row = graph_objects::Entity::find_by_id(version_id)
        .one(conn)
        .await?
        .filter(|row| {
            row.organization_id == scope.organization_id && row.project_id == scope.project_id
        });

    row.ok_or(GraphStoreError::NotFound(version_id))
}

async fn head_row<C>(
    conn: &C,
    canonical_id: Uuid,
) -> Result<Option<graph_objects::Model>, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    graph_objects::Entity::find()
        .filter(graph_objects::Column::CanonicalId.eq(canonical_id))
        .order_by_desc(graph_objects::Column::Version)
        .one(conn)
        .await
}

async fn live_head<C>(
    conn: &C,
    canonical_id: Uuid,
) -> Result<Option<graph_objects::Model>, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    Ok(head_row(conn, canonical_id)
        .await?
        .filter(|row| row.deleted_at.is_none()))
}

/// True when a live identity currently holds the key tuple on the branch.
async fn key_tuple_is_live<C>(
    conn: &C,
    scope: TenantScope,
    branch_id: Option<Uuid>,
    object_type: &str,
    object_key: &str,
) -> Result<bool, sea_orm::DbErr>
where
    C: ConnectionTrait,
{
    let mut query = graph_objects::Entity::find()
        .select_only()
        .column(graph_objects::Column::CanonicalId)
        .column(graph_objects::Column::Version)
        .column(graph_objects::Column::DeletedAt)
        .filter(graph_objects::Column::OrganizationId.eq(scope.organization_id))
        .filter(graph_objects::Column::ProjectId.eq(scope.project_id))
        .filter(graph_objects::Column::ObjectType.eq(object_type))
        .filter(graph_objects::Column::ObjectKey.eq(object_key));
    query = filter_branch_partition(query, branch_id);

    let rows: Vec<(Uuid, i32, Option<DateTimeUtc>)> = query.into_tuple().all(conn).await?;

    // The key tuple may have passed through several identities over time
    // (created, deleted, re-created); only each identity's head row counts.
    let mut heads: HashMap<Uuid, (i32, bool)> = HashMap::new();
    for (canonical_id, version, deleted_at) in rows {
        let entry = heads.entry(canonical_id).or_insert((0, true));
        if version > entry.0 {
            *entry = (version, deleted_at.is_some());
        }
    }

    Ok(heads.values().any(|(_, deleted)| !deleted))
}

/// Shallow-merge a properties delta over the base object.
fn merge_properties(base: &Value, delta: &Value) -> Value {
    match (base, delta) {
        (Value::Object(base_map), Value::Object(delta_map)) => {
            let mut merged = base_map.clone();
            for (key, value) in delta_map {
                merged.insert(key.clone(), value.clone());
            }
            Value::Object(merged)
        }
        _ => delta.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overwrites_only_given_keys() {
        let base = json!({"title": "Original", "priority": "high"});
        let delta = json!({"title": "Updated"});
        let merged = merge_properties(&base, &delta);
        assert_eq!(merged["title"], "Updated");
        assert_eq!(merged["priority"], "high");
    }

    #[test]
    fn test_merge_adds_new_keys() {
        let base = json!({"title": "Original"});
        let delta = json!({"owner": "alice"});
        let merged = merge_properties(&base, &delta);
        assert_eq!(merged["title"], "Original");
        assert_eq!(merged["owner"], "alice");
    }
}
