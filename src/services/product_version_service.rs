use std::collections::HashMap;

use chrono::Utc;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::batch::insert_in_batches;
use crate::database::entities::{graph_objects, product_version_members, product_versions};
use crate::database::lock::NamedLockRegistry;
use crate::errors::{is_unique_violation, ProductVersionError, ProductVersionResult};
use crate::services::validation::ValidationService;

const DEFAULT_PAGE_SIZE: u64 = 50;
const MAX_PAGE_SIZE: u64 = 200;

/// Service that freezes the project's current head state into immutable,
/// named release snapshots.
///
/// Creation is serialised per `(project, lowercase(name))` through a named
/// lock, so two concurrent calls with the same name resolve to one success
/// and one `NameExists` instead of racing the unique index into an opaque
/// failure. All other project activity proceeds unblocked.
///
/// Clones share the lock registry; use one service instance per process.
#[derive(Clone)]
pub struct ProductVersionService {
    db: DatabaseConnection,
    locks: NamedLockRegistry,
}

impl ProductVersionService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            locks: NamedLockRegistry::new(),
        }
    }

    /// Create a release snapshot of every live canonical identity.
    ///
    /// Captures the project-wide head version per identity across all
    /// branches. The header insert and the batched member writes happen in
    /// one transaction: either the snapshot exists with all its members or
    /// not at all.
    pub async fn create_product_version(
        &self,
        project_id: Uuid,
        input: ProductVersionCreate,
    ) -> ProductVersionResult<ProductVersionSummary> {
        let name = ValidationService::validate_product_version_name(&input.name)
            .map_err(|e| ProductVersionError::Validation(e.to_string()))?;

        let lock_key = format!("product_version:{}:{}", project_id, name.to_lowercase());
        let _guard = self.locks.acquire(&lock_key).await;

        // Re-check uniqueness now that we hold the lock; a concurrent
        // creation may have landed while we waited.
        if self.name_taken(project_id, &name).await? {
            return Err(ProductVersionError::NameExists(name));
        }

        if let Some(base_id) = input.base_product_version_id {
            self.require_in_project(project_id, base_id).await?;
        }

        let txn = self.db.begin().await?;

        let version = product_versions::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            name: Set(name.clone()),
            description: Set(input.description.clone()),
            base_product_version_id: Set(input.base_product_version_id),
            created_at: Set(Utc::now()),
        };

        let version = version.insert(&txn).await.map_err(|err| {
            if is_unique_violation(&err) {
                ProductVersionError::NameExists(name.clone())
            } else {
                ProductVersionError::Database(err)
            }
        })?;

        let members = live_head_members(&txn, project_id, version.id).await?;
        let member_count = members.len();

        insert_in_batches::<product_version_members::Entity, _, _>(&txn, members).await?;

        txn.commit().await?;

        info!(
            "Created product version '{}' ({}) with {} members in project {}",
            version.name, version.id, member_count, project_id
        );

        Ok(ProductVersionSummary {
            id: version.id,
            name: version.name,
            description: version.description,
            base_product_version_id: version.base_product_version_id,
            created_at: version.created_at,
            member_count: member_count as u64,
        })
    }

    /// Get a snapshot summary with its member count.
    pub async fn get_product_version(
        &self,
        project_id: Uuid,
        version_id: Uuid,
    ) -> ProductVersionResult<ProductVersionSummary> {
        let version = self.require_in_project(project_id, version_id).await?;

        let member_count = product_version_members::Entity::find()
            .filter(product_version_members::Column::ProductVersionId.eq(version_id))
            .count(&self.db)
            .await?;

        Ok(ProductVersionSummary {
            id: version.id,
            name: version.name,
            description: version.description,
            base_product_version_id: version.base_product_version_id,
            created_at: version.created_at,
            member_count,
        })
    }

    /// List snapshots for a project, newest first, with keyset pagination.
    pub async fn list_product_versions(
        &self,
        project_id: Uuid,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> ProductVersionResult<ProductVersionPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut query = product_versions::Entity::find()
            .filter(product_versions::Column::ProjectId.eq(project_id));

        if let Some(cursor) = cursor {
            let (created_at, id) = parse_cursor(cursor)?;
            query = query.filter(
                Condition::any()
                    .add(product_versions::Column::CreatedAt.lt(created_at))
                    .add(
                        Condition::all()
                            .add(product_versions::Column::CreatedAt.eq(created_at))
                            .add(product_versions::Column::Id.lt(id)),
                    ),
            );
        }

        // Fetch one extra row to learn whether another page exists.
        let mut rows = query
            .order_by_desc(product_versions::Column::CreatedAt)
            .order_by_desc(product_versions::Column::Id)
            .limit(limit + 1)
            .all(&self.db)
            .await?;

        let has_more = rows.len() as u64 > limit;
        rows.truncate(limit as usize);

        let next_cursor = if has_more {
            rows.last().map(|last| encode_cursor(last))
        } else {
            None
        };

        let counts = self.member_counts(&rows).await?;
        let items = rows
            .into_iter()
            .map(|version| {
                let member_count = counts.get(&version.id).copied().unwrap_or(0) as u64;
                ProductVersionSummary {
                    id: version.id,
                    name: version.name,
                    description: version.description,
                    base_product_version_id: version.base_product_version_id,
                    created_at: version.created_at,
                    member_count,
                }
            })
            .collect();

        Ok(ProductVersionPage { items, next_cursor })
    }

    /// Membership rows of a snapshot, ordered by canonical identity.
    pub async fn members(
        &self,
        project_id: Uuid,
        version_id: Uuid,
    ) -> ProductVersionResult<Vec<product_version_members::Model>> {
        self.require_in_project(project_id, version_id).await?;

        let mut members = product_version_members::Entity::find()
            .filter(product_version_members::Column::ProductVersionId.eq(version_id))
            .order_by_asc(product_version_members::Column::CanonicalId)
            .all(&self.db)
            .await?;

        // Do not rely on the storage collation for UUID ordering.
        members.sort_by_key(|member| member.canonical_id);

        Ok(members)
    }

    pub(crate) async fn require_in_project(
        &self,
        project_id: Uuid,
        version_id: Uuid,
    ) -> ProductVersionResult<product_versions::Model> {
        let version = product_versions::Entity::find_by_id(version_id)
            .one(&self.db)
            .await?
            .filter(|version| version.project_id == project_id);

        version.ok_or(ProductVersionError::NotFound(version_id))
    }

    async fn name_taken(&self, project_id: Uuid, name: &str) -> ProductVersionResult<bool> {
        let lowered = name.to_lowercase();
        let names: Vec<String> = product_versions::Entity::find()
            .select_only()
            .column(product_versions::Column::Name)
            .filter(product_versions::Column::ProjectId.eq(project_id))
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(names.iter().any(|taken| taken.to_lowercase() == lowered))
    }

    async fn member_counts(
        &self,
        versions: &[product_versions::Model],
    ) -> ProductVersionResult<HashMap<Uuid, i64>> {
        if versions.is_empty() {
            return Ok(HashMap::new());
        }

        let ids: Vec<Uuid> = versions.iter().map(|version| version.id).collect();
        let counts: Vec<(Uuid, i64)> = product_version_members::Entity::find()
            .select_only()
            .column(product_version_members::Column::ProductVersionId)
            .column_as(
                product_version_members::Column::CanonicalId.count(),
                "member_count",
            )
            .filter(product_version_members::Column::ProductVersionId.is_in(ids))
            .group_by(product_version_members::Column::ProductVersionId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(counts.into_iter().collect())
    }
}

/// Input for snapshot creation
pub struct ProductVersionCreate {
    pub name: String,
    pub description: Option<String>,
    pub base_product_version_id: Option<Uuid>,
}

/// Snapshot summary returned to callers
#[derive(Clone, Debug, PartialEq)]
pub struct ProductVersionSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_product_version_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
    pub member_count: u64,
}

/// One page of snapshot summaries
pub struct ProductVersionPage {
    pub items: Vec<ProductVersionSummary>,
    pub next_cursor: Option<String>,
}

/// Enumerate the head version row of every live canonical identity in the
/// project, across all branches, as membership rows for `version_id`.
async fn live_head_members<C>(
    conn: &C,
    project_id: Uuid,
    version_id: Uuid,
) -> Result<Vec<product_version_members::ActiveModel>, sea_orm::DbErr>
where
    C: sea_orm::ConnectionTrait,
{
    let rows: Vec<(Uuid, Uuid, i32, Option<DateTimeUtc>)> = graph_objects::Entity::find()
        .select_only()
        .column(graph_objects::Column::Id)
        .column(graph_objects::Column::CanonicalId)
        .column(graph_objects::Column::Version)
        .column(graph_objects::Column::DeletedAt)
        .filter(graph_objects::Column::ProjectId.eq(project_id))
        .into_tuple()
        .all(conn)
        .await?;

    // Highest version per canonical identity wins; identities whose head is
    // a tombstone are dropped.
    let mut heads: HashMap<Uuid, (Uuid, i32, bool)> = HashMap::new();
    for (id, canonical_id, version, deleted_at) in rows {
        let entry = heads.entry(canonical_id).or_insert((id, 0, true));
        if version > entry.1 {
            *entry = (id, version, deleted_at.is_some());
        }
    }

    let members: Vec<product_version_members::ActiveModel> = heads
        .into_iter()
        .filter(|(_, (_, _, deleted))| !deleted)
        .map(
            |(canonical_id, (object_version_id, _, _))| product_version_members::ActiveModel {
                product_version_id: Set(version_id),
                canonical_id: Set(canonical_id),
                object_version_id: Set(object_version_id),
            },
        )
        .collect();

    debug!(
        "Captured {} live identities for product version {}",
        members.len(),
        version_id
    );

    Ok(members)
}

fn encode_cursor(version: &product_versions::Model) -> String {
    format!("{}|{}", version.created_at.to_rfc3339(), version.id)
}

fn parse_cursor(cursor: &str) -> ProductVersionResult<(DateTimeUtc, Uuid)> {
    let invalid = || ProductVersionError::Validation("Invalid pagination cursor".to_string());

    let (timestamp, id) = cursor.split_once('|').ok_or_else(invalid)?;
    let created_at = chrono::DateTime::parse_from_rfc3339(timestamp)
        .map_err(|_| invalid())?
        .with_timezone(&chrono::Utc);
    let id = Uuid::parse_str(id).map_err(|_| invalid())?;

    Ok((created_at, id))
}
