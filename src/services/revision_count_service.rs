use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use sea_orm::prelude::DateTimeUtc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::database::batch::insert_in_batches;
use crate::database::entities::{graph_objects, object_revision_counts};
use crate::errors::{GraphStoreError, GraphStoreResult};

/// Derived revision-count index over the object store.
///
/// Purely derivative: `rebuild` recomputes the whole table from
/// `graph_objects` inside one transaction, so concurrent readers keep seeing
/// the previous contents until the rebuild commits. Lookups that miss the
/// cache fall back to a live count.
#[derive(Clone)]
pub struct RevisionCountService {
    db: DatabaseConnection,
}

impl RevisionCountService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Revision count for the object's canonical identity.
    ///
    /// Counts non-deleted version rows, so tombstones do not inflate the
    /// number. Served from the cache when present, live otherwise.
    pub async fn revision_count(&self, version_id: Uuid) -> GraphStoreResult<u64> {
        let row = graph_objects::Entity::find_by_id(version_id)
            .one(&self.db)
            .await?
            .ok_or(GraphStoreError::NotFound(version_id))?;

        let cached = object_revision_counts::Entity::find_by_id(row.canonical_id)
            .one(&self.db)
            .await?;

        if let Some(entry) = cached {
            return Ok(entry.revision_count as u64);
        }

        // Cache miss: the index has not been refreshed for this identity yet.
        let live = graph_objects::Entity::find()
            .filter(graph_objects::Column::CanonicalId.eq(row.canonical_id))
            .filter(graph_objects::Column::DeletedAt.is_null())
            .count(&self.db)
            .await?;

        Ok(live)
    }

    /// Cached entry for a canonical identity, if the cache holds one.
    pub async fn cached_entry(
        &self,
        canonical_id: Uuid,
    ) -> GraphStoreResult<Option<object_revision_counts::Model>> {
        let entry = object_revision_counts::Entity::find_by_id(canonical_id)
            .one(&self.db)
            .await?;

        Ok(entry)
    }

    /// Rebuild the whole index from the object store.
    ///
    /// Returns the number of canonical identities indexed.
    pub async fn rebuild(&self) -> GraphStoreResult<u64> {
        let rows: Vec<(Uuid, i32, DateTimeUtc)> = graph_objects::Entity::find()
            .select_only()
            .column(graph_objects::Column::CanonicalId)
            .column(graph_objects::Column::Version)
            .column(graph_objects::Column::CreatedAt)
            .filter(graph_objects::Column::DeletedAt.is_null())
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut aggregates: HashMap<Uuid, RevisionAggregate> = HashMap::new();
        for (canonical_id, version, created_at) in rows {
            let entry = aggregates
                .entry(canonical_id)
                .or_insert_with(|| RevisionAggregate::new(version, created_at));
            entry.observe(version, created_at);
        }

        let refreshed_at = Utc::now();
        let entries: Vec<object_revision_counts::ActiveModel> = aggregates
            .into_iter()
            .map(
                |(canonical_id, aggregate)| object_revision_counts::ActiveModel {
                    canonical_id: Set(canonical_id),
                    revision_count: Set(aggregate.revision_count),
                    latest_version: Set(aggregate.latest_version),
                    first_created_at: Set(aggregate.first_created_at),
                    last_updated_at: Set(aggregate.last_updated_at),
                    refreshed_at: Set(refreshed_at),
                },
            )
            .collect();
        let indexed = entries.len() as u64;

        let txn = self.db.begin().await?;
        object_revision_counts::Entity::delete_many()
            .exec(&txn)
            .await?;
        insert_in_batches::<object_revision_counts::Entity, _, _>(&txn, entries).await?;
        txn.commit().await?;

        info!("Rebuilt revision count cache: {} identities", indexed);

        Ok(indexed)
    }

    /// Spawn a background task refreshing the index on a fixed interval.
    ///
    /// Refresh failures are logged and the loop keeps going; readers are
    /// never blocked by a refresh.
    pub fn start_periodic_refresh(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = service.rebuild().await {
                    warn!("Revision count cache refresh failed: {}", err);
                }
            }
        })
    }
}

struct RevisionAggregate {
    revision_count: i64,
    latest_version: i32,
    first_created_at: DateTimeUtc,
    last_updated_at: DateTimeUtc,
}

impl RevisionAggregate {
    fn new(version: i32, created_at: DateTimeUtc) -> Self {
        Self {
            revision_count: 0,
            latest_version: version,
            first_created_at: created_at,
            last_updated_at: created_at,
        }
    }

    fn observe(&mut self, version: i32, created_at: DateTimeUtc) {
        self.revision_count += 1;
        self.latest_version = self.latest_version.max(version);
        self.first_created_at = self.first_created_at.min(created_at);
        self.last_updated_at = self.last_updated_at.max(created_at);
    }
}
