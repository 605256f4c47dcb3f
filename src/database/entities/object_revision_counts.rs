use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Derived revision-count index, one row per canonical identity.
///
/// Rebuilt from `graph_objects` on demand; owned by no single writer. Counts
/// only non-deleted version rows, so tombstones are excluded. Lookups that
/// miss this table fall back to a live count.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "object_revision_counts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub canonical_id: Uuid,
    pub revision_count: i64,
    pub latest_version: i32,
    pub first_created_at: ChronoDateTimeUtc,
    pub last_updated_at: ChronoDateTimeUtc,
    pub refreshed_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
