use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Versioned graph object entity.
///
/// One row per version. Rows are append-only: a patch writes a new row with
/// `version = head + 1`, a soft delete writes a tombstone row carrying
/// `deleted_at`. No row is ever updated or physically removed.
///
/// `canonical_id` is the stable identity shared by every version of the same
/// logical object; for the first version it equals `id`. A canonical identity
/// is live while its highest-version row has `deleted_at IS NULL`.
///
/// `branch_id` selects the version lineage: `None` is the default line, a
/// branch id is an independent lineage that may reuse the same
/// `(object_type, object_key)` pair.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "graph_objects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub canonical_id: Uuid,
    pub organization_id: Uuid,
    pub project_id: Uuid,
    pub branch_id: Option<Uuid>,
    pub object_type: String,
    pub object_key: String,
    pub version: i32,
    pub status: Option<String>,
    #[sea_orm(column_type = "JsonBinary")]
    pub labels: serde_json::Value, // JSON array of strings
    #[sea_orm(column_type = "JsonBinary")]
    pub properties: serde_json::Value,
    pub supersedes_id: Option<Uuid>,
    pub deleted_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::branches::Entity",
        from = "Column::BranchId",
        to = "super::branches::Column::Id"
    )]
    Branches,
    #[sea_orm(has_many = "super::product_version_members::Entity")]
    ProductVersionMembers,
}

impl Related<super::branches::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Branches.def()
    }
}

impl Related<super::product_version_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVersionMembers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Labels as plain strings; non-string entries are skipped.
    pub fn label_strings(&self) -> Vec<String> {
        self.labels
            .as_array()
            .map(|values| {
                values
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
