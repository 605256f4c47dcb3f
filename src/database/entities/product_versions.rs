use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Release snapshot header.
///
/// Immutable once created; the captured membership lives in
/// `product_version_members`. `base_product_version_id` records lineage for
/// display and does not affect which objects were captured.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_versions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub base_product_version_id: Option<Uuid>,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_version_members::Entity")]
    ProductVersionMembers,
}

impl Related<super::product_version_members::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVersionMembers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
