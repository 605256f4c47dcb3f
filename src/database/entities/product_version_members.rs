use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One captured canonical identity inside a release snapshot.
///
/// `object_version_id` points at the exact graph object version row that was
/// the head when the snapshot was taken.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_version_members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_version_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub canonical_id: Uuid,
    pub object_version_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product_versions::Entity",
        from = "Column::ProductVersionId",
        to = "super::product_versions::Column::Id"
    )]
    ProductVersions,
    #[sea_orm(
        belongs_to = "super::graph_objects::Entity",
        from = "Column::ObjectVersionId",
        to = "super::graph_objects::Column::Id"
    )]
    GraphObjects,
}

impl Related<super::product_versions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductVersions.def()
    }
}

impl Related<super::graph_objects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GraphObjects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
