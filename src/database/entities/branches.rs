use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Named branch registry.
///
/// A branch only registers a name that graph object writes may reference as
/// `branch_id`; creating one has no effect on existing object rows.
/// `parent_branch_id` records lineage for display and is not used to inherit
/// object state.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "branches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub parent_branch_id: Option<Uuid>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::graph_objects::Entity")]
    GraphObjects,
}

impl Related<super::graph_objects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::GraphObjects.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
