#![allow(dead_code)]

use graphstore::database::migrations::Migrator;
use graphstore::database::migrations::MigratorTrait;
use graphstore::services::{GraphObjectCreate, GraphObjectService, TenantScope};
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::json;
use uuid::Uuid;

/// In-memory SQLite database with the full schema applied.
///
/// A single pooled connection keeps every session on the same in-memory
/// database and serialises concurrent transactions the way a shared store
/// would.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

pub fn scope() -> TenantScope {
    TenantScope {
        organization_id: Uuid::new_v4(),
        project_id: Uuid::new_v4(),
    }
}

pub fn object_input(object_type: &str, object_key: &str) -> GraphObjectCreate {
    GraphObjectCreate {
        object_type: object_type.to_string(),
        object_key: object_key.to_string(),
        branch_id: None,
        status: Some("draft".to_string()),
        labels: vec![],
        properties: json!({ "title": object_key }),
    }
}

pub fn object_input_on_branch(
    object_type: &str,
    object_key: &str,
    branch_id: Uuid,
) -> GraphObjectCreate {
    GraphObjectCreate {
        branch_id: Some(branch_id),
        ..object_input(object_type, object_key)
    }
}

pub async fn create_object(
    service: &GraphObjectService,
    scope: TenantScope,
    object_type: &str,
    object_key: &str,
) -> graphstore::database::entities::graph_objects::Model {
    service
        .create(scope, object_input(object_type, object_key))
        .await
        .expect("Failed to create test object")
}
