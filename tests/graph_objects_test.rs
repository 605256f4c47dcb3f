mod common;

use common::{create_object, object_input, object_input_on_branch, scope, setup_db};
use graphstore::errors::GraphStoreError;
use graphstore::services::{
    BranchService, GraphObjectCreate, GraphObjectPatch, GraphObjectService, ObjectSearchFilters,
};
use serde_json::json;

#[tokio::test]
async fn test_create_assigns_version_one_and_canonical_identity() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let object = service
        .create(
            scope,
            GraphObjectCreate {
                object_type: "Requirement".to_string(),
                object_key: "REQ-1".to_string(),
                branch_id: None,
                status: Some("draft".to_string()),
                labels: vec!["security".to_string(), "mvp".to_string()],
                properties: json!({ "title": "User Authentication" }),
            },
        )
        .await
        .expect("create should succeed");

    assert_eq!(object.version, 1);
    assert_eq!(object.canonical_id, object.id);
    assert_eq!(object.supersedes_id, None);
    assert_eq!(object.status.as_deref(), Some("draft"));
    assert_eq!(object.label_strings(), vec!["security", "mvp"]);
    assert_eq!(object.properties["title"], "User Authentication");
    assert!(object.deleted_at.is_none());
}

#[tokio::test]
async fn test_create_rejects_blank_type_and_key() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let blank_type = service
        .create(
            scope,
            GraphObjectCreate {
                object_type: "   ".to_string(),
                ..object_input("x", "k")
            },
        )
        .await;
    assert!(matches!(blank_type, Err(GraphStoreError::Validation(_))));

    let blank_key = service
        .create(
            scope,
            GraphObjectCreate {
                object_key: "".to_string(),
                ..object_input("Requirement", "x")
            },
        )
        .await;
    assert!(matches!(blank_key, Err(GraphStoreError::Validation(_))));
}

#[tokio::test]
async fn test_create_conflicts_on_live_key_same_branch() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    create_object(&service, scope, "Doc", "d1").await;

    let conflict = service.create(scope, object_input("Doc", "d1")).await;
    match conflict {
        Err(GraphStoreError::KeyConflict {
            object_type,
            object_key,
        }) => {
            assert_eq!(object_type, "Doc");
            assert_eq!(object_key, "d1");
        }
        other => panic!("Expected KeyConflict, got {:?}", other.map(|m| m.id)),
    }
}

#[tokio::test]
async fn test_same_key_coexists_across_branches() {
    let db = setup_db().await;
    let objects = GraphObjectService::new(db.clone());
    let branches = BranchService::new(db);
    let scope = scope();

    let branch = branches
        .create_branch(scope.project_id, "feature-x", None)
        .await
        .expect("branch create should succeed");

    let on_default = objects
        .create(scope, object_input("Doc", "d1"))
        .await
        .expect("default-line create should succeed");
    let on_branch = objects
        .create(scope, object_input_on_branch("Doc", "d1", branch.id))
        .await
        .expect("branch create should succeed");

    assert_ne!(on_default.canonical_id, on_branch.canonical_id);

    // Branch isolation: each partition only sees its own objects.
    let default_items = objects
        .search(scope, ObjectSearchFilters::default())
        .await
        .expect("search should succeed");
    assert_eq!(default_items.len(), 1);
    assert_eq!(default_items[0].id, on_default.id);

    let branch_items = objects
        .search(
            scope,
            ObjectSearchFilters {
                branch_id: Some(branch.id),
                ..Default::default()
            },
        )
        .await
        .expect("search should succeed");
    assert_eq!(branch_items.len(), 1);
    assert_eq!(branch_items[0].id, on_branch.id);
}

#[tokio::test]
async fn test_patch_appends_version_and_merges_properties() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let created = service
        .create(
            scope,
            GraphObjectCreate {
                properties: json!({
                    "title": "Original Title",
                    "description": "Original Description",
                    "priority": "high",
                }),
                ..object_input("Requirement", "REQ-1")
            },
        )
        .await
        .expect("create should succeed");

    let patched = service
        .patch(
            scope,
            created.id,
            GraphObjectPatch {
                status: Some("approved".to_string()),
                properties: Some(json!({ "title": "Updated Title" })),
                ..Default::default()
            },
        )
        .await
        .expect("patch should succeed");

    assert_ne!(patched.id, created.id);
    assert_eq!(patched.canonical_id, created.canonical_id);
    assert_eq!(patched.version, 2);
    assert_eq!(patched.supersedes_id, Some(created.id));
    assert_eq!(patched.status.as_deref(), Some("approved"));

    // Unspecified properties carry forward.
    assert_eq!(patched.properties["title"], "Updated Title");
    assert_eq!(patched.properties["description"], "Original Description");
    assert_eq!(patched.properties["priority"], "high");
}

#[tokio::test]
async fn test_concurrent_patches_yield_gapless_versions() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let created = create_object(&service, scope, "Doc", "d1").await;

    let mut handles = Vec::new();
    for i in 0..5 {
        let service = service.clone();
        let version_id = created.id;
        handles.push(tokio::spawn(async move {
            service
                .patch(
                    scope,
                    version_id,
                    GraphObjectPatch {
                        properties: Some(json!({ "attempt": i })),
                        ..Default::default()
                    },
                )
                .await
        }));
    }
    for handle in handles {
        handle
            .await
            .expect("patch task panicked")
            .expect("patch should succeed");
    }

    let history = service
        .history(scope, created.id)
        .await
        .expect("history should succeed");
    let mut versions: Vec<i32> = history.iter().map(|row| row.version).collect();
    versions.sort();
    assert_eq!(versions, vec![1, 2, 3, 4, 5, 6]);
}

#[tokio::test]
async fn test_soft_delete_scenario() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    // Create on the default line and patch twice: version becomes 3.
    let v1 = create_object(&service, scope, "Doc", "d1").await;
    let v2 = service
        .patch(
            scope,
            v1.id,
            GraphObjectPatch {
                properties: Some(json!({ "rev": 2 })),
                ..Default::default()
            },
        )
        .await
        .expect("patch should succeed");
    let v3 = service
        .patch(
            scope,
            v1.id,
            GraphObjectPatch {
                properties: Some(json!({ "rev": 3 })),
                ..Default::default()
            },
        )
        .await
        .expect("patch should succeed");
    assert_eq!(v3.version, 3);

    service
        .soft_delete(scope, v1.id)
        .await
        .expect("delete should succeed");

    // No live head remains.
    let head = service
        .head_version(scope, v1.canonical_id, None)
        .await
        .expect("head lookup should succeed");
    assert!(head.is_none());

    // Historical versions 1-3 stay addressable by explicit version id.
    for row in [&v1, &v2, &v3] {
        let fetched = service
            .get(scope, row.id)
            .await
            .expect("historical version should stay addressable");
        assert_eq!(fetched.version, row.version);
        assert!(fetched.deleted_at.is_none());
    }

    // Live search no longer returns the identity.
    let live = service
        .search(scope, ObjectSearchFilters::default())
        .await
        .expect("search should succeed");
    assert!(live.is_empty());

    // The tombstone head is visible when deleted identities are requested.
    let with_deleted = service
        .search(
            scope,
            ObjectSearchFilters {
                include_deleted: true,
                ..Default::default()
            },
        )
        .await
        .expect("search should succeed");
    assert_eq!(with_deleted.len(), 1);
    assert!(with_deleted[0].deleted_at.is_some());
    assert_eq!(with_deleted[0].version, 4);
}

#[tokio::test]
async fn test_soft_delete_twice_returns_not_found() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let object = create_object(&service, scope, "Doc", "d1").await;
    service
        .soft_delete(scope, object.id)
        .await
        .expect("first delete should succeed");

    let second = service.soft_delete(scope, object.id).await;
    assert!(matches!(second, Err(GraphStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_restore_after_delete() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let object = create_object(&service, scope, "Doc", "d1").await;
    service
        .soft_delete(scope, object.id)
        .await
        .expect("delete should succeed");

    let restored = service
        .restore(scope, object.id)
        .await
        .expect("restore should succeed");

    assert_eq!(restored.canonical_id, object.canonical_id);
    assert!(restored.deleted_at.is_none());

    let head = service
        .head_version(scope, object.canonical_id, None)
        .await
        .expect("head lookup should succeed");
    assert_eq!(head.map(|row| row.id), Some(restored.id));
}

#[tokio::test]
async fn test_restore_of_live_object_rejected() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let object = create_object(&service, scope, "Doc", "d1").await;
    let result = service.restore(scope, object.id).await;
    assert!(matches!(result, Err(GraphStoreError::Validation(_))));
}

#[tokio::test]
async fn test_recreate_after_delete_gets_new_canonical_identity() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let first = create_object(&service, scope, "Doc", "d1").await;
    service
        .soft_delete(scope, first.id)
        .await
        .expect("delete should succeed");

    let second = create_object(&service, scope, "Doc", "d1").await;
    assert_ne!(second.canonical_id, first.canonical_id);
    assert_eq!(second.version, 1);

    // Restoring the old identity would collide with the new holder.
    let restore = service.restore(scope, first.id).await;
    assert!(matches!(restore, Err(GraphStoreError::KeyConflict { .. })));
}

#[tokio::test]
async fn test_history_returns_versions_descending() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    let created = create_object(&service, scope, "Doc", "d1").await;
    service
        .patch(scope, created.id, GraphObjectPatch::default())
        .await
        .expect("patch should succeed");

    let history = service
        .history(scope, created.id)
        .await
        .expect("history should succeed");

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].version, 2);
    assert_eq!(history[1].version, 1);
}

#[tokio::test]
async fn test_search_filters_by_type_and_labels() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope = scope();

    service
        .create(
            scope,
            GraphObjectCreate {
                labels: vec!["mvp".to_string()],
                ..object_input("Requirement", "REQ-1")
            },
        )
        .await
        .expect("create should succeed");
    service
        .create(
            scope,
            GraphObjectCreate {
                labels: vec!["mvp".to_string(), "security".to_string()],
                ..object_input("Requirement", "REQ-2")
            },
        )
        .await
        .expect("create should succeed");
    create_object(&service, scope, "Decision", "DEC-1").await;

    let requirements = service
        .search(
            scope,
            ObjectSearchFilters {
                object_type: Some("Requirement".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect("search should succeed");
    assert_eq!(requirements.len(), 2);

    let secure = service
        .search(
            scope,
            ObjectSearchFilters {
                labels: vec!["mvp".to_string(), "security".to_string()],
                ..Default::default()
            },
        )
        .await
        .expect("search should succeed");
    assert_eq!(secure.len(), 1);
    assert_eq!(secure[0].object_key, "REQ-2");
}

#[tokio::test]
async fn test_get_outside_scope_returns_not_found() {
    let db = setup_db().await;
    let service = GraphObjectService::new(db);
    let scope_a = scope();
    let scope_b = scope();

    let object = create_object(&service, scope_a, "Doc", "d1").await;

    let other = service.get(scope_b, object.id).await;
    assert!(matches!(other, Err(GraphStoreError::NotFound(_))));
}
