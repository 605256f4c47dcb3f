use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::database::entities::product_version_members;
use crate::errors::ProductVersionResult;
use crate::services::product_version_service::ProductVersionService;

/// Classification of a canonical identity between two snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    #[serde(rename = "added")]
    Added,
    #[serde(rename = "removed")]
    Removed,
    #[serde(rename = "modified")]
    Modified,
    #[serde(rename = "unchanged")]
    Unchanged,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
            Self::Unchanged => "unchanged",
        }
    }
}

/// One canonical identity's classification
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DiffItem {
    pub canonical_id: Uuid,
    pub change_type: ChangeType,
    pub version_a_object_id: Option<Uuid>,
    pub version_b_object_id: Option<Uuid>,
}

/// Per-classification counts; always sums to the number of items
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffMeta {
    pub added: usize,
    pub removed: usize,
    pub modified: usize,
    pub unchanged: usize,
}

/// Structural diff between two snapshots
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductVersionDiff {
    pub items: Vec<DiffItem>,
    pub meta: DiffMeta,
}

/// Compares the membership of two frozen snapshots.
///
/// Reads the membership tables only; the live object store is never
/// consulted, so a diff is repeatable for the same pair of snapshot ids.
#[derive(Clone)]
pub struct VersionDiffService {
    db: DatabaseConnection,
    versions: ProductVersionService,
}

impl VersionDiffService {
    pub fn new(db: DatabaseConnection) -> Self {
        let versions = ProductVersionService::new(db.clone());
        Self { db, versions }
    }

    /// Classify every canonical identity present in either snapshot.
    ///
    /// Items come back ordered by `canonical_id`. A missing or
    /// foreign-project snapshot id fails with `NotFound` carrying that id,
    /// so the caller can tell which side was wrong.
    pub async fn diff(
        &self,
        project_id: Uuid,
        version_a_id: Uuid,
        version_b_id: Uuid,
    ) -> ProductVersionResult<ProductVersionDiff> {
        self.versions
            .require_in_project(project_id, version_a_id)
            .await?;
        self.versions
            .require_in_project(project_id, version_b_id)
            .await?;

        let side_a = self.membership(version_a_id).await?;
        let side_b = self.membership(version_b_id).await?;

        let diff = merge_memberships(&side_a, &side_b);

        debug!(
            "Diffed product versions {} and {}: {} added, {} removed, {} modified, {} unchanged",
            version_a_id,
            version_b_id,
            diff.meta.added,
            diff.meta.removed,
            diff.meta.modified,
            diff.meta.unchanged
        );

        Ok(diff)
    }

    /// Membership pairs `(canonical_id, object_version_id)` sorted by
    /// canonical identity.
    async fn membership(&self, version_id: Uuid) -> ProductVersionResult<Vec<(Uuid, Uuid)>> {
        let rows = product_version_members::Entity::find()
            .filter(product_version_members::Column::ProductVersionId.eq(version_id))
            .order_by_asc(product_version_members::Column::CanonicalId)
            .all(&self.db)
            .await?;

        let mut pairs: Vec<(Uuid, Uuid)> = rows
            .into_iter()
            .map(|member| (member.canonical_id, member.object_version_id))
            .collect();
        // Do not rely on the storage collation for UUID ordering.
        pairs.sort_by_key(|(canonical_id, _)| *canonical_id);

        Ok(pairs)
    }
}

/// Merge two membership lists sorted by canonical identity.
///
/// A standard sorted two-pointer merge in place of a relational full outer
/// join: each key is classified by presence on either side and, when present
/// on both, by object version equality.
fn merge_memberships(side_a: &[(Uuid, Uuid)], side_b: &[(Uuid, Uuid)]) -> ProductVersionDiff {
    let mut items = Vec::with_capacity(side_a.len().max(side_b.len()));
    let mut meta = DiffMeta::default();

    let mut a = side_a.iter().peekable();
    let mut b = side_b.iter().peekable();

    loop {
        let item = match (a.peek(), b.peek()) {
            (None, None) => break,
            (Some((canonical_id, object_a)), None) => {
                let item = DiffItem {
                    canonical_id: *canonical_id,
                    change_type: ChangeType::Removed,
                    version_a_object_id: Some(*object_a),
                    version_b_object_id: None,
                };
                a.next();
                item
            }
            (None, Some((canonical_id, object_b))) => {
                let item = DiffItem {
                    canonical_id: *canonical_id,
                    change_type: ChangeType::Added,
                    version_a_object_id: None,
                    version_b_object_id: Some(*object_b),
                };
                b.next();
                item
            }
            (Some((canonical_a, object_a)), Some((canonical_b, object_b))) => {
                if canonical_a < canonical_b {
                    let item = DiffItem {
                        canonical_id: *canonical_a,
                        change_type: ChangeType::Removed,
                        version_a_object_id: Some(*object_a),
                        version_b_object_id: None,
                    };
                    a.next();
                    item
                } else if canonical_b < canonical_a {
                    let item = DiffItem {
                        canonical_id: *canonical_b,
                        change_type: ChangeType::Added,
                        version_a_object_id: None,
                        version_b_object_id: Some(*object_b),
                    };
                    b.next();
                    item
                } else {
                    let change_type = if object_a == object_b {
                        ChangeType::Unchanged
                    } else {
                        ChangeType::Modified
                    };
                    let item = DiffItem {
                        canonical_id: *canonical_a,
                        change_type,
                        version_a_object_id: Some(*object_a),
                        version_b_object_id: Some(*object_b),
                    };
                    a.next();
                    b.next();
                    item
                }
            }
        };

        match item.change_type {
            ChangeType::Added => meta.added += 1,
            ChangeType::Removed => meta.removed += 1,
            ChangeType::Modified => meta.modified += 1,
            ChangeType::Unchanged => meta.unchanged += 1,
        }
        items.push(item);
    }

    ProductVersionDiff { items, meta }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(canonical: u128, object: u128) -> (Uuid, Uuid) {
        (Uuid::from_u128(canonical), Uuid::from_u128(object))
    }

    #[test]
    fn test_merge_classifies_all_cases() {
        let side_a = vec![pair(1, 10), pair(2, 20), pair(3, 30)];
        let side_b = vec![pair(2, 21), pair(3, 30), pair(4, 40)];

        let diff = merge_memberships(&side_a, &side_b);

        assert_eq!(diff.items.len(), 4);
        assert_eq!(diff.meta.removed, 1); // canonical 1
        assert_eq!(diff.meta.modified, 1); // canonical 2
        assert_eq!(diff.meta.unchanged, 1); // canonical 3
        assert_eq!(diff.meta.added, 1); // canonical 4

        // Items come back ordered by canonical identity.
        let order: Vec<Uuid> = diff.items.iter().map(|item| item.canonical_id).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_merge_identity() {
        let side = vec![pair(1, 10), pair(2, 20)];
        let diff = merge_memberships(&side, &side);

        assert_eq!(diff.meta.added, 0);
        assert_eq!(diff.meta.removed, 0);
        assert_eq!(diff.meta.modified, 0);
        assert_eq!(diff.meta.unchanged, 2);
    }

    #[test]
    fn test_merge_counts_sum_to_items() {
        let side_a = vec![pair(1, 10), pair(5, 50)];
        let side_b = vec![pair(2, 20), pair(5, 51)];
        let diff = merge_memberships(&side_a, &side_b);

        let total = diff.meta.added + diff.meta.removed + diff.meta.modified + diff.meta.unchanged;
        assert_eq!(total, diff.items.len());
    }

    #[test]
    fn test_empty_sides() {
        let diff = merge_memberships(&[], &[]);
        assert!(diff.items.is_empty());
        assert_eq!(diff.meta, DiffMeta::default());
    }
}
