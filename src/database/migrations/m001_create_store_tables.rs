use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create branches table
        manager
            .create_table(
                Table::create()
                    .table(Branches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Branches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Branches::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(Branches::Name).string().not_null())
                    .col(ColumnDef::new(Branches::ParentBranchId).uuid())
                    .col(ColumnDef::new(Branches::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Branches::UpdatedAt).timestamp().not_null())
                    .index(
                        Index::create()
                            .name("idx_branches_project_name")
                            .table(Branches::Table)
                            .col(Branches::ProjectId)
                            .col(Branches::Name)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create graph_objects table (one row per version, append-only)
        manager
            .create_table(
                Table::create()
                    .table(GraphObjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GraphObjects::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GraphObjects::CanonicalId).uuid().not_null())
                    .col(
                        ColumnDef::new(GraphObjects::OrganizationId)
                            .uuid()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GraphObjects::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(GraphObjects::BranchId).uuid())
                    .col(ColumnDef::new(GraphObjects::ObjectType).string().not_null())
                    .col(ColumnDef::new(GraphObjects::ObjectKey).string().not_null())
                    .col(ColumnDef::new(GraphObjects::Version).integer().not_null())
                    .col(ColumnDef::new(GraphObjects::Status).string())
                    .col(ColumnDef::new(GraphObjects::Labels).json_binary().not_null())
                    .col(
                        ColumnDef::new(GraphObjects::Properties)
                            .json_binary()
                            .not_null(),
                    )
                    .col(ColumnDef::new(GraphObjects::SupersedesId).uuid())
                    .col(ColumnDef::new(GraphObjects::DeletedAt).timestamp())
                    .col(
                        ColumnDef::new(GraphObjects::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    // Version numbers are unique within a canonical identity.
                    .index(
                        Index::create()
                            .name("idx_graph_objects_canonical_version")
                            .table(GraphObjects::Table)
                            .col(GraphObjects::CanonicalId)
                            .col(GraphObjects::Version)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index for key-conflict checks. Not unique: every version row
        // of a canonical identity shares the same key tuple, so head-level
        // uniqueness is enforced transactionally by the object store. The
        // branch id is part of the tuple.
        manager
            .create_index(
                Index::create()
                    .name("idx_graph_objects_key_scope")
                    .table(GraphObjects::Table)
                    .col(GraphObjects::OrganizationId)
                    .col(GraphObjects::ProjectId)
                    .col(GraphObjects::BranchId)
                    .col(GraphObjects::ObjectType)
                    .col(GraphObjects::ObjectKey)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_graph_objects_project")
                    .table(GraphObjects::Table)
                    .col(GraphObjects::ProjectId)
                    .col(GraphObjects::CanonicalId)
                    .to_owned(),
            )
            .await?;

        // Create product_versions table
        manager
            .create_table(
                Table::create()
                    .table(ProductVersions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVersions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProductVersions::ProjectId).uuid().not_null())
                    .col(ColumnDef::new(ProductVersions::Name).string().not_null())
                    .col(ColumnDef::new(ProductVersions::Description).string())
                    .col(ColumnDef::new(ProductVersions::BaseProductVersionId).uuid())
                    .col(
                        ColumnDef::new(ProductVersions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    // Exact-name backstop; the case-insensitive check happens
                    // under the snapshot creation lock.
                    .index(
                        Index::create()
                            .name("idx_product_versions_project_name")
                            .table(ProductVersions::Table)
                            .col(ProductVersions::ProjectId)
                            .col(ProductVersions::Name)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create product_version_members table
        manager
            .create_table(
                Table::create()
                    .table(ProductVersionMembers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProductVersionMembers::ProductVersionId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVersionMembers::CanonicalId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ProductVersionMembers::ObjectVersionId)
                            .uuid()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_product_version_members")
                            .col(ProductVersionMembers::ProductVersionId)
                            .col(ProductVersionMembers::CanonicalId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_version_members_product_version_id")
                            .from(
                                ProductVersionMembers::Table,
                                ProductVersionMembers::ProductVersionId,
                            )
                            .to(ProductVersions::Table, ProductVersions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Create object_revision_counts table (derived cache)
        manager
            .create_table(
                Table::create()
                    .table(ObjectRevisionCounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::CanonicalId)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::RevisionCount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::LatestVersion)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::FirstCreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::LastUpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ObjectRevisionCounts::RefreshedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ObjectRevisionCounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVersionMembers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVersions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GraphObjects::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Branches::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(Iden)]
enum Branches {
    Table,
    Id,
    ProjectId,
    Name,
    ParentBranchId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum GraphObjects {
    Table,
    Id,
    CanonicalId,
    OrganizationId,
    ProjectId,
    BranchId,
    ObjectType,
    ObjectKey,
    Version,
    Status,
    Labels,
    Properties,
    SupersedesId,
    DeletedAt,
    CreatedAt,
}

#[derive(Iden)]
enum ProductVersions {
    Table,
    Id,
    ProjectId,
    Name,
    Description,
    BaseProductVersionId,
    CreatedAt,
}

#[derive(Iden)]
enum ProductVersionMembers {
    Table,
    ProductVersionId,
    CanonicalId,
    ObjectVersionId,
}

#[derive(Iden)]
enum ObjectRevisionCounts {
    Table,
    CanonicalId,
    RevisionCount,
    LatestVersion,
    FirstCreatedAt,
    LastUpdatedAt,
    RefreshedAt,
}
