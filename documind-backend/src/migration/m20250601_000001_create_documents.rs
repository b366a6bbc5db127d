use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Document::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Document::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Document::OwnerId).string().not_null())
                    .col(ColumnDef::new(Document::Title).string().not_null())
                    .col(ColumnDef::new(Document::Content).text())
                    .col(ColumnDef::new(Document::FilePath).string())
                    .col(ColumnDef::new(Document::FileType).string())
                    .col(ColumnDef::new(Document::FileSize).big_integer())
                    .col(ColumnDef::new(Document::Status).string().not_null())
                    .col(ColumnDef::new(Document::Tags).text().not_null())
                    .col(ColumnDef::new(Document::Analysis).text())
                    .col(ColumnDef::new(Document::Created).string().not_null())
                    .col(ColumnDef::new(Document::Updated).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Listing is always owner-scoped and ordered by updated.
        manager
            .create_index(
                Index::create()
                    .name("idx_document_owner_updated")
                    .table(Document::Table)
                    .col(Document::OwnerId)
                    .col(Document::Updated)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Document::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Document {
    Table,
    Id,
    OwnerId,
    Title,
    Content,
    FilePath,
    FileType,
    FileSize,
    Status,
    Tags,
    Analysis,
    Created,
    Updated,
}
