//! Initial migration: import job records plus the directory's people and companies.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_import_jobs(manager).await?;
        self.create_companies(manager).await?;
        self.create_people(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(People::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Companies::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ImportJobs::Table).to_owned())
            .await?;
        Ok(())
    }
}

impl Migration {
    async fn create_import_jobs(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ImportJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ImportJobs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ImportJobs::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(ImportJobs::Status)
                            .string()
                            .not_null()
                            .default("idle"),
                    )
                    .col(ColumnDef::new(ImportJobs::SourceUsername).string().null())
                    .col(
                        ColumnDef::new(ImportJobs::Mode)
                            .string()
                            .not_null()
                            .default("following"),
                    )
                    .col(
                        ColumnDef::new(ImportJobs::Payload)
                            .text()
                            .not_null()
                            .default("{}"),
                    )
                    .col(
                        ColumnDef::new(ImportJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn create_companies(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Companies::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Companies::Name).string().not_null())
                    .col(ColumnDef::new(Companies::GithubUrl).string().null())
                    .col(
                        ColumnDef::new(Companies::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_companies_name")
                    .table(Companies::Table)
                    .col(Companies::Name)
                    .to_owned(),
            )
            .await
    }

    async fn create_people(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(People::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(People::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(People::Name).string().not_null())
                    .col(ColumnDef::new(People::Bio).text().null())
                    .col(ColumnDef::new(People::AvatarPath).string().null())
                    .col(ColumnDef::new(People::Website).string().null())
                    .col(ColumnDef::new(People::GithubUrl).string().null())
                    .col(ColumnDef::new(People::Location).string().null())
                    .col(ColumnDef::new(People::CompanyId).uuid().null())
                    .col(
                        ColumnDef::new(People::IsPublished)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(People::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_people_company")
                            .from(People::Table, People::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Commit looks people up by both keys
        manager
            .create_index(
                Index::create()
                    .name("idx_people_github_url")
                    .table(People::Table)
                    .col(People::GithubUrl)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_people_name")
                    .table(People::Table)
                    .col(People::Name)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
#[sea_orm(iden = "import_jobs")]
enum ImportJobs {
    Table,
    Id,
    Name,
    Status,
    SourceUsername,
    Mode,
    Payload,
    UpdatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "companies")]
enum Companies {
    Table,
    Id,
    Name,
    GithubUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
#[sea_orm(iden = "people")]
enum People {
    Table,
    Id,
    Name,
    Bio,
    AvatarPath,
    Website,
    GithubUrl,
    Location,
    CompanyId,
    IsPublished,
    CreatedAt,
}
