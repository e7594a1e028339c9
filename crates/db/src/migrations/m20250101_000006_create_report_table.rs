//! Create report table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Report::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Report::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Report::ReporterId).string_len(128).not_null())
                    .col(ColumnDef::new(Report::ListingId).string_len(32).not_null())
                    .col(ColumnDef::new(Report::ReportedUserId).string_len(128).not_null())
                    .col(ColumnDef::new(Report::ListingTitle).string_len(200).not_null())
                    .col(ColumnDef::new(Report::Reason).text().not_null())
                    .col(ColumnDef::new(Report::Summary).text().not_null())
                    .col(
                        ColumnDef::new(Report::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Report::ResolvedBy).string_len(128))
                    .col(ColumnDef::new(Report::ResolvedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Report::CreatedAt)
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
                    .name("idx_report_status_created_at")
                    .table(Report::Table)
                    .col(Report::Status)
                    .col(Report::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Report::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Report {
    Table,
    Id,
    ReporterId,
    ListingId,
    ReportedUserId,
    ListingTitle,
    Reason,
    Summary,
    Status,
    ResolvedBy,
    ResolvedAt,
    CreatedAt,
}
