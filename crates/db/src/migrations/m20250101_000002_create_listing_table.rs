//! Create listing table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listing::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Listing::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Listing::UserId).string_len(128).not_null())
                    .col(ColumnDef::new(Listing::Title).string_len(200).not_null())
                    .col(ColumnDef::new(Listing::Description).text().not_null())
                    .col(ColumnDef::new(Listing::Category).string_len(32).not_null())
                    .col(ColumnDef::new(Listing::Department).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Listing::Semester)
                            .small_integer()
                            .not_null()
                            .check(Expr::col(Listing::Semester).between(1, 8)),
                    )
                    .col(
                        ColumnDef::new(Listing::PriceCents)
                            .big_integer()
                            .not_null()
                            .check(Expr::col(Listing::PriceCents).gte(0)),
                    )
                    .col(ColumnDef::new(Listing::ImageUrls).json_binary().not_null())
                    .col(ColumnDef::new(Listing::IsApproved).boolean().not_null().default(true))
                    .col(ColumnDef::new(Listing::SellerName).string_len(256))
                    .col(ColumnDef::new(Listing::SellerAvatarUrl).string_len(1024))
                    .col(
                        ColumnDef::new(Listing::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_listing_user")
                            .from(Listing::Table, Listing::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listing_user_id_created_at")
                    .table(Listing::Table)
                    .col(Listing::UserId)
                    .col(Listing::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Feed order
        manager
            .create_index(
                Index::create()
                    .name("idx_listing_created_at")
                    .table(Listing::Table)
                    .col(Listing::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listing_category")
                    .table(Listing::Table)
                    .col(Listing::Category)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Listing::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Listing {
    Table,
    Id,
    UserId,
    Title,
    Description,
    Category,
    Department,
    Semester,
    PriceCents,
    ImageUrls,
    IsApproved,
    SellerName,
    SellerAvatarUrl,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
