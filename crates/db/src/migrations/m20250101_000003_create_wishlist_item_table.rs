//! Create wishlist item table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WishlistItem::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WishlistItem::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WishlistItem::UserId).string_len(128).not_null())
                    .col(ColumnDef::new(WishlistItem::ListingId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(WishlistItem::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wishlist_item_user")
                            .from(WishlistItem::Table, WishlistItem::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Set semantics: a listing appears at most once per user.
        // No FK to listing; dangling ids are skipped on read.
        manager
            .create_index(
                Index::create()
                    .name("idx_wishlist_item_user_listing")
                    .table(WishlistItem::Table)
                    .col(WishlistItem::UserId)
                    .col(WishlistItem::ListingId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WishlistItem::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum WishlistItem {
    Table,
    Id,
    UserId,
    ListingId,
    CreatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
