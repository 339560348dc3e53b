use sea_orm_migration::prelude::*;

/// 仅约束未删除的记录，删除后同一长链接可以重新缩短
const ACTIVE_LONG_URL_INDEX: &str = "idx_urls_long_url_active";

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // 创建 urls 表
        manager
            .create_table(
                Table::create()
                    .table(Url::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Url::ShortId)
                            .string_len(512)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Url::UserId).string_len(512).not_null())
                    .col(ColumnDef::new(Url::LongUrl).text().not_null())
                    .col(
                        ColumnDef::new(Url::Deleted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Url::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // 用户历史查询索引
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_urls_user_id")
                    .table(Url::Table)
                    .col(Url::UserId)
                    .to_owned(),
            )
            .await?;

        // 部分唯一索引（SQLite 与 PostgreSQL 均支持 WHERE 子句）
        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {} ON urls (long_url) WHERE deleted = false",
                ACTIVE_LONG_URL_INDEX
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(ACTIVE_LONG_URL_INDEX).to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_urls_user_id").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Url::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Url {
    #[sea_orm(iden = "urls")]
    Table,
    ShortId,
    UserId,
    LongUrl,
    Deleted,
    CreatedAt,
}
