use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create outbox_messages table
        manager
            .create_table(
                Table::create()
                    .table(OutboxMessages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OutboxMessages::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OutboxMessages::AggregateId)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutboxMessages::AggregateType)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OutboxMessages::EventType)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OutboxMessages::Payload).text().not_null())
                    .col(ColumnDef::new(OutboxMessages::ChangedFields).text())
                    .col(
                        ColumnDef::new(OutboxMessages::Status)
                            .string_len(20)
                            .not_null()
                            .default("PENDING"),
                    )
                    .col(
                        ColumnDef::new(OutboxMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(OutboxMessages::ProcessedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(OutboxMessages::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(OutboxMessages::MaxRetries)
                            .integer()
                            .not_null()
                            .default(3),
                    )
                    .col(ColumnDef::new(OutboxMessages::ErrorMessage).text())
                    .col(ColumnDef::new(OutboxMessages::WorkerId).string_len(255))
                    .col(
                        ColumnDef::new(OutboxMessages::Version)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // Primary relay lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_outbox_status_created")
                    .table(OutboxMessages::Table)
                    .col(OutboxMessages::Status)
                    .col(OutboxMessages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_outbox_aggregate_id")
                    .table(OutboxMessages::Table)
                    .col(OutboxMessages::AggregateId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_outbox_event_type")
                    .table(OutboxMessages::Table)
                    .col(OutboxMessages::EventType)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_outbox_worker_id")
                    .table(OutboxMessages::Table)
                    .col(OutboxMessages::WorkerId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OutboxMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OutboxMessages {
    Table,
    Id,
    AggregateId,
    AggregateType,
    EventType,
    Payload,
    ChangedFields,
    Status,
    CreatedAt,
    ProcessedAt,
    RetryCount,
    MaxRetries,
    ErrorMessage,
    WorkerId,
    Version,
}
