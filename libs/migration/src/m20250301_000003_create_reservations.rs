use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reservations::Table)
                    .if_not_exists()
                    .col(pk_uuid(Reservations::Id))
                    .col(uuid(Reservations::UserId))
                    .col(uuid(Reservations::ProductId))
                    .col(string(Reservations::State).default("Pending"))
                    .col(date(Reservations::StartDate))
                    .col(date(Reservations::EndDate))
                    .col(decimal_len(Reservations::TotalPrice, 10, 2))
                    .col(text_null(Reservations::Observations))
                    .col(timestamp_with_time_zone_null(Reservations::ConfirmedAt))
                    .col(timestamp_with_time_zone_null(Reservations::CancelledAt))
                    .col(text_null(Reservations::CancellationReason))
                    .col(integer(Reservations::Version).default(1))
                    .col(
                        timestamp_with_time_zone(Reservations::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Reservations::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_user_id")
                            .from(Reservations::Table, Reservations::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_product_id")
                            .from(Reservations::Table, Reservations::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_reservations_state")
                            .from(Reservations::Table, Reservations::State)
                            .to(ReservationStates::Table, ReservationStates::Name)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        let db = manager.get_connection();

        db.execute_unprepared(
            r#"
            ALTER TABLE reservations
                ADD CONSTRAINT ck_reservations_date_range CHECK (start_date <= end_date),
                ADD CONSTRAINT ck_reservations_total_price CHECK (total_price > 0)
            "#,
        )
        .await?;

        // No two Confirmed reservations of one product may share a day
        db.execute_unprepared(
            r#"
            ALTER TABLE reservations
                ADD CONSTRAINT ex_reservations_confirmed_overlap
                EXCLUDE USING gist (
                    product_id WITH =,
                    daterange(start_date, end_date, '[]') WITH &&
                ) WHERE (state = 'Confirmed')
            "#,
        )
        .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_product_dates")
                    .table(Reservations::Table)
                    .col(Reservations::ProductId)
                    .col(Reservations::StartDate)
                    .col(Reservations::EndDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_user_id")
                    .table(Reservations::Table)
                    .col(Reservations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_state_start")
                    .table(Reservations::Table)
                    .col(Reservations::State)
                    .col(Reservations::StartDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reservations_created_at")
                    .table(Reservations::Table)
                    .col(Reservations::CreatedAt)
                    .to_owned(),
            )
            .await?;

        db.execute_unprepared(
            r#"
            CREATE TRIGGER reservations_touch_updated_at
                BEFORE UPDATE ON reservations
                FOR EACH ROW
                EXECUTE FUNCTION util.touch_updated_at()
            "#,
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DROP TRIGGER IF EXISTS reservations_touch_updated_at ON reservations",
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Reservations::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Reservations {
    Table,
    Id,
    UserId,
    ProductId,
    State,
    StartDate,
    EndDate,
    TotalPrice,
    Observations,
    ConfirmedAt,
    CancelledAt,
    CancellationReason,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum ReservationStates {
    Table,
    Name,
}
