use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReservationStates::Table)
                    .if_not_exists()
                    .col(pk_uuid(ReservationStates::Id))
                    .col(
                        ColumnDef::new(ReservationStates::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(text(ReservationStates::Description).default(""))
                    .col(boolean(ReservationStates::Active).default(true))
                    .to_owned(),
            )
            .await?;

        // The lifecycle engine matches states by name; ids are fixed so that
        // environments seeded separately agree.
        manager
            .get_connection()
            .execute_unprepared(
                r#"
                INSERT INTO reservation_states (id, name, description, active)
                VALUES
                    ('01950000-0000-7000-8000-000000000001', 'Pending', 'Awaiting confirmation', true),
                    ('01950000-0000-7000-8000-000000000002', 'Confirmed', 'Confirmed and blocking the product dates', true),
                    ('01950000-0000-7000-8000-000000000003', 'Cancelled', 'Cancelled by the guest or an administrator', true),
                    ('01950000-0000-7000-8000-000000000004', 'Completed', 'Stay finished', true)
                ON CONFLICT (name) DO NOTHING
                "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ReservationStates::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ReservationStates {
    Table,
    Id,
    Name,
    Description,
    Active,
}
