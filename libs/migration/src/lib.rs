pub use sea_orm_migration::prelude::*;

mod m20250301_000000_bootstrap;
mod m20250301_000001_create_users_and_products;
mod m20250301_000002_create_reservation_states;
mod m20250301_000003_create_reservations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000000_bootstrap::Migration),
            Box::new(m20250301_000001_create_users_and_products::Migration),
            Box::new(m20250301_000002_create_reservation_states::Migration),
            Box::new(m20250301_000003_create_reservations::Migration),
        ]
    }
}
