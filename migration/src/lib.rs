pub use sea_orm_migration::prelude::*;

mod m20240601_000001_create_rooms;
mod m20240601_000002_create_users;
mod m20240601_000003_create_cabs;
mod m20240601_000004_create_drivers;
mod m20240601_000005_create_bookings;
mod m20240601_000006_create_payment_transactions;
mod m20240601_000007_create_trips;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_rooms::Migration),
            Box::new(m20240601_000002_create_users::Migration),
            Box::new(m20240601_000003_create_cabs::Migration),
            Box::new(m20240601_000004_create_drivers::Migration),
            Box::new(m20240601_000005_create_bookings::Migration),
            Box::new(m20240601_000006_create_payment_transactions::Migration),
            Box::new(m20240601_000007_create_trips::Migration),
        ]
    }
}
