//! Person table storage: entity, migrations, repository, and startup preparation.

pub mod entity;
pub mod migrations;
pub mod repo;

pub use repo::{PersonRepository, SeaOrmPersonRepository};

use crate::config::DatabaseConfig;
use crate::model::NewPerson;
use migrations::Migrator;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, EntityTrait};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Open a connection pool for the configured database.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options.sqlx_logging(false);
    if let Some(max) = config.max_connections {
        options.max_connections(max);
    }
    Database::connect(options).await
}

/// Apply migrations, then optionally clear and seed the table.
///
/// Seeding is idempotent: records whose email already exists are skipped.
pub async fn prepare(
    db: &DatabaseConnection,
    config: &DatabaseConfig,
    seed: &[NewPerson],
) -> Result<(), DbErr> {
    if config.run_migrations {
        Migrator::up(db, None).await?;
        info!("Migration completed successfully");
    }

    if config.reset_on_start {
        let removed = entity::Entity::delete_many().exec(db).await?;
        info!(rows = removed.rows_affected, "Cleared person table");
    }

    if !seed.is_empty() {
        let models = seed.iter().map(entity::ActiveModel::from);
        let result = entity::Entity::insert_many(models)
            .on_conflict(
                OnConflict::column(entity::Column::Email)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;
        let inserted = match result {
            Ok(rows) => rows,
            Err(DbErr::RecordNotInserted) => 0,
            Err(e) => return Err(e),
        };
        info!(inserted, total = seed.len(), "Seeded person table");
    }

    Ok(())
}
