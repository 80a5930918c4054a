use crate::error::GenericError;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbBackend, EntityName, EntityTrait,
    Schema,
};
use tracing::{debug, info};

/// Postgres storage for one service, confined to that service's schema.
#[derive(Clone)]
pub struct ProdStorage {
    pub db: DatabaseConnection,
}

fn is_valid_schema_name(schema: &str) -> bool {
    !schema.is_empty()
        && schema.len() <= 63
        && schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !schema.starts_with(|c: char| c.is_ascii_digit())
}

impl ProdStorage {
    /// Connects with `search_path` pinned to `schema`, creating the schema if needed.
    pub async fn connect(database_url: &str, schema: &str) -> Result<Self, GenericError> {
        if !is_valid_schema_name(schema) {
            return Err(format!("Invalid schema name '{}'", schema).into());
        }

        let mut options = ConnectOptions::new(database_url.to_string());
        options.set_schema_search_path(schema.to_string());
        let db = Database::connect(options).await?;

        db.execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS \"{}\"", schema))
            .await?;
        info!("Connected to database, schema '{}'", schema);

        Ok(Self { db })
    }

    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates the entity's table unless it already exists.
    pub async fn ensure_table<E: EntityTrait>(&self, entity: E) -> Result<(), GenericError> {
        let backend = DbBackend::Postgres;
        let mut stmt = Schema::new(backend).create_table_from_entity(entity);
        stmt.if_not_exists();

        self.db.execute(backend.build(&stmt)).await?;
        debug!("Ensured table {}", entity.table_name());
        Ok(())
    }
}
