use diesel::{
    pg::PgConnection,
    r2d2::{ConnectionManager, Pool},
};
use log::info;
use r2d2_redis::RedisConnectionManager;

use crate::{
    app::{AppError, PgPool, RedisPool},
    config::Config,
};

embed_migrations!("migrations");

/// Return a pool of connections to the hosted postgres database.
/// Fails when no connection can be opened within the pool timeout.
///
/// # Example
/// ```
/// let config = Config::from_env()?;
/// let pool = psql_connect_to_db(&config)?;
/// ```
pub fn psql_connect_to_db(config: &Config) -> Result<PgPool, AppError> {
    let manager = ConnectionManager::<PgConnection>::new(config.database_url.clone());
    let pool = Pool::builder()
        .max_size(config.db_pool_size)
        .build(manager)?;

    info!("connected to postgres");
    Ok(pool)
}

/// Return a pool of connections to the redis server holding login tokens.
pub fn redis_connect_to_db(config: &Config) -> Result<RedisPool, AppError> {
    let manager = RedisConnectionManager::new(config.redis_url.as_str())?;
    let pool = Pool::builder().build(manager)?;

    info!("connected to redis at {}", config.redis_url);
    Ok(pool)
}

/// Applies every migration that hasn't been run yet
pub fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    let conn = pool.get()?;
    embedded_migrations::run(&*conn).map_err(|err| {
        log::error!("failed to run migrations: {}", err);
        AppError::InternalServerError
    })?;

    info!("database migrations are up to date");
    Ok(())
}
