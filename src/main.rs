#[macro_use]
extern crate diesel;
#[macro_use]
extern crate diesel_migrations;

pub mod app;
pub mod config;
pub mod database;
pub mod schema;
pub mod uploads;

mod auth;
mod routes;

use std::io;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web::Data, App, HttpServer};
use log::{error, info};

use crate::{app::AppState, config::Config, database::db_utils::run_migrations};

fn cors(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default();
    let mut any_origin = false;
    for origin in allowed_origins {
        if origin == "*" {
            any_origin = true;
            cors = cors.allow_any_origin();
        } else {
            cors = cors.allowed_origin(origin);
        }
    }

    cors = cors.allow_any_method().allow_any_header().max_age(3600);
    if !any_origin {
        cors = cors.supports_credentials();
    }
    cors
}

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env().map_err(|err| startup_error("invalid configuration", err))?;
    let app_state = AppState::new(&config).map_err(|err| startup_error("could not connect", err))?;

    if config.run_migrations {
        run_migrations(&app_state.psql_pool).map_err(|err| startup_error("migrations failed", err))?;
        info!("migrations are up to date");
    }
    std::fs::create_dir_all(&config.upload_dir)?;

    info!("server running on {}:{}", config.host, config.port);
    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(&allowed_origins))
            .wrap(Logger::default())
            .app_data(Data::new(app_state.clone()))
            .configure(routes::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    info!("server stopped");
    Ok(())
}
