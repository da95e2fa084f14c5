use std::io;

use actix::{Addr, SyncArbiter};
use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{middleware, App, HttpServer};
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;

use crate::auth::JwtKeys;
use crate::config::Settings;
use crate::services::db_utils::{get_db_pool, AppState, PgActor};

mod auth;
mod config;
mod error;
mod schema;
mod services;
mod types;

fn init_pg_db(settings: &Settings) -> io::Result<Addr<PgActor>> {
    let pool = get_db_pool(&settings.pg_database_url, settings.pg_workers as u32)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    Ok(SyncArbiter::start(settings.pg_workers, move || PgActor(pool.clone())))
}

fn init_redis_db(settings: &Settings) -> io::Result<redis::Client> {
    redis::Client::open(settings.redis_database_uri.as_str())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = Settings::load()
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err.to_string()))?;

    let pg_db = init_pg_db(&settings)?;
    let redis_db = init_redis_db(&settings)?;
    let keys = Data::new(JwtKeys::new(&settings.jwt_secret, settings.token_ttl_minutes));
    let bind_address = settings.bind_address.clone();

    let state = Data::new(AppState { pg_db, redis_db, settings });

    tracing::info!(address = %bind_address, "starting food ordering service");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .app_data(keys.clone())
            .configure(services::configure)
    })
        .bind(bind_address)?
        .run()
        .await
}
