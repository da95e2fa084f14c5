use actix::{Actor, Addr, SyncContext};
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::PgConnection;

use crate::config::Settings;
use crate::error::ServiceError;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooled = PooledConnection<ConnectionManager<PgConnection>>;

pub struct PgActor(pub PgPool);

pub struct AppState {
    pub pg_db: Addr<PgActor>,
    pub redis_db: redis::Client,
    pub settings: Settings,
}

impl Actor for PgActor {
    type Context = SyncContext<Self>;
}

impl PgActor {
    pub fn connection(&self) -> Result<PgPooled, ServiceError> {
        self.0.get().map_err(|err| {
            tracing::error!(error = %err, "failed to check out a postgres connection");
            ServiceError::Pool(err.to_string())
        })
    }
}

pub fn get_db_pool(db_url: &str, max_size: u32) -> Result<PgPool, ServiceError> {
    let manager = ConnectionManager::<PgConnection>::new(db_url);

    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|err| ServiceError::Pool(err.to_string()))
}
