use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub pg_database_url: String,
    pub redis_database_uri: String,
    pub jwt_secret: String,
    pub bind_address: String,
    pub pg_workers: usize,
    pub token_ttl_minutes: i64,
    pub delivery_fee_cents: i64,
    pub estimated_delivery_minutes: i64,
    pub menu_cache_ttl_s: u64,
}

impl Settings {
    /// Reads `config/default.*` when present, then the process environment
    /// (`PG_DATABASE_URL`, `JWT_SECRET`, ...), which wins.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name("config/default").required(false))
                .add_source(Environment::default().try_parsing(true)),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("bind_address", "127.0.0.1:8080")?
            .set_default("pg_workers", 5)?
            .set_default("token_ttl_minutes", 60)?
            .set_default("delivery_fee_cents", 300)?
            .set_default("estimated_delivery_minutes", 45)?
            .set_default("menu_cache_ttl_s", 300)?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_only() -> config::ConfigBuilder<config::builder::DefaultState> {
        Config::builder()
            .set_override("pg_database_url", "postgres://localhost/food")
            .unwrap()
            .set_override("redis_database_uri", "redis://127.0.0.1/")
            .unwrap()
            .set_override("jwt_secret", "secret")
            .unwrap()
    }

    #[test]
    fn defaults_fill_optional_keys() {
        let settings = Settings::from_builder(required_only()).unwrap();

        assert_eq!(settings.bind_address, "127.0.0.1:8080");
        assert_eq!(settings.pg_workers, 5);
        assert_eq!(settings.delivery_fee_cents, 300);
        assert_eq!(settings.estimated_delivery_minutes, 45);
    }

    #[test]
    fn overrides_win_over_defaults() {
        let settings = Settings::from_builder(
            required_only().set_override("delivery_fee_cents", 0).unwrap(),
        )
        .unwrap();

        assert_eq!(settings.delivery_fee_cents, 0);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let builder = Config::builder()
            .set_override("redis_database_uri", "redis://127.0.0.1/")
            .unwrap()
            .set_override("jwt_secret", "secret")
            .unwrap();

        assert!(Settings::from_builder(builder).is_err());
    }
}
