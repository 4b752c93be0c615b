use anyhow::{bail, Context};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub catalog: CatalogConfig,
}

// Настройки приложения
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub logger_type: LoggerType,
    /// Origin фронтенда для CORS. Без него CORS открыт для всех.
    pub frontend_url: Option<String>,
}

// Настройки хранилища
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub driver: StorageDriver,
    pub url: Option<String>,
    pub pool_size: u32,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: Option<String>,
}

// Начальное наполнение каталога
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageDriver {
    Memory,
    Postgres,
    Redis,
}

impl FromStr for StorageDriver {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageDriver::Memory),
            "postgres" | "postgresql" => Ok(StorageDriver::Postgres),
            "redis" => Ok(StorageDriver::Redis),
            other => bail!("unknown DATABASE_DRIVER '{}', expected memory | postgres | redis", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggerType {
    Dev,
    Json,
    Tskv,
}

impl FromStr for LoggerType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" => Ok(LoggerType::Dev),
            "json" => Ok(LoggerType::Json),
            "tskv" => Ok(LoggerType::Tskv),
            other => bail!("unknown LOGGER_TYPE '{}', expected dev | json | tskv", other),
        }
    }
}

/// Плоский набор переменных окружения, как их отдаёт `config::Environment`
/// (имена приводятся к нижнему регистру).
#[derive(Debug, Deserialize)]
struct EnvSettings {
    host: String,
    port: u16,
    environment: String,
    rust_log: String,
    logger_type: String,
    frontend_url: Option<String>,
    database_driver: String,
    database_url: Option<String>,
    db_pool_size: u32,
    redis_url: Option<String>,
    catalog_seed: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_source(::config::Environment::default())
    }

    pub fn from_source<S>(source: S) -> anyhow::Result<Self>
    where
        S: ::config::Source + Send + Sync + 'static,
    {
        let env: EnvSettings = ::config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 3000)?
            .set_default("environment", "development")?
            .set_default("rust_log", "afisha=debug,tower_http=debug")?
            .set_default("logger_type", "dev")?
            .set_default("database_driver", "memory")?
            .set_default("db_pool_size", 20)?
            .add_source(source)
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration value")?;

        let driver: StorageDriver = env.database_driver.parse()?;
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        let database_url = non_empty(env.database_url);
        let redis_url = non_empty(env.redis_url);

        match driver {
            StorageDriver::Postgres if database_url.is_none() => bail!("DATABASE_URL must be set for postgres driver"),
            StorageDriver::Redis if redis_url.is_none() => bail!("REDIS_URL must be set for redis driver"),
            _ => {}
        }

        Ok(Config {
            app: AppConfig {
                host: env.host,
                port: env.port,
                environment: env.environment,
                rust_log: env.rust_log,
                logger_type: env.logger_type.parse()?,
                frontend_url: non_empty(env.frontend_url),
            },
            database: DatabaseConfig { driver, url: database_url, pool_size: env.db_pool_size },
            redis: RedisConfig { url: redis_url },
            catalog: CatalogConfig { seed_path: env.catalog_seed },
        })
    }
}
