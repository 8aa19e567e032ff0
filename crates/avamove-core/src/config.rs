//! Configuration module
//!
//! All settings come from the environment (a `.env` file is honored for
//! local runs). `from_env` validates before returning, so a process never
//! starts with a half-usable configuration.

use std::env;

use crate::prefix::PrefixMap;

// Common constants
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LEGACY_PREFIX: &str = "legacy/";
const DEFAULT_PRODUCTION_PREFIX: &str = "production/";

/// Default bound on concurrently running record migrations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Migration run configuration.
#[derive(Clone, Debug)]
pub struct MigrationConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    // Storage configuration
    pub legacy_bucket: String,
    pub production_bucket: String,
    pub s3_region: Option<String>,
    pub aws_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub prefixes: PrefixMap,
    // Run shape
    /// Upper bound on records migrated per run. `None` migrates everything.
    pub batch_size: Option<i64>,
    pub max_concurrency: usize,
    /// How long to wait for dispatched migrations before re-checking. `None` waits forever.
    pub wait_timeout_secs: Option<u64>,
}

impl MigrationConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let config = MigrationConfig {
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            legacy_bucket: env::var("S3_LEGACY_BUCKET_NAME")
                .map_err(|_| anyhow::anyhow!("S3_LEGACY_BUCKET_NAME must be set"))?,
            production_bucket: env::var("S3_PRODUCTION_BUCKET_NAME")
                .map_err(|_| anyhow::anyhow!("S3_PRODUCTION_BUCKET_NAME must be set"))?,
            s3_region: env::var("S3_REGION").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT_URL").ok(),
            prefixes: PrefixMap::new(
                env::var("LEGACY_PREFIX").unwrap_or_else(|_| DEFAULT_LEGACY_PREFIX.to_string()),
                env::var("PRODUCTION_PREFIX")
                    .unwrap_or_else(|_| DEFAULT_PRODUCTION_PREFIX.to_string()),
            ),
            batch_size: env::var("MIGRATE_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok()),
            max_concurrency: env::var("MIGRATE_MAX_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_MAX_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_CONCURRENCY),
            wait_timeout_secs: env::var("MIGRATE_WAIT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Region for the S3 stores. `S3_REGION` wins over `AWS_REGION`.
    pub fn region(&self) -> Option<&str> {
        self.s3_region.as_deref().or(self.aws_region.as_deref())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgresql://") {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.legacy_bucket.is_empty() || self.production_bucket.is_empty() {
            return Err(anyhow::anyhow!(
                "S3_LEGACY_BUCKET_NAME and S3_PRODUCTION_BUCKET_NAME must not be empty"
            ));
        }

        if self.legacy_bucket == self.production_bucket {
            return Err(anyhow::anyhow!(
                "S3_LEGACY_BUCKET_NAME and S3_PRODUCTION_BUCKET_NAME must name different buckets"
            ));
        }

        if self.s3_region.is_none() && self.aws_region.is_none() {
            return Err(anyhow::anyhow!("S3_REGION or AWS_REGION must be set"));
        }

        let legacy = self.prefixes.legacy();
        let production = self.prefixes.production();
        if legacy.is_empty() || production.is_empty() {
            return Err(anyhow::anyhow!(
                "LEGACY_PREFIX and PRODUCTION_PREFIX must not be empty"
            ));
        }
        if legacy == production {
            return Err(anyhow::anyhow!(
                "LEGACY_PREFIX and PRODUCTION_PREFIX must differ"
            ));
        }
        // Nested prefixes would make path classification ambiguous.
        if legacy.starts_with(production) || production.starts_with(legacy) {
            return Err(anyhow::anyhow!(
                "LEGACY_PREFIX and PRODUCTION_PREFIX must not be nested within each other"
            ));
        }

        if self.db_max_connections == 0 {
            return Err(anyhow::anyhow!("DB_MAX_CONNECTIONS must be at least 1"));
        }

        if self.max_concurrency == 0 {
            return Err(anyhow::anyhow!("MIGRATE_MAX_CONCURRENCY must be at least 1"));
        }

        if let Some(batch) = self.batch_size {
            if batch < 1 {
                return Err(anyhow::anyhow!("MIGRATE_BATCH_SIZE must be at least 1"));
            }
        }

        if let Some(secs) = self.wait_timeout_secs {
            if secs == 0 {
                return Err(anyhow::anyhow!(
                    "MIGRATE_WAIT_TIMEOUT_SECS must be at least 1"
                ));
            }
        }

        Ok(())
    }
}
