use async_trait::async_trait;
use futures::StreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};

use avamove_core::{Location, MigrationConfig};

use crate::traits::{AvatarStore, StoreError, StoreResult};

/// S3 avatar store spanning the legacy and production buckets.
#[derive(Clone, Debug)]
pub struct S3AvatarStore {
    legacy: AmazonS3,
    production: AmazonS3,
    legacy_bucket: String,
    production_bucket: String,
}

impl S3AvatarStore {
    /// Build clients for both buckets from the run configuration.
    ///
    /// Credentials come from the environment (`AWS_ACCESS_KEY_ID` /
    /// `AWS_SECRET_ACCESS_KEY`); buckets, region, and endpoint come from the
    /// config. An `http://` endpoint enables plain HTTP for S3-compatible
    /// providers (e.g. MinIO).
    pub fn new(config: &MigrationConfig) -> StoreResult<Self> {
        let region = config.region().ok_or_else(|| {
            StoreError::ConfigError("S3_REGION or AWS_REGION must be set".to_string())
        })?;

        let legacy =
            Self::build_store(&config.legacy_bucket, region, config.s3_endpoint.as_deref())?;
        let production = Self::build_store(
            &config.production_bucket,
            region,
            config.s3_endpoint.as_deref(),
        )?;

        Ok(S3AvatarStore {
            legacy,
            production,
            legacy_bucket: config.legacy_bucket.clone(),
            production_bucket: config.production_bucket.clone(),
        })
    }

    fn build_store(bucket: &str, region: &str, endpoint: Option<&str>) -> StoreResult<AmazonS3> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.to_string())
            .with_bucket_name(bucket.to_string());

        if let Some(endpoint) = endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.to_string())
                .with_allow_http(allow_http);
        }

        builder
            .build()
            .map_err(|e| StoreError::ConfigError(e.to_string()))
    }

    fn store_for(&self, location: Location) -> &AmazonS3 {
        match location {
            Location::Legacy => &self.legacy,
            Location::Production => &self.production,
        }
    }

    fn bucket_for(&self, location: Location) -> &str {
        match location {
            Location::Legacy => &self.legacy_bucket,
            Location::Production => &self.production_bucket,
        }
    }
}

#[async_trait]
impl AvatarStore for S3AvatarStore {
    async fn exists(&self, location: Location, key: &str) -> StoreResult<bool> {
        let path = Path::from(key.to_string());
        match self.store_for(location).head(&path).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StoreError::BackendError(e.to_string())),
        }
    }

    async fn copy(
        &self,
        src: Location,
        src_key: &str,
        dst: Location,
        dst_key: &str,
    ) -> StoreResult<()> {
        let start = std::time::Instant::now();
        let from = Path::from(src_key.to_string());
        let to = Path::from(dst_key.to_string());

        if src == dst {
            let result: ObjectResult<_> = self.store_for(src).copy(&from, &to).await;
            result.map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StoreError::NotFound(src_key.to_string()),
                other => StoreError::CopyFailed(other.to_string()),
            })?;
        } else {
            // object_store copies within a single store, so a cross-bucket
            // copy is a download followed by an upload.
            let result: ObjectResult<_> = self.store_for(src).get(&from).await;
            let response = result.map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => StoreError::NotFound(src_key.to_string()),
                other => StoreError::CopyFailed(other.to_string()),
            })?;

            let bytes = response
                .bytes()
                .await
                .map_err(|e| StoreError::CopyFailed(e.to_string()))?;
            let size = bytes.len() as u64;

            let put: ObjectResult<_> = self.store_for(dst).put(&to, PutPayload::from(bytes)).await;
            put.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket_for(dst),
                    key = %dst_key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 copy upload failed"
                );
                StoreError::CopyFailed(e.to_string())
            })?;
        }

        tracing::info!(
            src_bucket = %self.bucket_for(src),
            src_key = %src_key,
            dst_bucket = %self.bucket_for(dst),
            dst_key = %dst_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 copy successful"
        );

        Ok(())
    }

    async fn delete(&self, location: Location, key: &str) -> StoreResult<()> {
        let start = std::time::Instant::now();
        let path = Path::from(key.to_string());

        match self.store_for(location).delete(&path).await {
            Ok(_) => {}
            // A missing object means the delete already happened.
            Err(ObjectStoreError::NotFound { .. }) => return Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket_for(location),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StoreError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket_for(location),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list(&self, location: Location, prefix: &str) -> StoreResult<Vec<String>> {
        let start = std::time::Instant::now();
        let prefix_path = Path::from(prefix.to_string());
        let mut stream = self.store_for(location).list(Some(&prefix_path));

        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket_for(location),
                    prefix = %prefix,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 list failed"
                );
                StoreError::ListFailed(e.to_string())
            })?;
            keys.push(meta.location.to_string());
        }

        // The store lists by path segment; re-filter textually so the result
        // matches the configured prefix exactly.
        keys.retain(|key| key.starts_with(prefix));
        keys.sort();

        tracing::info!(
            bucket = %self.bucket_for(location),
            prefix = %prefix,
            count = keys.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );

        Ok(keys)
    }
}
