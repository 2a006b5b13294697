use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use opendal::{services::S3, EntryMode, Operator};
use tracing::{info, warn};

use crate::config::AwsSettings;
use crate::error::{Result, SyncError};
use crate::fs::backend::{BackendType, ObjectStore};
use crate::fs::types::ObjectEntry;
use crate::profiles::parse_ini;

/// S3 and S3-compatible storage backend using OpenDAL
pub struct S3Store {
    operator: Operator,
    bucket: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Store {
    /// Build an operator from settings without touching the network.
    ///
    /// A named profile is read from the shared credentials file. Static keys
    /// from the settings come next; otherwise the standard AWS credential
    /// chain applies (environment variables, `~/.aws/credentials`, instance
    /// profile).
    pub fn new(aws: &AwsSettings) -> Result<Self> {
        if aws.bucket.is_empty() {
            return Err(SyncError::Config("S3 bucket name must be configured".to_string()));
        }

        let mut builder = S3::default().bucket(&aws.bucket).region(&aws.region);

        let endpoint = if aws.endpoint_url.is_empty() {
            None
        } else {
            info!("Using S3 endpoint: {}", aws.endpoint_url);
            builder = builder.endpoint(&aws.endpoint_url);
            Some(aws.endpoint_url.clone())
        };

        if !aws.profile.is_empty() {
            info!("Using AWS profile: {}", aws.profile);
            let credentials = load_profile(&aws.profile)?;
            builder = builder
                .access_key_id(&credentials.access_key_id)
                .secret_access_key(&credentials.secret_access_key);
            if let Some(token) = &credentials.session_token {
                builder = builder.session_token(token);
            }
        } else if !aws.access_key_id.is_empty() && !aws.secret_access_key.is_empty() {
            warn!("Using credentials from config file");
            builder = builder
                .access_key_id(&aws.access_key_id)
                .secret_access_key(&aws.secret_access_key);
        }

        if aws.signature_version != "s3v4" {
            warn!(
                "Signature version '{}' requested; requests are signed with SigV4",
                aws.signature_version
            );
        }

        let operator = Operator::new(builder)
            .map_err(|e| SyncError::Config(format!("Invalid S3 settings: {}", e)))?
            .finish();

        Ok(Self {
            operator,
            bucket: aws.bucket.clone(),
            region: aws.region.clone(),
            endpoint,
        })
    }

    /// Build the store and make sure the bucket answers.
    pub async fn connect(aws: &AwsSettings) -> Result<Self> {
        if !has_credentials(aws) {
            return Err(SyncError::Config("AWS credentials not found".to_string()));
        }
        let store = Self::new(aws)?;
        store.check().await?;
        info!("Connected to S3, bucket: {}", store.bucket);
        Ok(store)
    }
}

/// Keys for one profile of the shared credentials file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

fn shared_credentials_path() -> Option<PathBuf> {
    std::env::var_os("AWS_SHARED_CREDENTIALS_FILE")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|h| h.join(".aws").join("credentials")))
}

fn load_profile(profile: &str) -> Result<ProfileCredentials> {
    let path = shared_credentials_path()
        .ok_or_else(|| SyncError::Config("Cannot locate the AWS credentials file".to_string()))?;
    let content = std::fs::read_to_string(&path).map_err(|e| SyncError::io(&path, e))?;
    profile_credentials(&content, profile)?.ok_or_else(|| {
        SyncError::Config(format!(
            "AWS profile '{}' not found in {}",
            profile,
            path.display()
        ))
    })
}

/// Find `[profile]` (or `[profile name]`) with both keys set.
pub fn profile_credentials(content: &str, profile: &str) -> Result<Option<ProfileCredentials>> {
    let prefixed = format!("profile {}", profile);
    let found = parse_ini(content)?
        .into_iter()
        .find(|(name, _)| name == profile || *name == prefixed);
    let Some((_, entries)) = found else {
        return Ok(None);
    };
    match (
        entries.get("aws_access_key_id"),
        entries.get("aws_secret_access_key"),
    ) {
        (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
            Ok(Some(ProfileCredentials {
                access_key_id: key.clone(),
                secret_access_key: secret.clone(),
                session_token: entries
                    .get("aws_session_token")
                    .filter(|t| !t.is_empty())
                    .cloned(),
            }))
        }
        _ => Ok(None),
    }
}

/// Whether any credential source is available.
fn has_credentials(aws: &AwsSettings) -> bool {
    if !aws.profile.is_empty() {
        return true;
    }
    if !aws.access_key_id.is_empty() && !aws.secret_access_key.is_empty() {
        return true;
    }
    if std::env::var_os("AWS_ACCESS_KEY_ID").is_some()
        || std::env::var_os("AWS_PROFILE").is_some()
        || std::env::var_os("AWS_WEB_IDENTITY_TOKEN_FILE").is_some()
        || std::env::var_os("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI").is_some()
    {
        return true;
    }
    shared_credentials_path().is_some_and(|p| p.exists())
}

fn unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn check(&self) -> Result<()> {
        self.operator.check().await.map_err(|e| match e.kind() {
            opendal::ErrorKind::NotFound => {
                SyncError::Connectivity(format!("S3 bucket '{}' not found", self.bucket))
            }
            _ => SyncError::Connectivity(format!("Error connecting to S3: {}", e)),
        })
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectEntry>> {
        let entries = self.operator.list_with(prefix).recursive(true).await?;

        let mut objects = Vec::with_capacity(entries.len());
        for entry in entries {
            let meta = entry.metadata();
            if meta.mode() != EntryMode::FILE || entry.path().ends_with('/') {
                continue;
            }
            objects.push(ObjectEntry {
                key: entry.path().to_string(),
                size: meta.content_length(),
                mtime: meta
                    .last_modified()
                    .map(|t| unix_seconds(SystemTime::from(t)))
                    .unwrap_or(0),
                etag: meta.etag().unwrap_or_default().trim_matches('"').to_string(),
            });
        }
        Ok(objects)
    }

    async fn head_metadata(&self, key: &str) -> Result<Option<HashMap<String, String>>> {
        match self.operator.stat(key).await {
            Ok(meta) => Ok(Some(meta.user_metadata().cloned().unwrap_or_default())),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put_object(
        &self,
        key: &str,
        data: Vec<u8>,
        metadata: Option<&HashMap<String, String>>,
    ) -> Result<()> {
        match metadata {
            Some(metadata) => {
                self.operator
                    .write_with(key, data)
                    .user_metadata(metadata.clone())
                    .await?;
            }
            None => {
                self.operator.write(key, data).await?;
            }
        }
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>> {
        Ok(self.operator.read(key).await?.to_vec())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.operator.delete(key).await?;
        Ok(())
    }

    fn backend_type(&self) -> BackendType {
        BackendType::S3 {
            bucket: self.bucket.clone(),
            region: self.region.clone(),
            endpoint: self.endpoint.clone(),
        }
    }

    fn display_key(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key.trim_start_matches('/'))
    }
}
