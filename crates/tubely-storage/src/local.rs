use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
const EXPIRY_LEN: usize = 8;
const MAC_LEN: usize = 32;

/// Local filesystem storage implementation
///
/// Objects live under `base_path/{key}`. Signed URLs have the form
/// `{base_url}/{key}?token=...` where the token is
/// `base64url(expiry_be64 || nonce || HMAC-SHA256(secret, expiry || nonce || key))`.
/// A fresh nonce per call makes every signed URL unique.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    signing_secret: Vec<u8>,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for published objects (e.g., "/var/lib/tubely/assets")
    /// * `base_url` - Base URL the directory is served under (e.g., "http://localhost:8091/assets")
    /// * `signing_secret` - HMAC key for signed URLs
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: impl Into<Vec<u8>>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        let signing_secret = signing_secret.into();

        if signing_secret.is_empty() {
            return Err(StorageError::ConfigError(
                "Local signing secret must not be empty".to_string(),
            ));
        }

        Url::parse(&base_url).map_err(|e| {
            StorageError::ConfigError(format!("Invalid local storage base URL {}: {}", base_url, e))
        })?;

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_secret,
        })
    }

    /// Convert storage key to filesystem path.
    ///
    /// Key validation already rules out `..`, empty segments and absolute
    /// keys, so the joined path cannot leave `base_path`.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;
        Ok(self.base_path.join(storage_key))
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn mac_for(&self, payload: &[u8], storage_key: &str) -> StorageResult<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_secret)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?;
        mac.update(payload);
        mac.update(storage_key.as_bytes());
        Ok(mac)
    }

    fn sign_token(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        let expiry = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StorageError::SigningFailed(e.to_string()))?
            .as_secs()
            .saturating_add(expires_in.as_secs());
        let nonce: [u8; NONCE_LEN] = rand::random();

        let mut token = Vec::with_capacity(EXPIRY_LEN + NONCE_LEN + MAC_LEN);
        token.extend_from_slice(&expiry.to_be_bytes());
        token.extend_from_slice(&nonce);

        let tag = self.mac_for(&token, storage_key)?.finalize().into_bytes();
        token.extend_from_slice(&tag);

        Ok(URL_SAFE_NO_PAD.encode(token))
    }

    fn verify_token(&self, storage_key: &str, token: &str) -> StorageResult<()> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| StorageError::InvalidSignature("token is not valid base64".to_string()))?;

        if raw.len() != EXPIRY_LEN + NONCE_LEN + MAC_LEN {
            return Err(StorageError::InvalidSignature(
                "token has the wrong length".to_string(),
            ));
        }

        let (payload, tag) = raw.split_at(EXPIRY_LEN + NONCE_LEN);
        self.mac_for(payload, storage_key)?
            .verify_slice(tag)
            .map_err(|_| StorageError::InvalidSignature("signature mismatch".to_string()))?;

        let mut expiry_bytes = [0u8; EXPIRY_LEN];
        expiry_bytes.copy_from_slice(&payload[..EXPIRY_LEN]);
        let expiry = u64::from_be_bytes(expiry_bytes);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| StorageError::InvalidSignature(e.to_string()))?
            .as_secs();
        if now > expiry {
            return Err(StorageError::InvalidSignature("URL has expired".to_string()));
        }

        Ok(())
    }

    /// Verify a URL produced by [`Storage::get_presigned_url`] and return the
    /// storage key it grants access to.
    ///
    /// This is what the HTTP layer serving `base_url` calls before streaming
    /// the file back.
    pub fn resolve_signed_url(&self, signed_url: &str) -> StorageResult<String> {
        let url = Url::parse(signed_url)
            .map_err(|e| StorageError::InvalidSignature(format!("malformed URL: {}", e)))?;

        let token = url
            .query_pairs()
            .find(|(name, _)| name == "token")
            .map(|(_, value)| value.into_owned())
            .ok_or_else(|| StorageError::InvalidSignature("missing token".to_string()))?;

        let without_query = signed_url.split(['?', '#']).next().unwrap_or_default();
        let storage_key = without_query
            .strip_prefix(self.base_url.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| {
                StorageError::InvalidSignature("URL is not under the storage base URL".to_string())
            })?;

        validate_key(storage_key)?;
        self.verify_token(storage_key, &token)?;

        Ok(storage_key.to_string())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload_file(
        &self,
        storage_key: &str,
        local_path: &Path,
        _content_type: &str,
    ) -> StorageResult<u64> {
        let path = self.key_to_path(storage_key)?;
        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut source = fs::File::open(local_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to open {}: {}",
                local_path.display(),
                e
            ))
        })?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let size = tokio::io::copy(&mut source, &mut file).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.flush().await?;
        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(size)
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::debug!(
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn get_presigned_url(
        &self,
        storage_key: &str,
        expires_in: Duration,
    ) -> StorageResult<String> {
        validate_key(storage_key)?;
        let token = self.sign_token(storage_key, expires_in)?;
        Ok(format!("{}/{}?token={}", self.base_url, storage_key, token))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
