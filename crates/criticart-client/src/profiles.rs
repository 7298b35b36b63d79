//! Profiles and media uploads.

use chrono::Utc;
use criticart_core::{NewProfile, Profile, ProfilePatch, UserId, ValidationError};
use criticart_data::{Backend, Query};
use tracing::info;
use uuid::Uuid;

use crate::access::{decode, first_row, to_row, DataAccess};
use crate::error::{DataError, DataResult};

const PROFILES_TABLE: &str = "profiles";

/// Bucket for profile pictures.
pub const AVATAR_BUCKET: &str = "avatars";

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Original file name; only its extension is kept.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// File with a content type guessed from its extension.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Text after the last dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && !ext.contains('/'))
    }

    /// Random object name that keeps the original extension.
    pub fn object_name(&self) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext.to_ascii_lowercase()),
            None => Uuid::new_v4().to_string(),
        }
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        _ => "application/octet-stream",
    }
}

impl<B: Backend> DataAccess<B> {
    // === Profiles ===

    /// Profile of a user. Never cached.
    pub async fn get_profile(&self, user_id: &UserId) -> DataResult<Profile> {
        let query = Query::from(PROFILES_TABLE)
            .eq("user_id", user_id)
            .single();
        let rows = self
            .backend
            .select(&query, self.bearer().as_deref())
            .await?;
        Ok(rows.decode()?)
    }

    /// Save profile changes. Never cached.
    pub async fn update_profile(&self, user_id: &UserId, patch: &ProfilePatch) -> DataResult<Profile> {
        let session = self.session.require()?;
        patch.validate()?;

        let patch = patch.clone().touched(Utc::now());
        let query = Query::from(PROFILES_TABLE).eq("user_id", user_id);
        let updated = self
            .backend
            .update(&query, to_row(&patch)?, Some(&session.access_token))
            .await?;
        info!(user = %user_id, "profile updated");
        decode(first_row(updated)?)
    }

    /// Profile of the signed-in user, created with defaults if missing.
    pub async fn ensure_profile(&self) -> DataResult<Profile> {
        let session = self.session.require()?;
        match self.get_profile(session.user_id()).await {
            Err(e) if e.is_not_found() => {
                let row = NewProfile::default_for(
                    session.user_id(),
                    session.user.full_name(),
                    Utc::now(),
                );
                let stored = self
                    .backend
                    .insert(PROFILES_TABLE, to_row(&row)?, Some(&session.access_token))
                    .await?;
                info!(user = %session.user_id(), username = %row.username, "profile created");
                decode(stored)
            }
            other => other,
        }
    }

    /// Upload a new avatar and point the profile at it.
    pub async fn upload_avatar(&self, file: &MediaFile) -> DataResult<Profile> {
        let session = self.session.require()?;
        let url = self.upload_media(file, AVATAR_BUCKET).await?;
        self.update_profile(session.user_id(), &ProfilePatch::avatar(url))
            .await
    }

    // === Media ===

    /// Upload to the configured media bucket.
    pub async fn upload_review_media(&self, file: &MediaFile) -> DataResult<String> {
        self.upload_media(file, &self.media_bucket).await
    }

    /// Upload `file` under a random name and return its public URL.
    ///
    /// Failed attempts are retried with the upload retry policy; only the
    /// final failure reaches the caller.
    pub async fn upload_media(&self, file: &MediaFile, bucket: &str) -> DataResult<String> {
        if file.bytes.is_empty() {
            return Err(ValidationError::EmptyFile.into());
        }
        let path = file.object_name();
        let token = self.bearer();

        self.upload_retry
            .run("upload_media", |_| {
                self.backend.upload(
                    bucket,
                    &path,
                    file.bytes.clone(),
                    &file.content_type,
                    token.as_deref(),
                )
            })
            .await?;

        info!(bucket, path = %path, bytes = file.bytes.len(), "media uploaded");
        Ok(self.backend.public_url(bucket, &path))
    }

    /// Remove an uploaded object.
    pub async fn delete_media(&self, path: &str, bucket: &str) -> DataResult<()> {
        if path.trim().is_empty() {
            return Err(ValidationError::MissingField("Path").into());
        }
        self.backend
            .remove(bucket, &[path.to_string()], self.bearer().as_deref())
            .await
            .map_err(DataError::from)?;
        info!(bucket, path, "media deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_name_keeps_extension() {
        let file = MediaFile::new("Holiday Photo.JPG", vec![1]);
        let name = file.object_name();
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 36 + 4);
        assert_ne!(name, file.object_name());
        assert_eq!(file.content_type, "image/jpeg");
    }

    #[test]
    fn test_object_name_without_extension() {
        let file = MediaFile::new("README", vec![1]);
        assert_eq!(file.extension(), None);
        assert_eq!(file.object_name().len(), 36);
        assert_eq!(file.content_type, "application/octet-stream");
    }

    #[test]
    fn test_content_types() {
        assert_eq!(MediaFile::new("clip.mp4", vec![]).content_type, "video/mp4");
        assert_eq!(
            MediaFile::new("x.bin", vec![]).with_content_type("image/png").content_type,
            "image/png"
        );
    }
}
