use async_trait::async_trait;

use crate::{Error, MediaType, Time, Uuid};

/// Fixed storage folders, one per kind of media
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MediaCategory {
    CourseImages,
    LessonMedia,
    StudyGroupImages,
    ChannelImages,
    ProfilePhotos,
}

impl MediaCategory {
    pub fn prefix(&self) -> &'static str {
        match self {
            MediaCategory::CourseImages => "course_display_images/",
            MediaCategory::LessonMedia => "lessons_media/",
            MediaCategory::StudyGroupImages => "study_group_display_images/",
            MediaCategory::ChannelImages => "channel_display_images/",
            MediaCategory::ProfilePhotos => "user_profile_images/",
        }
    }
}

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct BlobPath {
    pub category: MediaCategory,
    pub file_name: String,
}

impl BlobPath {
    pub fn new(category: MediaCategory, file_name: &str) -> BlobPath {
        BlobPath {
            category,
            file_name: String::from(file_name),
        }
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.category.prefix(), self.file_name)
    }
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Stores the bytes and returns the download uri
    async fn upload(&self, path: &BlobPath, bytes: Vec<u8>) -> Result<String, Error>;
    async fn download_uri(&self, path: &BlobPath) -> Result<String, Error>;
    async fn download(&self, path: &BlobPath) -> Result<Vec<u8>, Error>;
    async fn delete(&self, path: &BlobPath) -> Result<(), Error>;
}

/// Name under which an uploaded file is stored: `<millis>_<nonce>_<name>`,
/// or `<millis>_<nonce>` with an extension guessed from the media type
pub fn media_file_name(name: &str, media_type: MediaType, now: Time, nonce: Uuid) -> String {
    let prefix = format!("{}_{}", now.timestamp_millis(), nonce.simple());
    if !name.is_empty() {
        return format!("{prefix}_{name}");
    }
    match media_type {
        MediaType::Image => format!("{prefix}.jpg"),
        MediaType::Video => format!("{prefix}.mp4"),
        MediaType::None => prefix,
    }
}
