use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// `video/*` types are videos; everything else renders as an image.
    pub fn from_mime(content_type: &str) -> Self {
        if content_type
            .trim()
            .to_ascii_lowercase()
            .starts_with("video/")
        {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }
}

/// Media attached to a post, as stored in its `media` column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub url: String,
    pub kind: MediaKind,
    /// Opaque handle the media host needs to delete the object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
}
