use crate::media::MediaFile;
use crate::model::{Location, Visibility};
use crate::sync::error::{validation, SyncResult};

/// Input of [`FeedStore::create`](super::FeedStore::create).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PostDraft {
    pub content: String,
    pub tags: Vec<String>,
    pub location: Option<Location>,
    pub media: Vec<MediaFile>,
    pub visibility: Visibility,
}

impl PostDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_media(mut self, file: MediaFile) -> Self {
        self.media.push(file);
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    /// Trimmed content, or a validation error when nothing is left.
    pub(crate) fn normalized_content(&self) -> SyncResult<String> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(validation("A publicação não pode estar vazia"));
        }
        Ok(content.to_owned())
    }

    /// Tags without `#`, surrounding whitespace, blanks or repeats; order kept.
    pub(crate) fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.trim().trim_start_matches('#').trim();
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_owned());
            }
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncErrorCode;

    #[test]
    fn blank_content_is_invalid() {
        let err = PostDraft::new(" \n\t ").normalized_content().unwrap_err();
        assert_eq!(err.code, SyncErrorCode::Validation);
        assert_eq!(
            PostDraft::new("  Saw a heron ").normalized_content().unwrap(),
            "Saw a heron"
        );
    }

    #[test]
    fn tags_are_cleaned_up() {
        let draft = PostDraft::new("x").with_tags(["#aves", " aves", "", "#", "lagoa"]);
        assert_eq!(draft.normalized_tags(), vec!["aves", "lagoa"]);
    }
}
