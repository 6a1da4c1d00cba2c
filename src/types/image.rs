//! Image description types

use serde::{Deserialize, Serialize};

use super::vocabulary::VocabularyItem;

/// What a model (or the fallback) says about a page image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub description: String,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
}

/// Where in a book an image appears; steers the prompt and the fallback text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ImageContext {
    Cover,
    Story,
    Educational,
    #[default]
    Default,
}

impl ImageContext {
    /// Case-insensitive lookup; unknown or missing tags map to `Default`.
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag.map(|t| t.trim().to_lowercase()).as_deref() {
            Some("cover") => ImageContext::Cover,
            Some("story") => ImageContext::Story,
            Some("educational") => ImageContext::Educational,
            _ => ImageContext::Default,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageContext::Cover => "cover",
            ImageContext::Story => "story",
            ImageContext::Educational => "educational",
            ImageContext::Default => "default",
        }
    }
}

/// Input to a single-image analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub image_url: String,
    pub context: ImageContext,
}

impl ImageRequest {
    pub fn new(image_url: impl Into<String>, context: ImageContext) -> Self {
        Self {
            image_url: image_url.into(),
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_tag_lookup() {
        assert_eq!(ImageContext::from_tag(Some("COVER")), ImageContext::Cover);
        assert_eq!(ImageContext::from_tag(Some(" story ")), ImageContext::Story);
        assert_eq!(ImageContext::from_tag(Some("poster")), ImageContext::Default);
        assert_eq!(ImageContext::from_tag(None), ImageContext::Default);
    }
}
