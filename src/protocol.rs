//! Messages exchanged with the wizard UI
//!
//! Both directions are JSON objects tagged by `type`:
//!
//! ```text
//! -> { "type": "create-carousel", "templateId": "t7", "imagesMetadata": [...] }
//! <- { "type": "request-images", "count": 7 }
//! -> { "type": "images-data", "images": [[137, 80, 78, 71, ...], ...] }
//! <- { "type": "progress", "percent": 55, "log": "Creating slides..." }
//! <- { "type": "carousel-complete" }
//! ```

use serde::{Deserialize, Serialize};

/// Name and byte size of an image the user picked
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ImageMetadata {
    pub name: String,
    pub size: u64,
}

/// A request to build one carousel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCarousel {
    pub template_id: String,
    #[serde(default)]
    pub images_metadata: Vec<ImageMetadata>,
    /// Images sent inline; when absent they are requested from the UI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_base64: Option<Vec<String>>,
}

impl CreateCarousel {
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            images_metadata: Vec::new(),
            images_base64: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<ImageMetadata>) -> Self {
        self.images_metadata = metadata;
        self
    }

    pub fn with_inline_images(mut self, images: Vec<String>) -> Self {
        self.images_base64 = Some(images);
        self
    }

    /// Inline images, only when at least one was sent
    pub fn inline_images(&self) -> Option<&[String]> {
        self.images_base64.as_deref().filter(|images| !images.is_empty())
    }
}

/// Messages from the UI to the engine
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum InboundMessage {
    CreateCarousel(CreateCarousel),
    ImagesData { images: Vec<Vec<u8>> },
}

impl InboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::CreateCarousel(_) => "create-carousel",
            InboundMessage::ImagesData { .. } => "images-data",
        }
    }
}

/// Events from the engine to the UI
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutboundEvent {
    Progress { percent: u8, log: String },
    RequestImages { count: usize },
    CarouselComplete,
}

impl OutboundEvent {
    pub fn progress(percent: u8, log: impl Into<String>) -> Self {
        OutboundEvent::Progress {
            percent,
            log: log.into(),
        }
    }
}
