//! Carousel Engine - instantiate social-media carousel templates on a canvas
//!
//! A template is a serialized design tree with carousel geometry attached.
//! The engine loads it from a [`TemplateCatalog`], binds user photos to the
//! `photo-N` layers, rebuilds the tree on a host [`Canvas`], applies the
//! template's compositing rules and cuts the result into export slices.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use carousel_engine::{render_carousel, EngineConfig, SvgConfig, TemplateCatalog};
//!
//! # async fn run() -> carousel_engine::Result<()> {
//! let catalog = Arc::new(TemplateCatalog::load("templates".as_ref())?);
//! let photo = std::fs::read("photo.png")?;
//!
//! let preview = render_carousel(catalog, "t7", vec![photo], EngineConfig::default()).await?;
//! let svg = preview.to_svg(&SvgConfig::default());
//! assert!(svg.contains("<svg"));
//! # Ok(())
//! # }
//! ```

pub mod bundle;
pub mod canvas;
pub mod codec;
pub mod composite;
pub mod config;
pub mod error;
pub mod export;
pub mod font;
pub mod materialize;
pub mod orchestrator;
pub mod protocol;
pub mod renderer;
pub mod template;

pub use canvas::{Canvas, CanvasError, ElementId, SceneCanvas};
pub use composite::Compositor;
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use materialize::{materialize_template, Materializer};
pub use orchestrator::{
    CarouselOutcome, ChannelBridge, Orchestrator, PluginSession, PreloadedBridge, UiBridge,
};
pub use protocol::{CreateCarousel, InboundMessage, OutboundEvent};
pub use renderer::{render_svg, SvgConfig};
pub use template::{TemplateCatalog, TemplateData};

use std::sync::Arc;

/// A carousel built on an in-memory canvas
#[derive(Debug)]
pub struct Preview {
    pub canvas: SceneCanvas,
    pub outcome: CarouselOutcome,
    /// Events the UI would have received
    pub events: Vec<OutboundEvent>,
}

impl Preview {
    /// Render the whole page, instructions frame included
    pub fn to_svg(&self, config: &SvgConfig) -> String {
        render_svg(&self.canvas, self.canvas.page(), config)
    }

    /// Compact description of the carousel tree
    pub fn outline(&self) -> String {
        canvas::outline(&self.canvas, self.outcome.root)
    }
}

/// Build one carousel on a fresh [`SceneCanvas`] with the given photos
///
/// This is the main entry point for offline use. Photos are handed over the
/// way the UI would send them after a `request-images` event.
pub async fn render_carousel(
    catalog: Arc<TemplateCatalog>,
    template_id: &str,
    images: Vec<Vec<u8>>,
    config: EngineConfig,
) -> Result<Preview> {
    let orchestrator = Orchestrator::new(catalog, config);
    let mut canvas = SceneCanvas::new();
    let mut bridge = PreloadedBridge::new(images);

    let outcome = orchestrator
        .create_carousel(&mut canvas, &CreateCarousel::new(template_id), &mut bridge)
        .await?;

    Ok(Preview {
        canvas,
        outcome,
        events: bridge.into_events(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Arc<TemplateCatalog> {
        let json = r#"{
            "t1": {
                "id": "t1", "name": "One", "width": 100, "height": 100,
                "slideWidth": 100, "slideHeight": 100, "slides": 1,
                "nodeTree": {
                    "type": "FRAME", "name": "Carousel", "width": 100, "height": 100,
                    "children": [{ "type": "RECTANGLE", "name": "bg", "width": 100, "height": 100 }]
                }
            }
        }"#;
        Arc::new(TemplateCatalog::from_bundle_json(json).unwrap())
    }

    #[tokio::test]
    async fn test_render_carousel() {
        let preview = render_carousel(catalog(), "t1", vec![], EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(preview.outline(), "frame:Carousel[rect:bg, slice:slice-1]");
        assert_eq!(preview.events.last(), Some(&OutboundEvent::CarouselComplete));

        let svg = preview.to_svg(&SvgConfig::default());
        assert!(svg.contains(r#"data-name="Carousel""#));
        assert!(svg.contains(r#"data-name="Export instructions""#));
    }

    #[tokio::test]
    async fn test_render_unknown_template() {
        let err = render_carousel(catalog(), "zz", vec![], EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Orchestration(_)));
        assert_eq!(err.to_string(), "cannot start carousel: template not found: zz");
    }
}
