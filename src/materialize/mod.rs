//! Template node tree materialization
//!
//! Walks a [`TemplateNode`] tree and builds the equivalent elements on a
//! [`Canvas`]. The walk is a single async recursion: each TEXT node suspends
//! while its font loads, and siblings are built strictly in declared order so
//! stacking matches the source design.
//!
//! Failures never escape a node. A node that cannot be built is logged, any
//! element created for it is removed, and it simply contributes nothing.

mod paint;

pub use paint::{
    letter_spacing, line_height, normalize_scale_mode, photo_ordinal, resolve_effects,
    resolve_strokes, solid_paint,
};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::canvas::{
    BlendMode, Canvas, CanvasError, ElementId, ImageHash, Paint, Property, ScaleMode,
};
use crate::codec::{self, CodecError};
use crate::config::EngineConfig;
use crate::font::{FontError, FontResolver};
use crate::template::{NodeType, PaintSpec, TemplateData, TemplateNode};

/// Name given to the invisible member of an otherwise empty group
pub const PLACEHOLDER_NAME: &str = ".placeholder";

/// Why a single node (or one of its fills) could not be built
#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error(transparent)]
    Font(#[from] FontError),

    #[error("embedded image: {0}")]
    Codec(#[from] CodecError),

    #[error("embedded image is {size} bytes, over the {max} byte limit")]
    PayloadTooLarge { size: usize, max: usize },
}

/// Counters collected over one walk
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterializeStats {
    /// Elements produced for template nodes (group placeholders excluded)
    pub elements: usize,
    /// Nodes of a type the engine does not reproduce
    pub skipped: usize,
    /// Nodes that failed and were removed
    pub failed: usize,
    pub photos_bound: usize,
    pub embedded_bound: usize,
    /// Image fills that could not be bound
    pub fills_dropped: usize,
}

type NodeFuture<'b> = Pin<Box<dyn Future<Output = Option<ElementId>> + Send + 'b>>;

/// Builds canvas elements for one template.
///
/// A materializer borrows everything it needs for the duration of a single
/// instantiation: the host, the font resolver (and its cache), the user
/// images, the template and the engine config.
pub struct Materializer<'a, C: Canvas + ?Sized> {
    canvas: &'a mut C,
    fonts: &'a mut FontResolver,
    images: &'a [Vec<u8>],
    template: &'a TemplateData,
    config: &'a EngineConfig,
    stats: MaterializeStats,
}

impl<'a, C: Canvas + ?Sized> Materializer<'a, C> {
    pub fn new(
        canvas: &'a mut C,
        fonts: &'a mut FontResolver,
        images: &'a [Vec<u8>],
        template: &'a TemplateData,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            canvas,
            fonts,
            images,
            template,
            config,
            stats: MaterializeStats::default(),
        }
    }

    pub fn stats(&self) -> &MaterializeStats {
        &self.stats
    }

    /// Materialize the whole template tree, returning its root element
    pub async fn run(&mut self) -> Option<ElementId> {
        let template = self.template;
        let root = self.materialize(&template.node_tree).await;
        info!(
            template = %template.id,
            elements = self.stats.elements,
            skipped = self.stats.skipped,
            failed = self.stats.failed,
            photos = self.stats.photos_bound,
            embedded = self.stats.embedded_bound,
            fills_dropped = self.stats.fills_dropped,
            "materialization finished"
        );
        root
    }

    /// Materialize one subtree. Never fails: errors are logged and yield `None`.
    pub fn materialize<'b>(&'b mut self, node: &'b TemplateNode) -> NodeFuture<'b> {
        Box::pin(async move {
            let built = match &node.node_type {
                NodeType::Frame => self.build_frame(node).await,
                NodeType::Group => self.build_group(node).await,
                NodeType::Rectangle => self.build_rectangle(node),
                NodeType::Text => self.build_text(node).await,
                NodeType::Slice => {
                    // Export slices are regenerated from the template geometry
                    debug!(node = %node.name, "ignoring declared slice");
                    self.stats.skipped += 1;
                    return None;
                }
                NodeType::Unsupported(kind) => {
                    warn!(node = %node.name, kind = %kind, "unsupported node type, skipping");
                    self.stats.skipped += 1;
                    return None;
                }
                other => {
                    debug!(node = %node.name, kind = other.as_str(), "vector node not reproduced");
                    self.stats.skipped += 1;
                    return None;
                }
            };

            match built {
                Ok(id) => {
                    self.stats.elements += 1;
                    Some(id)
                }
                Err(e) => {
                    warn!(node = %node.name, kind = node.node_type.as_str(), error = %e, "node dropped");
                    self.stats.failed += 1;
                    None
                }
            }
        })
    }

    async fn build_frame(&mut self, node: &TemplateNode) -> Result<ElementId, MaterializeError> {
        let id = self.canvas.create_frame();
        if let Err(e) = self.configure_frame(id, node) {
            self.canvas.remove(id);
            return Err(e);
        }

        for child in node.children() {
            let Some(child_id) = self.materialize(child).await else {
                continue;
            };
            if let Err(e) = self.canvas.append_child(id, child_id) {
                warn!(node = %child.name, error = %e, "could not attach child");
                self.canvas.remove(child_id);
                self.stats.failed += 1;
            }
        }
        Ok(id)
    }

    fn configure_frame(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        self.canvas.set(id, Property::Name(node.name.clone()))?;
        if let Some((width, height)) = node.size() {
            self.canvas.set(id, Property::Size { width, height })?;
        }
        if let Some(clips) = node.clips_content {
            self.canvas.set(id, Property::ClipsContent(clips))?;
        }
        if let Some(radius) = node.corner_radius {
            self.canvas.set(id, Property::CornerRadius(radius))?;
        }
        self.apply_common(id, node)?;
        self.apply_paints(id, node)
    }

    async fn build_group(&mut self, node: &TemplateNode) -> Result<ElementId, MaterializeError> {
        let mut members = Vec::new();
        for child in node.children() {
            if let Some(child_id) = self.materialize(child).await {
                members.push(child_id);
            }
        }

        if members.is_empty() {
            members.push(self.placeholder()?);
        }

        let id = match self.canvas.group(&members) {
            Ok(id) => id,
            Err(e) => {
                for member in members {
                    self.canvas.remove(member);
                }
                return Err(e.into());
            }
        };

        if let Err(e) = self.configure_group(id, node) {
            self.canvas.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    /// Groups take no fills or strokes; they hug their members
    fn configure_group(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        self.canvas.set(id, Property::Name(node.name.clone()))?;
        self.apply_common(id, node)?;
        self.apply_effects(id, node)
    }

    /// Invisible 1x1 stand-in so an empty group can still be composed
    fn placeholder(&mut self) -> Result<ElementId, MaterializeError> {
        let id = self.canvas.create_rectangle();
        let result = [
            Property::Name(PLACEHOLDER_NAME.to_string()),
            Property::Size {
                width: 1.0,
                height: 1.0,
            },
            Property::Fills(vec![]),
            Property::Visible(false),
        ]
        .into_iter()
        .try_for_each(|property| self.canvas.set(id, property));
        if let Err(e) = result {
            self.canvas.remove(id);
            return Err(e.into());
        }
        Ok(id)
    }

    fn build_rectangle(&mut self, node: &TemplateNode) -> Result<ElementId, MaterializeError> {
        let id = self.canvas.create_rectangle();
        if let Err(e) = self.configure_rectangle(id, node) {
            self.canvas.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    fn configure_rectangle(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        self.canvas.set(id, Property::Name(node.name.clone()))?;
        if let Some((width, height)) = node.size() {
            self.canvas.set(id, Property::Size { width, height })?;
        }
        if let Some(radius) = node.corner_radius {
            self.canvas.set(id, Property::CornerRadius(radius))?;
        }
        self.apply_common(id, node)?;
        self.apply_paints(id, node)
    }

    async fn build_text(&mut self, node: &TemplateNode) -> Result<ElementId, MaterializeError> {
        let id = self.canvas.create_text();
        if let Err(e) = self.configure_text(id, node).await {
            self.canvas.remove(id);
            return Err(e);
        }
        Ok(id)
    }

    async fn configure_text(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        self.canvas.set(id, Property::Name(node.name.clone()))?;

        let requested = node
            .text
            .font_name
            .clone()
            .unwrap_or_else(|| self.fonts.default_face().clone());
        let applied = self.fonts.resolve(&mut *self.canvas, &requested).await?;
        self.canvas.set(id, Property::FontName(applied))?;

        let text = &node.text;
        if let Some(characters) = &text.characters {
            self.canvas.set(id, Property::Characters(characters.clone()))?;
        }
        if let Some(size) = text.font_size {
            self.canvas.set(id, Property::FontSize(size))?;
        }
        if let Some(align) = &text.text_align_horizontal {
            self.canvas.set(id, Property::TextAlignHorizontal(align.clone()))?;
        }
        if let Some(align) = &text.text_align_vertical {
            self.canvas.set(id, Property::TextAlignVertical(align.clone()))?;
        }
        if let Some(spacing) = &text.letter_spacing {
            self.canvas.set(id, Property::LetterSpacing(letter_spacing(spacing)))?;
        }
        if let Some(spec) = &text.line_height {
            match line_height(spec) {
                Some(value) => self.canvas.set(id, Property::LineHeight(value))?,
                None => debug!(node = %node.name, ?spec, "ignoring line height"),
            }
        }
        if let Some(case) = &text.text_case {
            self.canvas.set(id, Property::TextCase(case.clone()))?;
        }

        self.apply_common(id, node)?;
        self.apply_paints(id, node)?;

        // Last, so horizontal alignment has a box to align within
        if let Some((width, height)) = node.size() {
            self.canvas.set(id, Property::Size { width, height })?;
        }
        Ok(())
    }

    /// Position, visibility, lock, opacity, rotation and blend mode
    fn apply_common(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), CanvasError> {
        self.canvas.set(id, Property::Position { x: node.x, y: node.y })?;
        self.canvas.set(id, Property::Visible(node.visible))?;
        self.canvas.set(id, Property::Locked(node.locked))?;
        self.canvas.set(id, Property::Opacity(node.opacity))?;
        if let Some(rotation) = node.rotation.filter(|r| *r != 0.0) {
            self.canvas.set(id, Property::Rotation(rotation))?;
        }
        match BlendMode::parse(&node.blend_mode) {
            Some(mode) => self.canvas.set(id, Property::BlendMode(mode))?,
            None => warn!(node = %node.name, mode = %node.blend_mode, "unknown blend mode"),
        }
        Ok(())
    }

    /// Fills, strokes, stroke weight and effects
    fn apply_paints(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        if let Some(specs) = &node.fills {
            let fills = self.resolve_fills(node, specs);
            if !fills.is_empty() {
                self.canvas.set(id, Property::Fills(fills))?;
            }
        }
        if let Some(specs) = &node.strokes {
            let strokes = resolve_strokes(specs);
            if !strokes.is_empty() {
                self.canvas.set(id, Property::Strokes(strokes))?;
            }
        }
        if let Some(weight) = node.stroke_weight {
            self.canvas.set(id, Property::StrokeWeight(weight))?;
        }
        self.apply_effects(id, node)
    }

    fn apply_effects(&mut self, id: ElementId, node: &TemplateNode) -> Result<(), MaterializeError> {
        if let Some(specs) = &node.effects {
            let effects = resolve_effects(specs);
            if !effects.is_empty() {
                self.canvas.set(id, Property::Effects(effects))?;
            }
        }
        Ok(())
    }

    fn resolve_fills(&mut self, node: &TemplateNode, specs: &[PaintSpec]) -> Vec<Paint> {
        let mut fills = Vec::with_capacity(specs.len());
        for spec in specs {
            match spec {
                PaintSpec::Solid { .. } => fills.extend(solid_paint(spec)),
                PaintSpec::Image { scale_mode, .. } => {
                    if let Some(paint) = self.bind_image(node, scale_mode.as_deref()) {
                        fills.push(paint);
                    }
                }
                PaintSpec::Unsupported => {
                    debug!(node = %node.name, "unsupported paint type ignored");
                }
            }
        }
        fills
    }

    /// Bind an IMAGE fill to a user photo or to the node's embedded image
    fn bind_image(&mut self, node: &TemplateNode, scale_mode: Option<&str>) -> Option<Paint> {
        let template = self.template;
        let prefix = template.photo_layer_name_prefix.as_str();
        if node.name.starts_with(prefix) {
            return self.bind_photo(node, prefix);
        }

        let Some(payload) = template.embedded_image(&node.id) else {
            debug!(node = %node.name, id = %node.id, "image fill without a source");
            self.stats.fills_dropped += 1;
            return None;
        };
        match self.decode_embedded(&payload.joined()) {
            Ok(hash) => {
                self.stats.embedded_bound += 1;
                Some(Paint::Image {
                    scale_mode: normalize_scale_mode(scale_mode),
                    image_hash: hash,
                })
            }
            Err(e) => {
                warn!(node = %node.name, id = %node.id, error = %e, "embedded image dropped");
                self.stats.fills_dropped += 1;
                None
            }
        }
    }

    fn bind_photo(&mut self, node: &TemplateNode, prefix: &str) -> Option<Paint> {
        let images = self.images;
        let bytes = photo_ordinal(&node.name, prefix)
            .and_then(|ordinal| ordinal.checked_sub(1))
            .and_then(|index| images.get(index));
        let Some(bytes) = bytes else {
            debug!(node = %node.name, images = images.len(), "no user image for photo layer");
            self.stats.fills_dropped += 1;
            return None;
        };

        match self.canvas.create_image(bytes) {
            Ok(hash) => {
                self.stats.photos_bound += 1;
                Some(Paint::Image {
                    scale_mode: ScaleMode::Fill,
                    image_hash: hash,
                })
            }
            Err(e) => {
                warn!(node = %node.name, error = %e, "user image rejected");
                self.stats.fills_dropped += 1;
                None
            }
        }
    }

    fn decode_embedded(&mut self, payload: &str) -> Result<ImageHash, MaterializeError> {
        let max = self.config.images.max_bytes;
        let size = payload.trim().len() / 4 * 3;
        if size > max {
            return Err(MaterializeError::PayloadTooLarge { size, max });
        }
        let bytes = codec::decode(payload)?;
        Ok(self.canvas.create_image(&bytes)?)
    }
}

/// Materialize a template onto a canvas with a fresh font cache.
///
/// Returns the root element (if any) and the walk statistics.
pub async fn materialize_template<C: Canvas + ?Sized>(
    canvas: &mut C,
    template: &TemplateData,
    images: &[Vec<u8>],
    config: &EngineConfig,
) -> (Option<ElementId>, MaterializeStats) {
    let mut fonts = FontResolver::new(&config.fonts);
    let mut materializer = Materializer::new(canvas, &mut fonts, images, template, config);
    let root = materializer.run().await;
    (root, materializer.stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{outline, ElementKind, LineHeight, SceneCanvas, SpacingUnit};
    use crate::template::FontFace;
    use base64::Engine as _;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn template(tree: serde_json::Value) -> TemplateData {
        serde_json::from_value(serde_json::json!({
            "id": "test",
            "name": "Test",
            "width": 200,
            "height": 100,
            "slideWidth": 100,
            "slideHeight": 100,
            "slides": 2,
            "nodeTree": tree,
        }))
        .unwrap()
    }

    async fn build(
        canvas: &mut SceneCanvas,
        template: &TemplateData,
        images: &[Vec<u8>],
    ) -> (Option<ElementId>, MaterializeStats) {
        materialize_template(canvas, template, images, &EngineConfig::default()).await
    }

    #[tokio::test]
    async fn test_frame_with_children_in_order() {
        let t = template(serde_json::json!({
            "type": "FRAME", "name": "root", "width": 200, "height": 100,
            "clipsContent": false,
            "children": [
                { "type": "RECTANGLE", "name": "bg", "x": 0, "y": 0, "width": 200, "height": 100,
                  "fills": [{ "type": "SOLID", "color": { "r": 1, "g": 0, "b": 0 }, "opacity": 0.5 }] },
                { "type": "ELLIPSE", "name": "dot" },
                { "type": "TEXT", "name": "title", "x": 10, "y": 20, "characters": "Hi" }
            ]
        }));
        let mut canvas = SceneCanvas::new();
        let (root, stats) = build(&mut canvas, &t, &[]).await;
        let root = root.unwrap();

        assert_eq!(outline(&canvas, root), "frame:root[rect:bg, text:title]");
        let frame = canvas.element(root).unwrap();
        assert!(!frame.clips_content);
        assert_eq!((frame.width, frame.height), (200.0, 100.0));

        let bg = canvas.element(frame.children[0]).unwrap();
        assert_eq!(
            bg.fills,
            vec![Paint::Solid {
                color: crate::template::Color::rgb(1.0, 0.0, 0.0),
                opacity: 0.5
            }]
        );
        let title = canvas.element(frame.children[1]).unwrap();
        assert_eq!((title.x, title.y), (10.0, 20.0));
        assert_eq!(title.characters(), Some("Hi"));

        assert_eq!(stats.elements, 3);
        assert_eq!(stats.skipped, 1);
    }

    #[tokio::test]
    async fn test_unsupported_root_yields_none() {
        let t = template(serde_json::json!({ "type": "STICKY", "name": "note" }));
        let mut canvas = SceneCanvas::new();
        let (root, stats) = build(&mut canvas, &t, &[]).await;
        assert!(root.is_none());
        assert_eq!(stats.skipped, 1);
        assert_eq!(canvas.live_element_count(), 0);
    }

    #[tokio::test]
    async fn test_group_composed_from_children() {
        let t = template(serde_json::json!({
            "type": "GROUP", "name": "pair", "x": 30, "y": 40, "opacity": 0.8,
            "children": [
                { "type": "RECTANGLE", "name": "a", "x": 0, "y": 0, "width": 10, "height": 10 },
                { "type": "RECTANGLE", "name": "b", "x": 20, "y": 5, "width": 10, "height": 10 }
            ]
        }));
        let mut canvas = SceneCanvas::new();
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        let group = canvas.element(root).unwrap();
        assert_eq!(group.kind, ElementKind::Group);
        assert_eq!(outline(&canvas, root), "group:pair[rect:a, rect:b]");
        assert_eq!((group.x, group.y), (30.0, 40.0));
        assert_eq!((group.width, group.height), (30.0, 15.0));
        assert_eq!(group.opacity, 0.8);
    }

    #[tokio::test]
    async fn test_empty_group_gets_placeholder() {
        let t = template(serde_json::json!({
            "type": "GROUP", "name": "empty",
            "children": [{ "type": "VECTOR", "name": "v" }]
        }));
        let mut canvas = SceneCanvas::new();
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        insta::assert_snapshot!(outline(&canvas, root), @"group:empty[rect:.placeholder]");
        let group = canvas.element(root).unwrap();
        let placeholder = canvas.element(group.children[0]).unwrap();
        assert!(!placeholder.visible);
        assert_eq!((placeholder.width, placeholder.height), (1.0, 1.0));
    }

    #[tokio::test]
    async fn test_text_uses_applied_face() {
        let t = template(serde_json::json!({
            "type": "TEXT", "name": "t", "characters": "Olá",
            "fontName": { "family": "Anton", "style": "Regular" },
            "fontSize": 64, "textAlignHorizontal": "CENTER",
            "letterSpacing": { "unit": "PERCENT", "value": -2 },
            "lineHeight": { "unit": "PIXELS", "value": 70 },
            "textCase": "UPPER",
            "width": 300, "height": 80
        }));
        let mut canvas = SceneCanvas::new().with_available_fonts([FontFace::new("Inter", "Regular")]);
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        let element = canvas.element(root).unwrap();
        let text = element.text.as_ref().unwrap();
        assert_eq!(text.font, FontFace::new("Inter", "Regular"));
        assert_eq!(text.characters, "Olá");
        assert_eq!(text.font_size, 64.0);
        assert_eq!(text.align_horizontal, "CENTER");
        assert_eq!(text.letter_spacing.unit, SpacingUnit::Percent);
        assert_eq!(text.line_height, LineHeight::Pixels(70.0));
        assert_eq!(text.text_case, "UPPER");
        assert_eq!((element.width, element.height), (300.0, 80.0));
    }

    #[tokio::test]
    async fn test_text_without_any_font_is_dropped() {
        let t = template(serde_json::json!({
            "type": "FRAME", "name": "root",
            "children": [
                { "type": "TEXT", "name": "t", "characters": "x" },
                { "type": "RECTANGLE", "name": "r" }
            ]
        }));
        let mut canvas = SceneCanvas::new().with_available_fonts([]);
        let (root, stats) = build(&mut canvas, &t, &[]).await;
        let root = root.unwrap();
        assert_eq!(outline(&canvas, root), "frame:root[rect:r]");
        assert_eq!(stats.failed, 1);
        assert_eq!(canvas.live_element_count(), 2);
    }

    #[tokio::test]
    async fn test_photo_layers_bind_user_images() {
        let t = template(serde_json::json!({
            "type": "FRAME", "name": "root",
            "children": [
                { "type": "RECTANGLE", "name": "photo-2", "width": 10, "height": 10,
                  "fills": [{ "type": "IMAGE", "scaleMode": "FIT" }] },
                { "type": "RECTANGLE", "name": "photo-3", "width": 10, "height": 10,
                  "fills": [{ "type": "IMAGE" }] }
            ]
        }));
        let images = vec![png(2, 2), png(3, 3)];
        let mut canvas = SceneCanvas::new();
        let (root, stats) = build(&mut canvas, &t, &images).await;
        let frame = canvas.element(root.unwrap()).unwrap();

        let bound = canvas.element(frame.children[0]).unwrap();
        match &bound.fills[..] {
            [Paint::Image {
                scale_mode,
                image_hash,
            }] => {
                assert_eq!(*scale_mode, ScaleMode::Fill);
                assert_eq!(canvas.image_size(image_hash), Some((3, 3)));
            }
            other => panic!("expected one image fill, got {other:?}"),
        }

        // Only two images: photo-3 keeps the host default fill
        let unbound = canvas.element(frame.children[1]).unwrap();
        assert!(unbound.fills.iter().all(|f| !f.is_image()));
        assert_eq!(stats.photos_bound, 1);
        assert_eq!(stats.fills_dropped, 1);
    }

    #[tokio::test]
    async fn test_embedded_image_with_stretch() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png(4, 2));
        let (head, tail) = encoded.split_at(8);
        let mut t = template(serde_json::json!({
            "type": "RECTANGLE", "id": "5:7", "name": "logo", "width": 40, "height": 20,
            "fills": [{ "type": "IMAGE", "scaleMode": "STRETCH" }]
        }));
        t.embedded_images = Some(
            [(
                "5:7".to_string(),
                crate::template::EmbeddedPayload::Chunked(vec![head.to_string(), tail.to_string()]),
            )]
            .into_iter()
            .collect(),
        );
        let mut canvas = SceneCanvas::new();
        let (root, stats) = build(&mut canvas, &t, &[]).await;
        let rect = canvas.element(root.unwrap()).unwrap();
        match &rect.fills[..] {
            [Paint::Image {
                scale_mode,
                image_hash,
            }] => {
                assert_eq!(*scale_mode, ScaleMode::Fill);
                assert_eq!(canvas.image_size(image_hash), Some((4, 2)));
            }
            other => panic!("expected one image fill, got {other:?}"),
        }
        assert_eq!(stats.embedded_bound, 1);
    }

    #[tokio::test]
    async fn test_oversized_embedded_image_is_dropped() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(png(4, 4));
        let mut t = template(serde_json::json!({
            "type": "RECTANGLE", "id": "1:2", "name": "logo",
            "fills": [
                { "type": "SOLID", "color": { "r": 0, "g": 0, "b": 1 } },
                { "type": "IMAGE" }
            ]
        }));
        t.embedded_images = Some(
            [("1:2".to_string(), crate::template::EmbeddedPayload::Inline(encoded))]
                .into_iter()
                .collect(),
        );
        let config = EngineConfig::default().with_max_image_bytes(16);
        let mut canvas = SceneCanvas::new();
        let (root, stats) = materialize_template(&mut canvas, &t, &[], &config).await;
        let rect = canvas.element(root.unwrap()).unwrap();
        assert_eq!(rect.fills, vec![Paint::solid(0.0, 0.0, 1.0)]);
        assert_eq!(stats.fills_dropped, 1);
    }

    #[tokio::test]
    async fn test_common_attributes() {
        let t = template(serde_json::json!({
            "type": "RECTANGLE", "name": "r", "x": 5, "y": 6,
            "visible": false, "locked": true, "opacity": 0.25,
            "rotation": 15, "blendMode": "MULTIPLY", "cornerRadius": 8,
            "strokes": [{ "type": "SOLID", "color": { "r": 0, "g": 0, "b": 0 } }],
            "strokeWeight": 3
        }));
        let mut canvas = SceneCanvas::new();
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        let rect = canvas.element(root).unwrap();
        assert_eq!((rect.x, rect.y), (5.0, 6.0));
        assert!(!rect.visible);
        assert!(rect.locked);
        assert_eq!(rect.opacity, 0.25);
        assert_eq!(rect.rotation, 15.0);
        assert_eq!(rect.blend_mode, BlendMode::Multiply);
        assert_eq!(rect.corner_radius, 8.0);
        assert_eq!(rect.strokes, vec![Paint::solid(0.0, 0.0, 0.0)]);
        assert_eq!(rect.stroke_weight, 3.0);
    }

    #[tokio::test]
    async fn test_unknown_blend_mode_is_skipped() {
        let t = template(serde_json::json!({
            "type": "RECTANGLE", "name": "r", "blendMode": "PLUS_DARKER"
        }));
        let mut canvas = SceneCanvas::new();
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        assert_eq!(canvas.element(root).unwrap().blend_mode, BlendMode::PassThrough);
    }

    #[tokio::test]
    async fn test_frame_child_count_never_exceeds_declared() {
        let t = template(serde_json::json!({
            "type": "FRAME", "name": "root",
            "children": [
                { "type": "FRAME", "name": "inner", "children": [
                    { "type": "LINE", "name": "l" },
                    { "type": "TEXT", "name": "t" }
                ]},
                { "type": "BOOLEAN_OPERATION", "name": "b" },
                { "type": "SLICE", "name": "s" }
            ]
        }));
        let mut canvas = SceneCanvas::new();
        let root = build(&mut canvas, &t, &[]).await.0.unwrap();
        assert_eq!(outline(&canvas, root), "frame:root[frame:inner[text:t]]");
    }
}
