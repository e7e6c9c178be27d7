//! In-memory canvas host

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use async_trait::async_trait;
use image::ImageReader;

use super::element::{Element, ElementId, ElementKind, ImageHash};
use super::{Canvas, CanvasError, Property, Severity};
use crate::template::FontFace;

/// Largest image edge accepted by default, in pixels
pub const DEFAULT_MAX_IMAGE_DIMENSION: u32 = 4096;

/// A message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
struct StoredImage {
    width: u32,
    height: u32,
}

/// Canvas host that keeps the whole document in memory.
///
/// Elements live in an arena indexed by [`ElementId`]. Like a real design
/// tool, text writes are rejected until the element's font face is loaded,
/// and groups can only be composed from existing elements.
#[derive(Debug)]
pub struct SceneCanvas {
    elements: Vec<Option<Element>>,
    page: Vec<ElementId>,
    selection: Vec<ElementId>,
    images: HashMap<ImageHash, StoredImage>,
    loaded_fonts: HashSet<FontFace>,
    /// `None` means every requested face loads
    available_fonts: Option<HashSet<FontFace>>,
    font_requests: Vec<FontFace>,
    notifications: Vec<Notification>,
    max_image_dimension: u32,
}

impl Default for SceneCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneCanvas {
    /// Create an empty canvas on which every font is available
    pub fn new() -> Self {
        Self {
            elements: Vec::new(),
            page: Vec::new(),
            selection: Vec::new(),
            images: HashMap::new(),
            loaded_fonts: HashSet::new(),
            available_fonts: None,
            font_requests: Vec::new(),
            notifications: Vec::new(),
            max_image_dimension: DEFAULT_MAX_IMAGE_DIMENSION,
        }
    }

    /// Restrict loadable fonts to the given faces
    pub fn with_available_fonts(mut self, faces: impl IntoIterator<Item = FontFace>) -> Self {
        self.available_fonts = Some(faces.into_iter().collect());
        self
    }

    /// Set the largest accepted image edge
    pub fn with_max_image_dimension(mut self, max: u32) -> Self {
        self.max_image_dimension = max;
        self
    }

    /// Top-level elements of the page, in stacking order
    pub fn page(&self) -> &[ElementId] {
        &self.page
    }

    pub fn selection(&self) -> &[ElementId] {
        &self.selection
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Every `load_font` call, in order
    pub fn font_requests(&self) -> &[FontFace] {
        &self.font_requests
    }

    /// Pixel size of a registered image
    pub fn image_size(&self, hash: &ImageHash) -> Option<(u32, u32)> {
        self.images.get(hash).map(|img| (img.width, img.height))
    }

    /// Number of elements that exist, attached or not
    pub fn live_element_count(&self) -> usize {
        self.elements.iter().filter(|e| e.is_some()).count()
    }

    fn insert(&mut self, element: Element) -> ElementId {
        let id = ElementId(self.elements.len());
        self.elements.push(Some(element));
        id
    }

    fn get(&self, id: ElementId) -> Result<&Element, CanvasError> {
        self.elements
            .get(id.0)
            .and_then(|e| e.as_ref())
            .ok_or(CanvasError::UnknownElement(id))
    }

    fn get_mut(&mut self, id: ElementId) -> Result<&mut Element, CanvasError> {
        self.elements
            .get_mut(id.0)
            .and_then(|e| e.as_mut())
            .ok_or(CanvasError::UnknownElement(id))
    }

    /// Remove an element from its parent's child list or from the page
    fn detach(&mut self, id: ElementId) {
        let parent = self.get(id).ok().and_then(|e| e.parent);
        match parent {
            Some(parent) => {
                if let Ok(p) = self.get_mut(parent) {
                    p.children.retain(|c| *c != id);
                }
                self.refit_group(parent);
            }
            None => self.page.retain(|c| *c != id),
        }
        if let Ok(e) = self.get_mut(id) {
            e.parent = None;
        }
    }

    fn is_ancestor(&self, candidate: ElementId, of: ElementId) -> bool {
        let mut current = self.get(of).ok().and_then(|e| e.parent);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.get(id).ok().and_then(|e| e.parent);
        }
        false
    }

    /// Groups hug their members
    fn refit_group(&mut self, id: ElementId) {
        let Ok(group) = self.get(id) else { return };
        if group.kind != ElementKind::Group {
            return;
        }
        let (width, height) = group
            .children
            .iter()
            .filter_map(|c| self.get(*c).ok())
            .fold((0.0f64, 0.0f64), |(w, h), c| (w.max(c.right()), h.max(c.bottom())));
        if let Ok(group) = self.get_mut(id) {
            group.width = width;
            group.height = height;
        }
    }

    fn check_text_font(&self, element: &Element, property: &Property) -> Result<(), CanvasError> {
        let face = match property {
            Property::FontName(face) => face,
            _ => match &element.text {
                Some(text) => &text.font,
                None => {
                    return Err(CanvasError::UnsupportedProperty {
                        kind: element.kind,
                        property: property.name(),
                    })
                }
            },
        };
        if self.loaded_fonts.contains(face) {
            Ok(())
        } else {
            Err(CanvasError::FontNotLoaded(face.clone()))
        }
    }
}

fn supports(kind: ElementKind, property: &Property) -> bool {
    use ElementKind::*;
    match property {
        Property::Name(_) | Property::Position { .. } | Property::Visible(_) | Property::Locked(_) => {
            true
        }
        Property::Size { .. } => kind != Group,
        Property::Opacity(_) | Property::Rotation(_) | Property::BlendMode(_) | Property::Effects(_) => {
            kind != Slice
        }
        Property::Fills(_) | Property::Strokes(_) | Property::StrokeWeight(_) => {
            matches!(kind, Frame | Rectangle | Text)
        }
        Property::CornerRadius(_) => matches!(kind, Frame | Rectangle),
        Property::ClipsContent(_) => kind == Frame,
        _ => kind == Text,
    }
}

#[async_trait]
impl Canvas for SceneCanvas {
    fn create_frame(&mut self) -> ElementId {
        self.insert(Element::new(ElementKind::Frame))
    }

    fn create_rectangle(&mut self) -> ElementId {
        self.insert(Element::new(ElementKind::Rectangle))
    }

    fn create_text(&mut self) -> ElementId {
        self.insert(Element::new(ElementKind::Text))
    }

    fn create_slice(&mut self) -> ElementId {
        self.insert(Element::new(ElementKind::Slice))
    }

    fn create_image(&mut self, bytes: &[u8]) -> Result<ImageHash, CanvasError> {
        if bytes.is_empty() {
            return Err(CanvasError::InvalidImage("empty payload".to_string()));
        }
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CanvasError::InvalidImage(e.to_string()))?
            .into_dimensions()
            .map_err(|e| CanvasError::InvalidImage(e.to_string()))?;
        if width > self.max_image_dimension || height > self.max_image_dimension {
            return Err(CanvasError::ImageTooLarge {
                width,
                height,
                max: self.max_image_dimension,
            });
        }

        let hash = ImageHash(format!("{:016x}", xxhash_rust::xxh3::xxh3_64(bytes)));
        self.images
            .entry(hash.clone())
            .or_insert(StoredImage { width, height });
        Ok(hash)
    }

    fn group(&mut self, members: &[ElementId]) -> Result<ElementId, CanvasError> {
        if members.is_empty() {
            return Err(CanvasError::EmptyGroup);
        }
        for member in members {
            self.get(*member)?;
        }

        let group = self.insert(Element::new(ElementKind::Group));
        for member in members {
            self.detach(*member);
            if let Ok(e) = self.get_mut(*member) {
                e.parent = Some(group);
            }
            if let Ok(g) = self.get_mut(group) {
                g.children.push(*member);
            }
        }
        self.refit_group(group);
        Ok(group)
    }

    fn set(&mut self, id: ElementId, property: Property) -> Result<(), CanvasError> {
        let element = self.get(id)?;
        if !supports(element.kind, &property) {
            return Err(CanvasError::UnsupportedProperty {
                kind: element.kind,
                property: property.name(),
            });
        }
        if property.is_text_property() {
            self.check_text_font(element, &property)?;
        }

        let parent = element.parent;
        let element = self.get_mut(id)?;
        match property {
            Property::Name(name) => element.name = name,
            Property::Position { x, y } => {
                element.x = x;
                element.y = y;
            }
            Property::Size { width, height } => {
                element.width = width;
                element.height = height;
            }
            Property::Visible(v) => element.visible = v,
            Property::Locked(v) => element.locked = v,
            Property::Opacity(v) => element.opacity = v,
            Property::Rotation(v) => element.rotation = v,
            Property::BlendMode(v) => element.blend_mode = v,
            Property::Fills(v) => element.fills = v,
            Property::Strokes(v) => element.strokes = v,
            Property::StrokeWeight(v) => element.stroke_weight = v,
            Property::Effects(v) => element.effects = v,
            Property::CornerRadius(v) => element.corner_radius = v,
            Property::ClipsContent(v) => element.clips_content = v,
            text_property => {
                if let Some(text) = element.text.as_mut() {
                    match text_property {
                        Property::FontName(face) => text.font = face,
                        Property::Characters(s) => text.characters = s,
                        Property::FontSize(v) => text.font_size = v,
                        Property::TextAlignHorizontal(s) => text.align_horizontal = s,
                        Property::TextAlignVertical(s) => text.align_vertical = s,
                        Property::LetterSpacing(v) => text.letter_spacing = v,
                        Property::LineHeight(v) => text.line_height = v,
                        Property::TextCase(s) => text.text_case = s,
                        _ => {}
                    }
                }
            }
        }

        if let Some(parent) = parent {
            self.refit_group(parent);
        }
        Ok(())
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), CanvasError> {
        let index = self.get(parent)?.children.len();
        self.insert_child(parent, index, child)
    }

    fn insert_child(
        &mut self,
        parent: ElementId,
        index: usize,
        child: ElementId,
    ) -> Result<(), CanvasError> {
        if !self.get(parent)?.kind.is_container() {
            return Err(CanvasError::NotAContainer(parent));
        }
        self.get(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(CanvasError::Cycle { parent, child });
        }

        self.detach(child);
        let target = self.get_mut(parent)?;
        let index = index.min(target.children.len());
        target.children.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        self.refit_group(parent);
        Ok(())
    }

    fn remove(&mut self, id: ElementId) {
        if self.get(id).is_err() {
            return;
        }
        self.detach(id);
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(slot) = self.elements.get_mut(current.0) {
                if let Some(element) = slot.take() {
                    stack.extend(element.children);
                }
            }
        }
        self.selection.retain(|s| *s != id);
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.get(id).ok()
    }

    async fn load_font(&mut self, face: &FontFace) -> Result<(), CanvasError> {
        self.font_requests.push(face.clone());
        let available = self
            .available_fonts
            .as_ref()
            .map_or(true, |fonts| fonts.contains(face));
        if available {
            self.loaded_fonts.insert(face.clone());
            Ok(())
        } else {
            Err(CanvasError::FontUnavailable(face.clone()))
        }
    }

    fn attach_to_page(&mut self, id: ElementId) -> Result<(), CanvasError> {
        self.get(id)?;
        self.detach(id);
        self.page.push(id);
        Ok(())
    }

    fn focus(&mut self, ids: &[ElementId]) {
        self.selection = ids
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_ok())
            .collect();
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        tracing::debug!(?severity, text = message, "user notification");
        self.notifications.push(Notification {
            message: message.to_string(),
            severity,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{outline, Paint};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        image::RgbaImage::new(width, height)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[tokio::test]
    async fn test_text_write_requires_loaded_font() {
        let mut canvas = SceneCanvas::new();
        let text = canvas.create_text();
        let err = canvas
            .set(text, Property::Characters("hi".to_string()))
            .unwrap_err();
        assert!(matches!(err, CanvasError::FontNotLoaded(_)));

        canvas
            .load_font(&FontFace::new("Inter", "Regular"))
            .await
            .unwrap();
        canvas
            .set(text, Property::Characters("hi".to_string()))
            .unwrap();
        assert_eq!(canvas.element(text).unwrap().characters(), Some("hi"));
    }

    #[tokio::test]
    async fn test_unavailable_font() {
        let mut canvas =
            SceneCanvas::new().with_available_fonts([FontFace::new("Inter", "Regular")]);
        let err = canvas
            .load_font(&FontFace::new("Roboto", "Bold"))
            .await
            .unwrap_err();
        assert!(matches!(err, CanvasError::FontUnavailable(_)));
        assert_eq!(canvas.font_requests().len(), 1);
    }

    #[test]
    fn test_group_requires_members() {
        let mut canvas = SceneCanvas::new();
        assert_eq!(canvas.group(&[]), Err(CanvasError::EmptyGroup));
    }

    #[test]
    fn test_group_hugs_members() {
        let mut canvas = SceneCanvas::new();
        let a = canvas.create_rectangle();
        canvas
            .set(a, Property::Size { width: 10.0, height: 20.0 })
            .unwrap();
        let b = canvas.create_rectangle();
        canvas.set(b, Property::Position { x: 30.0, y: 5.0 }).unwrap();
        canvas
            .set(b, Property::Size { width: 10.0, height: 10.0 })
            .unwrap();

        let group = canvas.group(&[a, b]).unwrap();
        let g = canvas.element(group).unwrap();
        assert_eq!(g.children, vec![a, b]);
        assert_eq!((g.width, g.height), (40.0, 20.0));
        assert_eq!(canvas.element(a).unwrap().parent, Some(group));
    }

    #[test]
    fn test_group_rejects_fills() {
        let mut canvas = SceneCanvas::new();
        let a = canvas.create_rectangle();
        let group = canvas.group(&[a]).unwrap();
        let err = canvas
            .set(group, Property::Fills(vec![Paint::solid(0.0, 0.0, 0.0)]))
            .unwrap_err();
        assert!(matches!(err, CanvasError::UnsupportedProperty { .. }));
    }

    #[test]
    fn test_insert_child_and_cycles() {
        let mut canvas = SceneCanvas::new();
        let outer = canvas.create_frame();
        let inner = canvas.create_frame();
        let rect = canvas.create_rectangle();
        canvas.set(outer, Property::Name("outer".into())).unwrap();
        canvas.set(inner, Property::Name("inner".into())).unwrap();
        canvas.set(rect, Property::Name("r".into())).unwrap();

        canvas.append_child(outer, rect).unwrap();
        canvas.insert_child(outer, 0, inner).unwrap();
        assert_eq!(outline(&canvas, outer), "frame:outer[frame:inner, rect:r]");

        assert!(matches!(
            canvas.append_child(inner, outer),
            Err(CanvasError::Cycle { .. })
        ));
        assert!(matches!(
            canvas.append_child(rect, inner),
            Err(CanvasError::NotAContainer(_))
        ));
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut canvas = SceneCanvas::new();
        let frame = canvas.create_frame();
        let rect = canvas.create_rectangle();
        canvas.append_child(frame, rect).unwrap();
        canvas.attach_to_page(frame).unwrap();
        assert_eq!(canvas.live_element_count(), 2);

        canvas.remove(frame);
        assert_eq!(canvas.live_element_count(), 0);
        assert!(canvas.page().is_empty());
        assert!(canvas.element(rect).is_none());
    }

    #[test]
    fn test_create_image() {
        let mut canvas = SceneCanvas::new();
        let bytes = png(3, 2);
        let hash = canvas.create_image(&bytes).unwrap();
        assert_eq!(canvas.image_size(&hash), Some((3, 2)));
        assert_eq!(canvas.create_image(&bytes).unwrap(), hash);

        assert!(matches!(
            canvas.create_image(b"definitely not an image"),
            Err(CanvasError::InvalidImage(_))
        ));
        assert!(matches!(
            canvas.create_image(&[]),
            Err(CanvasError::InvalidImage(_))
        ));
    }

    #[test]
    fn test_create_image_too_large() {
        let mut canvas = SceneCanvas::new().with_max_image_dimension(4);
        let err = canvas.create_image(&png(8, 2)).unwrap_err();
        assert_eq!(
            err,
            CanvasError::ImageTooLarge {
                width: 8,
                height: 2,
                max: 4
            }
        );
    }

    #[test]
    fn test_notify_and_focus() {
        let mut canvas = SceneCanvas::new();
        let frame = canvas.create_frame();
        canvas.focus(&[frame, ElementId(99)]);
        assert_eq!(canvas.selection(), &[frame]);
        canvas.notify("done", Severity::Info);
        assert_eq!(canvas.notifications()[0].message, "done");
    }
}
