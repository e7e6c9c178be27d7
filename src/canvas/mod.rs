//! Host canvas capabilities consumed by the engine
//!
//! The engine never owns visual elements itself. It drives a host through the
//! [`Canvas`] trait: creating primitives, writing properties, composing groups,
//! loading fonts and notifying the user. Element creation and property writes
//! are synchronous; font loading is the only asynchronous host call.
//!
//! [`SceneCanvas`] is an in-memory host used by the CLI preview and the tests.

mod element;
mod scene;
#[cfg(test)]
pub(crate) mod testing;

pub use element::{
    BlendMode, BlurKind, Effect, Element, ElementId, ElementKind, ImageHash, LetterSpacing,
    LineHeight, Paint, ScaleMode, ShadowKind, SpacingUnit, TextContent,
};
pub use scene::{Notification, SceneCanvas};

use async_trait::async_trait;
use thiserror::Error;

use crate::template::FontFace;

/// Errors reported by a canvas host
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CanvasError {
    #[error("unknown element {0}")]
    UnknownElement(ElementId),

    #[error("{kind:?} elements do not support {property}")]
    UnsupportedProperty {
        kind: ElementKind,
        property: &'static str,
    },

    /// Text properties were written before the element's font was loaded
    #[error("font {0} is not loaded")]
    FontNotLoaded(FontFace),

    #[error("font {0} is not available")]
    FontUnavailable(FontFace),

    #[error("invalid image data: {0}")]
    InvalidImage(String),

    #[error("image is {width}x{height}, larger than the {max}px limit")]
    ImageTooLarge { width: u32, height: u32, max: u32 },

    #[error("cannot compose a group without members")]
    EmptyGroup,

    #[error("element {0} cannot hold children")]
    NotAContainer(ElementId),

    #[error("moving {child} under {parent} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },
}

/// Severity of a user-facing notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single property write
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Name(String),
    Position { x: f64, y: f64 },
    Size { width: f64, height: f64 },
    Visible(bool),
    Locked(bool),
    Opacity(f64),
    Rotation(f64),
    BlendMode(BlendMode),
    Fills(Vec<Paint>),
    Strokes(Vec<Paint>),
    StrokeWeight(f64),
    Effects(Vec<Effect>),
    CornerRadius(f64),
    ClipsContent(bool),
    FontName(FontFace),
    Characters(String),
    FontSize(f64),
    TextAlignHorizontal(String),
    TextAlignVertical(String),
    LetterSpacing(LetterSpacing),
    LineHeight(LineHeight),
    TextCase(String),
}

impl Property {
    pub fn name(&self) -> &'static str {
        match self {
            Property::Name(_) => "name",
            Property::Position { .. } => "position",
            Property::Size { .. } => "size",
            Property::Visible(_) => "visible",
            Property::Locked(_) => "locked",
            Property::Opacity(_) => "opacity",
            Property::Rotation(_) => "rotation",
            Property::BlendMode(_) => "blendMode",
            Property::Fills(_) => "fills",
            Property::Strokes(_) => "strokes",
            Property::StrokeWeight(_) => "strokeWeight",
            Property::Effects(_) => "effects",
            Property::CornerRadius(_) => "cornerRadius",
            Property::ClipsContent(_) => "clipsContent",
            Property::FontName(_) => "fontName",
            Property::Characters(_) => "characters",
            Property::FontSize(_) => "fontSize",
            Property::TextAlignHorizontal(_) => "textAlignHorizontal",
            Property::TextAlignVertical(_) => "textAlignVertical",
            Property::LetterSpacing(_) => "letterSpacing",
            Property::LineHeight(_) => "lineHeight",
            Property::TextCase(_) => "textCase",
        }
    }

    /// Whether the write requires the text element's font to be loaded
    pub fn is_text_property(&self) -> bool {
        matches!(
            self,
            Property::FontName(_)
                | Property::Characters(_)
                | Property::FontSize(_)
                | Property::TextAlignHorizontal(_)
                | Property::TextAlignVertical(_)
                | Property::LetterSpacing(_)
                | Property::LineHeight(_)
                | Property::TextCase(_)
        )
    }
}

/// The capability set a design surface offers to the engine
#[async_trait]
pub trait Canvas: Send {
    fn create_frame(&mut self) -> ElementId;
    fn create_rectangle(&mut self) -> ElementId;
    fn create_text(&mut self) -> ElementId;
    fn create_slice(&mut self) -> ElementId;

    /// Register raw image bytes and return their hash for use in image paints
    fn create_image(&mut self, bytes: &[u8]) -> Result<ImageHash, CanvasError>;

    /// Compose a group from existing elements, in the given stacking order
    fn group(&mut self, members: &[ElementId]) -> Result<ElementId, CanvasError>;

    fn set(&mut self, id: ElementId, property: Property) -> Result<(), CanvasError>;

    /// Move `child` to the top of `parent`'s children
    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), CanvasError>;

    /// Move `child` into `parent` at `index` (clamped to the child count)
    fn insert_child(
        &mut self,
        parent: ElementId,
        index: usize,
        child: ElementId,
    ) -> Result<(), CanvasError>;

    /// Delete an element and its subtree
    fn remove(&mut self, id: ElementId);

    fn element(&self, id: ElementId) -> Option<&Element>;

    /// Make a font face available for text writes
    async fn load_font(&mut self, face: &FontFace) -> Result<(), CanvasError>;

    /// Place an element at the top level of the current page
    fn attach_to_page(&mut self, id: ElementId) -> Result<(), CanvasError>;

    /// Select the elements and scroll the viewport to them
    fn focus(&mut self, ids: &[ElementId]);

    fn notify(&mut self, message: &str, severity: Severity);
}

/// Convenience wrapper applying several writes in order
pub fn set_all<C: Canvas + ?Sized>(
    canvas: &mut C,
    id: ElementId,
    properties: impl IntoIterator<Item = Property>,
) -> Result<(), CanvasError> {
    for property in properties {
        canvas.set(id, property)?;
    }
    Ok(())
}

/// All descendants of `root` in pre-order, `root` excluded
pub fn descendants<C: Canvas + ?Sized>(canvas: &C, root: ElementId) -> Vec<ElementId> {
    let mut out = Vec::new();
    let mut stack: Vec<ElementId> = match canvas.element(root) {
        Some(e) => e.children.iter().rev().copied().collect(),
        None => return out,
    };
    while let Some(id) = stack.pop() {
        out.push(id);
        if let Some(e) = canvas.element(id) {
            stack.extend(e.children.iter().rev().copied());
        }
    }
    out
}

/// First descendant of `root` (pre-order) matching the predicate
pub fn find_descendant<C: Canvas + ?Sized>(
    canvas: &C,
    root: ElementId,
    predicate: impl Fn(&Element) -> bool,
) -> Option<ElementId> {
    descendants(canvas, root)
        .into_iter()
        .find(|id| canvas.element(*id).is_some_and(&predicate))
}

/// Compact one-line description of a subtree, e.g. `frame:Root[rect:bg, text:Title]`
pub fn outline<C: Canvas + ?Sized>(canvas: &C, root: ElementId) -> String {
    let Some(element) = canvas.element(root) else {
        return String::new();
    };
    let mut out = format!("{}:{}", element.kind.as_str(), element.name);
    if !element.children.is_empty() {
        let children: Vec<String> = element
            .children
            .iter()
            .map(|child| outline(canvas, *child))
            .collect();
        out.push('[');
        out.push_str(&children.join(", "));
        out.push(']');
    }
    out
}
