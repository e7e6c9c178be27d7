//! Canvas doubles for exercising failure paths

use async_trait::async_trait;

use super::{Canvas, CanvasError, Element, ElementId, ImageHash, Property, SceneCanvas, Severity};
use crate::template::FontFace;

/// A [`SceneCanvas`] that refuses the property writes matched by `reject`
pub struct RejectingCanvas {
    pub inner: SceneCanvas,
    reject: fn(&Property) -> bool,
}

impl RejectingCanvas {
    pub fn new(inner: SceneCanvas, reject: fn(&Property) -> bool) -> Self {
        Self { inner, reject }
    }
}

#[async_trait]
impl Canvas for RejectingCanvas {
    fn create_frame(&mut self) -> ElementId {
        self.inner.create_frame()
    }

    fn create_rectangle(&mut self) -> ElementId {
        self.inner.create_rectangle()
    }

    fn create_text(&mut self) -> ElementId {
        self.inner.create_text()
    }

    fn create_slice(&mut self) -> ElementId {
        self.inner.create_slice()
    }

    fn create_image(&mut self, bytes: &[u8]) -> Result<ImageHash, CanvasError> {
        self.inner.create_image(bytes)
    }

    fn group(&mut self, members: &[ElementId]) -> Result<ElementId, CanvasError> {
        self.inner.group(members)
    }

    fn set(&mut self, id: ElementId, property: Property) -> Result<(), CanvasError> {
        if (self.reject)(&property) {
            let kind = self.inner.element(id).ok_or(CanvasError::UnknownElement(id))?.kind;
            return Err(CanvasError::UnsupportedProperty {
                kind,
                property: property.name(),
            });
        }
        self.inner.set(id, property)
    }

    fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), CanvasError> {
        self.inner.append_child(parent, child)
    }

    fn insert_child(
        &mut self,
        parent: ElementId,
        index: usize,
        child: ElementId,
    ) -> Result<(), CanvasError> {
        self.inner.insert_child(parent, index, child)
    }

    fn remove(&mut self, id: ElementId) {
        self.inner.remove(id)
    }

    fn element(&self, id: ElementId) -> Option<&Element> {
        self.inner.element(id)
    }

    async fn load_font(&mut self, face: &FontFace) -> Result<(), CanvasError> {
        self.inner.load_font(face).await
    }

    fn attach_to_page(&mut self, id: ElementId) -> Result<(), CanvasError> {
        self.inner.attach_to_page(id)
    }

    fn focus(&mut self, ids: &[ElementId]) {
        self.inner.focus(ids)
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.inner.notify(message, severity)
    }
}
