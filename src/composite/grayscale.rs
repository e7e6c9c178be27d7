//! Grayscale photo wrapping

use tracing::{debug, warn};

use super::CompositeError;
use crate::canvas::{descendants, set_all, BlendMode, Canvas, ElementId, Paint, Property};
use crate::template::Color;

/// Name of the rectangle that desaturates the photo below it
pub const OVERLAY_NAME: &str = "grayscale-overlay";

/// Name of the frame holding a photo and its overlay
pub const WRAPPER_NAME: &str = "grayscale";

/// Wrap every photo layer below `root` with a COLOR-blended gray overlay.
///
/// Each wrapper takes the photo's slot in its parent, its position, size and
/// visible/locked flags. The photo moves into the wrapper at the local origin
/// and the overlay is stacked above it. Returns the wrapper ids.
///
/// When any write fails, every photo wrapped so far is put back in its slot
/// with its original flags and the wrappers are deleted.
pub fn wrap_photos<C: Canvas + ?Sized>(
    canvas: &mut C,
    root: ElementId,
    prefix: &str,
    color: Color,
) -> Result<Vec<ElementId>, CompositeError> {
    if canvas.element(root).is_none() {
        return Err(CompositeError::MissingRoot(root));
    }

    let photos: Vec<ElementId> = descendants(canvas, root)
        .into_iter()
        .filter(|id| {
            canvas
                .element(*id)
                .is_some_and(|e| e.name.starts_with(prefix))
        })
        .collect();

    let mut wrapped: Vec<Wrapped> = Vec::new();
    for photo in photos {
        match wrap_photo(canvas, photo, color) {
            Ok(Some(done)) => wrapped.push(done),
            Ok(None) => {}
            Err(e) => {
                for done in wrapped.iter().rev() {
                    done.undo(canvas);
                }
                return Err(e);
            }
        }
    }
    debug!(count = wrapped.len(), "grayscale overlays applied");
    Ok(wrapped.into_iter().map(|w| w.wrapper).collect())
}

/// Where a photo sat before it was wrapped
struct Wrapped {
    photo: ElementId,
    wrapper: ElementId,
    parent: ElementId,
    slot: usize,
    x: f64,
    y: f64,
    visible: bool,
    locked: bool,
}

impl Wrapped {
    /// Put the photo back in its slot and delete the wrapper with its overlay
    fn undo<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        let restored = canvas
            .insert_child(self.parent, self.slot, self.photo)
            .and_then(|()| {
                set_all(
                    canvas,
                    self.photo,
                    [
                        Property::Position {
                            x: self.x,
                            y: self.y,
                        },
                        Property::Visible(self.visible),
                        Property::Locked(self.locked),
                    ],
                )
            });
        if let Err(e) = restored {
            warn!(photo = %self.photo, error = %e, "photo layer not fully restored");
        }
        canvas.remove(self.wrapper);
    }
}

fn wrap_photo<C: Canvas + ?Sized>(
    canvas: &mut C,
    photo: ElementId,
    color: Color,
) -> Result<Option<Wrapped>, CompositeError> {
    let Some(element) = canvas.element(photo) else {
        return Ok(None);
    };
    let Some(parent) = element.parent else {
        warn!(photo = %element.name, "photo layer has no parent, not wrapped");
        return Ok(None);
    };
    let (x, y) = (element.x, element.y);
    let (width, height) = (element.width, element.height);
    let (visible, locked) = (element.visible, element.locked);
    let slot = canvas
        .element(parent)
        .and_then(|p| p.children.iter().position(|c| *c == photo))
        .unwrap_or(0);

    let wrapped = Wrapped {
        photo,
        wrapper: canvas.create_frame(),
        parent,
        slot,
        x,
        y,
        visible,
        locked,
    };

    let overlay = canvas.create_rectangle();
    if let Err(e) = build_wrapper(canvas, &wrapped, overlay, width, height, color) {
        wrapped.undo(canvas);
        canvas.remove(overlay);
        return Err(e);
    }
    Ok(Some(wrapped))
}

fn build_wrapper<C: Canvas + ?Sized>(
    canvas: &mut C,
    wrapped: &Wrapped,
    overlay: ElementId,
    width: f64,
    height: f64,
    color: Color,
) -> Result<(), CompositeError> {
    let wrapper = wrapped.wrapper;
    set_all(
        canvas,
        wrapper,
        [
            Property::Name(WRAPPER_NAME.to_string()),
            Property::Fills(vec![]),
            Property::ClipsContent(false),
            Property::Size { width, height },
            Property::Position {
                x: wrapped.x,
                y: wrapped.y,
            },
            Property::Visible(wrapped.visible),
            Property::Locked(wrapped.locked),
        ],
    )?;
    canvas.insert_child(wrapped.parent, wrapped.slot, wrapper)?;

    canvas.append_child(wrapper, wrapped.photo)?;
    set_all(
        canvas,
        wrapped.photo,
        [
            Property::Position { x: 0.0, y: 0.0 },
            Property::Visible(true),
            Property::Locked(false),
        ],
    )?;

    set_all(
        canvas,
        overlay,
        [
            Property::Name(OVERLAY_NAME.to_string()),
            Property::Size { width, height },
            Property::Position { x: 0.0, y: 0.0 },
            Property::Fills(vec![Paint::Solid {
                color: Color::rgb(color.r, color.g, color.b),
                opacity: 1.0,
            }]),
            Property::BlendMode(BlendMode::Color),
        ],
    )?;
    canvas.append_child(wrapper, overlay)?;
    Ok(())
}
