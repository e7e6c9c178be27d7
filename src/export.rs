//! Export regions and the instructions frame
//!
//! A carousel is one wide design cut into equal slides. [`partition`] adds a
//! slice region per slide inside the root so the regions move with it, and
//! [`instructions_frame`] builds the note placed above the carousel telling
//! the user how to export them.

use thiserror::Error;
use tracing::warn;

use crate::canvas::{set_all, Canvas, CanvasError, ElementId, Paint, Property};
use crate::font::{FontError, FontResolver};
use crate::template::TemplateData;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("element {0} cannot hold export slices")]
    NotAContainer(ElementId),

    #[error("element {0} does not exist")]
    MissingRoot(ElementId),

    #[error("invalid slide geometry: {slides} slides of {width}x{height}")]
    InvalidGeometry { slides: u32, width: f64, height: f64 },

    #[error(transparent)]
    Canvas(#[from] CanvasError),

    #[error("instructions text: {0}")]
    Font(#[from] FontError),
}

/// Most slides a single carousel may be cut into
pub const MAX_SLIDES: u32 = 1000;

/// How the root is cut into slides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlicePlan {
    pub slides: u32,
    pub slide_width: f64,
    pub slide_height: f64,
}

impl SlicePlan {
    pub fn new(slides: u32, slide_width: f64, slide_height: f64) -> Self {
        Self {
            slides,
            slide_width,
            slide_height,
        }
    }

    pub fn from_template(template: &TemplateData) -> Self {
        Self::new(template.slides, template.slide_width, template.slide_height)
    }

    fn validate(&self) -> Result<(), ExportError> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if self.slides <= MAX_SLIDES && positive(self.slide_width) && positive(self.slide_height) {
            Ok(())
        } else {
            Err(ExportError::InvalidGeometry {
                slides: self.slides,
                width: self.slide_width,
                height: self.slide_height,
            })
        }
    }
}

/// Name of the i-th (1-based) export region
pub fn slice_name(index: u32) -> String {
    format!("slice-{index}")
}

/// Append one slice per slide to `root`, left to right.
///
/// Slice `i` covers `x = (i - 1) * slide_width` over the full slide height.
/// On failure every slice created so far is removed again.
pub fn partition<C: Canvas + ?Sized>(
    canvas: &mut C,
    root: ElementId,
    plan: &SlicePlan,
) -> Result<Vec<ElementId>, ExportError> {
    let Some(element) = canvas.element(root) else {
        return Err(ExportError::MissingRoot(root));
    };
    if !element.kind.is_container() {
        return Err(ExportError::NotAContainer(root));
    }
    plan.validate()?;

    let covered = f64::from(plan.slides) * plan.slide_width;
    if covered > element.width {
        warn!(
            root = %element.name,
            root_width = element.width,
            covered,
            "slices extend past the root"
        );
    }

    let mut slices = Vec::new();
    for index in 1..=plan.slides {
        let slice = canvas.create_slice();
        let configured = set_all(
            canvas,
            slice,
            [
                Property::Name(slice_name(index)),
                Property::Position {
                    x: f64::from(index - 1) * plan.slide_width,
                    y: 0.0,
                },
                Property::Size {
                    width: plan.slide_width,
                    height: plan.slide_height,
                },
            ],
        )
        .and_then(|()| canvas.append_child(root, slice));
        if let Err(e) = configured {
            canvas.remove(slice);
            for created in slices {
                canvas.remove(created);
            }
            return Err(e.into());
        }
        slices.push(slice);
    }
    Ok(slices)
}

pub const INSTRUCTIONS_NAME: &str = "Export instructions";

const INSTRUCTIONS_PADDING: f64 = 16.0;
const INSTRUCTIONS_TEXT_HEIGHT: f64 = 400.0;
const INSTRUCTIONS_FONT_SIZE: f64 = 14.0;

/// The export how-to shown above the carousel
pub fn instructions_text(slides: u32) -> String {
    format!(
        "How to export the slides:\n\n\
         1. Select the slice layers (slice-1 to {}) in the layers panel\n\
         2. In the right panel, click Export\n\
         3. Choose the format (PNG or JPG) and the scale (1x, 2x, ...)\n\
         4. Click Export to download the images",
        slice_name(slides.max(1))
    )
}

/// Build the instructions frame: a light panel as wide as the template with
/// the how-to text inset by 16px. The frame is left unattached.
pub async fn instructions_frame<C: Canvas + ?Sized>(
    canvas: &mut C,
    fonts: &mut FontResolver,
    width: f64,
    slides: u32,
) -> Result<ElementId, ExportError> {
    let face = fonts.default_face().clone();
    let face = fonts.resolve(canvas, &face).await?;

    let frame = canvas.create_frame();
    let text = canvas.create_text();
    let built = build_instructions(canvas, frame, text, face, width, slides);
    if let Err(e) = built {
        canvas.remove(frame);
        canvas.remove(text);
        return Err(e);
    }
    Ok(frame)
}

fn build_instructions<C: Canvas + ?Sized>(
    canvas: &mut C,
    frame: ElementId,
    text: ElementId,
    face: crate::template::FontFace,
    width: f64,
    slides: u32,
) -> Result<(), ExportError> {
    set_all(
        canvas,
        frame,
        [
            Property::Name(INSTRUCTIONS_NAME.to_string()),
            Property::Fills(vec![Paint::solid(0.97, 0.97, 0.98)]),
            Property::Size { width, height: 1.0 },
            Property::ClipsContent(false),
        ],
    )?;

    set_all(
        canvas,
        text,
        [
            Property::Name("Instructions".to_string()),
            Property::FontName(face),
            Property::Characters(instructions_text(slides)),
            Property::FontSize(INSTRUCTIONS_FONT_SIZE),
            Property::Position {
                x: INSTRUCTIONS_PADDING,
                y: INSTRUCTIONS_PADDING,
            },
            Property::Size {
                width: (width - 2.0 * INSTRUCTIONS_PADDING).max(1.0),
                height: INSTRUCTIONS_TEXT_HEIGHT,
            },
            Property::Fills(vec![Paint::solid(0.2, 0.2, 0.25)]),
        ],
    )?;
    canvas.append_child(frame, text)?;

    let text_height = canvas
        .element(text)
        .map_or(INSTRUCTIONS_TEXT_HEIGHT, |t| t.height);
    canvas.set(
        frame,
        Property::Size {
            width,
            height: text_height + 2.0 * INSTRUCTIONS_PADDING,
        },
    )?;
    Ok(())
}

/// Place the instructions frame at the page origin and `root` below it.
///
/// Without instructions the root sits at the origin.
pub fn stack_on_page<C: Canvas + ?Sized>(
    canvas: &mut C,
    instructions: Option<ElementId>,
    root: ElementId,
    gap: f64,
) -> Result<(), CanvasError> {
    let mut y = 0.0;
    if let Some(frame) = instructions {
        canvas.set(frame, Property::Position { x: 0.0, y: 0.0 })?;
        y = canvas.element(frame).map_or(0.0, |f| f.height) + gap;
    }
    canvas.set(root, Property::Position { x: 0.0, y })
}
