//! Template documents and the catalog they are served from
//!
//! A template is a JSON export of a design: metadata describing the carousel
//! geometry (total size, slide size, slide count, photo layer naming) and a
//! recursive node tree. Templates are loaded once into a [`TemplateCatalog`]
//! and never mutated afterwards.
//!
//! # Example
//!
//! ```text
//! {
//!   "id": "t3", "name": "Minimal", "width": 3240, "height": 1350,
//!   "slideWidth": 1080, "slideHeight": 1350, "slides": 3,
//!   "photoLayerNamePrefix": "photo-",
//!   "nodeTree": { "type": "FRAME", "name": "Carousel", "children": [ ... ] }
//! }
//! ```

mod catalog;
mod model;

pub use catalog::{parse_template_file, CatalogError, IndexEntry, TemplateCatalog, INDEX_FILE};
pub use model::{
    BlurSpec, Color, EffectSpec, EmbeddedPayload, FontFace, LetterSpacingSpec, LineHeightSpec,
    NodeType, Offset, PaintSpec, ShadowSpec, TemplateData, TemplateNode, TextSpec,
};
