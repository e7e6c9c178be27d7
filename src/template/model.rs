//! Serialized template document schema
//!
//! Templates are exported from a design tool as JSON. Field names follow the
//! exporter's camelCase convention; every optional attribute stays optional
//! here and defaults are applied by the materializer.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_opacity() -> f64 {
    1.0
}

fn default_blend_mode() -> String {
    "PASS_THROUGH".to_string()
}

fn default_photo_prefix() -> String {
    "photo-".to_string()
}

/// A complete template: metadata plus the root of the node tree
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub version: u32,
    pub width: f64,
    pub height: f64,
    pub slide_width: f64,
    pub slide_height: f64,
    pub slides: u32,
    /// Name prefix marking photo placeholder layers (`photo-1`, `photo-2`, ...)
    #[serde(default = "default_photo_prefix")]
    pub photo_layer_name_prefix: String,
    /// Wrap every photo layer in a grayscale overlay after materialization
    #[serde(default)]
    pub photo_grayscale: bool,
    /// Decorative images keyed by node id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded_images: Option<HashMap<String, EmbeddedPayload>>,
    pub node_tree: TemplateNode,
}

impl TemplateData {
    /// Look up the embedded image payload declared for a node id
    pub fn embedded_image(&self, node_id: &str) -> Option<&EmbeddedPayload> {
        self.embedded_images.as_ref()?.get(node_id)
    }

    /// Total number of nodes in the tree, root included
    pub fn node_count(&self) -> usize {
        self.node_tree.descendant_count() + 1
    }
}

/// Base64 image data, either inline or split into chunks by the bundler
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum EmbeddedPayload {
    Inline(String),
    Chunked(Vec<String>),
}

impl EmbeddedPayload {
    /// The full base64 text with chunks concatenated in order
    pub fn joined(&self) -> std::borrow::Cow<'_, str> {
        match self {
            EmbeddedPayload::Inline(s) => std::borrow::Cow::Borrowed(s.as_str()),
            EmbeddedPayload::Chunked(parts) => std::borrow::Cow::Owned(parts.concat()),
        }
    }
}

/// Node type tag. Unknown tags are kept as `Unsupported` instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum NodeType {
    Frame,
    Group,
    Rectangle,
    Text,
    Slice,
    Vector,
    Ellipse,
    Line,
    BooleanOperation,
    Star,
    Polygon,
    Unsupported(String),
}

impl NodeType {
    pub fn as_str(&self) -> &str {
        match self {
            NodeType::Frame => "FRAME",
            NodeType::Group => "GROUP",
            NodeType::Rectangle => "RECTANGLE",
            NodeType::Text => "TEXT",
            NodeType::Slice => "SLICE",
            NodeType::Vector => "VECTOR",
            NodeType::Ellipse => "ELLIPSE",
            NodeType::Line => "LINE",
            NodeType::BooleanOperation => "BOOLEAN_OPERATION",
            NodeType::Star => "STAR",
            NodeType::Polygon => "POLYGON",
            NodeType::Unsupported(other) => other,
        }
    }

    /// Whether `children` carries structure for this type
    pub fn is_container(&self) -> bool {
        matches!(self, NodeType::Frame | NodeType::Group)
    }
}

impl From<String> for NodeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "FRAME" => NodeType::Frame,
            "GROUP" => NodeType::Group,
            "RECTANGLE" => NodeType::Rectangle,
            "TEXT" => NodeType::Text,
            "SLICE" => NodeType::Slice,
            "VECTOR" => NodeType::Vector,
            "ELLIPSE" => NodeType::Ellipse,
            "LINE" => NodeType::Line,
            "BOOLEAN_OPERATION" => NodeType::BooleanOperation,
            "STAR" => NodeType::Star,
            "POLYGON" => NodeType::Polygon,
            _ => NodeType::Unsupported(value),
        }
    }
}

impl From<NodeType> for String {
    fn from(value: NodeType) -> Self {
        value.as_str().to_string()
    }
}

/// One node of the template tree. `x` and `y` are relative to the parent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateNode {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    pub rotation: Option<f64>,
    #[serde(default = "default_blend_mode")]
    pub blend_mode: String,
    pub fills: Option<Vec<PaintSpec>>,
    pub strokes: Option<Vec<PaintSpec>>,
    pub stroke_weight: Option<f64>,
    pub corner_radius: Option<f64>,
    pub clips_content: Option<bool>,
    pub effects: Option<Vec<EffectSpec>>,
    pub children: Option<Vec<TemplateNode>>,
    #[serde(flatten)]
    pub text: TextSpec,
}

impl TemplateNode {
    /// Width and height, only when both are declared
    pub fn size(&self) -> Option<(f64, f64)> {
        Some((self.width?, self.height?))
    }

    pub fn children(&self) -> &[TemplateNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    fn descendant_count(&self) -> usize {
        self.children()
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }
}

/// Text-only attributes, flattened into the node object
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub characters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_name: Option<FontFace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_horizontal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_align_vertical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<LetterSpacingSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<LineHeightSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_case: Option<String>,
}

/// A font family and style pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct FontFace {
    pub family: String,
    pub style: String,
}

impl FontFace {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl std::fmt::Display for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// An RGB color with channels in `0..=1` and an optional alpha
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "default_opacity")]
    pub a: f64,
}

impl Color {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// `#rrggbb` form, alpha dropped
    pub fn to_hex(&self) -> String {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize, Serialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

/// Fill or stroke descriptor as declared in the template
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaintSpec {
    #[serde(rename_all = "camelCase")]
    Solid { color: Color, opacity: Option<f64> },
    #[serde(rename_all = "camelCase")]
    Image {
        scale_mode: Option<String>,
        image_ref: Option<String>,
    },
    /// Gradients, videos and anything else the engine does not reproduce
    #[serde(other)]
    Unsupported,
}

/// Effect descriptor as declared in the template
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectSpec {
    DropShadow(ShadowSpec),
    InnerShadow(ShadowSpec),
    LayerBlur(BlurSpec),
    BackgroundBlur(BlurSpec),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowSpec {
    pub color: Color,
    #[serde(default)]
    pub offset: Offset,
    #[serde(default)]
    pub radius: f64,
    pub spread: Option<f64>,
    pub visible: Option<bool>,
    pub blend_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlurSpec {
    #[serde(default)]
    pub radius: f64,
    pub visible: Option<bool>,
}

/// Letter spacing: a bare number is pixels, otherwise an explicit unit
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LetterSpacingSpec {
    Pixels(f64),
    Explicit { unit: String, value: f64 },
}

/// Line height: a bare number is pixels, `"AUTO"`, or an explicit unit
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum LineHeightSpec {
    Pixels(f64),
    Keyword(String),
    Explicit {
        unit: String,
        #[serde(default)]
        value: Option<f64>,
    },
}
