//! Concrete element model shared by every canvas host

use serde::Serialize;

use crate::template::{Color, FontFace, Offset};

/// Handle to an element owned by a canvas host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(pub usize);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content hash of an image registered with the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ImageHash(pub String);

impl std::fmt::Display for ImageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ElementKind {
    Frame,
    Group,
    Rectangle,
    Text,
    Slice,
}

impl ElementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Frame => "frame",
            ElementKind::Group => "group",
            ElementKind::Rectangle => "rect",
            ElementKind::Text => "text",
            ElementKind::Slice => "slice",
        }
    }

    /// Whether the element can hold children
    pub fn is_container(&self) -> bool {
        matches!(self, ElementKind::Frame | ElementKind::Group)
    }
}

/// Layer blend modes understood by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlendMode {
    PassThrough,
    Normal,
    Darken,
    Multiply,
    LinearBurn,
    ColorBurn,
    Lighten,
    Screen,
    LinearDodge,
    ColorDodge,
    Overlay,
    SoftLight,
    HardLight,
    Difference,
    Exclusion,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

impl BlendMode {
    /// Parse the exporter's SCREAMING_SNAKE_CASE name
    pub fn parse(name: &str) -> Option<Self> {
        let mode = match name {
            "PASS_THROUGH" => BlendMode::PassThrough,
            "NORMAL" => BlendMode::Normal,
            "DARKEN" => BlendMode::Darken,
            "MULTIPLY" => BlendMode::Multiply,
            "LINEAR_BURN" => BlendMode::LinearBurn,
            "COLOR_BURN" => BlendMode::ColorBurn,
            "LIGHTEN" => BlendMode::Lighten,
            "SCREEN" => BlendMode::Screen,
            "LINEAR_DODGE" => BlendMode::LinearDodge,
            "COLOR_DODGE" => BlendMode::ColorDodge,
            "OVERLAY" => BlendMode::Overlay,
            "SOFT_LIGHT" => BlendMode::SoftLight,
            "HARD_LIGHT" => BlendMode::HardLight,
            "DIFFERENCE" => BlendMode::Difference,
            "EXCLUSION" => BlendMode::Exclusion,
            "HUE" => BlendMode::Hue,
            "SATURATION" => BlendMode::Saturation,
            "COLOR" => BlendMode::Color,
            "LUMINOSITY" => BlendMode::Luminosity,
            _ => return None,
        };
        Some(mode)
    }
}

/// How an image fill is fitted into its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScaleMode {
    Fill,
    Fit,
    Crop,
    Tile,
}

impl ScaleMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScaleMode::Fill => "FILL",
            ScaleMode::Fit => "FIT",
            ScaleMode::Crop => "CROP",
            ScaleMode::Tile => "TILE",
        }
    }
}

/// A resolved fill or stroke
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Paint {
    Solid {
        color: Color,
        opacity: f64,
    },
    Image {
        scale_mode: ScaleMode,
        image_hash: ImageHash,
    },
}

impl Paint {
    pub fn solid(r: f64, g: f64, b: f64) -> Self {
        Paint::Solid {
            color: Color::rgb(r, g, b),
            opacity: 1.0,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Paint::Image { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShadowKind {
    Drop,
    Inner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BlurKind {
    Layer,
    Background,
}

/// A resolved visual effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Effect {
    Shadow {
        kind: ShadowKind,
        color: Color,
        offset: Offset,
        radius: f64,
        spread: f64,
        visible: bool,
        blend_mode: BlendMode,
    },
    Blur {
        kind: BlurKind,
        radius: f64,
        visible: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SpacingUnit {
    Pixels,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LetterSpacing {
    pub unit: SpacingUnit,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum LineHeight {
    Auto,
    Pixels(f64),
    Percent(f64),
}

/// Text-specific state of a text element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextContent {
    pub font: FontFace,
    pub characters: String,
    pub font_size: f64,
    pub align_horizontal: String,
    pub align_vertical: String,
    pub letter_spacing: LetterSpacing,
    pub line_height: LineHeight,
    pub text_case: String,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            font: FontFace::new("Inter", "Regular"),
            characters: String::new(),
            font_size: 12.0,
            align_horizontal: "LEFT".to_string(),
            align_vertical: "TOP".to_string(),
            letter_spacing: LetterSpacing {
                unit: SpacingUnit::Pixels,
                value: 0.0,
            },
            line_height: LineHeight::Auto,
            text_case: "ORIGINAL".to_string(),
        }
    }
}

/// One element in a host's tree. Coordinates are relative to the parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    pub kind: ElementKind,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub visible: bool,
    pub locked: bool,
    pub opacity: f64,
    /// Degrees, counter-clockwise
    pub rotation: f64,
    pub blend_mode: BlendMode,
    pub fills: Vec<Paint>,
    pub strokes: Vec<Paint>,
    pub stroke_weight: f64,
    pub effects: Vec<Effect>,
    pub corner_radius: f64,
    pub clips_content: bool,
    pub text: Option<TextContent>,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
}

impl Element {
    /// A fresh element with the host's default attributes for its kind
    pub fn new(kind: ElementKind) -> Self {
        let (name, size, fills) = match kind {
            ElementKind::Frame => ("Frame", 100.0, vec![Paint::solid(1.0, 1.0, 1.0)]),
            ElementKind::Group => ("Group", 0.0, vec![]),
            ElementKind::Rectangle => {
                ("Rectangle", 100.0, vec![Paint::solid(0.85, 0.85, 0.85)])
            }
            ElementKind::Text => ("Text", 0.0, vec![Paint::solid(0.0, 0.0, 0.0)]),
            ElementKind::Slice => ("Slice", 100.0, vec![]),
        };
        Self {
            kind,
            name: name.to_string(),
            x: 0.0,
            y: 0.0,
            width: size,
            height: size,
            visible: true,
            locked: false,
            opacity: 1.0,
            rotation: 0.0,
            blend_mode: BlendMode::PassThrough,
            fills,
            strokes: vec![],
            stroke_weight: 1.0,
            effects: vec![],
            corner_radius: 0.0,
            clips_content: kind == ElementKind::Frame,
            text: (kind == ElementKind::Text).then(TextContent::default),
            parent: None,
            children: vec![],
        }
    }

    pub fn characters(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.characters.as_str())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}
