//! SVG generation from canvas elements

use crate::canvas::{
    BlendMode, Canvas, Element, ElementId, ElementKind, LineHeight, Paint, SpacingUnit,
    TextContent,
};

/// Output options for [`render_svg`]
#[derive(Debug, Clone)]
pub struct SvgConfig {
    /// Space kept around the covered area
    pub viewbox_padding: f64,
    /// Emit the XML declaration
    pub standalone: bool,
    pub pretty_print: bool,
    /// Prepended to class names and clip ids; empty for none
    pub class_prefix: String,
    /// Draw slice regions as dashed outlines
    pub show_slices: bool,
}

impl Default for SvgConfig {
    fn default() -> Self {
        Self {
            viewbox_padding: 20.0,
            standalone: true,
            pretty_print: true,
            class_prefix: "ce-".to_string(),
            show_slices: true,
        }
    }
}

impl SvgConfig {
    /// Single-line fragment without declaration or padding
    pub fn compact() -> Self {
        Self {
            viewbox_padding: 0.0,
            standalone: false,
            pretty_print: false,
            ..Self::default()
        }
    }

    pub fn with_class_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.class_prefix = prefix.into();
        self
    }

    pub fn with_slices(mut self, show: bool) -> Self {
        self.show_slices = show;
        self
    }
}

/// Area of the page covered by the output
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    /// Smallest box covering every visible element in `ids`
    pub fn covering<C: Canvas + ?Sized>(canvas: &C, ids: &[ElementId]) -> Self {
        let mut bounds: Option<(f64, f64, f64, f64)> = None;
        for element in ids.iter().filter_map(|id| canvas.element(*id)) {
            if !element.visible {
                continue;
            }
            let (x0, y0, x1, y1) = bounds.unwrap_or((
                element.x,
                element.y,
                element.right(),
                element.bottom(),
            ));
            bounds = Some((
                x0.min(element.x),
                y0.min(element.y),
                x1.max(element.right()),
                y1.max(element.bottom()),
            ));
        }
        bounds.map_or_else(Self::default, |(x0, y0, x1, y1)| Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }
}

/// Build SVG elements incrementally
pub struct SvgBuilder {
    config: SvgConfig,
    defs: Vec<String>,
    elements: Vec<String>,
    indent: usize,
}

impl SvgBuilder {
    /// Create a new SVG builder
    pub fn new(config: SvgConfig) -> Self {
        Self {
            config,
            defs: vec![],
            elements: vec![],
            indent: 1,
        }
    }

    fn prefix(&self) -> &str {
        &self.config.class_prefix
    }

    fn class(&self, name: &str) -> String {
        format!("{}{}", self.prefix(), name)
    }

    fn indent_str(&self) -> String {
        if self.config.pretty_print {
            "  ".repeat(self.indent)
        } else {
            String::new()
        }
    }

    fn newline(&self) -> &str {
        if self.config.pretty_print {
            "\n"
        } else {
            ""
        }
    }

    /// Register a rectangular clip region and return its id
    pub fn add_clip(&mut self, key: ElementId, width: f64, height: f64) -> String {
        let id = format!("{}clip-{}", self.prefix(), key.0);
        self.defs.push(format!(
            r#"<clipPath id="{}"><rect width="{}" height="{}"/></clipPath>"#,
            id, width, height
        ));
        id
    }

    /// Open a positioned group for an element and its children
    pub fn start_group(&mut self, element: &Element, clip: Option<&str>) {
        let class = self.class(element.kind.as_str());
        let clip_attr = clip
            .map(|id| format!(r#" clip-path="url(#{})""#, id))
            .unwrap_or_default();
        self.elements.push(format!(
            r#"{}<g class="{}" data-name="{}" transform="{}"{}{}>"#,
            self.indent_str(),
            class,
            escape_xml(&element.name),
            transform(element),
            clip_attr,
            presentation(element),
        ));
        self.indent += 1;
    }

    pub fn end_group(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.elements.push(format!("{}</g>", self.indent_str()));
    }

    /// Add a filled box at the current origin.
    ///
    /// Image paints are drawn as a neutral placeholder tagged with the
    /// image hash.
    pub fn add_rect(
        &mut self,
        width: f64,
        height: f64,
        corner_radius: f64,
        fills: &[Paint],
        stroke: Option<(String, f64)>,
        classes: &[String],
    ) {
        let radius = if corner_radius > 0.0 {
            format!(r#" rx="{}""#, corner_radius)
        } else {
            String::new()
        };
        let stroke_attr = stroke
            .map(|(color, weight)| format!(r#" stroke="{}" stroke-width="{}""#, color, weight))
            .unwrap_or_default();
        let class_attr = if classes.is_empty() {
            String::new()
        } else {
            format!(r#" class="{}""#, classes.join(" "))
        };

        self.elements.push(format!(
            r#"{}<rect width="{}" height="{}"{}{}{}{}/>"#,
            self.indent_str(),
            width,
            height,
            radius,
            paint_attrs(fills),
            stroke_attr,
            class_attr,
        ));
    }

    /// Add a dashed outline marking an export region
    pub fn add_slice(&mut self, element: &Element) {
        let class = self.class("slice");
        self.elements.push(format!(
            r##"{}<rect x="{}" y="{}" width="{}" height="{}" fill="none" stroke="#ff00ff" stroke-dasharray="8 4" class="{}" data-name="{}"/>"##,
            self.indent_str(),
            element.x,
            element.y,
            element.width,
            element.height,
            class,
            escape_xml(&element.name),
        ));
    }

    /// Add a text block, one `tspan` per line
    pub fn add_text_element(&mut self, element: &Element, text: &TextContent) {
        let class = self.class("text");
        let (anchor, x) = match text.align_horizontal.as_str() {
            "CENTER" => ("middle", element.width / 2.0),
            "RIGHT" => ("end", element.width),
            _ => ("start", 0.0),
        };
        let line_height = match text.line_height {
            LineHeight::Auto => text.font_size * 6.0 / 5.0,
            LineHeight::Pixels(px) => px,
            LineHeight::Percent(pct) => text.font_size * pct / 100.0,
        };
        let spacing = match text.letter_spacing.unit {
            SpacingUnit::Pixels => text.letter_spacing.value,
            SpacingUnit::Percent => text.font_size * text.letter_spacing.value / 100.0,
        };
        let spacing_attr = if spacing != 0.0 {
            format!(r#" letter-spacing="{}""#, spacing)
        } else {
            String::new()
        };
        let style = text.font.style.to_ascii_lowercase();
        let italic_attr = if style.contains("italic") {
            r#" font-style="italic""#
        } else {
            ""
        };

        let mut out = format!(
            r#"{}<text class="{}" data-name="{}" transform="{}" font-family="{}" font-size="{}" font-weight="{}" text-anchor="{}"{}{}{}{}>"#,
            self.indent_str(),
            class,
            escape_xml(&element.name),
            transform(element),
            escape_xml(&text.font.family),
            text.font_size,
            font_weight(&style),
            anchor,
            italic_attr,
            spacing_attr,
            paint_attrs(&element.fills),
            presentation(element),
        );
        for (i, line) in text.characters.split('\n').enumerate() {
            let dy = if i == 0 { text.font_size } else { line_height };
            out.push_str(&format!(
                r#"<tspan x="{}" dy="{}">{}</tspan>"#,
                x,
                dy,
                escape_xml(&apply_case(line, &text.text_case))
            ));
        }
        out.push_str("</text>");
        self.elements.push(out);
    }

    /// Build the final SVG string
    pub fn build(self, viewbox: ViewBox) -> String {
        let padding = self.config.viewbox_padding;
        let vb_x = viewbox.x - padding;
        let vb_y = viewbox.y - padding;
        let vb_w = viewbox.width + 2.0 * padding;
        let vb_h = viewbox.height + 2.0 * padding;

        let nl = self.newline();

        let mut svg = String::new();

        if self.config.standalone {
            svg.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
            svg.push_str(nl);
        }

        svg.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{} {} {} {}">"#,
            vb_x, vb_y, vb_w, vb_h
        ));
        svg.push_str(nl);

        if !self.defs.is_empty() {
            svg.push_str("  <defs>");
            svg.push_str(nl);
            for def in &self.defs {
                svg.push_str("    ");
                svg.push_str(def);
                svg.push_str(nl);
            }
            svg.push_str("  </defs>");
            svg.push_str(nl);
        }

        for elem in &self.elements {
            svg.push_str(elem);
            svg.push_str(nl);
        }

        svg.push_str("</svg>");

        svg
    }
}

/// Render the given top-level elements and everything below them.
///
/// Hidden elements are skipped. Effects are not drawn.
pub fn render_svg<C: Canvas + ?Sized>(canvas: &C, roots: &[ElementId], config: &SvgConfig) -> String {
    let mut builder = SvgBuilder::new(config.clone());
    for root in roots {
        render_element(canvas, *root, &mut builder);
    }
    builder.build(ViewBox::covering(canvas, roots))
}

fn render_element<C: Canvas + ?Sized>(canvas: &C, id: ElementId, builder: &mut SvgBuilder) {
    let Some(element) = canvas.element(id) else {
        return;
    };
    if !element.visible {
        return;
    }

    match element.kind {
        ElementKind::Frame | ElementKind::Group => {
            let clip = (element.kind == ElementKind::Frame && element.clips_content)
                .then(|| builder.add_clip(id, element.width, element.height));
            builder.start_group(element, clip.as_deref());
            if element.kind == ElementKind::Frame && !element.fills.is_empty() {
                let class = builder.class("background");
                builder.add_rect(
                    element.width,
                    element.height,
                    element.corner_radius,
                    &element.fills,
                    stroke(element),
                    &[class],
                );
            }
            for child in &element.children {
                render_element(canvas, *child, builder);
            }
            builder.end_group();
        }
        ElementKind::Rectangle => {
            builder.start_group(element, None);
            let mut classes = vec![builder.class("rect")];
            if element.fills.iter().any(Paint::is_image) {
                classes.push(builder.class("image"));
            }
            builder.add_rect(
                element.width,
                element.height,
                element.corner_radius,
                &element.fills,
                stroke(element),
                &classes,
            );
            builder.end_group();
        }
        ElementKind::Text => {
            if let Some(text) = &element.text {
                builder.add_text_element(element, text);
            }
        }
        ElementKind::Slice => {
            if builder.config.show_slices {
                builder.add_slice(element);
            }
        }
    }
}

fn transform(element: &Element) -> String {
    if element.rotation != 0.0 {
        // Canvas rotation is counter-clockwise, SVG's is clockwise
        format!(
            "translate({} {}) rotate({})",
            element.x, element.y, -element.rotation
        )
    } else {
        format!("translate({} {})", element.x, element.y)
    }
}

/// Opacity and blending shared by every drawn element
fn presentation(element: &Element) -> String {
    let mut out = String::new();
    if element.opacity < 1.0 {
        out.push_str(&format!(r#" opacity="{}""#, element.opacity));
    }
    if let Some(mode) = css_blend_mode(element.blend_mode) {
        out.push_str(&format!(r#" style="mix-blend-mode: {}""#, mode));
    }
    out
}

/// Fill attributes for the topmost paint
fn paint_attrs(fills: &[Paint]) -> String {
    match fills.last() {
        None => r#" fill="none""#.to_string(),
        Some(Paint::Solid { color, opacity }) => {
            let alpha = opacity * color.a;
            if alpha < 1.0 {
                format!(r#" fill="{}" fill-opacity="{}""#, color.to_hex(), alpha)
            } else {
                format!(r#" fill="{}""#, color.to_hex())
            }
        }
        Some(Paint::Image {
            scale_mode,
            image_hash,
        }) => format!(
            r##" fill="#d9d9d9" data-image-hash="{}" data-scale-mode="{}""##,
            escape_xml(&image_hash.0),
            scale_mode.as_str()
        ),
    }
}

fn stroke(element: &Element) -> Option<(String, f64)> {
    element.strokes.iter().find_map(|paint| match paint {
        Paint::Solid { color, .. } => Some((color.to_hex(), element.stroke_weight)),
        Paint::Image { .. } => None,
    })
}

fn css_blend_mode(mode: BlendMode) -> Option<&'static str> {
    let css = match mode {
        BlendMode::PassThrough | BlendMode::Normal => return None,
        BlendMode::Darken => "darken",
        BlendMode::Multiply | BlendMode::LinearBurn => "multiply",
        BlendMode::ColorBurn => "color-burn",
        BlendMode::Lighten => "lighten",
        BlendMode::Screen | BlendMode::LinearDodge => "screen",
        BlendMode::ColorDodge => "color-dodge",
        BlendMode::Overlay => "overlay",
        BlendMode::SoftLight => "soft-light",
        BlendMode::HardLight => "hard-light",
        BlendMode::Difference => "difference",
        BlendMode::Exclusion => "exclusion",
        BlendMode::Hue => "hue",
        BlendMode::Saturation => "saturation",
        BlendMode::Color => "color",
        BlendMode::Luminosity => "luminosity",
    };
    Some(css)
}

/// CSS weight for a lowercased font style name
fn font_weight(style: &str) -> u16 {
    let compact: String = style.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.contains("extrabold") || compact.contains("black") {
        900
    } else if compact.contains("semibold") {
        600
    } else if compact.contains("bold") {
        700
    } else if compact.contains("medium") {
        500
    } else if compact.contains("extralight") || compact.contains("thin") {
        200
    } else if compact.contains("light") {
        300
    } else {
        400
    }
}

fn apply_case(line: &str, text_case: &str) -> String {
    match text_case {
        "UPPER" => line.to_uppercase(),
        "LOWER" => line.to_lowercase(),
        _ => line.to_string(),
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
