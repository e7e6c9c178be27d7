//! Paint, stroke and effect conversion
//!
//! Pure translations from template descriptors to host values. Image fills
//! need the canvas and the user images, so they are bound by the materializer;
//! this module only decides scale modes and photo indexes.

use crate::canvas::{
    BlendMode, BlurKind, Effect, LetterSpacing, LineHeight, Paint, ScaleMode, ShadowKind,
    SpacingUnit,
};
use crate::template::{EffectSpec, LetterSpacingSpec, LineHeightSpec, PaintSpec, ShadowSpec};

/// Map a declared scale mode to one the host accepts.
///
/// `STRETCH` becomes `FILL`; unknown or missing modes also fall back to `FILL`.
pub fn normalize_scale_mode(declared: Option<&str>) -> ScaleMode {
    match declared {
        Some("FIT") => ScaleMode::Fit,
        Some("CROP") => ScaleMode::Crop,
        Some("TILE") => ScaleMode::Tile,
        _ => ScaleMode::Fill,
    }
}

/// 1-based photo ordinal encoded in a layer name such as `photo-3`.
///
/// Returns `None` when the name lacks the prefix or no number follows it.
/// Trailing text after the digits is ignored (`photo-2 copy` is 2).
pub fn photo_ordinal(name: &str, prefix: &str) -> Option<usize> {
    let rest = name.strip_prefix(prefix)?.trim_start();
    let digits_end = rest
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(rest.len(), |(i, _)| i);
    rest[..digits_end].parse().ok()
}

/// Solid paints of a stroke list. Image and gradient strokes are dropped.
pub fn resolve_strokes(specs: &[PaintSpec]) -> Vec<Paint> {
    specs.iter().filter_map(solid_paint).collect()
}

/// Convert a SOLID descriptor, ignoring every other paint type
pub fn solid_paint(spec: &PaintSpec) -> Option<Paint> {
    match spec {
        PaintSpec::Solid { color, opacity } => Some(Paint::Solid {
            color: *color,
            opacity: opacity.unwrap_or(1.0),
        }),
        _ => None,
    }
}

pub fn resolve_effects(specs: &[EffectSpec]) -> Vec<Effect> {
    specs
        .iter()
        .filter_map(|spec| match spec {
            EffectSpec::DropShadow(shadow) => Some(shadow_effect(ShadowKind::Drop, shadow)),
            EffectSpec::InnerShadow(shadow) => Some(shadow_effect(ShadowKind::Inner, shadow)),
            EffectSpec::LayerBlur(blur) => Some(Effect::Blur {
                kind: BlurKind::Layer,
                radius: blur.radius,
                visible: blur.visible.unwrap_or(true),
            }),
            EffectSpec::BackgroundBlur(blur) => Some(Effect::Blur {
                kind: BlurKind::Background,
                radius: blur.radius,
                visible: blur.visible.unwrap_or(true),
            }),
            EffectSpec::Unsupported => None,
        })
        .collect()
}

fn shadow_effect(kind: ShadowKind, spec: &ShadowSpec) -> Effect {
    Effect::Shadow {
        kind,
        color: spec.color,
        offset: spec.offset,
        radius: spec.radius,
        spread: spec.spread.unwrap_or(0.0),
        visible: spec.visible.unwrap_or(true),
        blend_mode: spec
            .blend_mode
            .as_deref()
            .and_then(BlendMode::parse)
            .unwrap_or(BlendMode::Normal),
    }
}

/// Letter spacing with the unit clamped to pixels or percent
pub fn letter_spacing(spec: &LetterSpacingSpec) -> LetterSpacing {
    match spec {
        LetterSpacingSpec::Pixels(value) => LetterSpacing {
            unit: SpacingUnit::Pixels,
            value: *value,
        },
        LetterSpacingSpec::Explicit { unit, value } => LetterSpacing {
            unit: if unit == "PERCENT" {
                SpacingUnit::Percent
            } else {
                SpacingUnit::Pixels
            },
            value: *value,
        },
    }
}

/// Line height, or `None` when the descriptor cannot be interpreted
pub fn line_height(spec: &LineHeightSpec) -> Option<LineHeight> {
    match spec {
        LineHeightSpec::Pixels(value) => Some(LineHeight::Pixels(*value)),
        LineHeightSpec::Keyword(keyword) if keyword == "AUTO" => Some(LineHeight::Auto),
        LineHeightSpec::Keyword(_) => None,
        LineHeightSpec::Explicit { unit, value } => match (unit.as_str(), value) {
            ("AUTO", _) => Some(LineHeight::Auto),
            ("PERCENT", Some(v)) => Some(LineHeight::Percent(*v)),
            ("PIXELS", Some(v)) => Some(LineHeight::Pixels(*v)),
            _ => None,
        },
    }
}
