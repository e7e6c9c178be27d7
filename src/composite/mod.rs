//! Post-materialization compositing
//!
//! Two template-driven transforms run on the materialized root:
//!
//! - **Typography overrides**: fixed text placements for templates listed in
//!   a [`TypographyRegistry`].
//! - **Grayscale**: photo layers are wrapped with a COLOR-blended overlay when
//!   the template sets `photoGrayscale`.

mod grayscale;
mod typography;

pub use grayscale::{wrap_photos, OVERLAY_NAME, WRAPPER_NAME};
pub use typography::{
    apply_overrides, FrameTextRule, Placement, SequenceRule, TypographyOverrides,
    TypographyRegistry,
};

use thiserror::Error;
use tracing::{info, warn};

use crate::canvas::{descendants, Canvas, CanvasError, ElementId, ElementKind, Paint, Property};
use crate::config::CompositingConfig;
use crate::template::{Color, TemplateData};

#[derive(Debug, Error)]
pub enum CompositeError {
    #[error("composited root {0} does not exist")]
    MissingRoot(ElementId),

    #[error("canvas rejected a compositing step: {0}")]
    Canvas(#[from] CanvasError),
}

/// What compositing changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompositeReport {
    /// Texts moved by typography overrides
    pub repositioned_texts: usize,
    /// Frames created around grayscale photos
    pub grayscale_wrappers: Vec<ElementId>,
}

/// Runs the compositing transforms a template asks for
#[derive(Debug, Clone)]
pub struct Compositor {
    typography: TypographyRegistry,
    grayscale_color: Color,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(&CompositingConfig::default())
    }
}

impl Compositor {
    /// A compositor with the built-in typography tables
    pub fn new(config: &CompositingConfig) -> Self {
        Self {
            typography: TypographyRegistry::builtin(),
            grayscale_color: config.grayscale_color,
        }
    }

    /// Replace the typography tables
    pub fn with_typography(mut self, registry: TypographyRegistry) -> Self {
        self.typography = registry;
        self
    }

    /// Run the transforms in order. On error the tree under `root` is put
    /// back the way it was before the call.
    pub fn apply<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        root: ElementId,
        template: &TemplateData,
    ) -> Result<CompositeReport, CompositeError> {
        let before = Snapshot::take(canvas, root);
        let report = self.run(canvas, root, template);
        if report.is_err() {
            before.restore(canvas);
        }
        report
    }

    fn run<C: Canvas + ?Sized>(
        &self,
        canvas: &mut C,
        root: ElementId,
        template: &TemplateData,
    ) -> Result<CompositeReport, CompositeError> {
        let mut report = CompositeReport::default();

        if let Some(overrides) = self.typography.get(&template.id) {
            report.repositioned_texts = apply_overrides(canvas, root, overrides)?;
        }

        if template.photo_grayscale {
            report.grayscale_wrappers = wrap_photos(
                canvas,
                root,
                &template.photo_layer_name_prefix,
                self.grayscale_color,
            )?;
        }

        info!(
            template = %template.id,
            texts = report.repositioned_texts,
            grayscale = report.grayscale_wrappers.len(),
            "compositing finished"
        );
        Ok(report)
    }
}

/// Placement and text fills of every element under a root
struct Snapshot(Vec<(ElementId, f64, f64, f64, Option<Vec<Paint>>)>);

impl Snapshot {
    fn take<C: Canvas + ?Sized>(canvas: &C, root: ElementId) -> Self {
        Self(
            descendants(canvas, root)
                .into_iter()
                .filter_map(|id| {
                    let e = canvas.element(id)?;
                    let fills = (e.kind == ElementKind::Text).then(|| e.fills.clone());
                    Some((id, e.x, e.y, e.rotation, fills))
                })
                .collect(),
        )
    }

    /// Write back whatever differs from the recorded state
    fn restore<C: Canvas + ?Sized>(&self, canvas: &mut C) {
        for (id, x, y, rotation, fills) in &self.0 {
            let Some(current) = canvas.element(*id) else {
                continue;
            };
            let mut writes = Vec::new();
            if current.rotation != *rotation {
                writes.push(Property::Rotation(*rotation));
            }
            if (current.x, current.y) != (*x, *y) {
                writes.push(Property::Position { x: *x, y: *y });
            }
            if let Some(fills) = fills.as_ref().filter(|f| **f != current.fills) {
                writes.push(Property::Fills(fills.clone()));
            }
            for write in writes {
                if let Err(e) = canvas.set(*id, write) {
                    warn!(element = %id, error = %e, "compositing not fully rolled back");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{outline, set_all, Property, SceneCanvas};

    fn template(id: &str, grayscale: bool) -> TemplateData {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": id, "width": 100, "height": 100,
            "slideWidth": 100, "slideHeight": 100, "slides": 1,
            "photoGrayscale": grayscale,
            "nodeTree": { "type": "FRAME", "name": "root" }
        }))
        .unwrap()
    }

    fn scene() -> (SceneCanvas, ElementId) {
        let mut canvas = SceneCanvas::new();
        let root = canvas.create_frame();
        canvas.set(root, Property::Name("root".into())).unwrap();
        let photo = canvas.create_rectangle();
        set_all(
            &mut canvas,
            photo,
            [
                Property::Name("photo-1".into()),
                Property::Size {
                    width: 10.0,
                    height: 10.0,
                },
            ],
        )
        .unwrap();
        canvas.append_child(root, photo).unwrap();
        (canvas, root)
    }

    #[test]
    fn test_grayscale_only_when_enabled() {
        let compositor = Compositor::default();

        let (mut canvas, root) = scene();
        let report = compositor.apply(&mut canvas, root, &template("plain", false)).unwrap();
        assert_eq!(report, CompositeReport::default());
        assert_eq!(outline(&canvas, root), "frame:root[rect:photo-1]");

        let (mut canvas, root) = scene();
        let report = compositor.apply(&mut canvas, root, &template("mono", true)).unwrap();
        assert_eq!(report.grayscale_wrappers.len(), 1);
        assert_eq!(
            outline(&canvas, root),
            "frame:root[frame:grayscale[rect:photo-1, rect:grayscale-overlay]]"
        );
    }

    #[test]
    fn test_custom_grayscale_color() {
        let config = CompositingConfig {
            grayscale_color: Color::rgb(0.2, 0.2, 0.2),
        };
        let (mut canvas, root) = scene();
        let report = Compositor::new(&config)
            .apply(&mut canvas, root, &template("mono", true))
            .unwrap();
        let wrapper = canvas.element(report.grayscale_wrappers[0]).unwrap();
        let overlay = canvas.element(wrapper.children[1]).unwrap();
        assert_eq!(overlay.fills, vec![crate::canvas::Paint::solid(0.2, 0.2, 0.2)]);
    }

    #[test]
    fn test_failed_pass_leaves_tree_unmodified() {
        use crate::canvas::testing::RejectingCanvas;
        use crate::canvas::BlendMode;

        let (scene, root) = scene();
        let mut canvas = RejectingCanvas::new(scene, |p| {
            matches!(p, Property::BlendMode(BlendMode::Color))
        });
        let caption = canvas.create_text();
        canvas.set(caption, Property::Name("Caption".into())).unwrap();
        canvas.append_child(root, caption).unwrap();

        let mut registry = TypographyRegistry::new();
        registry.register(
            "mono",
            TypographyOverrides {
                named_texts: [("Caption".to_string(), Placement::rotated(40.0, 50.0, -90.0))].into(),
                ..Default::default()
            },
        );
        let compositor = Compositor::default().with_typography(registry);

        let err = compositor
            .apply(&mut canvas, root, &template("mono", true))
            .unwrap_err();
        assert!(matches!(err, CompositeError::Canvas(_)));
        assert_eq!(outline(&canvas.inner, root), "frame:root[rect:photo-1, text:Caption]");

        let caption = canvas.element(caption).unwrap();
        assert_eq!((caption.x, caption.y, caption.rotation), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let mut canvas = SceneCanvas::new();
        let err = Compositor::default()
            .apply(&mut canvas, ElementId(3), &template("mono", true))
            .unwrap_err();
        assert!(matches!(err, CompositeError::MissingRoot(_)));
    }
}
