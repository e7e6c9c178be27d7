//! Fixed typography placements for named templates
//!
//! Some templates rely on text positions that do not survive export (rotated
//! text, optical offsets). Their corrections live in a table keyed by
//! template id and are applied after materialization. Overrides only move,
//! rotate or unfill text; they never change its content.

use std::collections::HashMap;

use tracing::debug;

use super::CompositeError;
use crate::canvas::{find_descendant, Canvas, ElementId, ElementKind, Property};

/// Target position, with an optional rotation in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub rotation: Option<f64>,
}

impl Placement {
    pub const fn at(x: f64, y: f64) -> Self {
        Self { x, y, rotation: None }
    }

    pub const fn rotated(x: f64, y: f64, degrees: f64) -> Self {
        Self {
            x,
            y,
            rotation: Some(degrees),
        }
    }
}

/// Text placements for the direct TEXT children of a named frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameTextRule {
    pub frame: String,
    /// Trimmed text content to placement
    pub by_content: HashMap<String, Placement>,
    /// Contents whose fills are cleared when the text carries strokes
    pub outline_only: Vec<String>,
}

/// Reading-order placement of repeated text inside a named group
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceRule {
    pub group: String,
    /// Exact text content selecting the members
    pub content: String,
    pub placements: Vec<Placement>,
    /// Where the group itself ends up
    pub group_position: (f64, f64),
}

/// All corrections for one template
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypographyOverrides {
    pub frame_texts: Vec<FrameTextRule>,
    /// Text element name to placement
    pub named_texts: HashMap<String, Placement>,
    pub sequences: Vec<SequenceRule>,
}

impl TypographyOverrides {
    pub fn is_empty(&self) -> bool {
        self.frame_texts.is_empty() && self.named_texts.is_empty() && self.sequences.is_empty()
    }

    /// Corrections for the `culto-jovem` template
    pub fn culto_jovem() -> Self {
        let main = FrameTextRule {
            frame: "Main".to_string(),
            by_content: [
                ("Culto", Placement::at(70.0, 68.0)),
                ("Jo", Placement::at(20.0, 198.0)),
                ("VEM", Placement::at(189.0, 533.0)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
            outline_only: vec!["VEM".to_string()],
        };

        let juventude = SequenceRule {
            group: "Container".to_string(),
            content: "JUVENTUDE".to_string(),
            placements: [
                (0.0, 0.0),
                (336.0, 176.0),
                (672.0, 352.0),
                (1008.0, 528.0),
                (1344.0, 704.0),
                (1680.0, 880.0),
                (2016.0, 1057.0),
            ]
            .into_iter()
            .map(|(x, y)| Placement::rotated(x, y, -90.0))
            .collect(),
            group_position: (2176.0, -114.0),
        };

        Self {
            frame_texts: vec![main],
            named_texts: HashMap::from([("Date".to_string(), Placement::at(812.0, 296.0))]),
            sequences: vec![juventude],
        }
    }
}

/// Override tables keyed by template id
#[derive(Debug, Clone, Default)]
pub struct TypographyRegistry {
    tables: HashMap<String, TypographyOverrides>,
}

impl TypographyRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the tables shipped with the engine
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("culto-jovem", TypographyOverrides::culto_jovem());
        registry
    }

    pub fn register(&mut self, template_id: impl Into<String>, overrides: TypographyOverrides) {
        self.tables.insert(template_id.into(), overrides);
    }

    pub fn get(&self, template_id: &str) -> Option<&TypographyOverrides> {
        self.tables.get(template_id)
    }
}

/// Apply a table to the tree under `root`, returning how many texts moved
pub fn apply_overrides<C: Canvas + ?Sized>(
    canvas: &mut C,
    root: ElementId,
    overrides: &TypographyOverrides,
) -> Result<usize, CompositeError> {
    if canvas.element(root).is_none() {
        return Err(CompositeError::MissingRoot(root));
    }
    let mut moved = 0;

    for rule in &overrides.frame_texts {
        moved += apply_frame_rule(canvas, root, rule)?;
    }

    for (name, placement) in &overrides.named_texts {
        let target = find_descendant(canvas, root, |e| {
            e.kind == ElementKind::Text && e.name == *name
        });
        if let Some(id) = target {
            place(canvas, id, placement)?;
            moved += 1;
        }
    }

    for rule in &overrides.sequences {
        moved += apply_sequence(canvas, root, rule)?;
    }

    debug!(moved, "typography overrides applied");
    Ok(moved)
}

fn apply_frame_rule<C: Canvas + ?Sized>(
    canvas: &mut C,
    root: ElementId,
    rule: &FrameTextRule,
) -> Result<usize, CompositeError> {
    let Some(frame) = find_descendant(canvas, root, |e| {
        e.kind == ElementKind::Frame && e.name == rule.frame
    }) else {
        return Ok(0);
    };

    let texts: Vec<(ElementId, String, bool)> = child_texts(canvas, frame)
        .into_iter()
        .filter_map(|id| {
            let element = canvas.element(id)?;
            let content = element.characters()?.trim().to_string();
            Some((id, content, !element.strokes.is_empty()))
        })
        .collect();

    let mut moved = 0;
    for (id, content, stroked) in texts {
        if let Some(placement) = rule.by_content.get(&content) {
            place(canvas, id, placement)?;
            moved += 1;
        }
        if stroked && rule.outline_only.contains(&content) {
            canvas.set(id, Property::Fills(vec![]))?;
        }
    }
    Ok(moved)
}

fn apply_sequence<C: Canvas + ?Sized>(
    canvas: &mut C,
    root: ElementId,
    rule: &SequenceRule,
) -> Result<usize, CompositeError> {
    let Some(group) = find_descendant(canvas, root, |e| {
        e.kind == ElementKind::Group && e.name == rule.group
    }) else {
        return Ok(0);
    };

    let mut members: Vec<(ElementId, f64, f64)> = child_texts(canvas, group)
        .into_iter()
        .filter_map(|id| {
            let element = canvas.element(id)?;
            (element.characters()? == rule.content).then_some((id, element.y, element.x))
        })
        .collect();
    members.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.2.total_cmp(&b.2)));

    let mut moved = 0;
    for ((id, _, _), placement) in members.iter().zip(&rule.placements) {
        place(canvas, *id, placement)?;
        moved += 1;
    }

    let (x, y) = rule.group_position;
    canvas.set(group, Property::Position { x, y })?;
    Ok(moved)
}

fn child_texts<C: Canvas + ?Sized>(canvas: &C, parent: ElementId) -> Vec<ElementId> {
    canvas
        .element(parent)
        .map(|p| {
            p.children
                .iter()
                .copied()
                .filter(|c| canvas.element(*c).is_some_and(|e| e.kind == ElementKind::Text))
                .collect()
        })
        .unwrap_or_default()
}

fn place<C: Canvas + ?Sized>(
    canvas: &mut C,
    id: ElementId,
    placement: &Placement,
) -> Result<(), CompositeError> {
    canvas.set(
        id,
        Property::Position {
            x: placement.x,
            y: placement.y,
        },
    )?;
    if let Some(rotation) = placement.rotation {
        canvas.set(id, Property::Rotation(rotation))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{set_all, Paint, SceneCanvas};
    use crate::template::FontFace;

    async fn text(canvas: &mut SceneCanvas, name: &str, content: &str, x: f64, y: f64) -> ElementId {
        canvas.load_font(&FontFace::new("Inter", "Regular")).await.unwrap();
        let id = canvas.create_text();
        set_all(
            canvas,
            id,
            [
                Property::Name(name.to_string()),
                Property::Characters(content.to_string()),
                Property::Position { x, y },
            ],
        )
        .unwrap();
        id
    }

    fn frame(canvas: &mut SceneCanvas, name: &str) -> ElementId {
        let id = canvas.create_frame();
        canvas.set(id, Property::Name(name.to_string())).unwrap();
        id
    }

    #[tokio::test]
    async fn test_frame_texts_by_content() {
        let mut canvas = SceneCanvas::new();
        let root = frame(&mut canvas, "root");
        let main = frame(&mut canvas, "Main");
        canvas.append_child(root, main).unwrap();

        let culto = text(&mut canvas, "t1", " Culto ", 0.0, 0.0).await;
        let vem = text(&mut canvas, "t2", "VEM", 0.0, 0.0).await;
        let other = text(&mut canvas, "t3", "Outro", 5.0, 5.0).await;
        canvas
            .set(vem, Property::Strokes(vec![Paint::solid(1.0, 1.0, 1.0)]))
            .unwrap();
        for id in [culto, vem, other] {
            canvas.append_child(main, id).unwrap();
        }

        let moved = apply_overrides(&mut canvas, root, &TypographyOverrides::culto_jovem()).unwrap();
        assert_eq!(moved, 2);

        let culto = canvas.element(culto).unwrap();
        assert_eq!((culto.x, culto.y), (70.0, 68.0));
        assert_eq!(culto.characters(), Some(" Culto "));

        let vem = canvas.element(vem).unwrap();
        assert_eq!((vem.x, vem.y), (189.0, 533.0));
        assert!(vem.fills.is_empty());

        let other = canvas.element(other).unwrap();
        assert_eq!((other.x, other.y), (5.0, 5.0));
    }

    #[tokio::test]
    async fn test_named_text() {
        let mut canvas = SceneCanvas::new();
        let root = frame(&mut canvas, "root");
        let date = text(&mut canvas, "Date", "12/10", 1.0, 1.0).await;
        canvas.append_child(root, date).unwrap();

        apply_overrides(&mut canvas, root, &TypographyOverrides::culto_jovem()).unwrap();
        let date = canvas.element(date).unwrap();
        assert_eq!((date.x, date.y), (812.0, 296.0));
    }

    #[tokio::test]
    async fn test_sequence_in_reading_order() {
        let mut canvas = SceneCanvas::new();
        let root = frame(&mut canvas, "root");
        // Declared out of reading order on purpose
        let third = text(&mut canvas, "j", "JUVENTUDE", 0.0, 300.0).await;
        let first = text(&mut canvas, "j", "JUVENTUDE", 50.0, 0.0).await;
        let second = text(&mut canvas, "j", "JUVENTUDE", 90.0, 0.0).await;
        let noise = text(&mut canvas, "j", "JUVENTUDE!", 0.0, 0.0).await;
        let group = canvas.group(&[third, first, second, noise]).unwrap();
        canvas.set(group, Property::Name("Container".into())).unwrap();
        canvas.append_child(root, group).unwrap();

        let moved = apply_overrides(&mut canvas, root, &TypographyOverrides::culto_jovem()).unwrap();
        assert_eq!(moved, 3);

        let pos = |id| {
            let e = canvas.element(id).unwrap();
            (e.x, e.y, e.rotation)
        };
        assert_eq!(pos(first), (0.0, 0.0, -90.0));
        assert_eq!(pos(second), (336.0, 176.0, -90.0));
        assert_eq!(pos(third), (672.0, 352.0, -90.0));
        assert_eq!(pos(noise), (0.0, 0.0, 0.0));

        let group = canvas.element(group).unwrap();
        assert_eq!((group.x, group.y), (2176.0, -114.0));
    }

    #[test]
    fn test_builtin_registry() {
        let registry = TypographyRegistry::builtin();
        assert!(registry.get("culto-jovem").is_some_and(|t| !t.is_empty()));
        assert!(registry.get("minimal").is_none());
    }
}
