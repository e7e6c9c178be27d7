//! Font resolution with fallback faces
//!
//! Text properties can only be written once the element's face is loaded, so
//! every TEXT node resolves its font before anything else. When the requested
//! face cannot be loaded, the resolver walks a list of substitutes and reports
//! the face that was actually applied.

use std::collections::HashMap;

use thiserror::Error;

use crate::canvas::Canvas;
use crate::config::FontConfig;
use crate::template::FontFace;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FontError {
    /// Neither the requested face nor any fallback could be loaded
    #[error("no loadable face for {requested} (tried {attempts} candidates)")]
    Unavailable { requested: FontFace, attempts: usize },
}

/// Resolves requested faces to loadable ones, caching outcomes per face.
///
/// One resolver is used for a single instantiation, so a face is loaded at
/// most once no matter how many text nodes request it.
#[derive(Debug, Clone)]
pub struct FontResolver {
    default_face: FontFace,
    aliases: HashMap<String, String>,
    resolved: HashMap<FontFace, FontFace>,
}

impl FontResolver {
    pub fn new(config: &FontConfig) -> Self {
        Self {
            default_face: config.default_face(),
            aliases: config.aliases.clone(),
            resolved: HashMap::new(),
        }
    }

    /// The face used when nothing else loads
    pub fn default_face(&self) -> &FontFace {
        &self.default_face
    }

    /// Load `requested` or the first loadable substitute, returning the
    /// face that should be written to the text element
    pub async fn resolve<C: Canvas + ?Sized>(
        &mut self,
        canvas: &mut C,
        requested: &FontFace,
    ) -> Result<FontFace, FontError> {
        if let Some(applied) = self.resolved.get(requested) {
            return Ok(applied.clone());
        }

        let candidates = self.candidates(requested);
        for candidate in &candidates {
            // A candidate that already resolved to itself is loaded
            if self.resolved.get(candidate) == Some(candidate) {
                self.resolved.insert(requested.clone(), candidate.clone());
                return Ok(candidate.clone());
            }
            match canvas.load_font(candidate).await {
                Ok(()) => {
                    if candidate != requested {
                        tracing::warn!(
                            requested = %requested,
                            applied = %candidate,
                            "font not found, using fallback"
                        );
                    }
                    self.resolved.insert(candidate.clone(), candidate.clone());
                    self.resolved.insert(requested.clone(), candidate.clone());
                    return Ok(candidate.clone());
                }
                Err(e) => {
                    tracing::debug!(face = %candidate, error = %e, "font candidate failed");
                }
            }
        }

        Err(FontError::Unavailable {
            requested: requested.clone(),
            attempts: candidates.len(),
        })
    }

    /// Ordered, de-duplicated substitutes for a face
    pub fn candidates(&self, requested: &FontFace) -> Vec<FontFace> {
        let mut out: Vec<FontFace> = Vec::new();
        let mut push = |face: FontFace| {
            if !out.contains(&face) {
                out.push(face);
            }
        };

        push(requested.clone());
        for style in style_variants(&requested.style) {
            push(FontFace::new(requested.family.clone(), style));
        }
        push(FontFace::new(requested.family.clone(), "Regular"));
        if let Some(alias) = self.aliases.get(&requested.family) {
            push(FontFace::new(alias.clone(), requested.style.clone()));
            push(FontFace::new(alias.clone(), "Regular"));
        }
        push(self.default_face.clone());
        out
    }
}

/// Alternative spellings of a style name: "Semi Bold" <-> "SemiBold"
fn style_variants(style: &str) -> Vec<String> {
    let mut variants = Vec::new();
    if style.contains(' ') {
        variants.push(style.replace(' ', ""));
    } else {
        let mut spaced = String::with_capacity(style.len() + 2);
        for (i, c) in style.chars().enumerate() {
            if i > 0 && c.is_uppercase() {
                spaced.push(' ');
            }
            spaced.push(c);
        }
        if spaced != style {
            variants.push(spaced);
        }
    }
    variants
}
