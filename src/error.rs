//! Crate-level error type

use thiserror::Error;

use crate::bundle::BundleError;
use crate::canvas::CanvasError;
use crate::codec::CodecError;
use crate::composite::CompositeError;
use crate::config::ConfigError;
use crate::export::ExportError;
use crate::font::FontError;
use crate::materialize::MaterializeError;
use crate::orchestrator::OrchestrationError;
use crate::template::CatalogError;

/// Any error the engine can report
#[derive(Debug, Error)]
pub enum Error {
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("font error: {0}")]
    Font(#[from] FontError),

    #[error("canvas error: {0}")]
    Canvas(#[from] CanvasError),

    #[error("materialization error: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("compositing error: {0}")]
    Composite(#[from] CompositeError),

    #[error("export error: {0}")]
    Export(#[from] ExportError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Orchestration(#[from] OrchestrationError),

    #[error("bundle error: {0}")]
    Bundle(#[from] BundleError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions_keep_messages() {
        let err: Error = CodecError::Length { len: 5 }.into();
        assert_eq!(
            err.to_string(),
            "codec error: base64 payload length 5 is not a multiple of 4"
        );

        let err: Error = CatalogError::NotFound { id: "t9".into() }.into();
        assert!(matches!(err, Error::Catalog(_)));
        assert_eq!(err.to_string(), "catalog error: template not found: t9");
    }
}
