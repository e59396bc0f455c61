use crate::point::ViewportKind;
use crate::transform::TransformationType;

#[derive(Debug, thiserror::Error)]
pub enum GeorefError {
    #[error("Invalid input: {0}")]
    InputValidation(String),

    #[error("{kind} needs at least {required} correspondences, got {points}")]
    UnderdeterminedTransform {
        kind: TransformationType,
        points: usize,
        required: usize,
    },

    #[error("Correspondences do not determine a unique {0} transform")]
    SingularConfiguration(TransformationType),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Viewport {0} has no envelope yet")]
    ViewportNotInitialized(ViewportKind),

    #[error("Degenerate envelope: {0}")]
    DegenerateEnvelope(String),

    #[error("Expected a {expected} point, got a {actual} point")]
    KindMismatch {
        expected: ViewportKind,
        actual: ViewportKind,
    },

    #[error("Row {0} does not exist")]
    RowNotFound(usize),

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    FileExtension(#[from] common::FileExtensionError),

    #[error(transparent)]
    Format(#[from] common::SerdeFormatError),
}

pub type Result<T> = std::result::Result<T, GeorefError>;

impl GeorefError {
    pub fn input(msg: impl Into<String>) -> Self {
        GeorefError::InputValidation(msg.into())
    }

    /// Underdetermined fits are expected while points are still being collected.
    pub fn is_underdetermined(&self) -> bool {
        matches!(self, GeorefError::UnderdeterminedTransform { .. })
    }
}
