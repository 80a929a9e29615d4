use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("No usable training records: at least one record with landmark points and a bounding region is required")]
    EmptyTrainingSet,

    #[error("Degenerate point set: L2 norm {norm} is too small to normalize")]
    DegenerateShape { norm: f32 },

    #[error("Point count mismatch across training records: expected {expected} points, got {actual}")]
    PointCountMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
