use thiserror::Error;

/// Top-level error type for the fibermesh pipeline.
#[derive(Debug, Error)]
pub enum FiberMeshError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while constructing grids, padded geometry or analysis inputs.
///
/// These indicate bad input: the caller may retry with different data.
#[derive(Debug, Error)]
pub enum ConstructionError {
    #[error("state array length {actual} does not match dimensions {dims:?} (expected {expected})")]
    LengthMismatch {
        dims: [usize; 3],
        expected: usize,
        actual: usize,
    },

    #[error("cannot {0} an empty voxel grid")]
    EmptyGrid(&'static str),

    #[error("{field} array has length {actual}, expected {expected}")]
    FieldLengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Errors indicating a defect in mesh topology construction.
///
/// These are never caused by valid voxel input and should abort the build.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("face {vertices:?} is shared by {cells} cells (expected 1 or 2)")]
    FaceMultiplicity { vertices: [usize; 4], cells: usize },

    #[error("mesh invariant violated: {0}")]
    InvariantViolated(String),
}

/// Errors for lookups of cells or voxels that were never registered.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("cell index {0} is not registered")]
    CellNotFound(usize),

    #[error("voxel ({x}, {y}, {z}) is outside the region array")]
    VoxelOutOfRange { x: usize, y: usize, z: usize },
}

/// Errors for invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for '{key}': {value} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Convenience type alias for results using [`FiberMeshError`].
pub type Result<T> = std::result::Result<T, FiberMeshError>;
