use thiserror::Error;

/// Precondition violations detected on the host before data reaches the pass.
///
/// The shader stages themselves never report errors; invalid inputs just turn
/// into NaN or wrong colors. These checks are opt-in and run by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("model matrix is singular (determinant {determinant})")]
    SingularModel { determinant: f32 },
    #[error("{field} contains a non-finite value")]
    NonFinite { field: &'static str },
    #[error("color component is negative ({0})")]
    NegativeColor(f32),
    #[error("normal has zero length")]
    ZeroNormal,
    #[error("vertex {vertex} is invalid")]
    InvalidVertex {
        vertex: usize,
        #[source]
        source: Box<ValidationError>,
    },
    #[error("index {index} at position {position} is out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        position: usize,
        index: u32,
        vertex_count: usize,
    },
    #[error("index count {0} is not a multiple of three")]
    IncompleteTriangle(usize),
    #[error("mesh has no triangles")]
    NoTriangles,
    #[error("model matrix is not affine (bottom row {row:?})")]
    ProjectiveModel { row: [f32; 4] },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
