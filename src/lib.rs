//! Load a triangle mesh from an STL file and report its topology, surface
//! area, volume and mass properties.

pub mod config;
pub mod geo;
pub mod mass;
pub mod mesh;
pub mod report;
pub mod stl;

#[cfg(test)]
mod test_shapes;

pub use config::{AnalysisConfig, StlFormat};
pub use mass::{mass_properties, signed_volume, surface_area, volume, DegenerateMeshWarning, MassProperties, Measured};
pub use mesh::{Edge, EmptyMeshError, Mesh, Triangle};
pub use report::{analyze, analyze_bytes, analyze_with, load_mesh, AnalyzeError, FileReport, Report};
pub use stl::{parse, ParseError, RawTriangle};
