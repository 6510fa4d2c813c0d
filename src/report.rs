//! # Report
//!
//! One-call analysis of an STL file: parse, weld, measure.

use crate::{
    config::AnalysisConfig,
    geo::Bounds,
    mass::{mass_properties, surface_area, volume, MassProperties},
    mesh::{EmptyMeshError, Mesh},
    stl::{parse_with, read_stl_file, ParseError, RawTriangle},
};
use log::info;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
/// Reasons an analysis produces no report
pub enum AnalyzeError {
    #[error("couldn't parse STL: {0}")]
    Parse(#[from] ParseError),
    #[error(transparent)]
    EmptyMesh(#[from] EmptyMeshError),
}

/// Everything measured about one mesh
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub vertex_count: usize,
    pub edge_count: usize,
    pub face_count: usize,
    pub degenerate_faces: usize,
    pub boundary_edges: usize,
    pub non_manifold_edges: usize,
    pub components: usize,
    pub is_watertight: bool,
    pub surface_area: f64,
    pub volume: f64,
    pub mass_properties: MassProperties,
    pub bounds: Option<Bounds>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn from_mesh(mesh: &Mesh, density: f64) -> Report {
        let volume = volume(mesh);
        let mass = mass_properties(mesh, density);
        let warnings = volume
            .warning
            .iter()
            .chain(mass.warning.iter())
            .map(|w| w.to_string())
            .collect();

        Report {
            vertex_count: mesh.vertex_count(),
            edge_count: mesh.edge_count(),
            face_count: mesh.face_count(),
            degenerate_faces: mesh.degenerate_faces(),
            boundary_edges: mesh.boundary_edge_count(),
            non_manifold_edges: mesh.non_manifold_edge_count(),
            components: mesh.component_count(),
            is_watertight: mesh.is_watertight(),
            surface_area: surface_area(mesh),
            volume: volume.value,
            mass_properties: mass.value,
            bounds: mesh.bounds(),
            warnings,
        }
    }
}

/// A report tagged with the file it came from, as printed by `--json`
#[derive(Debug, Serialize)]
pub struct FileReport<'a> {
    pub path: String,
    pub report: &'a Report,
}

impl<'a> FileReport<'a> {
    pub fn new(path: &Path, report: &'a Report) -> FileReport<'a> {
        FileReport {
            path: path.display().to_string(),
            report,
        }
    }
}

fn build(raw: &[RawTriangle], config: &AnalysisConfig) -> Result<Mesh, AnalyzeError> {
    let mesh = Mesh::build(raw, config.epsilon)?;
    info!(
        "loaded mesh: {} vertices, {} faces from {} triangles",
        mesh.vertex_count(),
        mesh.face_count(),
        raw.len()
    );
    Ok(mesh)
}

/// Parse and weld a file, for callers that want the mesh itself, e.g. a viewer
pub fn load_mesh<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Mesh, AnalyzeError> {
    let raw = read_stl_file(path, config.format)?;
    build(&raw, config)
}

/// Analyze a file with the default settings
pub fn analyze<P: AsRef<Path>>(path: P) -> Result<Report, AnalyzeError> { analyze_with(path, &AnalysisConfig::default()) }

pub fn analyze_with<P: AsRef<Path>>(path: P, config: &AnalysisConfig) -> Result<Report, AnalyzeError> {
    let mesh = load_mesh(path, config)?;
    Ok(Report::from_mesh(&mesh, config.density))
}

/// Analyze STL data already in memory
pub fn analyze_bytes(data: &[u8], config: &AnalysisConfig) -> Result<Report, AnalyzeError> {
    let raw = parse_with(data, config.format)?;
    let mesh = build(&raw, config)?;
    Ok(Report::from_mesh(&mesh, config.density))
}
