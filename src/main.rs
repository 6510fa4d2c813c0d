use log::{error, LevelFilter};
use rayon::prelude::*;
use simplelog::{Config, TermLogger, TerminalMode};
use std::{
    path::{Path, PathBuf},
    process,
};
use stl_analyzer::{analyze_with, config::Opt, AnalysisConfig, AnalyzeError, FileReport, Report};
use structopt::StructOpt;

fn print_report(path: &Path, report: &Report) {
    let mass = &report.mass_properties;
    println!("{}", path.display());
    println!("Vertices: {}", report.vertex_count);
    println!("Edges: {}", report.edge_count);
    println!("Faces: {}", report.face_count);
    if report.degenerate_faces > 0 {
        println!("Degenerate faces dropped: {}", report.degenerate_faces);
    }
    println!(
        "Watertight: {} ({} boundary edges, {} non-manifold edges, {} components)",
        report.is_watertight, report.boundary_edges, report.non_manifold_edges, report.components
    );
    println!("Volume: {}", report.volume);
    println!("Surface area: {}", report.surface_area);
    if let Some(bounds) = report.bounds {
        let size = bounds.extents();
        println!("Extents: {} x {} x {}", size.x, size.y, size.z);
    }
    println!("Mass properties:");
    println!("  density: {}", mass.density);
    println!("  mass: {}", mass.mass);
    println!(
        "  center of mass: [{}, {}, {}]",
        mass.center_mass.x, mass.center_mass.y, mass.center_mass.z
    );
    println!("  inertia:");
    for col in mass.inertia.cols.iter() {
        println!("    [{:.6}, {:.6}, {:.6}]", col.x, col.y, col.z);
    }
    for warning in &report.warnings {
        println!("Warning: {}", warning);
    }
}

fn main() {
    let opt = Opt::from_args();
    let level = if opt.debug { LevelFilter::Debug } else { LevelFilter::Info };
    if TermLogger::init(level, Config::default(), TerminalMode::Mixed).is_err() {
        eprintln!("couldn't initialize logger");
    }

    let config = AnalysisConfig::from(&opt);
    let results: Vec<(&PathBuf, Result<Report, AnalyzeError>)> = opt
        .inputs
        .par_iter()
        .map(|path| (path, analyze_with(path, &config)))
        .collect();

    let mut failed = 0;
    let mut reports = Vec::new();
    for (path, result) in results {
        match result {
            Ok(report) => reports.push((path, report)),
            Err(e) => {
                error!("{}: {}", path.display(), e);
                failed += 1;
            },
        }
    }

    if opt.json {
        let json: Vec<_> = reports
            .iter()
            .map(|(path, report)| FileReport::new(path, report))
            .collect();
        match serde_json::to_string_pretty(&json) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                error!("couldn't serialize reports: {}", e);
                failed += 1;
            },
        }
    } else {
        for (i, (path, report)) in reports.iter().enumerate() {
            if i > 0 {
                println!();
            }
            print_report(path, report);
        }
    }

    if failed > 0 {
        process::exit(1);
    }
}
