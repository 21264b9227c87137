use crate::cli::ScoreArgs;
use crate::error::{CliError, Result};
use emfit::core::model::Atom;
use emfit::engine::config::FitConfigBuilder;
use emfit::engine::error::EngineError;
use emfit::engine::scorer::MapScorer;
use nalgebra::Point3;
use serde::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct AtomRecord {
    serial: usize,
    name: String,
    x: f64,
    y: f64,
    z: f64,
}

fn load_atoms(path: &Path) -> Result<(Vec<Atom>, Vec<Point3<f64>>)> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| CliError::FileParsing {
        path: path.to_path_buf(),
        source: e.into(),
    })?;

    let mut atoms = Vec::new();
    let mut positions = Vec::new();
    for result in reader.deserialize::<AtomRecord>() {
        let record = result.map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        atoms.push(Atom::new(record.serial, &record.name));
        positions.push(Point3::new(record.x, record.y, record.z));
    }
    Ok((atoms, positions))
}

pub fn run(args: ScoreArgs) -> Result<()> {
    info!("Loading atoms from {:?}", &args.atoms);
    let (atoms, positions) = load_atoms(&args.atoms)?;
    let labels: Vec<(usize, String)> = atoms
        .iter()
        .map(|atom| (atom.serial, atom.name.clone()))
        .collect();

    let mut builder = FitConfigBuilder::new()
        .atoms(atoms)
        .gmm_path(args.gmm.clone())
        .kbt(args.temp)
        .serial(args.serial)
        .neighbor_list(args.nlist);
    if let Some(cutoff) = args.nl_cutoff {
        builder = builder.neighbor_cutoff(cutoff);
    }
    if let Some(stride) = args.nl_stride {
        builder = builder.neighbor_stride(stride);
    }
    let config = builder.build().map_err(EngineError::from)?;

    let mut scorer = MapScorer::new(config)?;
    let evaluation = scorer.evaluate(&positions, 0)?;

    let starved = evaluation
        .model_overlap
        .iter()
        .filter(|&&overlap| overlap <= 0.0)
        .count();
    if starved > 0 {
        info!(
            starved,
            "data components with no overlap were excluded from the score"
        );
    }
    debug!(pairs = scorer.neighbor_pairs().len(), "active pair list");

    println!("score: {:.6}", evaluation.score);

    let writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["serial", "name", "grad_x", "grad_y", "grad_z"])?;
    for ((serial, name), gradient) in labels.iter().zip(&evaluation.atom_gradient) {
        csv_writer.write_record([
            serial.to_string(),
            name.clone(),
            gradient.x.to_string(),
            gradient.y.to_string(),
            gradient.z.to_string(),
        ])?;
    }
    csv_writer.flush()?;

    if let Some(path) = &args.output {
        info!("Per-atom gradient written to {:?}", path);
    }
    Ok(())
}
