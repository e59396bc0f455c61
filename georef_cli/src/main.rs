use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use georef::footprint::{self, Building, Footprint};
use georef::mapper::CoordinateMapper;
use georef::point_table::PointTableFile;
use georef::transform::{create_method, SolverInput, TransformationResult};
use georef::{GeorefOptions, TransformationType};

#[derive(Parser, Debug)]
#[command(version, about, long_about = "solve a coordinate transformation from a saved point table")]
struct Args {
    /// Overrides the level from the options file.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a transformation and print residuals.
    Solve {
        #[arg(short, long)]
        points: PathBuf,

        #[arg(short, long, default_value = "georef.yaml")]
        options: PathBuf,

        /// polynomial, helmert4 or affine
        #[arg(short = 't', long)]
        transformation: Option<TransformationType>,

        #[arg(long)]
        order: Option<u32>,

        /// Building model (YAML or JSON) whose footprint is mapped as well.
        #[arg(short, long)]
        buildings: Option<PathBuf>,

        /// Store residuals back into the point table.
        #[arg(long, default_value_t = false)]
        write_residuals: bool,

        /// Write the building model moved by the fitted transform (YAML or JSON).
        #[arg(long, requires = "buildings")]
        write_buildings: Option<PathBuf>,
    },
    /// Write an options file with default values.
    InitOptions {
        #[arg(default_value = "georef.yaml")]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Solve {
            points,
            options,
            transformation,
            order,
            buildings,
            write_residuals,
            write_buildings,
        } => {
            let mut options = GeorefOptions::load_or_default(&options);
            if let Some(kind) = transformation {
                options.transformation_type = kind;
            }
            if let Some(order) = order {
                options.polynomial_order = order;
            }
            init_logging(args.log_level.as_deref().unwrap_or(&options.log_level));

            let result = solve(
                &options,
                &points,
                buildings.as_deref(),
                write_residuals,
                write_buildings.as_deref(),
            )?;
            print_result(&result);
        }
        Command::InitOptions { path } => {
            init_logging(args.log_level.as_deref().unwrap_or("info"));
            GeorefOptions::default()
                .save(&path)
                .with_context(|| format!("writing {}", path.display()))?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    if let Err(err) = common::log_setup::setup_logging(level) {
        eprintln!("logging disabled: {err}");
    }
}

fn solve(
    options: &GeorefOptions,
    points: &Path,
    buildings: Option<&Path>,
    write_residuals: bool,
    write_buildings: Option<&Path>,
) -> Result<TransformationResult> {
    options.validate()?;

    let mut table = PointTableFile::load(points)
        .with_context(|| format!("reading point table {}", points.display()))?;
    let store = table.to_store(&CoordinateMapper::new(options.min_span))?;

    let buildings = match buildings {
        Some(path) => load_buildings(path)?,
        None => Vec::new(),
    };
    let footprint = Footprint::from_buildings(&buildings);

    let method = create_method(
        options.transformation_type,
        options.polynomial_order,
        SolverInput::new(&store, &footprint),
    )?;
    let result = method.solve().with_context(|| {
        format!(
            "{} fit over {} points",
            options.transformation_type,
            store.len()
        )
    })?;
    info!(
        kind = %options.transformation_type,
        points = store.len(),
        rmse = result.rmse,
        "transformation computed"
    );

    if write_residuals {
        for (row, residual) in table.rows.iter_mut().zip(&result.residuals) {
            row.residual = Some(*residual);
        }
        table
            .save(points)
            .with_context(|| format!("writing point table {}", points.display()))?;
    }

    if let Some(path) = write_buildings {
        let georeferenced = result.transform.apply_to_buildings(&buildings);
        footprint::save_buildings(path, &georeferenced)
            .with_context(|| format!("writing building model {}", path.display()))?;
    }

    Ok(result)
}

fn load_buildings(path: &Path) -> Result<Vec<Building>> {
    footprint::load_buildings(path)
        .with_context(|| format!("reading building model {}", path.display()))
}

fn print_result(result: &TransformationResult) {
    println!("transform: {:?}", result.transform);
    println!("{:>5} {:>14} {:>14} {:>14}", "row", "dx", "dy", "length");
    for (row, r) in result.residuals.iter().enumerate() {
        println!("{row:>5} {:>14.6} {:>14.6} {:>14.6}", r.dx, r.dy, r.length());
    }
    println!("rmse: {:.6}", result.rmse);
    for (i, ring) in result.rings.iter().enumerate() {
        let points: Vec<String> = ring
            .points
            .iter()
            .map(|p| format!("({:.3}, {:.3})", p.x, p.y))
            .collect();
        println!("ring {i}: {}", points.join(" "));
    }
}
