use anyhow::{Result, anyhow};
use cascade_sdf::{GlobalSdf, GlobalSdfConfig, SdfHit, SdfTrace, TraceConfig, io};
use clap::{Parser, Subcommand};
use nalgebra::{Point3, UnitVector3, Vector3};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Query a cascaded signed distance field", long_about = None)]
struct Cli {
    /// RON file describing the cascades and their texture files
    #[arg(short, long)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the distance to the nearest surface and the field gradient at a
    /// point
    Sample {
        /// World-space position as `x,y,z`
        #[arg(short, long, value_parser = parse_vector, allow_hyphen_values = true)]
        position: [f32; 3],
    },
    /// Trace a ray and print the first surface hit
    Trace {
        /// Ray origin as `x,y,z`
        #[arg(short, long, value_parser = parse_vector, allow_hyphen_values = true)]
        origin: [f32; 3],

        /// Ray direction as `x,y,z` (normalized before tracing)
        #[arg(short, long, value_parser = parse_vector, allow_hyphen_values = true)]
        direction: [f32; 3],

        /// RON file with trace parameters
        #[arg(long)]
        trace_config: Option<PathBuf>,

        /// Overrides the maximum trace distance
        #[arg(long)]
        max_distance: Option<f32>,

        /// Overrides the step scale
        #[arg(long)]
        step_scale: Option<f32>,

        /// Compute the surface normal at the hit
        #[arg(long)]
        normal: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let sdf = GlobalSdfConfig::load_from_ron_file(&cli.config)?;

    match cli.command {
        Command::Sample { position } => {
            sample(&sdf, Point3::from(position));
            Ok(())
        }
        Command::Trace {
            origin,
            direction,
            trace_config,
            max_distance,
            step_scale,
            normal,
        } => {
            let mut config = match trace_config {
                Some(path) => io::parse_ron_file(path)?,
                None => TraceConfig::default(),
            };
            if let Some(max_distance) = max_distance {
                config.max_distance = max_distance;
            }
            if let Some(step_scale) = step_scale {
                config.step_scale = step_scale;
            }
            config.needs_hit_normal |= normal;

            let direction = UnitVector3::try_new(Vector3::from(direction), f32::EPSILON)
                .ok_or_else(|| anyhow!("Ray direction must be non-zero"))?;

            let trace = config.trace(Point3::from(origin), direction);
            let hit = sdf.trace_ray(&trace);
            log::debug!("Traced ray with {} steps", hit.step_count);

            println!("{}", format_hit(&hit, &trace));
            Ok(())
        }
    }
}

fn sample(sdf: &GlobalSdf, position: Point3<f32>) {
    let distance = sdf.sample_distance(&position);
    let gradient = sdf.sample_gradient(&position);

    println!("distance: {distance}");
    if gradient.is_valid() {
        let g = gradient.gradient;
        println!("gradient: ({}, {}, {})", g.x, g.y, g.z);
        if let Some(normal) = gradient.normal() {
            println!("normal: ({}, {}, {})", normal.x, normal.y, normal.z);
        }
    } else {
        println!("gradient: unavailable");
    }
}

fn format_hit(hit: &SdfHit, trace: &SdfTrace) -> String {
    let Some(position) = hit.hit_position(trace) else {
        return format!("miss (steps: {})", hit.step_count);
    };

    let mut text = format!(
        "hit at distance {} in cascade {} (steps: {})\nposition: ({}, {}, {})",
        hit.hit_time, hit.hit_cascade, hit.step_count, position.x, position.y, position.z
    );
    if let Some(normal) = hit.hit_normal {
        text.push_str(&format!(
            "\nnormal: ({}, {}, {})",
            normal.x, normal.y, normal.z
        ));
    }
    text
}

fn parse_vector(text: &str) -> Result<[f32; 3], String> {
    let components = text
        .split(',')
        .map(|component| {
            component
                .trim()
                .parse::<f32>()
                .map_err(|err| format!("Invalid component `{component}`: {err}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    <[f32; 3]>::try_from(components)
        .map_err(|components| format!("Expected 3 components, got {}", components.len()))
}
