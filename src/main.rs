use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{error, info};

use census_synth::logging::init_logging;
use census_synth::sampler::SamplerParams;
use census_synth::seeds::SynthSeeds;
use census_synth::spatial::SpatialParams;
use census_synth::{Nation, Schema, SynthError, SynthOptions, Synthesizer};

#[derive(Parser, Debug)]
#[command(name = "census_synth")]
#[command(about = "Generate a synthetic individual-level population from census area tables")]
struct Args {
    /// Directory holding the downloaded census sources
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Directory the population tables are written to
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// JSON schema describing the sources (built-in 2011 census layout if not specified)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Only process these nations (E, N, S, W); repeatable
    #[arg(short, long = "nation", value_parser = parse_nation)]
    nations: Vec<Nation>,

    /// Stop the spatial stage after this many areas per nation
    #[arg(long)]
    limit_areas: Option<usize>,

    /// Give up sampling an area after this many candidate batches
    #[arg(long, default_value = "10000")]
    max_batches: usize,

    /// Base seed of the spatial stage
    #[arg(long)]
    spatial_seed: Option<u64>,

    /// Base seed override for an attribute, as COLUMN=SEED; repeatable
    #[arg(long = "attribute-seed", value_parser = parse_attribute_seed)]
    attribute_seeds: Vec<(String, u64)>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write rotating log files to this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample one located person per reported resident
    People,
    /// Add one attribute column to existing population tables
    Attribute {
        /// Schema column name, or `qualification` / `ethnic-group` for the built-in ones
        attribute: String,
    },
    /// People, then every attribute
    All,
}

/// Resolve an attribute argument to a column of `schema`.
fn attribute_column(schema: &Schema, name: &str) -> census_synth::Result<String> {
    let column = match name {
        "qualification" => "highest_qualification",
        "ethnic-group" => "ethnic_group",
        other => other,
    };
    if schema.attribute(column).is_some() {
        return Ok(column.to_string());
    }
    let known: Vec<&str> = schema.attributes.iter().map(|a| a.column.as_str()).collect();
    Err(SynthError::Invalid {
        what: "attribute",
        detail: format!("{} is not one of {}", name, known.join(", ")),
    })
}

fn parse_nation(s: &str) -> Result<Nation, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) => Nation::from_letter(letter).map_err(|e| e.to_string()),
        _ => Err(format!("expected a single nation letter, got {:?}", s)),
    }
}

fn parse_attribute_seed(s: &str) -> Result<(String, u64), String> {
    let (column, seed) = s
        .split_once('=')
        .ok_or_else(|| format!("expected COLUMN=SEED, got {:?}", s))?;
    let seed = seed
        .parse()
        .map_err(|e| format!("invalid seed {:?}: {}", seed, e))?;
    Ok((column.to_string(), seed))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _logger = match init_logging(&args.log_level, args.log_dir.as_deref()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to start logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> census_synth::Result<()> {
    let schema = match &args.schema {
        Some(path) => Schema::load(path)?,
        None => Schema::census_2011(),
    };

    let mut seeds = SynthSeeds::builder();
    if let Some(seed) = args.spatial_seed {
        seeds = seeds.spatial(seed);
    }
    for (column, seed) in args.attribute_seeds {
        seeds = seeds.attribute(column, seed);
    }
    let seeds = seeds.build();
    info!("Using {}", seeds);

    let options = SynthOptions {
        data_dir: args.data_dir,
        output_dir: args.output_dir,
        nations: args.nations,
        spatial: SpatialParams {
            sampler: SamplerParams {
                max_batches: args.max_batches,
            },
            limit_areas: args.limit_areas,
        },
        seeds,
    };
    let synth = Synthesizer::new(schema, options);

    match args.command {
        Command::People => synth.run_people(),
        Command::Attribute { attribute } => {
            let column = attribute_column(synth.schema(), &attribute)?;
            synth.run_attribute(&column)
        }
        Command::All => synth.run_all(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nation() {
        assert_eq!(parse_nation("s").unwrap(), Nation::Scotland);
        assert!(parse_nation("SW").is_err());
        assert!(parse_nation("X").is_err());
    }

    #[test]
    fn test_parse_attribute_seed() {
        assert_eq!(
            parse_attribute_seed("ethnic_group=12").unwrap(),
            ("ethnic_group".to_string(), 12)
        );
        assert!(parse_attribute_seed("ethnic_group").is_err());
        assert!(parse_attribute_seed("ethnic_group=x").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "census_synth",
            "--nation",
            "S",
            "-n",
            "w",
            "--attribute-seed",
            "ethnic_group=1",
            "attribute",
            "ethnic-group",
        ])
        .unwrap();
        assert_eq!(args.nations, vec![Nation::Scotland, Nation::Wales]);
        assert_eq!(args.attribute_seeds, vec![("ethnic_group".to_string(), 1)]);
        assert!(matches!(
            args.command,
            Command::Attribute { ref attribute } if attribute == "ethnic-group"
        ));
    }

    #[test]
    fn test_attribute_column_from_schema() {
        let mut schema = Schema::census_2011();
        assert_eq!(attribute_column(&schema, "qualification").unwrap(), "highest_qualification");
        assert_eq!(attribute_column(&schema, "ethnic_group").unwrap(), "ethnic_group");
        assert!(matches!(
            attribute_column(&schema, "religion"),
            Err(SynthError::Invalid { what: "attribute", .. })
        ));

        let mut religion = schema.attribute("ethnic_group").unwrap().clone();
        religion.column = "religion".to_string();
        schema.attributes.push(religion);
        assert_eq!(attribute_column(&schema, "religion").unwrap(), "religion");
    }
}
