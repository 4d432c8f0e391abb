use std::path::PathBuf;

/// PV site suitability CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "pvsite", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run pipeline steps for one region
    Run(RunArgs),

    /// Print which artifacts of a region exist, with their hashes
    Status(RegionArgs),
}

#[derive(clap::Args, Debug)]
pub struct RegionArgs {
    /// Region name, used in every artifact path
    #[arg(long)]
    pub region_name: String,

    /// Root holding `extraction/` and `score/`
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    pub input_path: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub region: RegionArgs,

    /// Step ids or names (0-12, grid, dni, ...) or "all"
    #[arg(long, num_args = 1.., default_value = "all", value_parser = step_token)]
    pub steps: Vec<String>,

    /// Recompute steps whose output already exists
    #[arg(long)]
    pub force: bool,

    /// JSON config file (criteria table, land classes, tuning)
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Horizontal grid spacing in metres
    #[arg(long)]
    pub h_space: Option<f64>,

    /// Vertical grid spacing in metres
    #[arg(long)]
    pub v_space: Option<f64>,

    /// Subject rows per distance chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,
}

/// Reject unknown step tokens at parse time; `11,12` style lists are allowed.
fn step_token(token: &str) -> Result<String, String> {
    for part in token.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if !part.eq_ignore_ascii_case("all") {
            part.parse::<pvsite::Stage>().map_err(|e| e.to_string())?;
        }
    }
    Ok(token.to_string())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pvsite::{Stage, StepSelection};

    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        let base = ["pvsite", "run", "--region-name", "opole", "--input-path", "data"];
        let cli = Cli::try_parse_from(base.iter().chain(argv)).unwrap();
        match cli.command {
            Commands::Run(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn steps_default_to_all() {
        let args = run_args(&[]);
        assert_eq!(args.steps, vec!["all"]);
        assert!(!args.force);
        assert_eq!(StepSelection::parse(&args.steps).unwrap(), StepSelection::All);
    }

    #[test]
    fn steps_accept_ids_names_and_lists() {
        let args = run_args(&["--steps", "0", "dni", "11,12", "--force", "--h-space", "500"]);
        assert!(args.force);
        assert_eq!(args.h_space, Some(500.0));
        let selection = StepSelection::parse(&args.steps).unwrap();
        assert_eq!(selection.stages(), vec![Stage::Grid, Stage::Dni, Stage::FinalScore, Stage::McdmScore]);
    }

    #[test]
    fn unknown_step_is_a_parse_error() {
        let base = ["pvsite", "run", "--region-name", "opole", "--input-path", "data"];
        for bad in ["wind", "13", "0,bogus"] {
            let err = Cli::try_parse_from(base.iter().chain(&["--steps", bad])).unwrap_err();
            assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation, "{bad}");
        }
    }

    #[test]
    fn verbosity_is_global() {
        let cli = Cli::try_parse_from(["pvsite", "status", "--region-name", "r", "--input-path", "p", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Status(_)));
    }
}
