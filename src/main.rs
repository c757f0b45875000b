//! Offline driver: fills a session from the detection simulator and prints the
//! resulting snapshot as JSON.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use concept_annotator::detection::Simulator;
use concept_annotator::{Workbench, WorkbenchConfig};

#[derive(Parser)]
#[command(name = "concept-annotator", version, about = "Simulate detections for named concepts")]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Concept names to submit
    #[arg(required = true)]
    concepts: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Logger first so config loading problems are reported. RUST_LOG, when
    // set, wins over the configured level.
    let level_from_env = std::env::var_os("RUST_LOG").is_some();
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Trace)
        .parse_default_env()
        .init();
    if !level_from_env {
        log::set_max_level(log::LevelFilter::Info);
    }

    let config = WorkbenchConfig::load_or_default(args.config.as_deref());
    if !level_from_env {
        log::set_max_level(config.log_level.to_level_filter());
    }

    let mut simulator = Simulator::new(config.simulator);
    let mut workbench = Workbench::new(config);
    for name in &args.concepts {
        match workbench.simulate_concept(name, &mut simulator) {
            Some(id) => log::info!("Simulated detections for '{}'", id),
            None => log::warn!("Skipped concept '{}'", name),
        }
    }

    match serde_json::to_string_pretty(&workbench.snapshot()) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize session: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parses_config_and_concepts() {
        let args =
            Args::try_parse_from(["concept-annotator", "--config", "/tmp/a.json", "car", "red dog"])
                .unwrap();
        assert_eq!(args.config, Some(PathBuf::from("/tmp/a.json")));
        assert_eq!(args.concepts, vec!["car", "red dog"]);
    }

    #[test]
    fn test_requires_a_concept() {
        assert!(Args::try_parse_from(["concept-annotator"]).is_err());
        assert!(Args::try_parse_from(["concept-annotator", "--config"]).is_err());
    }
}
