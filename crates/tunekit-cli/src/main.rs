use anyhow::Result;
use clap::{Arg, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

use tunekit_classifiers::config::ModelConfig;
use tunekit_cli::classifiers::input::RunConfig;
use tunekit_cli::classifiers::run::{run_demo, run_experiment, RunSummary};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("TUNEKIT_LOG", "error,tunekit=info"))
        .init();

    let model_arg = || {
        Arg::new("model")
            .short('m')
            .long("model")
            .help("Classifier to tune. Overrides the model type in the configuration file.")
            .value_parser(["knn", "svm"])
            .value_hint(ValueHint::Other)
    };
    let report_arg = || {
        Arg::new("report")
            .short('r')
            .long("report")
            .help("Write an HTML summary of the hyperparameter search to this path.")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath)
    };

    let matches = Command::new("tunekit")
        .version(clap::crate_version!())
        .about("Hyperparameter-searched KNN and SVM classifiers over batched data")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Tune a classifier on training + validation tables and score it on a test table")
                .arg(
                    Arg::new("config")
                        .help("Path to the JSON run configuration")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(model_arg())
                .arg(report_arg())
                .arg(
                    Arg::new("n_jobs")
                        .short('j')
                        .long("n-jobs")
                        .help("Worker threads used to evaluate candidates.")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Run a classifier on synthetic Gaussian clusters")
                .arg(model_arg().default_value("knn"))
                .arg(
                    Arg::new("seed")
                        .short('s')
                        .long("seed")
                        .help("Seed for data generation and batch shuffling.")
                        .value_parser(clap::value_parser!(u64))
                        .default_value("7"),
                )
                .arg(report_arg()),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("train", sub_m)) => handle_train(sub_m),
        Some(("demo", sub_m)) => handle_demo(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_train(matches: &ArgMatches) -> Result<()> {
    let config_path = matches
        .get_one::<PathBuf>("config")
        .ok_or_else(|| anyhow::anyhow!("missing config path"))?;
    log::info!("[tunekit::train] Running experiment from config: {:?}", config_path);

    let config = RunConfig::from_arguments(config_path, matches)?;

    match run_experiment(&config) {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            log::error!("Experiment failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_demo(matches: &ArgMatches) -> Result<()> {
    let model = matches
        .get_one::<String>("model")
        .map(|m| ModelConfig::from_str(m))
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();
    let seed = matches.get_one::<u64>("seed").copied().unwrap_or(7);
    let report = matches.get_one::<PathBuf>("report");
    log::info!("[tunekit::demo] Running {} demo with seed {}", model.name(), seed);

    match run_demo(&model, seed, report.map(|p| p.as_path())) {
        Ok(summary) => print_summary(&summary),
        Err(e) => {
            log::error!("Demo failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn print_summary(summary: &RunSummary) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}
