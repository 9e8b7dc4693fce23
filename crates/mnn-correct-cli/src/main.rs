use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;

use mnn_correct::CorrectionConfig;
use mnn_correct_cli::commands::{
    load_config, run_adjust, run_correct, run_smooth, AdjustJob, CorrectJob, SmoothJob,
};

fn path_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .help(help)
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn output_arg(help: &'static str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .help(help)
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .value_hint(ValueHint::FilePath)
}

fn sigma_arg() -> Arg {
    Arg::new("sigma")
        .short('s')
        .long("sigma")
        .help("Kernel variance; weights are exp(-squared distance / sigma)")
        .value_parser(clap::value_parser!(f64))
}

fn build_cli() -> Command {
    Command::new("mnn-correct")
        .version(clap::crate_version!())
        .about("Smooth and variance-adjust MNN correction vectors for batch-effect removal")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .global(true)
                .help("Number of worker threads (defaults to all cores)")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .global(true)
                .help("Run single-threaded")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("correct")
                .about("Correct a query batch towards a reference batch using anchor pairs")
                .arg(path_arg("reference", "Reference matrix (features x samples)"))
                .arg(path_arg("query", "Query matrix (features x samples)"))
                .arg(path_arg(
                    "pairs",
                    "Anchor pairs with header 'reference,query' (0-based sample indices)",
                ))
                .arg(output_arg("File the corrected query matrix is written to"))
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .help("JSON configuration file; command-line flags take precedence")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(sigma_arg())
                .arg(
                    Arg::new("no_var_adj")
                        .long("no-var-adj")
                        .help("Skip quantile-matching variance adjustment")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("scaling_output")
                        .long("scaling-output")
                        .help("Optional file for the per-sample scale factors")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("smooth")
                .about("Smooth per-pair correction vectors into a per-sample field")
                .arg(path_arg("vectors", "Correction vectors (pairs x features)"))
                .arg(path_arg("index", "Anchor sample index per vector, one per line"))
                .arg(path_arg("data", "Matrix used for distances (features x samples)"))
                .arg(output_arg("File the smoothed field (features x samples) is written to"))
                .arg(sigma_arg().required(true)),
        )
        .subcommand(
            Command::new("adjust")
                .about("Compute quantile-matching scale factors for query samples")
                .arg(path_arg("reference", "Reference matrix (features x samples)"))
                .arg(path_arg("query", "Query matrix (features x samples)"))
                .arg(path_arg("gradients", "One direction per query sample (samples x features)"))
                .arg(output_arg("File the scale factors are written to, one per line"))
                .arg(sigma_arg().required(true)),
        )
}

fn correct_config(matches: &ArgMatches, parallel: bool) -> Result<CorrectionConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config(path)?,
        None => CorrectionConfig::default(),
    };
    if let Some(&sigma) = matches.get_one::<f64>("sigma") {
        config.sigma = sigma;
    }
    if matches.get_flag("no_var_adj") {
        config.var_adj = false;
    }
    config.parallel = config.parallel && parallel;
    log::debug!("Using configuration: {:?}", config);
    Ok(config)
}

fn required_path(matches: &ArgMatches, name: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(name)
        .cloned()
        .unwrap_or_default()
}

/// Size the global rayon pool and report whether parallel loops are enabled.
fn configure_threads(matches: &ArgMatches) -> Result<bool> {
    if let Some(&threads) = matches.get_one::<usize>("threads") {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
        log::debug!("Using {} worker threads", threads);
    }
    Ok(!matches.get_flag("sequential"))
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("MNN_CORRECT_LOG", "error,mnn_correct=info"))
        .init();

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("correct", sub)) => {
            let parallel = configure_threads(sub)?;
            let job = CorrectJob {
                reference: required_path(sub, "reference"),
                query: required_path(sub, "query"),
                pairs: required_path(sub, "pairs"),
                output: required_path(sub, "output"),
                scaling_output: sub.get_one::<PathBuf>("scaling_output").cloned(),
                config: correct_config(sub, parallel)?,
            };
            run_correct(&job)?;
        }
        Some(("smooth", sub)) => {
            let parallel = configure_threads(sub)?;
            let job = SmoothJob {
                vectors: required_path(sub, "vectors"),
                index: required_path(sub, "index"),
                data: required_path(sub, "data"),
                output: required_path(sub, "output"),
                sigma: sub.get_one::<f64>("sigma").copied().unwrap_or_default(),
                parallel,
            };
            run_smooth(&job)?;
        }
        Some(("adjust", sub)) => {
            let parallel = configure_threads(sub)?;
            let job = AdjustJob {
                reference: required_path(sub, "reference"),
                query: required_path(sub, "query"),
                gradients: required_path(sub, "gradients"),
                output: required_path(sub, "output"),
                sigma: sub.get_one::<f64>("sigma").copied().unwrap_or_default(),
                parallel,
            };
            run_adjust(&job)?;
        }
        _ => unreachable!("subcommand_required prevents this"),
    }

    Ok(())
}
