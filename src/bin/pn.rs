use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};

use pn_cover::analysis::{AnalysisError, CancellationToken, analyze};
use pn_cover::config::AnalysisConfig;
use pn_cover::net::{Net, load_net};
use pn_cover::options::Options;
use pn_cover::report::AnalysisReport;

const EXIT_ANALYSIS_ERROR: u8 = 1;
const EXIT_INPUT_ERROR: u8 = 2;

fn main() -> ExitCode {
    if std::env::var("PN_LOG").is_ok() {
        let e = env_logger::Env::new()
            .filter("PN_LOG")
            .write_style("PN_LOG_STYLE");
        env_logger::init_from_env(e);
    }

    let mut flags = match shellwords::split(&std::env::var("PN_FLAGS").unwrap_or_default()) {
        Ok(flags) => flags,
        Err(err) => {
            eprintln!("error: PN_FLAGS: {err}");
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };
    log::debug!("PN options from environment: {:?}", flags);
    flags.extend(std::env::args().skip(1));

    let options = match Options::parse_from_args(&flags) {
        Ok(options) => options,
        Err(err) => {
            if let Some(clap_err) = err.downcast_ref::<clap::Error>() {
                clap_err.exit();
            }
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    let (net, config) = match load_inputs(&options) {
        Ok(inputs) => inputs,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(EXIT_INPUT_ERROR);
        }
    };

    run(&net, &config, &options)
}

fn load_inputs(options: &Options) -> Result<(Net, AnalysisConfig)> {
    let mut config = match &options.config_file {
        Some(path) => AnalysisConfig::load_from_file(path)?,
        None => AnalysisConfig::default(),
    };
    options.apply_to(&mut config);
    log::debug!("analysis config: {:?}", config);

    let net = load_net(&options.net_file)
        .with_context(|| format!("Failed to load net: {:?}", options.net_file))?;
    Ok((net, config))
}

fn run(net: &Net, config: &AnalysisConfig, options: &Options) -> ExitCode {
    let start = Instant::now();
    let result = analyze(net, config, &CancellationToken::new());
    let elapsed = start.elapsed();

    match result {
        Ok(outcome) => {
            let report =
                AnalysisReport::from_outcome(net, &outcome, elapsed, config.include_tree_log);
            println!("{}", report);
            let written = write_outputs(&report, options, || outcome.tree.to_dot());
            if let Err(err) = written {
                eprintln!("error: {err:#}");
                return ExitCode::from(EXIT_ANALYSIS_ERROR);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            let report = AnalysisReport::from_error(net, &err, elapsed);
            println!("{}", report);
            if let Err(write_err) = write_outputs(&report, options, String::new) {
                eprintln!("error: {write_err:#}");
            }
            match err {
                AnalysisError::MalformedNet(_) => ExitCode::from(EXIT_INPUT_ERROR),
                _ => ExitCode::from(EXIT_ANALYSIS_ERROR),
            }
        }
    }
}

fn write_outputs(
    report: &AnalysisReport,
    options: &Options,
    dot: impl FnOnce() -> String,
) -> Result<()> {
    if let Some(output) = &options.output {
        report
            .save_to_file(output)
            .with_context(|| format!("Failed to write report: {}", output))?;
        log::info!("report written to {} and {}.json", output, output);
    }
    if let Some(path) = &options.dot_file {
        let dot = dot();
        if !dot.is_empty() {
            std::fs::write(path, dot)
                .with_context(|| format!("Failed to write dot file: {:?}", path))?;
            log::info!("coverability tree written to {:?}", path);
        }
    }
    Ok(())
}
