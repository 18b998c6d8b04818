extern crate weaver_msa;
use weaver_msa::cli::{build_cli, MsaParameters};
use weaver_msa::processing::msa_engine::start_msa_engine;

extern crate clap;
use clap::crate_version;

extern crate clap_complete;
use clap_complete::{generate, Shell};

#[macro_use]
extern crate log;
use log::LevelFilter;
extern crate env_logger;
use env_logger::Builder;

use std::env;
use std::process;

fn main() {
    let mut app = build_cli();
    let matches = app.clone().get_matches();

    match matches.subcommand_name() {
        Some("msa") => {
            let m = matches.subcommand_matches("msa").unwrap();
            set_log_level(m, true);
            match run_msa(m) {
                Ok(_) => info!("MSA complete."),
                Err(e) => {
                    error!("MSA failed with error: {:#}", e);
                    process::exit(1);
                }
            };
        }
        Some("shell-completion") => {
            let m = matches.subcommand_matches("shell-completion").unwrap();
            let mut file = std::fs::File::create(m.get_one::<String>("output-file").unwrap())
                .expect("failed to open output file");
            if let Some(generator) = m.get_one::<Shell>("shell").copied() {
                let mut cmd = build_cli();
                let name = cmd.get_name().to_string();
                generate(generator, &mut cmd, name, &mut file);
            }
        }
        _ => {
            app.print_help().unwrap();
            println!();
        }
    }
}

fn run_msa(m: &clap::ArgMatches) -> anyhow::Result<()> {
    let params = MsaParameters::from_matches(m)?;
    rayon::ThreadPoolBuilder::new()
        .num_threads(params.threads)
        .build_global()?;
    start_msa_engine(&params)?;
    Ok(())
}

fn set_log_level(matches: &clap::ArgMatches, is_last: bool) {
    let verbosity = *matches.get_one::<usize>("verbosity").unwrap_or(&2);
    let log_level = match verbosity {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        3 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = Builder::new();
    builder.filter_level(log_level);
    if env::var("RUST_LOG").is_ok() {
        builder.parse_filters(&env::var("RUST_LOG").unwrap());
    }
    if builder.try_init().is_err() && is_last {
        warn!("Failed to set log level - has it been specified multiple times?")
    }
    if is_last {
        info!("weaver version {}", crate_version!());
    }
}
