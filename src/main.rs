mod app;
mod cli;
mod clock;
mod config;
mod constants;
mod error;
mod network;
mod platform;
mod store;
mod ui;
mod util;

use std::{
    process::ExitCode,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use log::{debug, info};

use crate::app::Tracker;
use crate::cli::Cli;
use crate::config::{Credentials, Settings};
use crate::error::{Error, Result};
use crate::network::HttpSource;
use crate::store::{log_path, read_log, LogStore};
use crate::ui::ChartData;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(err) => {
            debug!("{err:?}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let settings = Settings::from_cli(cli)?;

    if !cli.track && !cli.plot {
        println!("Nothing to do: pass --track and/or --plot.");
        return Ok(ExitCode::SUCCESS);
    }
    if cli.track {
        track(&settings)?;
    }
    if cli.plot {
        return Ok(plot(&settings));
    }
    Ok(ExitCode::SUCCESS)
}

fn track(settings: &Settings) -> Result<()> {
    let source = HttpSource::new(settings.platform, Credentials::from_env(), settings.timeout)?;
    let store = LogStore::open(&settings.data_dir, settings.platform)?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&stop);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| Error::Config(format!("failed to install Ctrl-C handler: {e}")))?;

    Tracker::new(source, store, settings.ids.clone()).run(settings.interval, &stop);
    Ok(())
}

// A bad log only costs that identifier its chart
fn plot(settings: &Settings) -> ExitCode {
    let mut failed = 0;
    for id in &settings.ids {
        if let Err(err) = plot_one(settings, id) {
            debug!("could not plot {id}: {err:?}");
            eprintln!("Error: {err}");
            failed += 1;
        }
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn plot_one(settings: &Settings, id: &str) -> Result<()> {
    let platform = settings.platform;
    let path = log_path(&settings.data_dir, platform, id);
    let samples = read_log(&path)?;
    info!("plotting {} samples from {}", samples.len(), path.display());

    let title = format!(
        "{p} Video Views and Rate of Increase Over Time - {p} ID {id}",
        p = platform.title()
    );
    let chart = ChartData::new(title, &samples).ok_or_else(|| Error::Format {
        path,
        line: 0,
        reason: "no samples".into(),
    })?;
    ui::show(&chart)?;
    Ok(())
}
