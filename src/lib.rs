// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Charts for websocket benchmark runs: RTT percentiles per client count and
//! memory usage over time.

#[macro_use]
extern crate rustcommon_logger;

mod chart;
mod config;
mod error;
pub mod memory;
pub mod rtt;

pub use crate::chart::{check_output, Chart, Format, RenderContext};
pub use crate::config::{ChartConfig, Config, ConfigFile, Logging, Tool, VERSION};
pub use crate::error::{Error, Result};
pub use crate::memory::MemSeries;
pub use crate::rtt::{RttParser, RttSample, RttSeries};

use rustcommon_logger::{LogBuilder, MultiLogBuilder, Stdout};

/// Parses the RTT log named by `config` and writes its chart.
pub fn rtt_report(config: &Config) -> Result<RttSeries> {
    check_output(config.output())?;

    let series = rtt::load(config.input())?;
    info!(
        "rtt: {} samples ({} lines skipped), peak max-rtt: {} ms",
        series.len(),
        series.skipped(),
        series.peak().unwrap_or(0)
    );

    RenderContext::new(config.chart())?.plot_rtt(&series, config.output())?;
    Ok(series)
}

/// Parses the memory log named by `config` and writes its chart.
pub fn memory_report(config: &Config) -> Result<MemSeries> {
    check_output(config.output())?;

    let series = memory::load(config.input())?;
    info!(
        "memory: {} samples, peak: {:.2} MiB",
        series.len(),
        series.peak().unwrap_or(0.0)
    );

    RenderContext::new(config.chart())?.plot_memory(&series, config.output())?;
    Ok(series)
}

/// Entry point shared by the binaries. Returns the process exit code.
pub fn run(tool: Tool) -> i32 {
    let config = match Config::new(tool) {
        Ok(config) => config,
        Err(Error::Cli(e)) => e.exit(),
        Err(e) => {
            eprintln!("{}: {}", tool.name(), e);
            return 1;
        }
    };

    // initialize logging
    let log = match LogBuilder::new()
        .output(Box::new(Stdout::new()))
        .log_queue_depth(1024)
        .single_message_size(4096)
        .build()
    {
        Ok(log) => log,
        Err(e) => {
            eprintln!("{}: failed to initialize log: {:?}", tool.name(), e);
            return 1;
        }
    };

    let mut log = MultiLogBuilder::new()
        .level_filter(config.logging())
        .default(log)
        .build()
        .start();

    info!("{} {}", tool.name(), VERSION);
    config.print();

    let result = match tool {
        Tool::Rtt => rtt_report(&config).map(|_| ()),
        Tool::Memory => memory_report(&config).map(|_| ()),
    };

    let code = match result {
        Ok(()) => {
            info!("Done");
            0
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    let _ = log.flush();
    code
}
