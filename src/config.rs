// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::{Error, Result};

use clap::{App, Arg, ArgMatches};
use rustcommon_logger::LevelFilter;
use serde_derive::Deserialize;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The report tools sharing this configuration.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tool {
    Rtt,
    Memory,
}

impl Tool {
    pub fn name(self) -> &'static str {
        match self {
            Tool::Rtt => "rtt-plot",
            Tool::Memory => "mem-plot",
        }
    }

    fn about(self) -> &'static str {
        match self {
            Tool::Rtt => "Generate RTT chart",
            Tool::Memory => "Generate memory usage chart",
        }
    }

    fn input_help(self) -> &'static str {
        match self {
            Tool::Rtt => "input file containing benchmark results",
            Tool::Memory => "input file containing one memory sample (MiB) per line",
        }
    }
}

fn default_width() -> u32 {
    1080
}

fn default_height() -> u32 {
    720
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Logging {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for Logging {
    fn default() -> Self {
        Logging::Info
    }
}

impl From<Logging> for LevelFilter {
    fn from(level: Logging) -> Self {
        match level {
            Logging::Off => LevelFilter::Off,
            Logging::Error => LevelFilter::Error,
            Logging::Warn => LevelFilter::Warn,
            Logging::Info => LevelFilter::Info,
            Logging::Debug => LevelFilter::Debug,
            Logging::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct General {
    #[serde(default)]
    logging: Logging,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartConfig {
    #[serde(default = "default_width")]
    width: u32,
    #[serde(default = "default_height")]
    height: u32,
    caption: Option<String>,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            caption: None,
        }
    }
}

impl ChartConfig {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn set_height(&mut self, height: u32) {
        self.height = height;
    }

    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    pub fn set_caption(&mut self, caption: Option<String>) {
        self.caption = caption;
    }
}

/// Contents of the optional TOML file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    general: General,
    #[serde(default)]
    chart: ChartConfig,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    input: PathBuf,
    output: PathBuf,
    logging: Logging,
    chart: ChartConfig,
}

impl Config {
    /// parse command line options and return `Config`
    pub fn new(tool: Tool) -> Result<Config> {
        Self::from_args(tool, std::env::args_os())
    }

    /// Builds the config from an explicit argument list. The first item is
    /// the program name.
    pub fn from_args<I, T>(tool: Tool, args: I) -> Result<Config>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app(tool).get_matches_from_safe(args)?;

        let file = match matches.value_of("config") {
            Some(path) => ConfigFile::load_from_file(Path::new(path))?,
            None => ConfigFile::default(),
        };

        let mut config = Config {
            input: path_arg(&matches, "input")?,
            output: path_arg(&matches, "output")?,
            logging: file.general.logging,
            chart: file.chart,
        };

        if let Some(width) = parse_numeric_arg(&matches, "width")? {
            config.chart.set_width(width);
        }

        if let Some(height) = parse_numeric_arg(&matches, "height")? {
            config.chart.set_height(height);
        }

        if let Some(caption) = matches.value_of("caption") {
            config.chart.set_caption(Some(caption.to_string()));
        }

        match matches.occurrences_of("verbose") {
            0 => {}
            1 => config.logging = Logging::Debug,
            _ => config.logging = Logging::Trace,
        }

        if config.chart.width() == 0 || config.chart.height() == 0 {
            return Err(Error::Config(format!(
                "chart size must be non-zero, got {}x{}",
                config.chart.width(),
                config.chart.height()
            )));
        }

        Ok(config)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// get logging level
    pub fn logging(&self) -> LevelFilter {
        self.logging.into()
    }

    pub fn chart(&self) -> &ChartConfig {
        &self.chart
    }

    pub fn print(&self) {
        debug!("config: input: {}", self.input.display());
        debug!("config: output: {}", self.output.display());
        debug!(
            "config: chart: {}x{} caption: {}",
            self.chart.width(),
            self.chart.height(),
            self.chart.caption().unwrap_or("<none>")
        );
    }
}

fn app(tool: Tool) -> App<'static, 'static> {
    App::new(tool.name())
        .version(VERSION)
        .about(tool.about())
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .value_name("FILE")
                .help(tool.input_help())
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .value_name("FILE")
                .help("output file path to write resulted chart (PNG or SVG)")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("config")
                .long("config")
                .value_name("FILE")
                .help("TOML config file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("caption")
                .long("caption")
                .value_name("TEXT")
                .help("Chart caption")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("width")
                .long("width")
                .value_name("PIXELS")
                .help("Chart width")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("height")
                .long("height")
                .value_name("PIXELS")
                .help("Chart height")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Increase verbosity by one level. Can be used more than once")
                .multiple(true),
        )
}

fn path_arg(matches: &ArgMatches, key: &str) -> Result<PathBuf> {
    matches
        .value_of_os(key)
        .map(PathBuf::from)
        .ok_or_else(|| Error::Config(format!("missing {} path", key)))
}

fn parse_numeric_arg(matches: &ArgMatches, key: &str) -> Result<Option<u32>> {
    match matches.value_of(key) {
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| Error::Config(format!("{} is not a valid number: {}", key, v))),
        None => Ok(None),
    }
}
