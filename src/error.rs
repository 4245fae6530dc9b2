// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// A memory log line which is not a floating-point literal. `line` is
    /// 1-based.
    #[error("malformed numeric input at line {line}: {content:?}")]
    MalformedNumber { line: usize, content: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Cli(#[from] clap::Error),
    #[error("failed to load font: {0}")]
    Font(String),
    #[error("failed to render chart: {0}")]
    Render(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
