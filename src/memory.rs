// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Memory usage logs: one floating-point sample (MiB) per line. Unlike the
//! RTT log there is no noise to skip, so any bad line fails the whole read.

use crate::error::{Error, Result};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemSeries {
    samples: Vec<f64>,
}

impl MemSeries {
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Largest finite sample. NaN and infinities are ignored.
    pub fn peak(&self) -> Option<f64> {
        self.finite().fold(None, |acc, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
    }

    pub fn low(&self) -> Option<f64> {
        self.finite().fold(None, |acc, v| match acc {
            Some(m) if m <= v => Some(m),
            _ => Some(v),
        })
    }

    fn finite(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied().filter(|v| v.is_finite())
    }
}

fn parse_sample(line: usize, text: &str) -> Result<f64> {
    text.trim().parse().map_err(|_| Error::MalformedNumber {
        line,
        content: text.to_owned(),
    })
}

fn collect<I, S>(lines: I) -> Result<MemSeries>
where
    I: IntoIterator<Item = Result<S>>,
    S: AsRef<str>,
{
    let mut samples = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        let line = line?;
        samples.push(parse_sample(i + 1, line.as_ref())?);
    }
    Ok(MemSeries { samples })
}

/// Parses every line as an `f64`, stopping at the first one which isn't.
pub fn build_series<I, S>(lines: I) -> Result<MemSeries>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    collect(lines.into_iter().map(Ok))
}

/// Reads a memory log from disk.
pub fn load(path: impl AsRef<Path>) -> Result<MemSeries> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let lines = BufReader::new(file)
        .lines()
        .map(|line| line.map_err(|e| Error::io(path, e)));
    let series = collect(lines)?;
    debug!("{}: {} samples", path.display(), series.len());
    Ok(series)
}
