// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

//! Parser for the per-step summary lines printed by the websocket benchmark:
//!
//! ```text
//! clients:  1000    95per-rtt: 1328ms    min-rtt:   2ms    median-rtt: 457ms    max-rtt: 1577ms
//! ```
//!
//! Anything else in the log is noise and is skipped.

use crate::error::{Error, Result};

use regex::Regex;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

const PATTERN: &str = r"clients:\s+([0-9]+)\s+95per-rtt:\s+([0-9]+)ms\s+min-rtt:\s+([0-9]+)ms\s+median-rtt:\s+([0-9]+)ms\s+max-rtt:\s+([0-9]+)ms";

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RttSample {
    pub clients: u64,
    pub p95: u64,
    pub min: u64,
    pub median: u64,
    pub max: u64,
}

/// Five aligned columns, one row per matching log line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RttSeries {
    clients: Vec<u64>,
    p95: Vec<u64>,
    min: Vec<u64>,
    median: Vec<u64>,
    max: Vec<u64>,
    skipped: usize,
}

impl RttSeries {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn push(&mut self, sample: RttSample) {
        self.clients.push(sample.clients);
        self.p95.push(sample.p95);
        self.min.push(sample.min);
        self.median.push(sample.median);
        self.max.push(sample.max);
    }

    pub fn clients(&self) -> &[u64] {
        &self.clients
    }

    pub fn p95(&self) -> &[u64] {
        &self.p95
    }

    pub fn min(&self) -> &[u64] {
        &self.min
    }

    pub fn median(&self) -> &[u64] {
        &self.median
    }

    pub fn max(&self) -> &[u64] {
        &self.max
    }

    /// number of input lines which did not carry a sample
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// largest `max-rtt` seen, or `None` for an empty series
    pub fn peak(&self) -> Option<u64> {
        self.max.iter().copied().max()
    }
}

pub struct RttParser {
    pattern: Regex,
}

impl Default for RttParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RttParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(PATTERN).expect("rtt pattern failed to compile"),
        }
    }

    /// Extracts a sample from `line`. Lines which don't follow the summary
    /// format, including ones with values too large for a `u64`, yield `None`.
    pub fn parse_line(&self, line: &str) -> Option<RttSample> {
        let captures = self.pattern.captures(line)?;
        let field = |i: usize| -> Option<u64> {
            let text = captures.get(i)?.as_str();
            match text.parse() {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("rtt field {} out of range: {} ({})", i, text, e);
                    None
                }
            }
        };
        Some(RttSample {
            clients: field(1)?,
            p95: field(2)?,
            min: field(3)?,
            median: field(4)?,
            max: field(5)?,
        })
    }

    pub fn build_series<I, S>(&self, lines: I) -> RttSeries
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut series = RttSeries::new();
        for line in lines {
            self.accumulate(&mut series, line.as_ref());
        }
        series
    }

    /// Like `build_series` but over a buffered reader. Only read failures are
    /// errors, lines which aren't valid UTF-8 are skipped like any other noise.
    pub fn read_series<R: BufRead>(&self, mut reader: R) -> std::io::Result<RttSeries> {
        let mut series = RttSeries::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            if buf.ends_with(b"\n") {
                buf.pop();
                if buf.ends_with(b"\r") {
                    buf.pop();
                }
            }
            self.accumulate(&mut series, &String::from_utf8_lossy(&buf));
        }
        Ok(series)
    }

    fn accumulate(&self, series: &mut RttSeries, line: &str) {
        match self.parse_line(line) {
            Some(sample) => series.push(sample),
            None => {
                debug!("skipping line: {}", line);
                series.skipped += 1;
            }
        }
    }
}

/// Parses a single line with a freshly compiled pattern. Prefer holding an
/// `RttParser` when parsing many lines.
pub fn parse_line(line: &str) -> Option<RttSample> {
    RttParser::new().parse_line(line)
}

pub fn build_series<I, S>(lines: I) -> RttSeries
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    RttParser::new().build_series(lines)
}

/// Reads an RTT benchmark log from disk.
pub fn load(path: impl AsRef<Path>) -> Result<RttSeries> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let series = RttParser::new()
        .read_series(BufReader::new(file))
        .map_err(|e| Error::io(path, e))?;
    debug!(
        "{}: {} samples, {} lines skipped",
        path.display(),
        series.len(),
        series.skipped()
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "clients:  1000    95per-rtt: 1328ms    min-rtt:   2ms    median-rtt: 457ms    max-rtt: 1577ms";

    fn line(clients: u64, p95: u64, min: u64, median: u64, max: u64) -> String {
        format!(
            "clients: {}    95per-rtt: {}ms    min-rtt: {}ms    median-rtt: {}ms    max-rtt: {}ms",
            clients, p95, min, median, max
        )
    }

    #[test]
    fn parse_summary_line() {
        assert_eq!(
            parse_line(SAMPLE),
            Some(RttSample {
                clients: 1000,
                p95: 1328,
                min: 2,
                median: 457,
                max: 1577,
            })
        );
    }

    #[test]
    fn parse_unrelated_line() {
        assert_eq!(
            parse_line("Missing received broadcasts: expected 23100000, got 23005351"),
            None
        );
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn parse_whitespace_and_surroundings() {
        let parser = RttParser::new();
        let tabs = "clients:\t5\t95per-rtt:\t4ms\tmin-rtt: 1ms \t median-rtt:  2ms  max-rtt:\t3ms";
        assert_eq!(
            parser.parse_line(tabs),
            Some(RttSample {
                clients: 5,
                p95: 4,
                min: 1,
                median: 2,
                max: 3,
            })
        );

        let prefixed = format!("2021-06-01 12:00:00 {}\n", SAMPLE);
        assert_eq!(parser.parse_line(&prefixed), parser.parse_line(SAMPLE));
    }

    #[test]
    fn parse_leading_zeros() {
        let sample = parse_line(&line(1, 7, 0, 3, 9).replace("7ms", "007ms")).unwrap();
        assert_eq!(sample.p95, 7);
    }

    #[test]
    fn reject_malformed() {
        let parser = RttParser::new();
        // missing ms suffix
        assert_eq!(
            parser.parse_line("clients: 1 95per-rtt: 2 min-rtt: 3ms median-rtt: 4ms max-rtt: 5ms"),
            None
        );
        // reordered tokens
        assert_eq!(
            parser.parse_line("clients: 1 min-rtt: 3ms 95per-rtt: 2ms median-rtt: 4ms max-rtt: 5ms"),
            None
        );
        // no whitespace after a token
        assert_eq!(
            parser.parse_line("clients:1 95per-rtt: 2ms min-rtt: 3ms median-rtt: 4ms max-rtt: 5ms"),
            None
        );
        // interleaved text
        assert_eq!(
            parser.parse_line(
                "clients: 1 foo 95per-rtt: 2ms min-rtt: 3ms median-rtt: 4ms max-rtt: 5ms"
            ),
            None
        );
        // non-ascii digits
        assert_eq!(
            parser.parse_line("clients: ١ 95per-rtt: 2ms min-rtt: 3ms median-rtt: 4ms max-rtt: 5ms"),
            None
        );
        // overflow
        assert_eq!(
            parser.parse_line(&line(1, 2, 3, 4, 5).replace("5ms", "99999999999999999999ms")),
            None
        );
    }

    #[test]
    fn integer_width() {
        let widest = line(1, 2, 3, 4, u64::MAX);
        assert_eq!(parse_line(&widest).map(|s| s.max), Some(u64::MAX));

        let too_wide = widest.replace(&u64::MAX.to_string(), "18446744073709551616");
        assert_eq!(parse_line(&too_wide), None);
        let series = build_series(vec![widest, too_wide]);
        assert_eq!(series.len(), 1);
        assert_eq!(series.skipped(), 1);
    }

    #[test]
    fn series_all_matching() {
        let lines: Vec<String> = (1..=5).map(|i| line(i * 100, i * 4, i, i * 2, i * 5)).collect();
        let series = build_series(&lines);

        assert_eq!(series.len(), 5);
        assert_eq!(series.clients(), &[100, 200, 300, 400, 500]);
        assert_eq!(series.p95(), &[4, 8, 12, 16, 20]);
        assert_eq!(series.min(), &[1, 2, 3, 4, 5]);
        assert_eq!(series.median(), &[2, 4, 6, 8, 10]);
        assert_eq!(series.max(), &[5, 10, 15, 20, 25]);
        assert_eq!(series.skipped(), 0);
        assert_eq!(series.peak(), Some(25));
    }

    #[test]
    fn series_skips_noise() {
        let lines = vec![
            "starting benchmark".to_string(),
            line(10, 40, 1, 20, 50),
            "Missing received broadcasts: expected 23100000, got 23005351".to_string(),
            line(20, 80, 2, 30, 90),
            String::new(),
            line(30, 70, 3, 25, 60),
        ];
        let series = build_series(&lines);

        assert_eq!(series.len(), 3);
        assert_eq!(series.skipped(), 3);
        assert_eq!(series.clients(), &[10, 20, 30]);
        assert_eq!(series.max(), &[50, 90, 60]);
        assert_eq!(series.peak(), Some(90));
        assert_eq!(series.p95(), &[40, 80, 70]);
        assert_eq!(series.min(), &[1, 2, 3]);
        assert_eq!(series.median(), &[20, 30, 25]);
    }

    #[test]
    fn series_is_repeatable() {
        let lines = vec![SAMPLE, "noise", SAMPLE];
        let parser = RttParser::new();
        assert_eq!(parser.build_series(&lines), parser.build_series(&lines));
        assert_eq!(parser.build_series(&lines), build_series(&lines));
    }

    #[test]
    fn read_from_buffer() {
        let text = format!("{}\r\nnoise\n{}\n", SAMPLE, line(1, 2, 3, 4, 5));
        let series = RttParser::new().read_series(text.as_bytes()).unwrap();
        assert_eq!(series.clients(), &[1000, 1]);
        assert_eq!(series.skipped(), 1);
    }

    #[test]
    fn read_skips_invalid_utf8() {
        let mut text = line(1, 2, 3, 4, 5).into_bytes();
        text.extend_from_slice(b"\ngarbage \xff\xfe in the log\n");
        text.extend_from_slice(line(2, 4, 6, 8, 10).as_bytes());
        text.extend_from_slice(b"\n");

        let series = RttParser::new().read_series(&text[..]).unwrap();
        assert_eq!(series.clients(), &[1, 2]);
        assert_eq!(series.max(), &[5, 10]);
        assert_eq!(series.skipped(), 1);
    }

    #[test]
    fn read_without_trailing_newline() {
        let series = RttParser::new().read_series(SAMPLE.as_bytes()).unwrap();
        assert_eq!(series.clients(), &[1000]);
        assert_eq!(series.skipped(), 0);
    }

    #[test]
    fn empty_series() {
        let series = build_series(Vec::<String>::new());
        assert!(series.is_empty());
        assert_eq!(series.peak(), None);
    }
}
