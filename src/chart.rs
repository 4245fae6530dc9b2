// Copyright 2021 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::config::ChartConfig;
use crate::error::{Error, Result};
use crate::memory::MemSeries;
use crate::rtt::RttSeries;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::{register_font, FontStyle, IntoFont, TextStyle};

use std::error::Error as StdError;
use std::fs::File;
use std::io::BufWriter;
use std::ops::Range;
use std::path::Path;

const FONT: &str = "sans-serif";

macro_rules! hexcolour {
    ($colour:literal) => {
        RGBColor(
            (($colour & 0xFF0000) >> 16) as u8,
            (($colour & 0x00FF00) >> 8) as u8,
            ($colour & 0x0000FF) as u8,
        )
    };
}

const GREY: RGBColor = hexcolour!(0x808080);
const MEDIAN_GREEN: RGBColor = hexcolour!(0x008000);

type DrawResult = std::result::Result<(), Box<dyn StdError>>;

/// Something which knows how to draw itself onto a chart area.
pub trait Chart {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, caption: Option<&str>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static;
}

const BITMAP_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Format {
    Svg,
    /// an extension the bitmap encoder recognizes
    Bitmap,
    /// no or unknown extension, written as PNG
    Png,
}

impl Format {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("svg") => Format::Svg,
            Some(ext) if BITMAP_EXTENSIONS.iter().any(|b| ext.eq_ignore_ascii_case(b)) => {
                Format::Bitmap
            }
            _ => Format::Png,
        }
    }
}

/// Fails early if the chart could never be written to `path`.
pub fn check_output(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            return Err(Error::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "output directory does not exist",
                ),
            ));
        }
    }
    Ok(())
}

/// Rendering state for a single invocation. Dropped once the image is
/// written.
pub struct RenderContext<'a> {
    config: &'a ChartConfig,
}

impl<'a> RenderContext<'a> {
    pub fn new(config: &'a ChartConfig) -> Result<Self> {
        let font: &'static [u8] = dejavu::sans_mono::regular();
        register_font(FONT, FontStyle::Normal, font)
            .map_err(|e| Error::Font(format!("{:?}", e)))?;
        Ok(Self { config })
    }

    pub fn plot_rtt(&self, series: &RttSeries, output: &Path) -> Result<()> {
        self.render(series, output)
    }

    pub fn plot_memory(&self, series: &MemSeries, output: &Path) -> Result<()> {
        self.render(series, output)
    }

    pub fn render<C: Chart>(&self, chart: &C, output: &Path) -> Result<()> {
        let size = (self.config.width(), self.config.height());
        let caption = self.config.caption();
        debug!(
            "rendering {}x{} chart to {}",
            size.0,
            size.1,
            output.display()
        );
        let result = match Format::from_path(output) {
            Format::Svg => {
                let root = SVGBackend::new(output, size).into_drawing_area();
                draw_and_present(chart, &root, caption)
            }
            Format::Bitmap => {
                let root = BitMapBackend::new(output, size).into_drawing_area();
                draw_and_present(chart, &root, caption)
            }
            Format::Png => {
                let mut buffer = vec![0u8; size.0 as usize * size.1 as usize * 3];
                let result = {
                    let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
                    draw_and_present(chart, &root, caption)
                };
                result.and_then(|_| write_png(output, size, &buffer))
            }
        };
        result.map_err(|e| Error::Render(format!("{}: {}", output.display(), e)))
    }
}

/// Encodes an RGB buffer as PNG regardless of the file extension.
#[allow(deprecated)]
fn write_png(output: &Path, size: (u32, u32), buffer: &[u8]) -> DrawResult {
    use png::HasParameters;

    let file = BufWriter::new(File::create(output)?);
    let mut encoder = png::Encoder::new(file, size.0, size.1);
    encoder.set(png::ColorType::RGB).set(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(buffer)?;
    Ok(())
}

fn desc_style() -> TextStyle<'static> {
    (FONT, 16).into_font().color(&RED)
}

fn draw_and_present<C, DB>(
    chart: &C,
    root: &DrawingArea<DB, Shift>,
    caption: Option<&str>,
) -> DrawResult
where
    C: Chart,
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    chart.draw(root, caption)?;
    root.present()?;
    Ok(())
}

/// Widens a degenerate range so that plotters has something to map onto.
fn span(low: f64, high: f64) -> Range<f64> {
    if high > low {
        low..high
    } else {
        (low - 0.5)..(low + 0.5)
    }
}

fn points(x: &[u64], y: &[u64]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y.iter())
        .map(|(&x, &y)| (x as f64, y as f64))
        .collect()
}

fn builder<'a, 'b, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    caption: Option<&str>,
) -> ChartBuilder<'a, 'b, DB> {
    let mut builder = ChartBuilder::on(root);
    builder
        .margin(20)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 40);
    if let Some(caption) = caption {
        builder.caption(caption, (FONT, 30));
    }
    builder
}

impl Chart for RttSeries {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, caption: Option<&str>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        if self.is_empty() {
            warn!("no rtt samples found, rendering an empty chart");
        }

        let clients = self.clients();
        let x_range = match (clients.iter().min(), clients.iter().max()) {
            (Some(&low), Some(&high)) => span(low as f64, high as f64),
            _ => 0.0..1.0,
        };
        let y_top = match self.peak() {
            Some(peak) if peak > 0 => peak as f64 * 1.1,
            _ => 1.0,
        };

        let mut chart = builder(root, caption).build_cartesian_2d(x_range, 0.0..y_top)?;

        chart
            .configure_mesh()
            .x_desc("clients num")
            .y_desc("RTT ms")
            .axis_desc_style(desc_style())
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                points(clients, self.p95()),
                RED.stroke_width(1),
            ))?
            .label("95 percentile")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED.stroke_width(1)));

        chart
            .draw_series(DashedLineSeries::new(
                points(clients, self.median()),
                10,
                5,
                MEDIAN_GREEN.stroke_width(1),
            ))?
            .label("Median")
            .legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], MEDIAN_GREEN.stroke_width(1))
            });

        chart
            .draw_series(LineSeries::new(
                points(clients, self.max()),
                GREY.stroke_width(1),
            ))?
            .label("Max")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], GREY.stroke_width(1)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperMiddle)
            .background_style(WHITE.filled())
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }
}

impl Chart for MemSeries {
    fn draw<DB>(&self, root: &DrawingArea<DB, Shift>, caption: Option<&str>) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        if self.is_empty() {
            warn!("no memory samples found, rendering an empty chart");
        }

        let values: Vec<(f64, f64)> = self
            .samples()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .map(|(i, &v)| (i as f64, v))
            .collect();

        let x_range = span(0.0, self.len().saturating_sub(1) as f64);
        let y_range = match (self.low(), self.peak()) {
            (Some(low), Some(high)) if low.is_finite() && high.is_finite() => {
                let margin = (high - low) * 0.05;
                span(low - margin, high + margin)
            }
            _ => 0.0..1.0,
        };

        let mut chart = builder(root, caption).build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .y_desc("RAM (MiB)")
            .axis_desc_style(desc_style())
            .draw()?;

        chart.draw_series(LineSeries::new(values, RED.stroke_width(1)))?;

        Ok(())
    }
}
