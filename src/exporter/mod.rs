//! Scrape-side view of the latest reading.
//!
//! `SensorMetrics` is the capability consumed by the HTTP adapter: it
//! enumerates the exported series and produces their current values from a
//! single store snapshot per scrape. Rendering writes the text exposition
//! format directly; the adapter only transports the result.

use std::collections::BTreeMap;
use std::io::Write;

use crate::core::state::StateStore;

pub mod http;

/// Description of one exported gauge series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesSpec {
    pub name: &'static str,
    pub help: &'static str,
}

/// The three measurement series, in exposition order.
pub const SERIES: [SeriesSpec; 3] = [
    SeriesSpec {
        name: "i2c_co2_value",
        help: "CO2 level in ppm",
    },
    SeriesSpec {
        name: "i2c_temperature_value",
        help: "Temperature in °C",
    },
    SeriesSpec {
        name: "i2c_pressure_value",
        help: "Air pressure in hPa",
    },
];

/// One gauge value produced from a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub series: &'static SeriesSpec,
    pub value: f64,
}

/// Converts store snapshots into the exported measurement series.
///
/// Each scrape takes exactly one snapshot; concurrent scrapes and a
/// concurrent store update are isolated by the store's locking. Nothing is
/// cached across scrapes.
pub struct SensorMetrics {
    store: StateStore,
    labels: BTreeMap<String, String>,
}

impl SensorMetrics {
    pub fn new(store: StateStore, labels: BTreeMap<String, String>) -> Self {
        Self { store, labels }
    }

    /// The exported series, independent of any snapshot.
    pub fn series(&self) -> &'static [SeriesSpec] {
        &SERIES
    }

    /// Takes one snapshot and produces all three samples from it.
    pub fn collect(&self) -> [Sample; 3] {
        let reading = self.store.get();
        [
            Sample {
                series: &SERIES[0],
                value: f64::from(reading.co2),
            },
            Sample {
                series: &SERIES[1],
                value: reading.temperature,
            },
            Sample {
                series: &SERIES[2],
                value: reading.pressure,
            },
        ]
    }

    /// Renders the current snapshot in text exposition format.
    pub fn render(&self) -> String {
        let label_str = format_labels(&self.labels);
        let mut output = Vec::with_capacity(256);

        for sample in self.collect() {
            writeln!(output, "# HELP {} {}", sample.series.name, sample.series.help).ok();
            writeln!(output, "# TYPE {} gauge", sample.series.name).ok();
            writeln!(
                output,
                "{}{} {}",
                sample.series.name,
                label_str,
                format_value(sample.value)
            )
            .ok();
        }

        String::from_utf8(output).unwrap_or_default()
    }
}

/// Formats the static label set for the exposition format.
fn format_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }

    let parts: Vec<String> = labels
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escapes special characters in label values.
fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Formats a gauge value, keeping integral values fraction-free.
fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
