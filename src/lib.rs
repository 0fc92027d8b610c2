//! airbee — EE895 air-telemetry agent
//!
//! This crate provides a small, long-running agent that polls an E+E EE895
//! CO2/temperature/pressure sensor over a register-addressed I2C bus,
//! keeps the single most recent reading, and serves it to a Prometheus
//! scraper. Optionally each new reading is also forwarded to an MQTT
//! broker, with a one-time Home Assistant discovery announcement.
//!
//! ## Modules
//!
//! * `config` — Configuration structures, loading, validation, and
//!   defaults. Supports TOML configuration files with validation via the
//!   `validator` crate.
//!
//! * `core` — Core runtime components:
//!   - Sensor reader and frame decoding
//!   - Latest-reading state store
//!   - Fixed-cadence poll loop
//!   - Best-effort MQTT fan-out
//!
//! * `exporter` — The scrape capability (series enumeration, snapshot
//!   collection, text exposition rendering) and its HTTP adapter.
//!
//! * `logger` — Centralized logging initialization using `tracing`.
//!   Supports console output in multiple formats (compact, pretty, JSON)
//!   and optional systemd journald integration.

pub mod config;
pub mod core;
pub mod exporter;
pub mod logger;
