//! # replob-detector: heartbeat-based failure detection
//!
//! [`Detector`] owns a last-seen timestamp per peer and drives a pulse/scan
//! loop as a journey. It never proposes a removal itself — it calls back
//! into whatever owns the `Replob` engine, keeping this crate free of a
//! dependency on `replob-core`.

mod detector;

pub use detector::Detector;
