#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Acquisition pipeline for a single-channel serial ADC stream
//! (transport-agnostic).
//!
//! All transport interactions go through the `voltlog_traits::Link` trait;
//! the pipeline itself never touches a serial port.
//!
//! ## Architecture
//!
//! - **Gain**: firmware gain table and the single-owner current-gain cell
//!   (`gain` module)
//! - **Framing**: content-shape classification of the multiplexed
//!   data/control text stream (`frame` module)
//! - **Filtering**: Savitzky-Golay window smoother or scalar Kalman
//!   estimator (`filter` module)
//! - **Buffering**: fixed-capacity circular buffer with chronological
//!   views (`ring` module)
//! - **Persistence**: batched timed writes with day rollover (`writer`
//!   module)
//! - **Driving**: reader thread, bounded reconnect, and the
//!   Running/Reconnecting/Terminated state machine (`reader`, `link`,
//!   `pipeline` modules)

// Module declarations
pub mod error;
pub mod filter;
pub mod frame;
pub mod gain;
pub mod link;
pub mod link_error;
pub mod mocks;
pub mod pipeline;
pub mod reader;
pub mod ring;
pub mod sink;
pub mod spectrum;
pub mod writer;

pub use error::{PipelineError, Result};
pub use filter::SampleFilter;
pub use frame::{Frame, FrameParser, GainChange, Sample};
pub use gain::Gain;
pub use link::LinkManager;
pub use pipeline::{DriverState, PipelineDriver, PipelineStats};
pub use ring::CircularBuffer;
pub use sink::{NullSink, VisualizationSink};
pub use spectrum::{SpectralView, spectral_magnitudes};
pub use writer::{BatchRecord, BatchWriter};
