//! # polled-button-driver
//!
//! Polled GPIO button driver with debounce and click classification.
//!
//! ## Architecture
//!
//! ```text
//! bus request ──▶ Driver::dispatch_raw ──▶ Registry ◀── Driver::sample_once
//!                                             │              │
//!                                             ▼              ▼
//!                                         EventStream ◀── ButtonNode::sample
//! ```
//!
//! - [`Registry`]: ordered buttons behind one bounded-wait lock
//! - [`engine::ButtonNode`]: per-button debounce and click/long/hold state machine
//! - [`EventStream`]: lock-free event bus, each listener reads at its own pace
//! - [`hal`]: the ports (GPIO, tick clock, entropy) the core is written against
//!
//! The sampler never waits on the request path: if the registry is busy it
//! skips the cycle and tries again on the next tick.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod button;
pub mod config;
pub mod consumer;
pub mod driver;
pub mod engine;
pub mod error;
pub mod event;
pub mod hal;
pub mod id;
pub mod log_drain;
pub mod logging;
pub mod registry;
pub mod stats;
pub mod stream;
pub mod sync;

pub use button::{ButtonConfig, ButtonId, Level, PinNumber, PullMode, RegisterRequest, Selector};
pub use config::{DriverConfig, Timings};
pub use consumer::EventConsumer;
pub use driver::{Cycle, Driver};
pub use error::{ConfigError, DriverError};
pub use event::{ButtonEvent, DriverRequest, EventKind, EventSink, RequestBus};
pub use registry::Registry;
pub use stats::{DriverStats, StatsSnapshot};
pub use stream::EventStream;
