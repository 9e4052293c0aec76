//! Hardware Abstraction Layer for the button driver.
//!
//! Ports the driver core consumes: GPIO capability, tick clock, entropy.
//! Business logic stays in core modules, HAL is just I/O.

pub mod clock;
pub mod gpio;
#[cfg(any(test, feature = "sim"))]
pub mod sim;

#[cfg(target_os = "espidf")]
pub mod esp;

pub use clock::{Clock, Entropy, Tick};
pub use gpio::{GpioProvider, PinReservations};
