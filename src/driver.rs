//! Driver context.
//!
//! One value owns the registry, the platform ports, the event sink, the
//! configuration and the counters. It is created once, shared by
//! reference between the sampler task and whatever task delivers bus
//! requests, and never torn down.
//!
//! # Threads
//!
//! ```text
//! Sampler task ──▶ run() ──▶ sample_once() ─┐
//!                                            ├──▶ Registry (TimedLock)
//! Bus task ──▶ dispatch_raw() ──▶ register() ┘
//!                               deregister()
//! ```
//!
//! [`Driver::subscribe`] hooks `dispatch_raw` up to a [`RequestBus`] so
//! other components can add and remove buttons by posting requests.
//!
//! The request path logs through the `log` facade. The sampler logs into
//! [`Driver::sampler_log`] while it holds the registry, so it never waits
//! on a logger backend.

use alloc::vec::Vec;

use crate::button::{ButtonConfig, ConfigWord, RegisterRequest, Selector};
use crate::config::DriverConfig;
use crate::engine::Step;
use crate::error::{ConfigError, DriverError};
use crate::event::{
    ButtonEvent, DriverRequest, EventKind, EventSink, RequestBus, DEREGISTER_REQUEST_ID,
    REGISTER_REQUEST_ID,
};
use crate::hal::clock::{Clock, Entropy};
use crate::hal::gpio::GpioProvider;
use crate::logging::LogStream;
use crate::registry::Registry;
use crate::stats::DriverStats;
use crate::{drv_debug, drv_info, drv_warn};

/// Result of one sampler cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cycle {
    /// No button registered; nothing was locked.
    Idle,
    /// Registry busy; the whole cycle was skipped.
    Skipped,
    /// Every node was visited. Carries the number of events published.
    Sampled(usize),
}

pub struct Driver<G, C, E, B> {
    gpio: G,
    clock: C,
    entropy: E,
    bus: B,
    config: DriverConfig,
    registry: Registry,
    stats: DriverStats,
    log: LogStream,
}

impl<G, C, E, B> Driver<G, C, E, B>
where
    G: GpioProvider,
    C: Clock,
    E: Entropy,
    B: EventSink,
{
    /// Build a driver with an empty registry.
    pub fn new(gpio: G, clock: C, entropy: E, bus: B, config: DriverConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        Ok(Self {
            gpio,
            clock,
            entropy,
            bus,
            config,
            registry: Registry::new(),
            stats: DriverStats::new(),
            log: LogStream::new(),
        })
    }

    /// Register a button and publish the outcome.
    pub fn register(&self, request: RegisterRequest) -> Result<ButtonConfig, DriverError> {
        let result = self.registry.register(
            &request,
            &self.gpio,
            &self.clock,
            &self.entropy,
            self.config.request_lock_wait,
        );

        match result {
            Ok(config) => {
                self.stats.registered();
                log::info!(
                    "registered {} as {} (idle {:?}, {:?})",
                    config.pin,
                    config.id,
                    config.idle_level,
                    config.pull
                );
                self.publish(ButtonEvent::button(EventKind::ButtonRegistered, config));
            }
            Err(err) => {
                self.count_failure(err);
                log::warn!("registration of {} failed: {}", request.pin, err);
                self.publish(ButtonEvent::registration_failed(request, err));
            }
        }

        result
    }

    /// Deregister the first button `selector` names and publish the outcome.
    pub fn deregister(&self, selector: Selector) -> Result<ButtonConfig, DriverError> {
        let result = self.registry.deregister(
            &selector,
            &self.gpio,
            &self.clock,
            self.config.request_lock_wait,
        );

        match result {
            Ok(config) => {
                self.stats.deregistered();
                log::info!("deregistered {} ({})", config.id, config.pin);
                self.publish(ButtonEvent::button(EventKind::ButtonDeregistered, config));
            }
            Err(err) => {
                self.count_failure(err);
                log::warn!(
                    "deregistration of pin {} id {:04X} failed: {}",
                    selector.pin,
                    selector.id,
                    err
                );
                self.publish(ButtonEvent::deregistration_failed(selector, err));
            }
        }

        result
    }

    pub fn dispatch(&self, request: DriverRequest) -> Result<ButtonConfig, DriverError> {
        match request {
            DriverRequest::Register(request) => self.register(request),
            DriverRequest::Deregister(selector) => self.deregister(selector),
        }
    }

    /// Handle a raw bus message.
    ///
    /// Messages that do not decode are logged and dropped; no event is
    /// published for them since there is no payload to echo back.
    pub fn dispatch_raw(&self, event_id: i32, word: u32) -> Result<ButtonConfig, DriverError> {
        match DriverRequest::from_raw(event_id, ConfigWord(word)) {
            Ok(request) => self.dispatch(request),
            Err(err) => {
                log::warn!("ignoring bus message {} ({:#010x}): {}", event_id, word, err);
                Err(err)
            }
        }
    }

    /// One sampler cycle over every registered button.
    pub fn sample_once(&self) -> Cycle {
        if self.registry.is_empty() {
            return Cycle::Idle;
        }

        let Some(mut nodes) = self
            .registry
            .lock_for_cycle(&self.clock, self.config.sampler_lock_wait)
        else {
            self.stats.cycle_skipped();
            return Cycle::Skipped;
        };

        let now = self.clock.now();
        let timings = &self.config.timings;
        let mut published = 0;

        for node in nodes.iter_mut() {
            let config = *node.config();
            let step = node.sample(&self.gpio, now, timings, self.config.extended_info, |kind| {
                drv_debug!(self.log, now, "{} {:?}", config.id, kind);
                if self.publish(ButtonEvent::button(kind, config)) {
                    published += 1;
                } else {
                    drv_warn!(self.log, now, "{} {:?} dropped", config.id, kind);
                }
            });

            if step == Step::BecameReady {
                drv_info!(self.log, now, "{} on {} ready", config.id, config.pin);
            }
        }

        drop(nodes);
        self.stats.cycle_completed();
        Cycle::Sampled(published)
    }

    /// Route registration and deregistration requests posted on `bus`
    /// into [`Driver::dispatch_raw`].
    ///
    /// Both subscriptions must be kept alive for requests to keep flowing.
    pub fn subscribe<R>(&'static self, bus: &R) -> Result<[R::Subscription; 2], R::Error>
    where
        R: RequestBus,
        Self: Sync,
    {
        let register = bus.subscribe(REGISTER_REQUEST_ID, move |event_id, word| {
            let _ = self.dispatch_raw(event_id, word.0);
        })?;
        let deregister = bus.subscribe(DEREGISTER_REQUEST_ID, move |event_id, word| {
            let _ = self.dispatch_raw(event_id, word.0);
        })?;

        Ok([register, deregister])
    }

    /// Sampler task body. Publishes task-started, then cycles forever.
    pub fn run(&self) -> ! {
        log::info!("sampler started");
        self.publish(ButtonEvent::task_started());

        loop {
            let pause = match self.sample_once() {
                Cycle::Idle => self.config.idle_backoff,
                Cycle::Skipped | Cycle::Sampled(_) => self.config.cycle_yield,
            };
            self.clock.delay(pause);
        }
    }

    /// Registered buttons in registration order.
    ///
    /// `None` if the registry stayed busy for the request wait.
    pub fn buttons(&self) -> Option<Vec<ButtonConfig>> {
        self.registry
            .configs(&self.clock, self.config.request_lock_wait)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn stats(&self) -> &DriverStats {
        &self.stats
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Ring the sampler logs into; drain it with [`crate::log_drain::forward`].
    pub fn sampler_log(&self) -> &LogStream {
        &self.log
    }

    /// Direct registry access, mainly for diagnostics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    fn publish(&self, event: ButtonEvent) -> bool {
        let accepted = self.bus.publish(event);
        if !accepted {
            self.stats.event_dropped();
        }
        accepted
    }

    fn count_failure(&self, err: DriverError) {
        match err {
            DriverError::LockTimeout => self.stats.request_dropped(),
            _ => self.stats.request_failed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{Level, PinNumber, PullMode};
    use crate::consumer::EventConsumer;
    use crate::hal::sim::{ManualClock, SimGpio, XorShiftEntropy};
    use crate::stream::EventStream;

    type TestDriver<'a> = Driver<&'a SimGpio, &'a ManualClock, XorShiftEntropy, &'a EventStream>;

    fn pin(n: u8) -> PinNumber {
        PinNumber::new(n).unwrap()
    }

    fn driver<'a>(gpio: &'a SimGpio, clock: &'a ManualClock, bus: &'a EventStream) -> TestDriver<'a> {
        Driver::new(gpio, clock, XorShiftEntropy::new(7), bus, DriverConfig::DEFAULT).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let gpio = SimGpio::new();
        let clock = ManualClock::new(0);
        let bus = EventStream::<64>::new();

        let mut config = DriverConfig::DEFAULT;
        config.timings.debounce = 0;

        let result = Driver::new(&gpio, &clock, XorShiftEntropy::new(1), &bus, config);
        assert!(matches!(result, Err(ConfigError::ZeroDebounce)));
    }

    #[test]
    fn test_empty_registry_is_idle() {
        let (gpio, clock, bus) = (SimGpio::new(), ManualClock::new(0), EventStream::new());
        let drv = driver(&gpio, &clock, &bus);

        assert_eq!(drv.sample_once(), Cycle::Idle);
        assert_eq!(drv.stats().snapshot().cycles, 0);
    }

    #[test]
    fn test_register_publishes_config() {
        let (gpio, clock, bus) = (SimGpio::new(), ManualClock::new(0), EventStream::new());
        let drv = driver(&gpio, &clock, &bus);
        let mut events = EventConsumer::new(&bus);

        let config = drv
            .register(RegisterRequest::new(pin(4), Level::High, PullMode::PullUp).with_id(0x42))
            .unwrap();

        let event = events.tick().unwrap();
        assert_eq!(event.kind, EventKind::ButtonRegistered);
        assert_eq!(event.config(), Some(&config));
        assert_eq!(drv.stats().snapshot().registrations, 1);
    }

    #[test]
    fn test_sampler_logs_ready() {
        let (gpio, clock, bus) = (SimGpio::new(), ManualClock::new(10), EventStream::new());
        let drv = driver(&gpio, &clock, &bus);

        gpio.set_level(pin(4), Level::High);
        drv.register(RegisterRequest::new(pin(4), Level::High, PullMode::PullUp).with_id(1))
            .unwrap();

        assert_eq!(drv.sample_once(), Cycle::Sampled(0));

        let entry = drv.sampler_log().drain().unwrap();
        assert_eq!(entry.tick, 10);
        assert!(entry.message().contains("ready"));
    }

    struct Refuse;

    impl EventSink for Refuse {
        fn publish(&self, _event: ButtonEvent) -> bool {
            false
        }
    }

    #[test]
    fn test_sampler_logs_refused_events() {
        let (gpio, clock) = (SimGpio::new(), ManualClock::new(0));
        let mut config = DriverConfig::DEFAULT;
        config.extended_info = true;
        let drv = Driver::new(&gpio, &clock, XorShiftEntropy::new(3), Refuse, config).unwrap();

        gpio.set_level(pin(4), Level::High);
        let _ = drv.register(RegisterRequest::new(pin(4), Level::High, PullMode::PullUp));
        assert_eq!(drv.sample_once(), Cycle::Sampled(0));

        clock.advance(10);
        gpio.set_level(pin(4), Level::Low);
        assert_eq!(drv.sample_once(), Cycle::Sampled(0));

        let ready = drv.sampler_log().drain().unwrap();
        assert!(ready.message().contains("ready"));
        let press = drv.sampler_log().drain().unwrap();
        assert!(press.message().contains("ButtonPress"));
        let dropped = drv.sampler_log().drain().unwrap();
        assert_eq!(dropped.tick, 10);
        assert!(dropped.message().contains("dropped"));
    }

    #[test]
    fn test_skips_cycle_when_registry_busy() {
        let (gpio, clock, bus) = (SimGpio::new(), ManualClock::new(0), EventStream::new());
        let drv = driver(&gpio, &clock, &bus);
        drv.register(RegisterRequest::new(pin(4), Level::High, PullMode::PullUp))
            .unwrap();

        let _held = drv.registry.lock_for_cycle(&clock, 0).unwrap();
        assert_eq!(drv.sample_once(), Cycle::Skipped);
        assert_eq!(drv.stats().snapshot().skipped_cycles, 1);
    }
}
