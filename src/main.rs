//! btndrv firmware entry point.
//!
//! 1. Bind the `log` facade to the ESP-IDF logger
//! 2. Attach the driver to the system event loop
//! 3. Start the sampler task and the sampler log drain task
//! 4. Register the BOOT button by posting a request on the loop
//! 5. Log every event the driver publishes

#[cfg(target_os = "espidf")]
mod firmware {
    use std::thread;
    use std::time::Duration;

    use esp_idf_svc::eventloop::{EspSystemEventLoop, System};
    use esp_idf_svc::log::EspLogger;
    use esp_idf_svc::sys;

    use polled_button_driver::button::ConfigWord;
    use polled_button_driver::config::{DriverConfig, VERSION};
    use polled_button_driver::event::REGISTER_REQUEST_ID;
    use polled_button_driver::hal::esp::{EspButtonBus, EspEntropy, EspGpio, FreeRtosClock};
    use polled_button_driver::{log_drain, Driver, EventConsumer, EventStream, Level, PullMode};

    type FirmwareBus = EspButtonBus<System>;
    type FirmwareDriver = Driver<
        &'static EspGpio,
        FreeRtosClock,
        EspEntropy,
        (&'static EventStream, &'static FirmwareBus),
    >;

    static GPIO: EspGpio = EspGpio::new();
    static EVENTS: EventStream = EventStream::new();

    /// BOOT strap button on most dev boards: active low, external pull-up.
    const BOOT_PIN: u8 = 0;

    const SAMPLER_STACK: usize = 4096;
    const DRAIN_STACK: usize = 4096;
    const DRAIN_PERIOD: Duration = Duration::from_millis(100);
    const LISTEN_PERIOD: Duration = Duration::from_millis(20);

    pub fn run() {
        sys::link_patches();
        EspLogger::initialize_default();

        log::info!("{} starting", VERSION);

        let sys_loop = match EspSystemEventLoop::take() {
            Ok(sys_loop) => sys_loop,
            Err(err) => {
                log::error!("system event loop unavailable: {}", err);
                return;
            }
        };
        let bus: &'static FirmwareBus = Box::leak(Box::new(EspButtonBus::new(sys_loop)));

        let sinks = (&EVENTS, bus);
        let driver = match Driver::new(&GPIO, FreeRtosClock, EspEntropy, sinks, DriverConfig::DEFAULT) {
            Ok(driver) => driver,
            Err(err) => {
                log::error!("driver config rejected: {}", err);
                return;
            }
        };
        let driver: &'static FirmwareDriver = Box::leak(Box::new(driver));

        let _requests = match driver.subscribe(bus) {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                log::error!("request subscription failed: {}", err);
                return;
            }
        };

        let mut events = EventConsumer::from_oldest(&EVENTS);

        let sampler = thread::Builder::new()
            .name("btn-sampler".into())
            .stack_size(SAMPLER_STACK)
            .spawn(move || driver.run());
        if let Err(err) = sampler {
            log::error!("sampler task not started: {}", err);
            return;
        }

        let drain = thread::Builder::new()
            .name("btn-log".into())
            .stack_size(DRAIN_STACK)
            .spawn(move || loop {
                log_drain::forward(driver.sampler_log());
                thread::sleep(DRAIN_PERIOD);
            });
        if let Err(err) = drain {
            log::warn!("sampler log drain not started: {}", err);
        }

        let boot = ConfigWord::pack(BOOT_PIN, 0, Level::High, PullMode::PullUp as u8);
        match bus.post(REGISTER_REQUEST_ID, boot) {
            Ok(true) => {}
            Ok(false) => log::error!("BOOT button request not queued"),
            Err(err) => log::error!("BOOT button request failed: {}", err),
        }

        let mut reported_lost = 0;
        loop {
            for event in events.drain() {
                match (event.config(), event.reason) {
                    (Some(config), _) => {
                        log::info!("{:?} id {} on {}", event.kind, config.id, config.pin)
                    }
                    (None, Some(reason)) => log::warn!("{:?}: {}", event.kind, reason),
                    (None, None) => log::info!("{:?}", event.kind),
                }
            }

            let lost = events.dropped();
            if lost != reported_lost {
                log::warn!("listener fell behind, {} events lost so far", lost);
                reported_lost = lost;
            }

            thread::sleep(LISTEN_PERIOD);
        }
    }
}

#[cfg(target_os = "espidf")]
fn main() {
    firmware::run();
}

#[cfg(not(target_os = "espidf"))]
fn main() {
    eprintln!(
        "{} is ESP-IDF firmware; build it for an espidf target (e.g. xtensa-esp32-espidf)",
        polled_button_driver::config::VERSION
    );
}
