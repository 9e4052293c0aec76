//! ESP-IDF implementations of the HAL ports.
//!
//! Raw `esp_idf_svc::sys` calls: the sampler reconfigures pins on the fly
//! by number, which the typed `PinDriver` API does not allow.
//!
//! [`EspButtonBus`] carries driver traffic over an ESP-IDF event loop
//! under the `BTNDRV_EVENT` base: events out, requests in.

use core::ffi::CStr;

use esp_idf_svc::eventloop::{
    EspEvent, EspEventDeserializer, EspEventLoop, EspEventLoopType, EspEventPostData,
    EspEventSerializer, EspEventSource, EspSubscription,
};
use esp_idf_svc::sys::{self, EspError};

use crate::button::{ConfigWord, Level, PinNumber, PullMode};
use crate::event::{
    ButtonEvent, EventSink, RequestBus, DEREGISTER_REQUEST_ID, REGISTER_REQUEST_ID,
};
use crate::hal::clock::{Clock, Entropy, Tick};
use crate::hal::gpio::{GpioProvider, PinReservations};

/// GPIO bank of the running chip.
pub struct EspGpio {
    reservations: PinReservations,
}

impl EspGpio {
    pub const fn new() -> Self {
        Self {
            reservations: PinReservations::new(),
        }
    }
}

impl Default for EspGpio {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioProvider for EspGpio {
    fn reserve(&self, pin: PinNumber) -> bool {
        (pin.get() as sys::gpio_num_t) < sys::gpio_num_t_GPIO_NUM_MAX
            && self.reservations.reserve(pin)
    }

    fn release(&self, pin: PinNumber) {
        // SAFETY: pin was reserved by this driver, reset only touches its own pad
        let err = unsafe { sys::gpio_reset_pin(pin.get() as sys::gpio_num_t) };
        if err != sys::ESP_OK {
            log::warn!("gpio_reset_pin({}) failed: {}", pin, err);
        }
        self.reservations.release(pin);
    }

    fn configure(&self, pin: PinNumber, pull: PullMode) {
        let conf = sys::gpio_config_t {
            pin_bit_mask: 1u64 << pin.get(),
            mode: sys::gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: if pull.pull_up_enabled() {
                sys::gpio_pullup_t_GPIO_PULLUP_ENABLE
            } else {
                sys::gpio_pullup_t_GPIO_PULLUP_DISABLE
            },
            pull_down_en: if pull.pull_down_enabled() {
                sys::gpio_pulldown_t_GPIO_PULLDOWN_ENABLE
            } else {
                sys::gpio_pulldown_t_GPIO_PULLDOWN_DISABLE
            },
            intr_type: sys::gpio_int_type_t_GPIO_INTR_DISABLE,
            ..Default::default()
        };

        // SAFETY: conf lives across the call, gpio_config copies it
        let err = unsafe { sys::gpio_config(&conf) };
        if err != sys::ESP_OK {
            log::warn!("gpio_config({}) failed: {}", pin, err);
        }
    }

    fn read_level(&self, pin: PinNumber) -> Level {
        // SAFETY: read-only register access
        let raw = unsafe { sys::gpio_get_level(pin.get() as sys::gpio_num_t) };
        Level::from_raw(raw as u32)
    }
}

/// FreeRTOS scheduler tick.
pub struct FreeRtosClock;

impl Clock for FreeRtosClock {
    fn now(&self) -> Tick {
        // SAFETY: always callable from task context
        unsafe { sys::xTaskGetTickCount() }
    }

    fn delay(&self, ticks: Tick) {
        // SAFETY: blocks the calling task only
        unsafe { sys::vTaskDelay(ticks) }
    }
}

/// Hardware RNG.
pub struct EspEntropy;

impl Entropy for EspEntropy {
    fn random_u32(&self) -> u32 {
        // SAFETY: esp_random has no preconditions
        unsafe { sys::esp_random() }
    }
}

/// Event base shared by requests and driver events.
static BUS_BASE: &CStr = c"BTNDRV_EVENT";

/// Ticks a post may wait for room in the loop queue.
const POST_TIMEOUT: sys::TickType_t = 1;

/// One message under [`BUS_BASE`], any event id.
pub struct BusMessage {
    pub event_id: i32,
    pub word: ConfigWord,
}

unsafe impl EspEventSource for BusMessage {
    fn source() -> Option<&'static CStr> {
        Some(BUS_BASE)
    }
}

impl EspEventSerializer for BusMessage {
    type Data<'a> = BusMessage;

    fn serialize<F, R>(data: &Self::Data<'_>, f: F) -> R
    where
        F: FnOnce(&EspEventPostData) -> R,
    {
        // SAFETY: the payload is a plain u32, copied by the loop on post
        f(&unsafe { EspEventPostData::new(BUS_BASE, Some(data.event_id), &data.word.0) })
    }
}

/// Request messages with event id `ID`.
struct Request<const ID: i32>;

unsafe impl<const ID: i32> EspEventSource for Request<ID> {
    fn source() -> Option<&'static CStr> {
        Some(BUS_BASE)
    }

    fn event_id() -> Option<i32> {
        Some(ID)
    }
}

impl<const ID: i32> EspEventDeserializer for Request<ID> {
    type Data<'a> = ConfigWord;

    fn deserialize<'a>(data: &EspEvent<'a>) -> Self::Data<'a> {
        // SAFETY: requests are always posted with a u32 payload
        ConfigWord(*unsafe { data.as_payload::<u32>() })
    }
}

/// Driver traffic on an ESP-IDF event loop.
///
/// Pass `EspSystemEventLoop::take()?` to share the default loop, or a
/// private `EspEventLoop::<User<Background>>` to keep driver traffic off it.
pub struct EspButtonBus<T: EspEventLoopType> {
    event_loop: EspEventLoop<T>,
}

impl<T: EspEventLoopType> EspButtonBus<T> {
    pub fn new(event_loop: EspEventLoop<T>) -> Self {
        Self { event_loop }
    }

    /// Post a raw message under the driver base, e.g. a registration request.
    pub fn post(&self, event_id: i32, word: ConfigWord) -> Result<bool, EspError> {
        self.event_loop
            .post::<BusMessage>(&BusMessage { event_id, word }, POST_TIMEOUT)
    }
}

impl<T: EspEventLoopType> EventSink for EspButtonBus<T>
where
    EspEventLoop<T>: Sync,
{
    fn publish(&self, event: ButtonEvent) -> bool {
        let word = event.payload.word().unwrap_or(ConfigWord(0));
        match self.post(event.kind.id(), word) {
            Ok(posted) => posted,
            Err(err) => {
                log::warn!("posting {:?} failed: {}", event.kind, err);
                false
            }
        }
    }
}

impl<T: EspEventLoopType> RequestBus for EspButtonBus<T> {
    type Subscription = EspSubscription<'static, T>;
    type Error = EspError;

    fn subscribe<F>(&self, event_id: i32, mut handler: F) -> Result<Self::Subscription, EspError>
    where
        F: FnMut(i32, ConfigWord) + Send + 'static,
    {
        match event_id {
            REGISTER_REQUEST_ID => self
                .event_loop
                .subscribe::<Request<REGISTER_REQUEST_ID>, _>(move |word| {
                    handler(REGISTER_REQUEST_ID, word)
                }),
            DEREGISTER_REQUEST_ID => self
                .event_loop
                .subscribe::<Request<DEREGISTER_REQUEST_ID>, _>(move |word| {
                    handler(DEREGISTER_REQUEST_ID, word)
                }),
            _ => Err(EspError::from_infallible::<{ sys::ESP_ERR_INVALID_ARG }>()),
        }
    }
}
