//! Module: event
//!
//! Purpose: Messages exchanged with the event bus. Output events the driver
//! publishes, input requests it accepts, and the sink port it publishes to.
//!
//! Numeric ids are stable: bus adapters put them on the wire as-is.

use crate::button::{ButtonConfig, ConfigWord, RegisterRequest, Selector};
use crate::error::DriverError;

/// Output event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum EventKind {
    TaskStarted = 0,
    ButtonRegistered = 1,
    ButtonDeregistered = 2,
    ButtonPress = 3,
    ButtonRelease = 4,
    RegistrationFailed = 7,
    DeregistrationFailed = 8,
    Click = 9,
    DoubleClick = 10,
    TripleClick = 11,
    LongClick = 12,
    VeryLongClick = 13,
    MultiClick = 14,
    Hold = 15,
}

impl EventKind {
    #[inline]
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Click pattern for a flushed click count. `None` for zero.
    pub fn from_clicks(clicks: u8) -> Option<Self> {
        match clicks {
            0 => None,
            1 => Some(EventKind::Click),
            2 => Some(EventKind::DoubleClick),
            3 => Some(EventKind::TripleClick),
            _ => Some(EventKind::MultiClick),
        }
    }
}

/// Bus event id of a registration request.
pub const REGISTER_REQUEST_ID: i32 = 5;

/// Bus event id of a deregistration request.
pub const DEREGISTER_REQUEST_ID: i32 = 6;

/// What an event carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPayload {
    None,
    /// Full config of the button concerned.
    Button(ButtonConfig),
    /// Registration request echoed back on failure.
    Request(RegisterRequest),
    /// Deregistration selector echoed back on failure.
    Selector(Selector),
}

impl EventPayload {
    /// Packed wire word, `None` for empty payloads.
    pub fn word(&self) -> Option<ConfigWord> {
        match self {
            EventPayload::None => None,
            EventPayload::Button(config) => Some(config.to_word()),
            EventPayload::Request(request) => Some(request.to_word()),
            EventPayload::Selector(selector) => Some(selector.to_word()),
        }
    }
}

/// One published event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub kind: EventKind,
    pub payload: EventPayload,
    /// Set on failure events only.
    pub reason: Option<DriverError>,
}

impl ButtonEvent {
    /// Placeholder for empty ring slots.
    pub const EMPTY: Self = Self {
        kind: EventKind::TaskStarted,
        payload: EventPayload::None,
        reason: None,
    };

    pub const fn task_started() -> Self {
        Self::EMPTY
    }

    /// Event about a registered button.
    pub const fn button(kind: EventKind, config: ButtonConfig) -> Self {
        Self {
            kind,
            payload: EventPayload::Button(config),
            reason: None,
        }
    }

    pub const fn registration_failed(request: RegisterRequest, reason: DriverError) -> Self {
        Self {
            kind: EventKind::RegistrationFailed,
            payload: EventPayload::Request(request),
            reason: Some(reason),
        }
    }

    pub const fn deregistration_failed(selector: Selector, reason: DriverError) -> Self {
        Self {
            kind: EventKind::DeregistrationFailed,
            payload: EventPayload::Selector(selector),
            reason: Some(reason),
        }
    }

    /// Button config, if this event is about a registered button.
    pub fn config(&self) -> Option<&ButtonConfig> {
        match &self.payload {
            EventPayload::Button(config) => Some(config),
            _ => None,
        }
    }
}

/// Request accepted from the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverRequest {
    Register(RegisterRequest),
    Deregister(Selector),
}

impl DriverRequest {
    /// Decode a raw bus message.
    pub fn from_raw(event_id: i32, word: ConfigWord) -> Result<Self, DriverError> {
        match event_id {
            REGISTER_REQUEST_ID => RegisterRequest::from_word(word).map(DriverRequest::Register),
            DEREGISTER_REQUEST_ID => Selector::from_word(word).map(DriverRequest::Deregister),
            _ => Err(DriverError::InvalidPayload),
        }
    }
}

/// Outbound side of the event bus.
pub trait EventSink: Sync {
    /// Hand an event to the transport. `false` if it was dropped.
    fn publish(&self, event: ButtonEvent) -> bool;
}

impl<T: EventSink + ?Sized> EventSink for &T {
    #[inline]
    fn publish(&self, event: ButtonEvent) -> bool {
        (**self).publish(event)
    }
}

/// Fan-out: every event goes to both sinks. Accepted only if both took it.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn publish(&self, event: ButtonEvent) -> bool {
        let first = self.0.publish(event);
        let second = self.1.publish(event);
        first && second
    }
}

/// Inbound side of the event bus.
///
/// Handlers receive the event id and the packed payload word of every
/// message posted under the id they subscribed to.
pub trait RequestBus {
    /// Keeps the handler registered while alive.
    type Subscription;
    type Error;

    fn subscribe<F>(&self, event_id: i32, handler: F) -> Result<Self::Subscription, Self::Error>
    where
        F: FnMut(i32, ConfigWord) + Send + 'static;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{Level, PinNumber, PullMode};

    #[test]
    fn test_click_pattern_mapping() {
        assert_eq!(EventKind::from_clicks(0), None);
        assert_eq!(EventKind::from_clicks(1), Some(EventKind::Click));
        assert_eq!(EventKind::from_clicks(2), Some(EventKind::DoubleClick));
        assert_eq!(EventKind::from_clicks(3), Some(EventKind::TripleClick));
        assert_eq!(EventKind::from_clicks(4), Some(EventKind::MultiClick));
        assert_eq!(EventKind::from_clicks(7), Some(EventKind::MultiClick));
    }

    #[test]
    fn test_event_ids_stable() {
        assert_eq!(EventKind::TaskStarted.id(), 0);
        assert_eq!(EventKind::ButtonRelease.id(), 4);
        assert_eq!(EventKind::RegistrationFailed.id(), 7);
        assert_eq!(EventKind::Hold.id(), 15);
    }

    #[test]
    fn test_request_from_raw() {
        let pin = PinNumber::new(12).unwrap();
        let request = RegisterRequest::new(pin, Level::High, PullMode::PullUp).with_id(0x55);

        let decoded = DriverRequest::from_raw(REGISTER_REQUEST_ID, request.to_word());
        assert_eq!(decoded, Ok(DriverRequest::Register(request)));

        let selector = Selector::by_pin(pin);
        let decoded = DriverRequest::from_raw(DEREGISTER_REQUEST_ID, selector.to_word());
        assert_eq!(decoded, Ok(DriverRequest::Deregister(selector)));

        let bad = DriverRequest::from_raw(EventKind::Click.id(), request.to_word());
        assert_eq!(bad, Err(DriverError::InvalidPayload));
    }

    struct Refuse;

    impl EventSink for Refuse {
        fn publish(&self, _event: ButtonEvent) -> bool {
            false
        }
    }

    #[test]
    fn test_fan_out_reaches_both_sinks() {
        let local = crate::stream::EventStream::<8>::new();
        let sinks = (&local, Refuse);

        assert!(!sinks.publish(ButtonEvent::task_started()));
        assert_eq!(local.write_head(), 1);

        let both = (&local, &local);
        assert!(both.publish(ButtonEvent::task_started()));
        assert_eq!(local.write_head(), 3);
    }

    #[test]
    fn test_failure_event_keeps_request() {
        let request = RegisterRequest::new(PinNumber::new(3).unwrap(), Level::Low, PullMode::PullDown);
        let event = ButtonEvent::registration_failed(request, DriverError::PinUnavailable);

        assert_eq!(event.payload, EventPayload::Request(request));
        assert_eq!(event.reason, Some(DriverError::PinUnavailable));
        assert!(event.config().is_none());
        assert_eq!(event.payload.word(), Some(request.to_word()));
    }
}
