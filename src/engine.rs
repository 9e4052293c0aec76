//! Per-button debounce and classification state machine.
//!
//! Pure logic, no hardware dependencies. Consumes one level reading per
//! tick, produces button events. Fully testable on host.
//!
//! # Classification
//!
//! - Release after more than `very_long_click`: **very long click**, immediately
//! - Release after more than `long_click`: **long click**, immediately
//! - Shorter release: counted, flushed as click/double/triple/multi once the
//!   line has been quiet for `click_timeout`
//! - Still pressed after `hold`: **hold**, repeated every `hold` ticks

use crate::button::{ButtonConfig, ButtonRuntimeState, Level, MAX_CLICKS};
use crate::config::Timings;
use crate::event::EventKind;
use crate::hal::clock::{elapsed, Tick};
use crate::hal::gpio::GpioProvider;

/// Outcome of one sampler pass over a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Not yet seen at idle level; pin reconfigured and re-read.
    Waiting,
    /// Seen at idle level on this pass, monitored from the next one.
    BecameReady,
    /// Monitored normally.
    Active,
}

/// A registered button: fixed config plus sampler-owned state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonNode {
    config: ButtonConfig,
    state: ButtonRuntimeState,
}

impl ButtonNode {
    /// Fresh node with all-zero runtime state.
    pub fn new(config: ButtonConfig) -> Self {
        Self {
            config,
            state: ButtonRuntimeState::default(),
        }
    }

    #[inline]
    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    #[inline]
    pub fn state(&self) -> &ButtonRuntimeState {
        &self.state
    }

    /// True while the debounced level differs from idle.
    #[inline]
    pub fn is_actuated(&self) -> bool {
        self.state.ready && self.state.last_level != self.config.idle_level
    }

    /// One sampler pass: bootstrap the pin or run the state machine.
    pub fn sample<G, F>(
        &mut self,
        gpio: &G,
        now: Tick,
        timings: &Timings,
        extended_info: bool,
        emit: F,
    ) -> Step
    where
        G: GpioProvider + ?Sized,
        F: FnMut(EventKind),
    {
        if !self.state.ready {
            gpio.configure(self.config.pin, self.config.pull);
            let level = gpio.read_level(self.config.pin);
            return if self.bootstrap(level) {
                Step::BecameReady
            } else {
                Step::Waiting
            };
        }

        let level = gpio.read_level(self.config.pin);
        self.step(now, level, timings, extended_info, emit);
        Step::Active
    }

    /// Record the bootstrap reading. Ready only if it equals the idle level.
    pub fn bootstrap(&mut self, level: Level) -> bool {
        self.state.last_level = level;
        self.state.ready = level == self.config.idle_level;
        self.state.ready
    }

    /// Advance the state machine with a reading taken at `now`.
    pub fn step<F>(
        &mut self,
        now: Tick,
        level: Level,
        timings: &Timings,
        extended_info: bool,
        mut emit: F,
    ) where
        F: FnMut(EventKind),
    {
        let idle = self.config.idle_level;
        let state = &mut self.state;

        let changed = level != state.last_level;
        if changed && elapsed(now, state.last_change_tick) >= timings.debounce {
            state.last_level = level;
            state.last_change_tick = now;

            if level == idle {
                if extended_info {
                    emit(EventKind::ButtonRelease);
                }

                state.release_tick = now;
                let held = elapsed(state.release_tick, state.press_tick);
                if held > timings.very_long_click {
                    emit(EventKind::VeryLongClick);
                } else if held > timings.long_click {
                    emit(EventKind::LongClick);
                } else if state.click_count < MAX_CLICKS {
                    state.click_count += 1;
                }
                state.press_tick = 0;
            } else {
                if extended_info {
                    emit(EventKind::ButtonPress);
                }

                state.press_tick = now;
                state.release_tick = 0;
            }
        } else if state.last_level != idle && elapsed(now, state.press_tick) > timings.hold {
            emit(EventKind::Hold);
            state.press_tick = now;
        }

        if state.click_count > 0 && elapsed(now, state.last_change_tick) > timings.click_timeout {
            if let Some(kind) = EventKind::from_clicks(state.click_count) {
                emit(kind);
            }
            state.click_count = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::button::{ButtonId, PinNumber, PullMode};
    use crate::hal::sim::SimGpio;

    const T: Timings = Timings {
        debounce: 5,
        long_click: 100,
        very_long_click: 300,
        hold: 500,
        click_timeout: 40,
    };

    fn node(idle_level: Level) -> ButtonNode {
        ButtonNode::new(ButtonConfig {
            pin: PinNumber::new(4).unwrap(),
            id: ButtonId::new(1).unwrap(),
            idle_level,
            pull: PullMode::PullUp,
        })
    }

    /// Node already bootstrapped at idle (active-low button).
    fn ready_node() -> ButtonNode {
        let mut n = node(Level::High);
        assert!(n.bootstrap(Level::High));
        n
    }

    fn step(n: &mut ButtonNode, now: Tick, level: Level) -> Vec<EventKind> {
        let mut events = Vec::new();
        n.step(now, level, &T, false, |e| events.push(e));
        events
    }

    #[test]
    fn test_bootstrap_requires_idle() {
        let mut n = node(Level::High);

        assert!(!n.bootstrap(Level::Low));
        assert!(!n.state().ready);

        assert!(n.bootstrap(Level::High));
        assert!(n.state().ready);
    }

    #[test]
    fn test_sample_reconfigures_until_ready() {
        let gpio = SimGpio::new();
        let pin = PinNumber::new(4).unwrap();
        let mut n = node(Level::High);

        // stuck pressed at boot
        gpio.set_level(pin, Level::Low);
        for now in 0..3 {
            let result = n.sample(&gpio, now, &T, false, |_| panic!("no events while waiting"));
            assert_eq!(result, Step::Waiting);
        }
        assert_eq!(gpio.configure_calls(), 3);
        assert_eq!(gpio.pull(pin), Some(PullMode::PullUp));

        gpio.set_level(pin, Level::High);
        assert_eq!(n.sample(&gpio, 3, &T, false, |_| {}), Step::BecameReady);
        assert_eq!(n.sample(&gpio, 4, &T, false, |_| {}), Step::Active);
        assert_eq!(gpio.configure_calls(), 4);
    }

    #[test]
    fn test_press_sets_press_tick() {
        let mut n = ready_node();

        assert!(step(&mut n, 1000, Level::Low).is_empty());
        assert_eq!(n.state().press_tick, 1000);
        assert_eq!(n.state().release_tick, 0);
        assert_eq!(n.state().last_change_tick, 1000);
        assert!(n.is_actuated());
    }

    #[test]
    fn test_bounce_inside_window_ignored() {
        let mut n = ready_node();

        step(&mut n, 1000, Level::Low);
        // release bounce 2 ticks later
        assert!(step(&mut n, 1002, Level::High).is_empty());
        assert_eq!(n.state().last_level, Level::Low);
        assert_eq!(n.state().click_count, 0);
        assert_eq!(n.state().last_change_tick, 1000);

        // exactly at the window edge the change is accepted
        step(&mut n, 1005, Level::High);
        assert_eq!(n.state().last_level, Level::High);
        assert_eq!(n.state().click_count, 1);
    }

    #[test]
    fn test_short_click_counts() {
        let mut n = ready_node();

        step(&mut n, 1000, Level::Low);
        let events = step(&mut n, 1050, Level::High);

        assert!(events.is_empty());
        assert_eq!(n.state().click_count, 1);
        assert_eq!(n.state().press_tick, 0);
        assert_eq!(n.state().release_tick, 1050);
    }

    #[test]
    fn test_click_flushed_after_quiet_timeout() {
        let mut n = ready_node();

        step(&mut n, 1000, Level::Low);
        step(&mut n, 1050, Level::High);

        // at the timeout: not yet
        assert!(step(&mut n, 1090, Level::High).is_empty());
        assert_eq!(step(&mut n, 1091, Level::High), [EventKind::Click]);
        assert_eq!(n.state().click_count, 0);
        assert!(step(&mut n, 1200, Level::High).is_empty());
    }

    #[test]
    fn test_double_and_triple_click() {
        let mut n = ready_node();

        for i in 0..2 {
            step(&mut n, 1000 + i * 20, Level::Low);
            step(&mut n, 1010 + i * 20, Level::High);
        }
        assert_eq!(step(&mut n, 1100, Level::High), [EventKind::DoubleClick]);

        for i in 0..3 {
            step(&mut n, 2000 + i * 20, Level::Low);
            step(&mut n, 2010 + i * 20, Level::High);
        }
        assert_eq!(step(&mut n, 2100, Level::High), [EventKind::TripleClick]);
    }

    #[test]
    fn test_click_count_saturates() {
        let mut n = ready_node();

        for i in 0..6 {
            step(&mut n, 1000 + i * 20, Level::Low);
            step(&mut n, 1010 + i * 20, Level::High);
        }
        assert_eq!(n.state().click_count, MAX_CLICKS);
        assert_eq!(step(&mut n, 1300, Level::High), [EventKind::MultiClick]);
        assert_eq!(n.state().click_count, 0);
    }

    #[test]
    fn test_long_click() {
        let mut n = ready_node();

        step(&mut n, 1000, Level::Low);
        assert_eq!(step(&mut n, 1150, Level::High), [EventKind::LongClick]);
        assert_eq!(n.state().click_count, 0);
        assert_eq!(n.state().press_tick, 0);
    }

    #[test]
    fn test_very_long_click_wins_over_long() {
        let mut n = ready_node();

        step(&mut n, 1000, Level::Low);
        assert_eq!(step(&mut n, 1400, Level::High), [EventKind::VeryLongClick]);
        assert_eq!(n.state().click_count, 0);
    }

    #[test]
    fn test_hold_repeats() {
        let mut n = ready_node();
        let mut holds = Vec::new();

        step(&mut n, 1000, Level::Low);
        for now in 1001..=2600 {
            for e in step(&mut n, now, Level::Low) {
                holds.push((now, e));
            }
        }

        let expected: [(Tick, EventKind); 3] = [
            (1501, EventKind::Hold),
            (2002, EventKind::Hold),
            (2503, EventKind::Hold),
        ];
        assert_eq!(holds, expected);
    }

    #[test]
    fn test_no_hold_while_idle() {
        let mut n = ready_node();
        assert!(step(&mut n, 10_000, Level::High).is_empty());
    }

    #[test]
    fn test_extended_info_precedes_classification() {
        let mut n = ready_node();
        let mut events = Vec::new();

        n.step(1000, Level::Low, &T, true, |e| events.push(e));
        n.step(1150, Level::High, &T, true, |e| events.push(e));

        assert_eq!(
            events,
            [EventKind::ButtonPress, EventKind::ButtonRelease, EventKind::LongClick]
        );
    }

    #[test]
    fn test_active_high_button() {
        let mut n = node(Level::Low);
        assert!(n.bootstrap(Level::Low));

        step(&mut n, 1000, Level::High);
        assert!(n.is_actuated());
        step(&mut n, 1020, Level::Low);
        assert_eq!(n.state().click_count, 1);
    }

    #[test]
    fn test_tick_wraparound() {
        let mut n = ready_node();
        let start = u32::MAX - 10;

        // last_change_tick is 0, elapsed from it wraps but stays large
        step(&mut n, start, Level::Low);
        assert_eq!(n.state().press_tick, start);

        // 150 ticks later, across the wrap
        let release = start.wrapping_add(150);
        assert_eq!(step(&mut n, release, Level::High), [EventKind::LongClick]);
    }
}
