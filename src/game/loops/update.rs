//! Fixed-rate simulation loop.

use std::sync::Arc;

use log::{debug, info};

use crate::engine::input::{EventSource, InputEvent, InputHandler};
use crate::engine::time::{Clock, RateCounter};
use crate::game::state::SharedState;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

/// Schedules ticks against cumulative expected time rather than a fixed
/// per-tick delay, so one slow tick is made up by shorter sleeps afterwards.
#[derive(Debug)]
pub struct TickScheduler {
    updates_per_second: u32,
    update_num: u64,
    start_ms: u64,
    delay_ms: i64,
}

impl TickScheduler {
    pub fn new(updates_per_second: u32) -> Self {
        Self {
            updates_per_second: updates_per_second.max(1),
            update_num: 0,
            start_ms: 0,
            delay_ms: -1,
        }
    }

    /// Delay computed after the previous tick. Non-positive means the next
    /// tick starts a fresh schedule.
    pub fn delay_ms(&self) -> i64 {
        self.delay_ms
    }

    pub fn update_num(&self) -> u64 {
        self.update_num
    }

    pub fn reset(&mut self, now_ms: u64) {
        self.update_num = 0;
        self.start_ms = now_ms;
    }

    /// Counts a finished tick and computes the delay before the next one.
    pub fn complete_tick(&mut self, now_ms: u64) -> i64 {
        self.update_num += 1;
        let expected = (1000 * self.update_num / self.updates_per_second as u64) as i64;
        let elapsed = now_ms.saturating_sub(self.start_ms) as i64;
        self.delay_ms = expected - elapsed;
        self.delay_ms
    }
}

pub struct UpdateLoop<K: Clock> {
    clock: K,
    scheduler: TickScheduler,
    rate: RateCounter,
}

impl<K: Clock> UpdateLoop<K> {
    pub fn new(clock: K, updates_per_second: u32) -> Self {
        Self {
            clock,
            scheduler: TickScheduler::new(updates_per_second),
            rate: RateCounter::new(),
        }
    }

    /// Runs `tick` at the target rate until it returns [`TickOutcome::Quit`].
    /// Returns the number of ticks run, including the quitting one.
    pub fn run(&mut self, mut tick: impl FnMut() -> TickOutcome) -> u64 {
        let mut ticks = 0;
        loop {
            let delay = self.scheduler.delay_ms();
            if delay <= 0 {
                // Missed the deadline or first tick: start a new schedule.
                self.scheduler.reset(self.clock.now_ms());
            } else {
                self.clock.sleep_ms(delay as u64);
            }

            ticks += 1;
            if tick() == TickOutcome::Quit {
                return ticks;
            }

            let now = self.clock.now_ms();
            self.scheduler.complete_tick(now);
            if let Some(ups) = self.rate.record(now) {
                debug!("Updates per second: {ups}");
            }
        }
    }
}

/// One update tick: drains input and moves shapes in the shared state.
pub struct Simulation {
    input: InputHandler,
    state: Arc<SharedState>,
    events: Vec<InputEvent>,
}

impl Simulation {
    pub fn new(state: Arc<SharedState>) -> Self {
        Self {
            input: InputHandler::new(),
            state,
            events: Vec::new(),
        }
    }

    pub fn update(&mut self, source: &mut impl EventSource) -> TickOutcome {
        if self.state.shutdown_requested() {
            return TickOutcome::Quit;
        }

        source.drain(&mut self.events);
        for event in self.events.drain(..) {
            match event {
                InputEvent::Quit => {
                    info!("Quit requested");
                    return TickOutcome::Quit;
                }
                InputEvent::Key { code, pressed } => {
                    self.input.handle_keyboard_input_event(code, pressed);
                }
                InputEvent::Resized(size) => {
                    debug!("Window resized to {}x{}", size.width, size.height);
                    self.state.set_window_size(size);
                }
                InputEvent::Focused(focused) => {
                    self.input.handle_window_focus(focused);
                }
            }
        }

        self.input.apply_movement(&self.state);
        TickOutcome::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use proptest::prelude::*;
    use winit::dpi::PhysicalSize;
    use winit::keyboard::KeyCode;

    use crate::engine::time::ManualClock;
    use crate::game::config::AppConfig;
    use crate::game::state::{Position, Shape};

    /// Hands out one scripted batch of events per tick.
    #[derive(Default)]
    struct ScriptedEvents {
        batches: VecDeque<Vec<InputEvent>>,
        drained: usize,
    }

    impl ScriptedEvents {
        fn new(batches: Vec<Vec<InputEvent>>) -> Self {
            Self {
                batches: batches.into(),
                drained: 0,
            }
        }
    }

    impl EventSource for ScriptedEvents {
        fn drain(&mut self, out: &mut Vec<InputEvent>) {
            self.drained += 1;
            if let Some(batch) = self.batches.pop_front() {
                out.extend(batch);
            }
        }
    }

    fn state() -> Arc<SharedState> {
        Arc::new(SharedState::new(&AppConfig::default()))
    }

    fn press(code: KeyCode) -> InputEvent {
        InputEvent::Key { code, pressed: true }
    }

    /// Runs 100 ticks, sleeping `work(k)` inside tick k, and returns the time
    /// each tick started.
    fn tick_starts(work: impl Fn(u64) -> u64) -> Vec<u64> {
        let clock = ManualClock::new(5_000);
        let starts = RefCell::new(Vec::new());
        let mut update_loop = UpdateLoop::new(&clock, 48);
        update_loop.run(|| {
            let k = starts.borrow().len() as u64 + 1;
            starts.borrow_mut().push(clock.now_ms());
            clock.advance(work(k));
            if k == 100 {
                TickOutcome::Quit
            } else {
                TickOutcome::Continue
            }
        });
        starts.into_inner()
    }

    #[test]
    fn ticks_follow_cumulative_schedule() {
        let starts = tick_starts(|_| 3);
        for (i, start) in starts.iter().enumerate() {
            assert_eq!(*start, 5_000 + 1000 * i as u64 / 48, "tick {}", i + 1);
        }
    }

    #[test]
    fn slow_tick_within_budget_is_absorbed() {
        let starts = tick_starts(|k| if k == 10 { 15 } else { 1 });
        for (i, start) in starts.iter().enumerate() {
            assert_eq!(*start, 5_000 + 1000 * i as u64 / 48, "tick {}", i + 1);
        }
        assert_eq!(starts.len(), 100);
    }

    #[test]
    fn overlong_tick_resets_the_baseline() {
        let starts = tick_starts(|k| if k == 10 { 100 } else { 0 });
        // Tick 10 starts at 5000 + 187 and finishes 100ms later, past its slot.
        let baseline = 5_000 + 1000 * 9 / 48 + 100;
        assert_eq!(starts[10], baseline);
        for (j, start) in starts[10..].iter().enumerate() {
            assert_eq!(*start, baseline + 1000 * j as u64 / 48, "tick {}", j + 11);
        }
    }

    #[test]
    fn scheduler_delay_converges_to_target_rate() {
        let mut scheduler = TickScheduler::new(48);
        scheduler.reset(0);
        assert_eq!(scheduler.complete_tick(0), 20);
        assert_eq!(scheduler.complete_tick(20), 21);
        assert_eq!(scheduler.complete_tick(83), -21);
        assert_eq!(scheduler.update_num(), 3);
    }

    #[test]
    fn quit_stops_before_any_further_tick() {
        let clock = ManualClock::default();
        let state = state();
        let mut sim = Simulation::new(Arc::clone(&state));
        let mut events = ScriptedEvents::new(vec![
            vec![press(KeyCode::ArrowUp)],
            vec![],
            vec![InputEvent::Quit, press(KeyCode::ArrowDown)],
            vec![],
        ]);

        let ticks = UpdateLoop::new(&clock, 48).run(|| sim.update(&mut events));

        assert_eq!(ticks, 3);
        assert_eq!(events.drained, 3);
        // Two movement ticks; the quitting tick applies none.
        assert_eq!(state.position(Shape::Dot).load(), Position::new(180, 178));
    }

    #[test]
    fn shutdown_flag_ends_the_loop() {
        let clock = ManualClock::default();
        let state = state();
        let mut sim = Simulation::new(Arc::clone(&state));
        let mut events = ScriptedEvents::default();
        let mut count = 0;

        let ticks = UpdateLoop::new(&clock, 48).run(|| {
            count += 1;
            if count == 4 {
                state.request_shutdown();
            }
            sim.update(&mut events)
        });

        assert_eq!(ticks, 4);
        assert_eq!(events.drained, 3);
    }

    #[test]
    fn resize_events_publish_window_size() {
        let state = state();
        let mut sim = Simulation::new(Arc::clone(&state));
        let mut events = ScriptedEvents::new(vec![vec![InputEvent::Resized(PhysicalSize::new(800, 400))]]);
        assert_eq!(sim.update(&mut events), TickOutcome::Continue);
        assert_eq!(state.window_size(), PhysicalSize::new(800, 400));
    }

    #[test]
    fn held_key_keeps_moving_every_tick() {
        let state = state();
        let mut sim = Simulation::new(Arc::clone(&state));
        let mut events = ScriptedEvents::new(vec![vec![press(KeyCode::KeyF)]]);
        for _ in 0..5 {
            sim.update(&mut events);
        }
        assert_eq!(state.position(Shape::Ring2).load(), Position::new(135, 130));
    }

    proptest! {
        #[test]
        fn holding_up_moves_exactly_one_unit_per_tick(
            ticks in 0usize..500,
            start_y in -1_000_000i32..1_000_000,
        ) {
            let config = AppConfig {
                ring1_start: Position::new(0, start_y),
                ..AppConfig::default()
            };
            let state = Arc::new(SharedState::new(&config));
            let mut sim = Simulation::new(Arc::clone(&state));
            let mut events = ScriptedEvents::new(vec![vec![press(KeyCode::KeyI)]]);
            for _ in 0..ticks {
                sim.update(&mut events);
            }
            let position = state.position(Shape::Ring1).load();
            prop_assert_eq!(position, Position::new(0, start_y - ticks as i32));
        }
    }
}
