// src/core/clock.rs
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Instant;

/// One frame's worth of timing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTick {
    /// Milliseconds since the clock started.
    pub now_ms: f64,
    /// Time since the previous tick, clamped.
    pub delta_ms: f64,
    /// Reference frame duration over the unclamped elapsed time; 1.0 when no time passed.
    /// Tweens sample `now_ms` directly, so a stalled frame scales by what actually elapsed.
    pub frame_scale: f64,
}

impl FrameTick {
    pub fn new(now_ms: f64, elapsed_ms: f64, reference_frame_ms: f64, max_delta_ms: f64) -> Self {
        let frame_scale = if elapsed_ms > 0.0 { reference_frame_ms / elapsed_ms } else { 1.0 };
        Self { now_ms, delta_ms: elapsed_ms.clamp(0.0, max_delta_ms), frame_scale }
    }
}

pub trait FrameHandler {
    fn on_frame(&mut self, tick: &FrameTick);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

enum Slot {
    Owned(Box<dyn FrameHandler>),
    Weak(Weak<RefCell<dyn FrameHandler>>),
}

pub struct FrameClock {
    start: Instant,
    last_ms: Option<f64>,
    reference_frame_ms: f64,
    max_delta_ms: f64,
    handlers: Vec<(HandlerId, Slot)>,
    next_id: u64,
}

impl FrameClock {
    pub fn new(reference_frame_ms: f64, max_delta_ms: f64) -> Self {
        Self::starting_at(Instant::now(), reference_frame_ms, max_delta_ms)
    }

    pub fn starting_at(start: Instant, reference_frame_ms: f64, max_delta_ms: f64) -> Self {
        Self { start, last_ms: None, reference_frame_ms, max_delta_ms, handlers: Vec::new(), next_id: 0 }
    }

    fn next_handler_id(&mut self) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn subscribe(&mut self, handler: Box<dyn FrameHandler>) -> HandlerId {
        let id = self.next_handler_id();
        self.handlers.push((id, Slot::Owned(handler)));
        id
    }

    /// Register without taking ownership. Once the owner drops the handler it is skipped and pruned.
    pub fn subscribe_weak<H: FrameHandler + 'static>(&mut self, handler: &Rc<RefCell<H>>) -> HandlerId {
        let id = self.next_handler_id();
        let rc: Rc<RefCell<dyn FrameHandler>> = handler.clone();
        self.handlers.push((id, Slot::Weak(Rc::downgrade(&rc))));
        id
    }

    pub fn unsubscribe(&mut self, id: HandlerId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(h, _)| *h != id);
        self.handlers.len() != before
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Timing for a frame at `now`, without dispatching.
    pub fn tick_at(&mut self, now: Instant) -> FrameTick {
        let now_ms = now.saturating_duration_since(self.start).as_secs_f64() * 1000.0;
        self.tick_ms(now_ms)
    }

    pub fn tick_ms(&mut self, now_ms: f64) -> FrameTick {
        let elapsed_ms = self.last_ms.map_or(0.0, |last| now_ms - last);
        self.last_ms = Some(now_ms);
        FrameTick::new(now_ms, elapsed_ms, self.reference_frame_ms, self.max_delta_ms)
    }

    /// Invoke every live handler once, in registration order.
    pub fn fire(&mut self, tick: &FrameTick) {
        self.handlers.retain(|(_, slot)| match slot {
            Slot::Owned(_) => true,
            Slot::Weak(w) => w.strong_count() > 0,
        });
        for (_, slot) in self.handlers.iter_mut() {
            match slot {
                Slot::Owned(h) => h.on_frame(tick),
                Slot::Weak(w) => {
                    if let Some(h) = w.upgrade() {
                        h.borrow_mut().on_frame(tick);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Default)]
    struct Counter {
        frames: Vec<f64>,
    }

    impl FrameHandler for Counter {
        fn on_frame(&mut self, tick: &FrameTick) {
            self.frames.push(tick.now_ms);
        }
    }

    struct Shared(Rc<RefCell<Vec<&'static str>>>, &'static str);

    impl FrameHandler for Shared {
        fn on_frame(&mut self, _tick: &FrameTick) {
            self.0.borrow_mut().push(self.1);
        }
    }

    #[test]
    fn first_tick_has_unit_scale() {
        let mut clock = FrameClock::new(1000.0 / 60.0, 100.0);
        let t = clock.tick_ms(0.0);
        assert_eq!((t.delta_ms, t.frame_scale), (0.0, 1.0));
    }

    #[test]
    fn scale_follows_delta_and_clamps() {
        let mut clock = FrameClock::new(20.0, 100.0);
        clock.tick_ms(0.0);
        let t = clock.tick_ms(40.0);
        assert_eq!(t.delta_ms, 40.0);
        assert_eq!(t.frame_scale, 0.5);

        let t = clock.tick_ms(1040.0);
        assert_eq!(t.delta_ms, 100.0);
        assert_eq!(t.frame_scale, 0.02);

        let t = clock.tick_ms(1040.0);
        assert_eq!(t.frame_scale, 1.0);

        // Time running backwards counts as no elapsed time.
        let t = clock.tick_ms(1000.0);
        assert_eq!((t.delta_ms, t.frame_scale), (0.0, 1.0));
    }

    #[test]
    fn tick_at_measures_from_start() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start, 16.0, 100.0);
        let t = clock.tick_at(start + Duration::from_millis(250));
        assert!((t.now_ms - 250.0).abs() < 1e-6);
    }

    #[test]
    fn handlers_fire_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut clock = FrameClock::new(16.0, 100.0);
        clock.subscribe(Box::new(Shared(log.clone(), "a")));
        let b = Rc::new(RefCell::new(Shared(log.clone(), "b")));
        clock.subscribe_weak(&b);
        clock.subscribe(Box::new(Shared(log.clone(), "c")));

        let t = clock.tick_ms(0.0);
        clock.fire(&t);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn dropped_weak_handler_is_never_invoked() {
        let mut clock = FrameClock::new(16.0, 100.0);
        let counter = Rc::new(RefCell::new(Counter::default()));
        clock.subscribe_weak(&counter);

        let t = clock.tick_ms(0.0);
        clock.fire(&t);
        assert_eq!(counter.borrow().frames.len(), 1);

        drop(counter);
        let t = clock.tick_ms(16.0);
        clock.fire(&t);
        assert_eq!(clock.handler_count(), 0);
    }

    #[test]
    fn unsubscribe_removes_handler() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut clock = FrameClock::new(16.0, 100.0);
        let id = clock.subscribe(Box::new(Shared(log.clone(), "x")));
        assert!(clock.unsubscribe(id));
        assert!(!clock.unsubscribe(id));
        let t = clock.tick_ms(0.0);
        clock.fire(&t);
        assert!(log.borrow().is_empty());
    }
}
