// src/reels/tween.rs
//! Timestamp-driven tweens with a tiny scheduler.
//!
//! Usage sketch:
//! ```ignore
//! use reelspin::reels::tween::*;
//!
//! let mut sched = TweenScheduler::new();
//! sched.schedule(Tween::new(TweenField::ReelPosition(0), 0.0, 12.0, now_ms, 2500.0, Ease::BackOut(0.5)));
//!
//! // each frame
//! for ev in sched.advance(now_ms, &mut state) {
//!     match ev {
//!         TweenEvent::Updated { field, .. } => { /* redraw the reel */ }
//!         TweenEvent::Completed { field, .. } => { /* count it down */ }
//!     }
//! }
//! ```
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ease {
    Linear,
    /// quad-in
    Accelerate,
    /// quad-out
    Decelerate,
    /// Overshoots past the target and settles back; the value scales the overshoot.
    BackOut(f64),
}

impl Ease {
    #[inline(always)]
    pub fn sample(self, t: f64) -> f64 {
        match self {
            Ease::Linear => t,
            Ease::Accelerate => t * t,
            Ease::Decelerate => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::BackOut(amount) => {
                let u = t - 1.0;
                u * u * ((amount + 1.0) * u + amount) + 1.0
            }
        }
    }

    /// Parses the config spelling. `backout_amount` only matters for `backout`.
    pub fn from_name(name: &str, backout_amount: f64) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "linear" => Some(Ease::Linear),
            "accelerate" => Some(Ease::Accelerate),
            "decelerate" => Some(Ease::Decelerate),
            "backout" | "back_out" => Some(Ease::BackOut(backout_amount)),
            _ => None,
        }
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ease::Linear => write!(f, "linear"),
            Ease::Accelerate => write!(f, "accelerate"),
            Ease::Decelerate => write!(f, "decelerate"),
            Ease::BackOut(a) => write!(f, "backout({a})"),
        }
    }
}

/// `t` is not clamped here; callers pass an already clamped phase.
#[inline(always)]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1.0 - t) + b * t
}

/// The closed set of numeric fields a tween may drive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TweenField {
    ReelPosition(usize),
}

/// Anything that owns tweenable fields.
pub trait TweenTarget {
    fn read(&self, field: TweenField) -> f64;
    fn write(&mut self, field: TweenField, value: f64);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

#[derive(Clone, Debug)]
pub struct Tween {
    pub field: TweenField,
    pub from: f64,
    pub to: f64,
    pub start_ms: f64,
    pub duration_ms: f64,
    pub ease: Ease,
}

impl Tween {
    pub fn new(field: TweenField, from: f64, to: f64, start_ms: f64, duration_ms: f64, ease: Ease) -> Self {
        Self { field, from, to, start_ms, duration_ms, ease }
    }

    /// Normalized progress at `now_ms`. Non-positive durations are already done.
    #[inline(always)]
    pub fn phase(&self, now_ms: f64) -> f64 {
        if !(self.duration_ms > 0.0) {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0)
    }

    #[inline(always)]
    pub fn end_ms(&self) -> f64 {
        self.start_ms + self.duration_ms.max(0.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenEvent {
    Updated { id: TweenId, field: TweenField, value: f64 },
    Completed { id: TweenId, field: TweenField },
}

impl TweenEvent {
    pub fn field(&self) -> TweenField {
        match *self {
            TweenEvent::Updated { field, .. } | TweenEvent::Completed { field, .. } => field,
        }
    }
}

struct Active {
    id: TweenId,
    tween: Tween,
}

#[derive(Default)]
pub struct TweenScheduler {
    active: Vec<Active>,
    next_id: u64,
}

impl TweenScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, tween: Tween) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.active.push(Active { id, tween });
        id
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_animating(&self, field: TweenField) -> bool {
        self.active.iter().any(|a| a.tween.field == field)
    }

    pub fn get(&self, id: TweenId) -> Option<&Tween> {
        self.active.iter().find(|a| a.id == id).map(|a| &a.tween)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TweenId, &Tween)> {
        self.active.iter().map(|a| (a.id, &a.tween))
    }

    /// Advance every active tween once, in scheduling order.
    ///
    /// Each tween yields `Updated`, and `Completed` right after it on the frame
    /// it reaches phase 1 (its field is then snapped to `to`). Finished tweens
    /// are dropped only after the whole pass.
    pub fn advance<T: TweenTarget + ?Sized>(&mut self, now_ms: f64, target: &mut T) -> Vec<TweenEvent> {
        let mut events = Vec::with_capacity(self.active.len() + 1);
        let mut finished: Vec<TweenId> = Vec::new();

        for a in &self.active {
            let tw = &a.tween;
            let phase = tw.phase(now_ms);
            let value = lerp(tw.from, tw.to, tw.ease.sample(phase));
            target.write(tw.field, value);
            events.push(TweenEvent::Updated { id: a.id, field: tw.field, value });

            if phase >= 1.0 {
                target.write(tw.field, tw.to);
                events.push(TweenEvent::Completed { id: a.id, field: tw.field });
                finished.push(a.id);
            }
        }

        if !finished.is_empty() {
            self.active.retain(|a| !finished.contains(&a.id));
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Slots(Vec<f64>);

    impl TweenTarget for Slots {
        fn read(&self, field: TweenField) -> f64 {
            let TweenField::ReelPosition(i) = field;
            self.0[i]
        }
        fn write(&mut self, field: TweenField, value: f64) {
            let TweenField::ReelPosition(i) = field;
            self.0[i] = value;
        }
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        assert_eq!(lerp(2.0, 10.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 10.0, 1.0), 10.0);
        assert_eq!(lerp(2.0, 10.0, 0.5), 6.0);
    }

    #[test]
    fn backout_hits_both_ends_and_overshoots() {
        let e = Ease::BackOut(0.5);
        assert_eq!(e.sample(0.0), 0.0);
        assert_eq!(e.sample(1.0), 1.0);
        let peak = (1..100).map(|i| e.sample(i as f64 / 100.0)).fold(f64::MIN, f64::max);
        assert!(peak > 1.0, "expected overshoot, peak was {peak}");
    }

    #[test]
    fn ease_names_parse() {
        assert_eq!(Ease::from_name("BackOut", 0.3), Some(Ease::BackOut(0.3)));
        assert_eq!(Ease::from_name(" linear ", 0.5), Some(Ease::Linear));
        assert_eq!(Ease::from_name("bounce", 0.5), None);
    }

    #[test]
    fn advance_interpolates_and_snaps_to_end() {
        let mut slots = Slots(vec![0.0]);
        let mut sched = TweenScheduler::new();
        sched.schedule(Tween::new(TweenField::ReelPosition(0), 0.0, 10.0, 1000.0, 500.0, Ease::Linear));

        let ev = sched.advance(1250.0, &mut slots);
        assert_eq!(slots.0[0], 5.0);
        assert_eq!(ev.len(), 1);
        assert!(!sched.is_idle());

        let ev = sched.advance(1600.0, &mut slots);
        assert_eq!(slots.0[0], 10.0);
        assert!(matches!(ev[0], TweenEvent::Updated { .. }));
        assert!(matches!(ev[1], TweenEvent::Completed { .. }));
        assert!(sched.is_idle());
    }

    #[test]
    fn end_value_is_exact_under_backout() {
        let mut slots = Slots(vec![0.1]);
        let mut sched = TweenScheduler::new();
        let to = 0.1 + 10.0 + 0.2;
        sched.schedule(Tween::new(TweenField::ReelPosition(0), 0.1, to, 0.0, 2500.0, Ease::BackOut(0.5)));
        sched.advance(2500.0, &mut slots);
        assert_eq!(slots.0[0], to);
    }

    #[test]
    fn zero_duration_completes_on_next_advance() {
        let mut slots = Slots(vec![3.0]);
        let mut sched = TweenScheduler::new();
        sched.schedule(Tween::new(TweenField::ReelPosition(0), 3.0, 7.0, 50.0, 0.0, Ease::Linear));
        sched.schedule(Tween::new(TweenField::ReelPosition(0), 3.0, 7.0, 50.0, -20.0, Ease::Linear));
        let ev = sched.advance(0.0, &mut slots);
        assert_eq!(slots.0[0], 7.0);
        assert_eq!(ev.iter().filter(|e| matches!(e, TweenEvent::Completed { .. })).count(), 2);
        assert!(sched.is_idle());
    }

    #[test]
    fn each_tween_advances_once_per_pass() {
        let mut slots = Slots(vec![0.0, 0.0, 0.0]);
        let mut sched = TweenScheduler::new();
        for i in 0..3 {
            sched.schedule(Tween::new(TweenField::ReelPosition(i), 0.0, 1.0, 0.0, 100.0 * (i + 1) as f64, Ease::Linear));
        }
        let ev = sched.advance(100.0, &mut slots);
        let updates: Vec<_> = ev
            .iter()
            .filter_map(|e| match e {
                TweenEvent::Updated { field, .. } => Some(*field),
                _ => None,
            })
            .collect();
        assert_eq!(
            updates,
            vec![TweenField::ReelPosition(0), TweenField::ReelPosition(1), TweenField::ReelPosition(2)]
        );
        assert_eq!(sched.len(), 2);
        assert!(!sched.is_animating(TweenField::ReelPosition(0)));
        assert!(sched.is_animating(TweenField::ReelPosition(2)));
    }

    #[test]
    fn before_start_stays_at_from() {
        let mut slots = Slots(vec![4.0]);
        let mut sched = TweenScheduler::new();
        sched.schedule(Tween::new(TweenField::ReelPosition(0), 4.0, 8.0, 500.0, 100.0, Ease::Decelerate));
        sched.advance(100.0, &mut slots);
        assert_eq!(slots.read(TweenField::ReelPosition(0)), 4.0);
    }
}
