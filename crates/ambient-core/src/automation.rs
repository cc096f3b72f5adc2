//! Sample-accurate parameter automation.
//!
//! `ParamTimeline` models an automatable parameter the way WebAudio's
//! `AudioParam` does: a sorted list of events where a ramp event describes how
//! the value travels from the previous event up to the ramp's own time. The
//! software renderer evaluates one of these per gain stage per sample.

#[derive(Clone, Copy, Debug, PartialEq)]
enum Curve {
    Set,
    Linear,
    Exponential,
}

#[derive(Clone, Copy, Debug)]
struct ParamEvent {
    time: f64,
    value: f32,
    curve: Curve,
}

#[derive(Clone, Debug)]
pub struct ParamTimeline {
    default_value: f32,
    events: Vec<ParamEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent {
            time,
            value,
            curve: Curve::Set,
        });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent {
            time,
            value,
            curve: Curve::Linear,
        });
    }

    /// Exponential ramps only move between two values of the same sign; an
    /// endpoint at zero holds the previous value until the ramp's time.
    pub fn exponential_ramp_to_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(ParamEvent {
            time,
            value,
            curve: Curve::Exponential,
        });
    }

    /// Drop every event scheduled at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.events.retain(|e| e.time < from);
    }

    /// Forget events that can no longer influence values at or after `t`.
    pub fn prune_before(&mut self, t: f64) {
        let idx = self.events.partition_point(|e| e.time <= t);
        if idx > 1 {
            self.events.drain(..idx - 1);
        }
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    pub fn value_at(&self, t: f64) -> f32 {
        let idx = self.events.partition_point(|e| e.time <= t);
        let (t0, v0) = match idx.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => (t.min(0.0), self.default_value),
        };
        let Some(next) = self.events.get(idx) else {
            return v0;
        };
        let span = next.time - t0;
        if span <= 0.0 {
            return v0;
        }
        let frac = ((t - t0) / span) as f32;
        match next.curve {
            Curve::Set => v0,
            Curve::Linear => v0 + (next.value - v0) * frac,
            Curve::Exponential => {
                if v0 * next.value > 0.0 {
                    v0 * (next.value / v0).powf(frac)
                } else {
                    v0
                }
            }
        }
    }

    // Events at equal times keep insertion order.
    fn insert(&mut self, event: ParamEvent) {
        let idx = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(idx, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn holds_default_without_events() {
        let p = ParamTimeline::new(0.7);
        assert!(close(p.value_at(0.0), 0.7));
        assert!(close(p.value_at(100.0), 0.7));
    }

    #[test]
    fn linear_ramp_interpolates_from_previous_event() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.0, 1.0);
        p.linear_ramp_to_value_at_time(0.5, 2.0);
        assert!(close(p.value_at(0.5), 0.0));
        assert!(close(p.value_at(1.5), 0.25));
        assert!(close(p.value_at(2.0), 0.5));
        assert!(close(p.value_at(9.0), 0.5));
    }

    #[test]
    fn exponential_ramp_is_geometric() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.1, 0.0);
        p.exponential_ramp_to_value_at_time(0.001, 4.0);
        assert!(close(p.value_at(2.0), 0.01));
        assert!(close(p.value_at(4.0), 0.001));
    }

    #[test]
    fn exponential_ramp_from_zero_holds() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.0, 0.0);
        p.exponential_ramp_to_value_at_time(1.0, 1.0);
        assert!(close(p.value_at(0.5), 0.0));
        assert!(close(p.value_at(1.0), 1.0));
    }

    #[test]
    fn envelope_attack_then_release() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.0, 10.0);
        p.linear_ramp_to_value_at_time(0.1, 12.0);
        p.exponential_ramp_to_value_at_time(0.001, 16.0);
        assert!(close(p.value_at(11.0), 0.05));
        assert!(close(p.value_at(12.0), 0.1));
        assert!(p.value_at(14.0) < 0.1 && p.value_at(14.0) > 0.001);
        assert!(close(p.value_at(16.0), 0.001));
    }

    #[test]
    fn cancel_removes_future_ramp_and_holds_last_value() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.0, 0.0);
        p.linear_ramp_to_value_at_time(1.0, 10.0);
        p.cancel_scheduled_values(5.0);
        // Without a pinned value the param falls back to the last surviving event.
        assert!(close(p.value_at(6.0), 0.0));
        assert_eq!(p.pending_events(), 1);
    }

    #[test]
    fn prune_keeps_values_from_now_on() {
        let mut p = ParamTimeline::new(0.0);
        p.set_value_at_time(0.2, 0.0);
        p.linear_ramp_to_value_at_time(0.4, 1.0);
        p.set_value_at_time(0.4, 2.0);
        p.linear_ramp_to_value_at_time(0.8, 4.0);
        let before = p.value_at(3.0);
        p.prune_before(3.0);
        assert_eq!(p.pending_events(), 2);
        assert!(close(p.value_at(3.0), before));
        assert!(close(p.value_at(4.0), 0.8));
    }

    #[test]
    fn equal_times_keep_insertion_order() {
        let mut p = ParamTimeline::new(0.0);
        p.linear_ramp_to_value_at_time(0.5, 1.0);
        p.set_value_at_time(0.9, 1.0);
        assert!(close(p.value_at(1.0), 0.9));
    }
}
