//! Highlight Sequencer
//!
//! Step-driven autoplay state machine for unattended display. Walks the
//! source nodes of the current field pair, then switches to the next
//! target field; once every target field has been shown for a source
//! field, rotates to the next source field.
//!
//! **State flow:**
//! ```text
//! Idle ──start──▶ CyclingSource ──last index──▶ CyclingTarget ─┐
//!                   ▲      │                    (next target)   │
//!                   │      └──last target──▶ SwappingFieldPair ─┤
//!                   │                        (next source)      │
//!                   └────────────── dwell ──────────────────────┘
//! any cycling state ──pause──▶ Paused ──resume──▶ captured state
//! ```
//!
//! The machine holds no clock. Every operation returns a `Step` naming
//! what to show and how long to dwell; `DwellScheduler` turns that dwell
//! into a tick which the owner feeds back via `on_dwell_expired`.

mod scheduler;

pub use scheduler::{DwellScheduler, DwellTick};

use crate::aggregate::FieldPair;
use flowviz_common::events::{HighlightCursor, SequencerState, Side};
use std::time::Duration;
use tracing::debug;

/// Shortest dwell the schedule will produce
pub const MIN_DWELL: Duration = Duration::from_millis(100);

/// Dwell durations derived from the single autoplay speed
///
/// `category_step < target_switch < pair_swap`, so a full rotation scales
/// linearly with the configured speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellSchedule {
    /// Hold on one highlighted node
    pub category_step: Duration,
    /// Full view while switching target field
    pub target_switch: Duration,
    /// Full view while rotating source field
    pub pair_swap: Duration,
}

impl DwellSchedule {
    pub fn from_speed(speed: Duration) -> Self {
        Self {
            category_step: (speed / 2).max(MIN_DWELL),
            target_switch: (speed * 3 / 4).max(MIN_DWELL),
            pair_swap: speed.max(MIN_DWELL),
        }
    }

    /// Dwell for a state, None when the state has no timer
    pub fn for_state(&self, state: SequencerState) -> Option<Duration> {
        match state {
            SequencerState::CyclingSource => Some(self.category_step),
            SequencerState::CyclingTarget => Some(self.target_switch),
            SequencerState::SwappingFieldPair => Some(self.pair_swap),
            SequencerState::Idle | SequencerState::Paused => None,
        }
    }
}

/// Outcome of one sequencer operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Node to emphasize; None shows the full, unhighlighted view
    pub focus: Option<HighlightCursor>,
    /// Time until the next `on_dwell_expired`; None cancels the timer
    pub dwell: Option<Duration>,
    /// Field pair changed; the owner must re-aggregate before showing
    pub pair_changed: bool,
}

/// Autoplay state machine for one diagram
#[derive(Debug, Clone)]
pub struct HighlightSequencer {
    rotation: Vec<String>,
    schedule: DwellSchedule,
    pair: FieldPair,
    state: SequencerState,
    index: usize,
    autoplay: bool,
    resume_to: Option<SequencerState>,
}

impl HighlightSequencer {
    /// New sequencer in `Idle`
    ///
    /// `rotation` is the field rotation order (the catalog order).
    pub fn new(rotation: Vec<String>, pair: FieldPair, schedule: DwellSchedule, autoplay: bool) -> Self {
        Self {
            rotation,
            schedule,
            pair,
            state: SequencerState::Idle,
            index: 0,
            autoplay,
            resume_to: None,
        }
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn field_pair(&self) -> &FieldPair {
        &self.pair
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn schedule(&self) -> &DwellSchedule {
        &self.schedule
    }

    /// Current focus; None shows the full view
    pub fn cursor(&self) -> Option<HighlightCursor> {
        let showing_node = match self.state {
            SequencerState::CyclingSource => true,
            SequencerState::Paused => self.resume_to == Some(SequencerState::CyclingSource),
            _ => false,
        };
        showing_node.then(|| self.pair.cursor(Side::Source, self.index))
    }

    /// `Idle → CyclingSource` when autoplay is on and data is present
    pub fn start(&mut self, source_count: usize) -> Step {
        if !self.autoplay || source_count == 0 {
            self.go_idle();
            return self.step(false);
        }
        self.state = SequencerState::CyclingSource;
        self.index = 0;
        self.resume_to = None;
        debug!("Sequencer started on {}", self.pair);
        self.step(false)
    }

    /// Advance after a dwell expiry
    ///
    /// No-op in `Idle` and `Paused`; the owner filters stale timers, this
    /// check covers anything that still slips through.
    pub fn on_dwell_expired(&mut self, source_count: usize) -> Step {
        match self.state {
            SequencerState::Idle | SequencerState::Paused => self.step(false),
            _ if source_count == 0 => {
                self.go_idle();
                self.step(false)
            }
            SequencerState::CyclingSource => {
                if self.index + 1 < source_count {
                    self.index += 1;
                    return self.step(false);
                }
                self.advance_pair();
                self.step(true)
            }
            SequencerState::CyclingTarget | SequencerState::SwappingFieldPair => {
                self.state = SequencerState::CyclingSource;
                self.index = 0;
                self.step(false)
            }
        }
    }

    /// Rotate past the current pair without walking its nodes
    ///
    /// Used by the owner when the pair just rotated to cannot be drawn.
    /// Only meaningful in a transition state; elsewhere a no-op.
    pub fn skip_pair(&mut self) -> Step {
        match self.state {
            SequencerState::CyclingTarget | SequencerState::SwappingFieldPair => {
                debug!("Sequencer skipping {}", self.pair);
                self.advance_pair();
                self.step(true)
            }
            _ => self.step(false),
        }
    }

    /// Number of ordered pairs in one full rotation
    pub fn rotation_len(&self) -> usize {
        let n = self.rotation.len();
        n * n.saturating_sub(1)
    }

    /// Freeze on the current cursor (user hover)
    pub fn pause(&mut self) -> Step {
        if self.state.is_cycling() {
            self.resume_to = Some(self.state);
            self.state = SequencerState::Paused;
        }
        self.step(false)
    }

    /// Continue from the captured state and index
    pub fn resume(&mut self) -> Step {
        if self.state == SequencerState::Paused {
            self.state = self.resume_to.take().unwrap_or(SequencerState::CyclingSource);
        }
        self.step(false)
    }

    /// Enable or disable autoplay
    ///
    /// Disabling forces `Idle` and clears the cursor. Enabling starts
    /// cycling when `source_count > 0`.
    pub fn set_autoplay(&mut self, enabled: bool, source_count: usize) -> Step {
        self.autoplay = enabled;
        if !enabled {
            self.go_idle();
            return self.step(false);
        }
        if self.state == SequencerState::Idle {
            return self.start(source_count);
        }
        self.step(false)
    }

    /// Jump to a caller-chosen field pair, restarting at index 0
    pub fn set_field_pair(&mut self, pair: FieldPair) -> Step {
        let changed = pair != self.pair;
        self.pair = pair;
        self.index = 0;
        match self.state {
            SequencerState::Idle => {}
            SequencerState::Paused => self.resume_to = Some(SequencerState::CyclingSource),
            _ => self.state = SequencerState::CyclingSource,
        }
        self.step(changed)
    }

    /// Clamp the index after the record set changed under the cursor
    pub fn clamp_index(&mut self, source_count: usize) {
        if self.index >= source_count {
            self.index = 0;
        }
    }

    /// Target fields for `source` in rotation order, starting after it
    pub fn targets_for(&self, source: &str) -> Vec<&str> {
        let start = self.position(source).map_or(0, |p| p + 1);
        let n = self.rotation.len();
        (0..n)
            .map(|k| self.rotation[(start + k) % n].as_str())
            .filter(|candidate| *candidate != source)
            .collect()
    }

    fn position(&self, field: &str) -> Option<usize> {
        self.rotation.iter().position(|f| f == field)
    }

    /// Next target field for this source, else the next source field
    fn advance_pair(&mut self) {
        if self.has_next_target() {
            self.advance_target();
            self.state = SequencerState::CyclingTarget;
        } else {
            self.advance_source();
            self.state = SequencerState::SwappingFieldPair;
        }
        self.index = 0;
    }

    fn has_next_target(&self) -> bool {
        let targets = self.targets_for(self.pair.source());
        match targets.iter().position(|t| *t == self.pair.target()) {
            Some(p) => p + 1 < targets.len(),
            None => !targets.is_empty(),
        }
    }

    fn advance_target(&mut self) {
        let targets = self.targets_for(self.pair.source());
        let next = match targets.iter().position(|t| *t == self.pair.target()) {
            Some(p) => targets.get(p + 1),
            None => targets.first(),
        };
        if let Some(target) = next.map(|t| t.to_string()) {
            self.replace_pair(self.pair.source().to_string(), target);
        }
    }

    fn advance_source(&mut self) {
        if self.rotation.is_empty() {
            return;
        }
        let next = self
            .position(self.pair.source())
            .map_or(0, |p| (p + 1) % self.rotation.len());
        let source = self.rotation[next].clone();
        let target = self.targets_for(&source).first().map(|t| t.to_string());
        if let Some(target) = target {
            self.replace_pair(source, target);
        }
    }

    fn replace_pair(&mut self, source: String, target: String) {
        debug_assert_ne!(source, target, "rotation produced a self pair");
        match FieldPair::new(source, target) {
            Ok(pair) => {
                debug!("Sequencer rotating to {}", pair);
                self.pair = pair;
            }
            // Unreachable: targets_for never yields the source
            Err(e) => debug!("Skipping invalid rotation step: {}", e),
        }
    }

    fn go_idle(&mut self) {
        self.state = SequencerState::Idle;
        self.index = 0;
        self.resume_to = None;
    }

    fn step(&self, pair_changed: bool) -> Step {
        Step {
            focus: self.cursor(),
            dwell: self.schedule.for_state(self.state),
            pair_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation() -> Vec<String> {
        ["a", "b", "c"].iter().map(|s| s.to_string()).collect()
    }

    fn sequencer() -> HighlightSequencer {
        HighlightSequencer::new(
            rotation(),
            FieldPair::new("a", "b").unwrap(),
            DwellSchedule::from_speed(Duration::from_secs(4)),
            true,
        )
    }

    fn index_of(step: &Step) -> Option<usize> {
        step.focus.as_ref().map(|c| c.index)
    }

    #[test]
    fn test_schedule_ordering() {
        let s = DwellSchedule::from_speed(Duration::from_secs(4));
        assert_eq!(s.category_step, Duration::from_secs(2));
        assert_eq!(s.target_switch, Duration::from_secs(3));
        assert_eq!(s.pair_swap, Duration::from_secs(4));
        assert!(s.category_step < s.target_switch && s.target_switch < s.pair_swap);

        let tiny = DwellSchedule::from_speed(Duration::from_millis(10));
        assert_eq!(tiny.category_step, MIN_DWELL);
    }

    #[test]
    fn test_indices_walk_monotonically() {
        let mut seq = sequencer();
        let first = seq.start(5);
        assert_eq!(seq.state(), SequencerState::CyclingSource);
        assert_eq!(first.dwell, Some(Duration::from_secs(2)));

        let mut seen = vec![index_of(&first).unwrap()];
        for _ in 1..5 {
            seen.push(index_of(&seq.on_dwell_expired(5)).unwrap());
        }
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_pause_and_resume_keep_index() {
        let mut seq = sequencer();
        seq.start(5);
        seq.on_dwell_expired(5);
        seq.on_dwell_expired(5);

        let paused = seq.pause();
        assert_eq!(seq.state(), SequencerState::Paused);
        assert_eq!(paused.dwell, None);
        assert_eq!(index_of(&paused), Some(2));

        // Stale expiry while paused does nothing
        let ignored = seq.on_dwell_expired(5);
        assert_eq!(index_of(&ignored), Some(2));
        assert_eq!(seq.state(), SequencerState::Paused);

        let resumed = seq.resume();
        assert_eq!(seq.state(), SequencerState::CyclingSource);
        assert_eq!(index_of(&resumed), Some(2));
        assert_eq!(index_of(&seq.on_dwell_expired(5)), Some(3));
    }

    #[test]
    fn test_exhausting_sources_switches_target_then_source() {
        let mut seq = sequencer();
        seq.start(2);
        seq.on_dwell_expired(2);

        // a → b exhausted: next target for a is c
        let step = seq.on_dwell_expired(2);
        assert!(step.pair_changed);
        assert_eq!(step.focus, None);
        assert_eq!(step.dwell, Some(Duration::from_secs(3)));
        assert_eq!(seq.state(), SequencerState::CyclingTarget);
        assert_eq!(seq.field_pair(), &FieldPair::new("a", "c").unwrap());

        let step = seq.on_dwell_expired(2);
        assert_eq!(seq.state(), SequencerState::CyclingSource);
        assert_eq!(index_of(&step), Some(0));

        seq.on_dwell_expired(2);
        // a → c exhausted: no targets left, rotate source to b → c
        let step = seq.on_dwell_expired(2);
        assert!(step.pair_changed);
        assert_eq!(step.dwell, Some(Duration::from_secs(4)));
        assert_eq!(seq.state(), SequencerState::SwappingFieldPair);
        assert_eq!(seq.field_pair(), &FieldPair::new("b", "c").unwrap());
    }

    #[test]
    fn test_rotation_never_yields_self_pair() {
        let mut seq = sequencer();
        seq.start(1);
        for _ in 0..60 {
            seq.on_dwell_expired(1);
            let pair = seq.field_pair();
            assert_ne!(pair.source(), pair.target());
        }
    }

    #[test]
    fn test_skip_pair_visits_every_pair_once_per_rotation() {
        let mut seq = sequencer();
        assert_eq!(seq.rotation_len(), 6);

        // Nothing to skip outside a transition
        seq.start(1);
        assert!(!seq.skip_pair().pair_changed);
        assert_eq!(seq.field_pair(), &FieldPair::new("a", "b").unwrap());

        seq.on_dwell_expired(1);
        let mut seen = vec![seq.field_pair().to_string()];
        for _ in 1..seq.rotation_len() {
            let step = seq.skip_pair();
            assert!(step.pair_changed);
            assert_eq!(step.focus, None);
            seen.push(seq.field_pair().to_string());
        }
        assert_eq!(
            seen,
            vec!["a → c", "b → c", "b → a", "c → a", "c → b", "a → b"]
        );
        assert_eq!(seq.state(), SequencerState::SwappingFieldPair);
    }

    #[test]
    fn test_targets_skip_source() {
        let seq = sequencer();
        assert_eq!(seq.targets_for("b"), vec!["c", "a"]);
        assert_eq!(seq.targets_for("c"), vec!["a", "b"]);
    }

    #[test]
    fn test_autoplay_off_forces_idle() {
        let mut seq = sequencer();
        seq.start(4);
        seq.on_dwell_expired(4);

        let step = seq.set_autoplay(false, 4);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(step.focus, None);
        assert_eq!(step.dwell, None);

        assert_eq!(seq.start(4).focus, None);

        let step = seq.set_autoplay(true, 4);
        assert_eq!(seq.state(), SequencerState::CyclingSource);
        assert_eq!(index_of(&step), Some(0));
    }

    #[test]
    fn test_no_data_stays_idle() {
        let mut seq = sequencer();
        let step = seq.start(0);
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(step.dwell, None);

        seq.start(3);
        seq.on_dwell_expired(0);
        assert_eq!(seq.state(), SequencerState::Idle);
    }

    #[test]
    fn test_set_field_pair_resets_index() {
        let mut seq = sequencer();
        seq.start(5);
        seq.on_dwell_expired(5);
        seq.on_dwell_expired(5);

        let step = seq.set_field_pair(FieldPair::new("c", "a").unwrap());
        assert!(step.pair_changed);
        assert_eq!(index_of(&step), Some(0));
        let cursor = step.focus.unwrap();
        assert_eq!(cursor.source_field, "c");
        assert_eq!(cursor.target_field, "a");
    }

    #[test]
    fn test_set_field_pair_while_paused_stays_paused() {
        let mut seq = sequencer();
        seq.start(5);
        seq.on_dwell_expired(5);
        seq.pause();

        let step = seq.set_field_pair(FieldPair::new("b", "a").unwrap());
        assert_eq!(seq.state(), SequencerState::Paused);
        assert_eq!(step.dwell, None);
        assert_eq!(index_of(&step), Some(0));

        seq.resume();
        assert_eq!(seq.state(), SequencerState::CyclingSource);
    }

    #[test]
    fn test_pause_during_full_view_resumes_full_view() {
        let mut seq = sequencer();
        seq.start(1);
        seq.on_dwell_expired(1);
        assert_eq!(seq.state(), SequencerState::CyclingTarget);

        assert_eq!(seq.pause().focus, None);
        let step = seq.resume();
        assert_eq!(seq.state(), SequencerState::CyclingTarget);
        assert_eq!(step.dwell, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_clamp_index() {
        let mut seq = sequencer();
        seq.start(5);
        for _ in 0..4 {
            seq.on_dwell_expired(5);
        }
        seq.clamp_index(3);
        assert_eq!(seq.cursor().unwrap().index, 0);
    }
}
