use serde::{Deserialize, Serialize};

use crate::events::{beat_seconds, DiffField, EventMap};

/// Which side of the threshold fires the trigger. Comparison is
/// inclusive: a value exactly on the threshold fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    #[default]
    Above,
    Below,
}

/// Edge/threshold detector over one event's diff tuple. The cooldown
/// timestamp is the only persistent state in the detection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub event: String,
    pub threshold: f64,
    pub field: DiffField,
    pub comparison: Comparison,
    /// Minimum seconds between two firings.
    pub cooldown: Option<f64>,
    /// Cooldown in beats; overrides `cooldown` while a confident BPM is
    /// known.
    pub cooldown_beats: Option<f64>,
    #[serde(skip)]
    next_eligible: f64,
}

impl Trigger {
    pub fn new(event: impl Into<String>, threshold: f64) -> Self {
        Self {
            event: event.into(),
            threshold,
            field: DiffField::New,
            comparison: Comparison::Above,
            cooldown: None,
            cooldown_beats: None,
            next_eligible: f64::NEG_INFINITY,
        }
    }

    pub fn on_field(mut self, field: DiffField) -> Self {
        self.field = field;
        self
    }

    pub fn below(mut self) -> Self {
        self.comparison = Comparison::Below;
        self
    }

    pub fn with_cooldown(mut self, seconds: f64) -> Self {
        self.cooldown = Some(seconds);
        self
    }

    pub fn with_cooldown_beats(mut self, beats: f64) -> Self {
        self.cooldown_beats = Some(beats);
        self
    }

    /// Evaluate against this tick's data. A missing event is routine
    /// telemetry loss and simply does not fire. During a cooldown the
    /// event is not consumed: the cooldown clock only restarts on a
    /// firing.
    pub fn evaluate(&mut self, data: &EventMap, now: f64) -> bool {
        if now < self.next_eligible {
            return false;
        }
        let Some(diff) = data.get(&self.event) else {
            return false;
        };
        let value = diff.field(self.field).scalar();
        let fired = match self.comparison {
            Comparison::Above => value >= self.threshold,
            Comparison::Below => value <= self.threshold,
        };
        if fired {
            if let Some(cooldown) = self.cooldown_length(data) {
                self.next_eligible = now + cooldown;
            }
        }
        fired
    }

    fn cooldown_length(&self, data: &EventMap) -> Option<f64> {
        if let Some(beats) = self.cooldown_beats {
            if let Some(seconds) = beat_seconds(data, beats) {
                return Some(seconds);
            }
        }
        self.cooldown
    }
}

/// Recursive boolean condition over triggers: an OR/AND tree with an
/// always-true leaf. Evaluation short-circuits, so triggers behind an
/// already-decided branch keep their cooldown state untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TriggerExpr {
    Always,
    One(Trigger),
    All(Vec<TriggerExpr>),
    Any(Vec<TriggerExpr>),
}

impl TriggerExpr {
    pub fn evaluate(&mut self, data: &EventMap, now: f64) -> bool {
        match self {
            TriggerExpr::Always => true,
            TriggerExpr::One(t) => t.evaluate(data, now),
            TriggerExpr::All(exprs) => {
                for e in exprs {
                    if !e.evaluate(data, now) {
                        return false;
                    }
                }
                true
            }
            TriggerExpr::Any(exprs) => {
                for e in exprs {
                    if e.evaluate(data, now) {
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl From<Trigger> for TriggerExpr {
    fn from(t: Trigger) -> Self {
        TriggerExpr::One(t)
    }
}
