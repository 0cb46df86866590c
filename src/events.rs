use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Event name carrying the live BPM estimate.
pub const BPM_EVENT: &str = "audio/bpm/bpm";
/// Event name carrying the BPM estimator's confidence, 0..1.
pub const BPM_CONFIDENCE_EVENT: &str = "audio/bpm/bpmconfidence";
/// Beat-relative timing only engages above this confidence.
pub const BPM_CONFIDENCE_MIN: f64 = 0.8;

/// An analysis value: a scalar or an equal-length vector (e.g. one
/// level per frequency band).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventValue {
    Scalar(f64),
    Vector(Vec<f64>),
}

impl EventValue {
    /// Scalar view: the value itself, or a vector's first element.
    pub fn scalar(&self) -> f64 {
        match self {
            EventValue::Scalar(v) => *v,
            EventValue::Vector(v) => v.first().copied().unwrap_or(0.0),
        }
    }

    fn zip_with(&self, other: &EventValue, f: impl Fn(f64, f64) -> f64) -> EventValue {
        match (self, other) {
            (EventValue::Scalar(a), EventValue::Scalar(b)) => EventValue::Scalar(f(*a, *b)),
            (EventValue::Vector(a), EventValue::Vector(b)) => {
                EventValue::Vector(a.iter().zip(b).map(|(x, y)| f(*x, *y)).collect())
            }
            // Mixed shapes degrade to the scalar view.
            (a, b) => EventValue::Scalar(f(a.scalar(), b.scalar())),
        }
    }
}

impl From<f64> for EventValue {
    fn from(v: f64) -> Self {
        EventValue::Scalar(v)
    }
}

/// Which component of an event diff a trigger compares against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffField {
    #[default]
    New,
    Old,
    Delta,
    DeltaPercent,
}

/// One event's tick-over-tick change: the new and previous values plus
/// their elementwise difference and relative difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDiff {
    pub new: EventValue,
    pub old: EventValue,
    pub delta: EventValue,
    pub percent: EventValue,
}

impl EventDiff {
    /// Compute the diff of an observed change. The relative delta is 0
    /// where the previous value was 0.
    pub fn from_change(old: EventValue, new: EventValue) -> Self {
        let delta = new.zip_with(&old, |n, o| n - o);
        let percent = delta.zip_with(&old, |d, o| if o == 0.0 { 0.0 } else { d / o });
        Self {
            new,
            old,
            delta,
            percent,
        }
    }

    /// A freshly appearing scalar with no history.
    pub fn from_scalar(value: f64) -> Self {
        Self::from_change(EventValue::Scalar(0.0), EventValue::Scalar(value))
    }

    pub fn field(&self, field: DiffField) -> &EventValue {
        match field {
            DiffField::New => &self.new,
            DiffField::Old => &self.old,
            DiffField::Delta => &self.delta,
            DiffField::DeltaPercent => &self.percent,
        }
    }
}

/// Per-tick input to the engine: event name → diff tuple. A missing key
/// means "no data this tick", never an error.
pub type EventMap = HashMap<String, EventDiff>;

/// Seconds per beat, when a confident BPM estimate is present.
pub fn beat_length(data: &EventMap) -> Option<f64> {
    let confidence = data.get(BPM_CONFIDENCE_EVENT)?.new.scalar();
    if confidence < BPM_CONFIDENCE_MIN {
        return None;
    }
    let bpm = data.get(BPM_EVENT)?.new.scalar();
    if bpm > 0.0 {
        Some(60.0 / bpm)
    } else {
        None
    }
}

/// Convert a beat count to seconds under the current confident BPM.
pub fn beat_seconds(data: &EventMap, beats: f64) -> Option<f64> {
    beat_length(data).map(|b| b * beats)
}
