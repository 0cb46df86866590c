use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ShowError;
use crate::events::{beat_seconds, EventMap};
use crate::model::color::PALETTE;
use crate::model::{Easing, Light, LightFilter, Value};

use super::context::ShowContext;

/// Symbolic start/end value for a transition template, resolved against
/// a concrete light's state and the tick's data at bind time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValueSpec {
    /// The light's current raw value for the parameter.
    Current,
    /// Reserved default-value resolution; currently raw 0.
    Default,
    /// Oscillate through the mapping's labels, reversing at the ends.
    /// Direction persists per (light, parameter) in the context.
    Cycle,
    /// Next label in declaration order, wrapping.
    Next,
    /// Previous label in declaration order, wrapping.
    Prev,
    /// Uniform random label, or a uniform random float when unmapped.
    Random,
    /// Uniform random pick from the fixed color palette.
    RandomRgb,
    /// End-value only: reuse this transition's resolved start value.
    Start,
    /// Read a live data key, clamped to [0, 1].
    Data(String),
    /// A number, RGB triple, or semantic label.
    Literal(Value),
}

impl Default for ValueSpec {
    fn default() -> Self {
        ValueSpec::Current
    }
}

impl From<f64> for ValueSpec {
    fn from(v: f64) -> Self {
        ValueSpec::Literal(Value::Number(v))
    }
}

impl From<&str> for ValueSpec {
    fn from(s: &str) -> Self {
        match s.strip_prefix('@') {
            Some(key) => ValueSpec::Data(key.to_owned()),
            None => ValueSpec::Literal(Value::Label(s.to_owned())),
        }
    }
}

impl From<Value> for ValueSpec {
    fn from(v: Value) -> Self {
        ValueSpec::Literal(v)
    }
}

/// Resolved keyword a spread offset or keep rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionField {
    Duration,
    Delay,
    StartValue,
    EndValue,
}

/// Shared wall-clock window for bound transitions: a start timestamp
/// plus delay and duration in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub duration: f64,
    pub delay: f64,
    pub started_at: f64,
}

impl Timing {
    /// Elapsed fraction of the active window. Negative before the delay
    /// has passed, above 1 after expiry.
    pub fn percent(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return if now < self.started_at + self.delay {
                -1.0
            } else {
                1.0
            };
        }
        (now - (self.started_at + self.delay)) / self.duration
    }

    pub fn is_running(&self, now: f64) -> bool {
        now - self.started_at <= self.delay + self.duration
    }
}

/// A single-parameter transition template. Immutable configuration;
/// `for_lights` stamps out one bound transition per matching light,
/// resolving symbolic values against that light's state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub parameter: String,
    pub duration: f64,
    pub delay: f64,
    pub start: ValueSpec,
    pub end: ValueSpec,
    /// Beat counts that override duration/delay while a confident BPM
    /// is known.
    pub duration_beats: Option<f64>,
    pub delay_beats: Option<f64>,
    pub easing: Easing,
    /// Per-light-index offsets: each entry adds `index * step` to the
    /// resolved field. Value offsets wrap within the unit interval to
    /// preserve cyclic semantics.
    pub spread: Vec<(TransitionField, f64)>,
    /// Fields that lights after the first copy from the previous
    /// sibling's resolution instead of re-resolving — this is how one
    /// random draw is shared across a light group.
    pub keep: Vec<TransitionField>,
    pub filter: LightFilter,
}

impl TransitionSpec {
    /// Create a template. Identical start and end specs are a
    /// configuration error, as is `Start` as the start value.
    pub fn new(
        parameter: impl Into<String>,
        duration: f64,
        start: impl Into<ValueSpec>,
        end: impl Into<ValueSpec>,
    ) -> Result<Self, ShowError> {
        let parameter = parameter.into();
        let start = start.into();
        let end = end.into();
        if start == ValueSpec::Start {
            return Err(ShowError::StartUsedAsStartValue { parameter });
        }
        if start == end {
            return Err(ShowError::IndistinguishableEndpoints { parameter });
        }
        Ok(Self {
            parameter,
            duration,
            delay: 0.0,
            start,
            end,
            duration_beats: None,
            delay_beats: None,
            easing: Easing::Linear,
            spread: Vec::new(),
            keep: Vec::new(),
            filter: LightFilter::default(),
        })
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_duration_beats(mut self, beats: f64) -> Self {
        self.duration_beats = Some(beats);
        self
    }

    pub fn with_delay_beats(mut self, beats: f64) -> Self {
        self.delay_beats = Some(beats);
        self
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn with_spread(mut self, field: TransitionField, step: f64) -> Self {
        self.spread.push((field, step));
        self
    }

    pub fn keeping(mut self, fields: impl IntoIterator<Item = TransitionField>) -> Self {
        self.keep.extend(fields);
        self
    }

    pub fn with_filter(mut self, filter: LightFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Bind this template to every matching light, resolving symbolic
    /// values once against current state and this tick's data.
    pub fn for_lights(
        &self,
        lights: &[Arc<Light>],
        data: &EventMap,
        ctx: &mut ShowContext,
        now: f64,
    ) -> Vec<BoundTransition> {
        let targets = self.filter.apply(lights);
        let mut out = Vec::with_capacity(targets.len());
        let mut prev: Option<ResolvedFields> = None;

        for (index, light) in targets.iter().enumerate() {
            let mut fields = self.resolve_fields(light, data, ctx);
            if index > 0 {
                if let Some(p) = &prev {
                    for field in &self.keep {
                        fields.copy_from(p, *field);
                    }
                }
            }
            prev = Some(fields.clone());
            self.apply_spread(index, &mut fields);

            out.push(BoundTransition {
                light: light.name().to_owned(),
                parameter: self.parameter.clone(),
                start: fields.start,
                end: fields.end,
                easing: self.easing,
                timing: Timing {
                    duration: fields.duration,
                    delay: fields.delay,
                    started_at: now,
                },
            });
        }
        out
    }

    fn resolve_fields(&self, light: &Light, data: &EventMap, ctx: &mut ShowContext) -> ResolvedFields {
        let start = resolve_spec(&self.start, light, &self.parameter, data, ctx, None);
        let end = resolve_spec(&self.end, light, &self.parameter, data, ctx, Some(&start));
        let duration = self
            .duration_beats
            .and_then(|b| beat_seconds(data, b))
            .unwrap_or(self.duration);
        let delay = self
            .delay_beats
            .and_then(|b| beat_seconds(data, b))
            .unwrap_or(self.delay);
        ResolvedFields {
            start,
            end,
            duration,
            delay,
        }
    }

    fn apply_spread(&self, index: usize, fields: &mut ResolvedFields) {
        for (field, step) in &self.spread {
            let offset = index as f64 * step;
            match field {
                TransitionField::Duration => fields.duration = (fields.duration + offset).max(0.0),
                TransitionField::Delay => fields.delay = (fields.delay + offset).max(0.0),
                TransitionField::StartValue => offset_value(&mut fields.start, offset),
                TransitionField::EndValue => offset_value(&mut fields.end, offset),
            }
        }
    }
}

#[derive(Debug, Clone)]
struct ResolvedFields {
    start: Value,
    end: Value,
    duration: f64,
    delay: f64,
}

impl ResolvedFields {
    fn copy_from(&mut self, other: &ResolvedFields, field: TransitionField) {
        match field {
            TransitionField::Duration => self.duration = other.duration,
            TransitionField::Delay => self.delay = other.delay,
            TransitionField::StartValue => self.start = other.start.clone(),
            TransitionField::EndValue => self.end = other.end.clone(),
        }
    }
}

/// A transition bound to one light with a concrete start time. Single
/// use: it interpolates until expiry and is discarded with its effect.
#[derive(Debug, Clone)]
pub struct BoundTransition {
    pub light: String,
    pub parameter: String,
    pub start: Value,
    pub end: Value,
    pub easing: Easing,
    pub timing: Timing,
}

impl BoundTransition {
    pub fn is_running(&self, now: f64) -> bool {
        self.timing.is_running(now)
    }

    /// The parameter value at `now`. Nothing before the delay elapses;
    /// the exact end value (no easing artifacts) once the duration has
    /// passed, indefinitely.
    pub fn value(&self, now: f64) -> Option<Value> {
        let percent = self.timing.percent(now);
        if percent <= 0.0 {
            return None;
        }
        if percent >= 1.0 {
            return Some(self.end.clone());
        }
        let m = self.easing.evaluate(percent);
        match (&self.start, &self.end) {
            (Value::Number(a), Value::Number(b)) => Some(Value::Number(a + (b - a) * m)),
            (Value::Rgb(a), Value::Rgb(b)) => Some(Value::Rgb(a.blend_hls(*b, m))),
            _ => {
                log::debug!(
                    "transition on {:?}/{:?} has mismatched endpoints; snapping to end",
                    self.light,
                    self.parameter
                );
                Some(self.end.clone())
            }
        }
    }
}

/// Wrap into [0, 1] by repeated ±1 adjustment. Unlike clamping, this
/// preserves cyclic semantics for spread offsets; unlike a modulo, an
/// exact 1.0 stays 1.0.
fn wrap_unit(mut v: f64) -> f64 {
    while v < 0.0 {
        v += 1.0;
    }
    while v > 1.0 {
        v -= 1.0;
    }
    v
}

fn offset_value(value: &mut Value, offset: f64) {
    if let Value::Number(v) = value {
        *v = wrap_unit(*v + offset);
    }
}

fn resolve_spec(
    spec: &ValueSpec,
    light: &Light,
    parameter: &str,
    data: &EventMap,
    ctx: &mut ShowContext,
    start: Option<&Value>,
) -> Value {
    match spec {
        ValueSpec::Current => light.get_raw(parameter).unwrap_or(Value::Number(0.0)),
        ValueSpec::Default => Value::Number(0.0),
        ValueSpec::Cycle => cycle_value(light, parameter, ctx),
        ValueSpec::Next => step_value(light, parameter, 1),
        ValueSpec::Prev => step_value(light, parameter, -1),
        ValueSpec::Random => random_value(light, parameter, ctx),
        ValueSpec::RandomRgb => random_rgb(ctx),
        ValueSpec::Start => start.cloned().unwrap_or(Value::Number(0.0)),
        ValueSpec::Data(key) => Value::Number(
            data.get(key)
                .map_or(0.0, |d| d.new.scalar().clamp(0.0, 1.0)),
        ),
        ValueSpec::Literal(v) => match v {
            Value::Label(_) => match light.kind().parameter(parameter) {
                Some(m) => m.convert_to_raw(&light.get_mapped_state(), v),
                None => {
                    log::warn!("label for unknown parameter {parameter:?} on {:?}", light.name());
                    Value::Number(0.0)
                }
            },
            other => other.clone(),
        },
    }
}

/// Oscillating label walk. The current position comes from the light's
/// mapped state; only the travel direction is remembered, per
/// (light, parameter), in the context.
fn cycle_value(light: &Light, parameter: &str, ctx: &mut ShowContext) -> Value {
    let mapped = light.get_mapped_state();
    let dir = ctx.cycle_direction(light.name(), parameter);

    if let Some(m) = light.kind().parameter(parameter) {
        if let Some(ranges) = m.resolve_ranges(&mapped) {
            if !ranges.is_empty() {
                let len = ranges.len() as isize;
                let current = mapped.get(parameter).and_then(Value::as_label);
                let (index, dir) = match current.and_then(|c| ranges.get_index_of(c)) {
                    None => (0, dir),
                    Some(i) => {
                        let j = i as isize + dir.step();
                        if j < 0 || j >= len {
                            let flipped = dir.flipped();
                            ((i as isize + flipped.step()).clamp(0, len - 1), flipped)
                        } else {
                            (j, dir)
                        }
                    }
                };
                ctx.set_cycle_direction(light.name(), parameter, dir);
                let raw = ranges
                    .get_index(index as usize)
                    .and_then(|(label, _)| m.label_raw(ranges, label))
                    .unwrap_or(0.0);
                return Value::Number(raw);
            }
        }
    }

    // No labels: ±0.1 raw stepping. A step that would leave the unit
    // interval flips direction and steps the other way instead, so the
    // oscillation stays defined at exactly 0 and 1.
    let v = light
        .get_raw(parameter)
        .map_or(0.0, |r| r.number_or(0.0));
    let step = 0.1 * dir.step() as f64;
    let candidate = v + step;
    let (next, dir) = if (0.0..=1.0).contains(&candidate) {
        (candidate, dir)
    } else {
        ((v - step).clamp(0.0, 1.0), dir.flipped())
    };
    ctx.set_cycle_direction(light.name(), parameter, dir);
    Value::Number(next)
}

fn step_value(light: &Light, parameter: &str, step: isize) -> Value {
    let mapped = light.get_mapped_state();
    if let Some(m) = light.kind().parameter(parameter) {
        let current = mapped.get(parameter).and_then(Value::as_label);
        if let Some(label) = m.adjacent_label(&mapped, current, step) {
            if let Some(ranges) = m.resolve_ranges(&mapped) {
                return Value::Number(m.label_raw(ranges, &label).unwrap_or(0.0));
            }
        }
    }
    let v = light
        .get_raw(parameter)
        .map_or(0.0, |r| r.number_or(0.0));
    Value::Number((v + 0.1 * step as f64).rem_euclid(1.0))
}

fn random_value(light: &Light, parameter: &str, ctx: &mut ShowContext) -> Value {
    let mapped = light.get_mapped_state();
    if let Some(m) = light.kind().parameter(parameter) {
        if let Some(ranges) = m.resolve_ranges(&mapped) {
            if !ranges.is_empty() {
                let index = ctx.rng().gen_range(0..ranges.len());
                let raw = ranges
                    .get_index(index)
                    .and_then(|(label, _)| m.label_raw(ranges, label))
                    .unwrap_or(0.0);
                return Value::Number(raw);
            }
        }
    }
    Value::Number(ctx.rng().gen::<f64>())
}

fn random_rgb(ctx: &mut ShowContext) -> Value {
    let index = ctx.rng().gen_range(0..PALETTE.len());
    PALETTE
        .get(index)
        .map_or(Value::Rgb(crate::model::Rgb::WHITE), |(_, c)| Value::Rgb(*c))
}
