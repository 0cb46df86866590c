use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::value::Value;

/// Inclusive output-domain range (byte scale) claimed by one semantic
/// label. Insertion order of labels is meaningful: cycle/next/prev
/// resolution walks labels in the order they were declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRange {
    pub low: u8,
    pub high: u8,
}

impl OutputRange {
    pub const fn new(low: u8, high: u8) -> Self {
        Self { low, high }
    }

    pub fn contains(self, v: u8) -> bool {
        v >= self.low && v <= self.high
    }
}

/// Ordered label → output-range table.
pub type LabelMap = IndexMap<String, OutputRange>;

/// Semantic label table for a parameter. `Conditional` tables depend on
/// a sibling parameter's current semantic value (e.g. a laser whose
/// pattern byte means different shapes per mode); entries are checked
/// in order and the first match wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum LabelRanges {
    #[default]
    Empty,
    Fixed(LabelMap),
    Conditional(Vec<ConditionalRanges>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalRanges {
    pub parameter: String,
    pub equals: String,
    pub ranges: LabelMap,
}

/// Compound encoding for parameters that fan one raw value out across
/// several output channels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compound {
    #[default]
    None,
    /// One value spread big-endian across sub-channels (16-bit pan as
    /// coarse/fine byte pair).
    HighRes(Vec<String>),
    /// One tuple fanned across named sibling parameters, each converted
    /// through its own mapping.
    Multi(Vec<String>),
}

/// Conversion rules for one controllable parameter of a light type:
/// raw ⇄ semantic label ⇄ hardware output value.
///
/// Conditional tables mean a mapping can only be interpreted against a
/// light's current semantic state, so every conversion here takes the
/// light's mapped-state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterMapping {
    pub name: String,
    /// 1-based channel offset within the light's footprint. `None` for
    /// virtual compound parents that only exist to drive sub-channels.
    pub channel: Option<u16>,
    pub invert: bool,
    /// Output range that resets the fixture (e.g. motor reset), kept as
    /// data for callers that issue resets.
    pub reset: Option<OutputRange>,
    pub ranges: LabelRanges,
    pub compound: Compound,
    /// Declared physical travel in degrees, for pan/tilt parameters.
    pub range_deg: Option<f64>,
}

impl ParameterMapping {
    pub fn new(name: impl Into<String>, channel: impl Into<Option<u16>>) -> Self {
        Self {
            name: name.into(),
            channel: channel.into(),
            invert: false,
            reset: None,
            ranges: LabelRanges::Empty,
            compound: Compound::None,
            range_deg: None,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    pub fn with_reset(mut self, low: u8, high: u8) -> Self {
        self.reset = Some(OutputRange::new(low, high));
        self
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (S, (u8, u8))>,
        S: Into<String>,
    {
        self.ranges = LabelRanges::Fixed(
            labels
                .into_iter()
                .map(|(name, (low, high))| (name.into(), OutputRange::new(low, high)))
                .collect(),
        );
        self
    }

    pub fn with_conditional_labels(mut self, tables: Vec<ConditionalRanges>) -> Self {
        self.ranges = LabelRanges::Conditional(tables);
        self
    }

    pub fn high_res<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compound = Compound::HighRes(channels.into_iter().map(Into::into).collect());
        self
    }

    pub fn multi<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compound = Compound::Multi(parameters.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range_deg(mut self, degrees: f64) -> Self {
        self.range_deg = Some(degrees);
        self
    }

    /// The label table active under the given mapped-state snapshot, or
    /// `None` when this parameter has no labels (or no condition holds).
    pub fn resolve_ranges(&self, mapped: &HashMap<String, Value>) -> Option<&LabelMap> {
        match &self.ranges {
            LabelRanges::Empty => None,
            LabelRanges::Fixed(map) => Some(map),
            LabelRanges::Conditional(tables) => tables
                .iter()
                .find(|t| {
                    mapped
                        .get(&t.parameter)
                        .and_then(Value::as_label)
                        .is_some_and(|l| l == t.equals)
                })
                .map(|t| &t.ranges),
        }
    }

    /// Normalize a raw value into the output domain: clamp, then apply
    /// inversion.
    pub fn normalized_output(&self, raw: f64) -> f64 {
        let v = raw.clamp(0.0, 1.0);
        if self.invert {
            1.0 - v
        } else {
            v
        }
    }

    /// Project a raw float to the byte scale.
    pub fn output_byte(&self, raw: f64) -> u8 {
        let scaled = self.normalized_output(raw) * 255.0;
        scaled.round().clamp(0.0, 255.0) as u8
    }

    /// Inverse of the output projection: byte back to raw float.
    pub fn convert_from_output(&self, out: u8) -> f64 {
        let v = f64::from(out) / 255.0;
        if self.invert {
            1.0 - v
        } else {
            v
        }
    }

    /// Raw value a semantic label resolves to (the low end of its
    /// output range, pulled back through the output projection).
    pub fn label_raw(&self, ranges: &LabelMap, label: &str) -> Option<f64> {
        ranges
            .get(label)
            .map(|range| self.convert_from_output(range.low))
    }

    /// Accept a raw number, an RGB triple, or a semantic label and
    /// return the raw-domain value. An unknown label converts to 0 —
    /// lossy but never fatal, so a bad config cannot stall a live show.
    pub fn convert_to_raw(&self, mapped: &HashMap<String, Value>, value: &Value) -> Value {
        match value {
            Value::Label(label) => {
                let resolved = self
                    .resolve_ranges(mapped)
                    .and_then(|ranges| self.label_raw(ranges, label));
                match resolved {
                    Some(raw) => Value::Number(raw),
                    None => {
                        log::warn!("unknown label {label:?} for parameter {:?}", self.name);
                        Value::Number(0.0)
                    }
                }
            }
            other => other.clone(),
        }
    }

    /// Reverse range lookup: the semantic label whose output range
    /// contains this raw value's output projection, else the raw value
    /// unchanged.
    pub fn convert_to_mapped(&self, mapped: &HashMap<String, Value>, raw: &Value) -> Value {
        let Value::Number(v) = raw else {
            return raw.clone();
        };
        let out = self.output_byte(*v);
        self.resolve_ranges(mapped)
            .and_then(|ranges| {
                ranges
                    .iter()
                    .find(|(_, range)| range.contains(out))
                    .map(|(label, _)| Value::Label(label.clone()))
            })
            .unwrap_or_else(|| raw.clone())
    }

    /// The label `step` positions away from `current` in declaration
    /// order, wrapping at either end. With no current label, forward
    /// steps land on the first label and backward steps on the last.
    pub fn adjacent_label(
        &self,
        mapped: &HashMap<String, Value>,
        current: Option<&str>,
        step: isize,
    ) -> Option<String> {
        let ranges = self.resolve_ranges(mapped)?;
        if ranges.is_empty() {
            return None;
        }
        let len = ranges.len() as isize;
        let index = match current.and_then(|c| ranges.get_index_of(c)) {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step >= 0 => 0,
            None => len - 1,
        };
        ranges
            .get_index(index as usize)
            .map(|(label, _)| label.clone())
    }

    /// Spread a raw value big-endian across this parameter's high-res
    /// sub-channels. Empty unless the parameter is `Compound::HighRes`.
    pub fn high_res_bytes(&self, raw: f64) -> Vec<(String, u8)> {
        let Compound::HighRes(channels) = &self.compound else {
            return Vec::new();
        };
        let bits = channels.len().min(8) as u32 * 8;
        let max = (1u128 << bits) - 1;
        let scaled = (max as f64 * self.normalized_output(raw)).round() as u128;
        let n = channels.len();
        channels
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let shift = 8 * (n - 1 - i) as u32;
                (name.clone(), ((scaled >> shift) & 0xff) as u8)
            })
            .collect()
    }
}
