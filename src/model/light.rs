use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::ShowError;

use super::mapping::{Compound, ParameterMapping};
use super::value::Value;

/// A named fixture profile: its channel footprint and the mapping for
/// every controllable parameter. Parameter declaration order is kept —
/// it drives both state-update evaluation order and label stepping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightType {
    name: String,
    channels: u16,
    parameters: IndexMap<String, ParameterMapping>,
}

impl LightType {
    /// Build a light type. Fails fast on duplicate parameter names.
    pub fn new(
        name: impl Into<String>,
        channels: u16,
        parameters: Vec<ParameterMapping>,
    ) -> Result<Self, ShowError> {
        let name = name.into();
        let mut map = IndexMap::new();
        for p in parameters {
            if map.contains_key(&p.name) {
                return Err(ShowError::DuplicateName {
                    what: "parameter".into(),
                    name: p.name,
                });
            }
            map.insert(p.name.clone(), p);
        }
        Ok(Self {
            name,
            channels,
            parameters: map,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterMapping> {
        self.parameters.get(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &ParameterMapping> {
        self.parameters.values()
    }

    /// Parameters in state-update evaluation order: plain parameters
    /// first, then high-res compounds, then multi compounds, stable
    /// within each class. Compound fan-out therefore always sees (and
    /// overwrites) already-updated sibling state.
    pub fn evaluation_order(&self) -> Vec<&ParameterMapping> {
        let mut order: Vec<_> = self.parameters.values().collect();
        order.sort_by_key(|p| match p.compound {
            Compound::None => 0,
            Compound::HighRes(_) => 1,
            Compound::Multi(_) => 2,
        });
        order
    }

    /// Declared pan/tilt travel in degrees, if this type has both.
    pub fn pan_tilt_ranges(&self) -> Option<(f64, f64)> {
        let pan = self.parameter("pan")?.range_deg?;
        let tilt = self.parameter("tilt")?.range_deg?;
        Some((pan, tilt))
    }
}

#[derive(Debug, Default)]
struct LightState {
    raw: HashMap<String, Value>,
    mapped: HashMap<String, Value>,
    output: HashMap<String, u8>,
}

/// A concrete, addressed light. Holds three synchronized views of its
/// state — raw, semantic, output — behind one lock. Each getter takes
/// the lock once, so a single read is a consistent snapshot; nothing
/// here spans two lights' locks.
#[derive(Debug)]
pub struct Light {
    name: String,
    kind: Arc<LightType>,
    address: u16,
    groups: Vec<String>,
    state: Mutex<LightState>,
}

impl Light {
    pub fn new(name: impl Into<String>, address: u16, kind: Arc<LightType>) -> Self {
        let mut state = LightState::default();
        for p in kind.parameters() {
            state.raw.insert(p.name.clone(), Value::Number(0.0));
        }
        derive_projections(&kind, &mut state);
        Self {
            name: name.into(),
            kind,
            address,
            groups: Vec::new(),
            state: Mutex::new(state),
        }
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn kind(&self) -> &Arc<LightType> {
        &self.kind
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Apply a partial update. Incoming labels are resolved to raw
    /// through the parameter's mapping; then every parameter's semantic
    /// and output projections are re-derived, because conditional and
    /// compound mappings make projections depend on sibling values.
    pub fn update_state(&self, updates: &HashMap<String, Value>) {
        let mut st = self.state.lock();
        for p in self.kind.evaluation_order() {
            if let Some(v) = updates.get(&p.name) {
                let raw = p.convert_to_raw(&st.mapped, v);
                // Refresh this parameter's own semantic view right away
                // so later parameters' conditional lookups see it.
                let semantic = p.convert_to_mapped(&st.mapped, &raw);
                st.raw.insert(p.name.clone(), raw);
                st.mapped.insert(p.name.clone(), semantic);
            }
        }
        derive_projections(&self.kind, &mut st);
    }

    pub fn get_raw_state(&self) -> HashMap<String, Value> {
        self.state.lock().raw.clone()
    }

    pub fn get_raw(&self, parameter: &str) -> Option<Value> {
        self.state.lock().raw.get(parameter).cloned()
    }

    pub fn get_mapped_state(&self) -> HashMap<String, Value> {
        self.state.lock().mapped.clone()
    }

    pub fn get_output_state(&self) -> HashMap<String, u8> {
        self.state.lock().output.clone()
    }

    /// Flatten the output snapshot to absolute DMX channel → byte.
    /// Virtual parameters (no channel) are skipped; their sub-channels
    /// carry the data.
    pub fn dmx_state(&self) -> BTreeMap<u16, u8> {
        let st = self.state.lock();
        let mut out = BTreeMap::new();
        for (name, byte) in &st.output {
            if let Some(channel) = self.kind.parameter(name).and_then(|p| p.channel) {
                out.insert(self.address + channel - 1, *byte);
            }
        }
        out
    }
}

/// Re-derive semantic and output projections for every parameter, in
/// evaluation order, against the progressively updated semantic state.
fn derive_projections(kind: &LightType, st: &mut LightState) {
    for p in kind.evaluation_order() {
        let raw = st.raw.get(&p.name).cloned().unwrap_or(Value::Number(0.0));
        let semantic = p.convert_to_mapped(&st.mapped, &raw);
        st.mapped.insert(p.name.clone(), semantic);

        match &p.compound {
            Compound::None => {
                st.output.insert(p.name.clone(), p.output_byte(raw.number_or(0.0)));
            }
            Compound::HighRes(_) => {
                for (channel, byte) in p.high_res_bytes(raw.number_or(0.0)) {
                    st.output.insert(channel, byte);
                }
            }
            Compound::Multi(keys) => {
                let components: Vec<f64> = match &raw {
                    Value::Rgb(c) => vec![c.r, c.g, c.b],
                    Value::Number(v) => vec![*v; keys.len()],
                    Value::Label(_) => vec![0.0; keys.len()],
                };
                for (key, component) in keys.iter().zip(components) {
                    let normalized = p.normalized_output(component);
                    let byte = kind
                        .parameter(key)
                        .map_or_else(|| (normalized * 255.0).round() as u8, |sub| {
                            sub.output_byte(normalized)
                        });
                    st.output.insert(key.clone(), byte);
                    st.mapped.insert(key.clone(), Value::Number(normalized));
                }
            }
        }
    }
}

/// Composable light targeting: explicit names and/or group membership.
/// Both constraints must hold when both are present; an empty filter
/// matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightFilter {
    pub names: Vec<String>,
    pub groups: Vec<String>,
}

impl LightFilter {
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            groups: Vec::new(),
        }
    }

    pub fn grouped<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Vec::new(),
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.groups.is_empty()
    }

    pub fn matches(&self, light: &Light) -> bool {
        if !self.names.is_empty() && !self.names.iter().any(|n| n == light.name()) {
            return false;
        }
        if !self.groups.is_empty() && !self.groups.iter().any(|g| light.in_group(g)) {
            return false;
        }
        true
    }

    pub fn apply(&self, lights: &[Arc<Light>]) -> Vec<Arc<Light>> {
        lights
            .iter()
            .filter(|l| self.matches(l))
            .cloned()
            .collect()
    }
}
