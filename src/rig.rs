use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::engine::{LightUpdates, SceneController, ShowContext};
use crate::error::ShowError;
use crate::events::EventMap;
use crate::model::Light;

/// One tick's hardware-ready snapshot: light name → output-channel-or-
/// parameter name → byte. Ordered maps so printed/serialized frames are
/// stable.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub lights: BTreeMap<String, BTreeMap<String, u8>>,
}

/// The per-tick driver facade around a scene controller and its lights.
///
/// Each `tick` runs the trigger pass, evaluates the controller against
/// the supplied data, applies the resulting raw updates to light state,
/// and returns the refreshed output snapshot for the output stage.
#[derive(Debug)]
pub struct Rig {
    lights: Vec<Arc<Light>>,
    pub controller: SceneController,
    ctx: ShowContext,
}

impl Rig {
    /// Assemble a rig. Duplicate light names fail fast — they would
    /// make update routing ambiguous.
    pub fn new(lights: Vec<Arc<Light>>, controller: SceneController) -> Result<Self, ShowError> {
        let mut seen = std::collections::HashSet::new();
        for light in &lights {
            if !seen.insert(light.name().to_owned()) {
                return Err(ShowError::DuplicateName {
                    what: "light".into(),
                    name: light.name().to_owned(),
                });
            }
        }
        Ok(Self {
            lights,
            controller,
            ctx: ShowContext::new(),
        })
    }

    /// Seed the engine RNG for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.ctx = ShowContext::with_seed(seed);
        self
    }

    pub fn lights(&self) -> &[Arc<Light>] {
        &self.lights
    }

    /// Run one frame: triggers, evaluation, state application, output
    /// snapshot. `now` is seconds on the driver's clock.
    pub fn tick(&mut self, data: &EventMap, now: f64) -> Frame {
        self.controller.run_triggers(data, now, &mut self.ctx);
        let updates: LightUpdates = self
            .controller
            .evaluate(data, &self.lights, &mut self.ctx, now);

        for (name, params) in &updates {
            if let Some(light) = self.lights.iter().find(|l| l.name() == name.as_str()) {
                light.update_state(params);
            }
        }

        Frame {
            lights: self
                .lights
                .iter()
                .map(|l| {
                    (
                        l.name().to_owned(),
                        l.get_output_state().into_iter().collect(),
                    )
                })
                .collect(),
        }
    }

    /// Merge every light's addressed channels into one DMX frame.
    pub fn dmx_frame(&self) -> BTreeMap<u16, u8> {
        let mut out = BTreeMap::new();
        for light in &self.lights {
            out.extend(light.dmx_state());
        }
        out
    }
}
