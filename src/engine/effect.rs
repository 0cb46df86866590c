use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::EventMap;
use crate::model::{Light, LightFilter, Value};

use super::context::ShowContext;
use super::movement::{BoundMovement, MovementSpec};
use super::transition::{BoundTransition, TransitionSpec};
use super::trigger::TriggerExpr;

/// Per-tick engine output: light name → parameter → raw value.
pub type LightUpdates = HashMap<String, HashMap<String, Value>>;

/// Merge one update set into another; later writers win per key.
pub fn merge_updates(into: &mut LightUpdates, from: LightUpdates) {
    for (light, params) in from {
        into.entry(light).or_default().extend(params);
    }
}

/// One entry in an effect: a scalar transition or a 2-axis movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TransitionNode {
    Scalar(TransitionSpec),
    Movement(MovementSpec),
}

impl From<TransitionSpec> for TransitionNode {
    fn from(spec: TransitionSpec) -> Self {
        TransitionNode::Scalar(spec)
    }
}

impl From<MovementSpec> for TransitionNode {
    fn from(spec: MovementSpec) -> Self {
        TransitionNode::Movement(spec)
    }
}

/// Triggers an effect responds to inside a program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectTriggers {
    /// Stages this effect in a multiple-mode program.
    pub run: Option<TriggerExpr>,
    /// Jumps a single-mode program's cursor to this effect.
    pub select: Option<TriggerExpr>,
}

/// A named, immutable bundle of transition templates. Programs
/// instantiate it against a light list each time it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectSpec {
    pub name: String,
    pub transitions: Vec<TransitionNode>,
    pub filter: LightFilter,
    pub triggers: EffectTriggers,
}

impl EffectSpec {
    pub fn new(name: impl Into<String>, transitions: Vec<TransitionNode>) -> Self {
        Self {
            name: name.into(),
            transitions,
            filter: LightFilter::default(),
            triggers: EffectTriggers::default(),
        }
    }

    pub fn with_filter(mut self, filter: LightFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_run_trigger(mut self, expr: impl Into<TriggerExpr>) -> Self {
        self.triggers.run = Some(expr.into());
        self
    }

    pub fn with_select_trigger(mut self, expr: impl Into<TriggerExpr>) -> Self {
        self.triggers.select = Some(expr.into());
        self
    }

    /// Bind to the matching subset of `lights`. Every transition
    /// template fans out to one bound instance per matching light, in
    /// template order then light order — that order is also the
    /// overwrite order during evaluation.
    pub fn for_lights(
        &self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> BoundEffect {
        let targets = self.filter.apply(lights);
        let mut nodes = Vec::new();
        for node in &self.transitions {
            match node {
                TransitionNode::Scalar(spec) => nodes.extend(
                    spec.for_lights(&targets, data, ctx, now)
                        .into_iter()
                        .map(BoundNode::Scalar),
                ),
                TransitionNode::Movement(spec) => nodes.extend(
                    spec.for_lights(&targets, data, now)
                        .into_iter()
                        .map(BoundNode::Movement),
                ),
            }
        }
        BoundEffect {
            name: self.name.clone(),
            nodes,
            lights: targets.iter().map(|l| l.name().to_owned()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
enum BoundNode {
    Scalar(BoundTransition),
    Movement(BoundMovement),
}

/// An effect instantiated against concrete lights at a start time.
#[derive(Debug, Clone)]
pub struct BoundEffect {
    pub name: String,
    nodes: Vec<BoundNode>,
    pub lights: Vec<String>,
}

impl BoundEffect {
    /// True while any constituent transition is still inside its
    /// delay+duration window.
    pub fn is_running(&self, now: f64) -> bool {
        self.nodes.iter().any(|n| match n {
            BoundNode::Scalar(t) => t.is_running(now),
            BoundNode::Movement(m) => m.is_running(now),
        })
    }

    /// Aggregate every transition's contribution per light. Later
    /// transitions overwrite earlier ones for the same key within the
    /// same tick.
    pub fn evaluate(&self, now: f64) -> LightUpdates {
        let mut out = LightUpdates::new();
        for node in &self.nodes {
            match node {
                BoundNode::Scalar(t) => {
                    if let Some(value) = t.value(now) {
                        out.entry(t.light.clone())
                            .or_default()
                            .insert(t.parameter.clone(), value);
                    }
                }
                BoundNode::Movement(m) => {
                    if let Some(pos) = m.value(now) {
                        let params = out.entry(m.light.clone()).or_default();
                        params.insert("pan".to_owned(), Value::Number(pos.pan));
                        params.insert("tilt".to_owned(), Value::Number(pos.tilt));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::engine::movement::MovementPath;
    use crate::model::{LightType, ParameterMapping};

    fn rig() -> Vec<Arc<Light>> {
        let head = Arc::new(
            LightType::new(
                "head",
                6,
                vec![
                    ParameterMapping::new("pan", None)
                        .high_res(["pan_coarse", "pan_fine"])
                        .with_range_deg(540.0),
                    ParameterMapping::new("pan_coarse", 1),
                    ParameterMapping::new("pan_fine", 2),
                    ParameterMapping::new("tilt", None)
                        .high_res(["tilt_coarse", "tilt_fine"])
                        .with_range_deg(220.0),
                    ParameterMapping::new("tilt_coarse", 3),
                    ParameterMapping::new("tilt_fine", 4),
                    ParameterMapping::new("dim", 5),
                    ParameterMapping::new("strobe", 6),
                ],
            )
            .unwrap(),
        );
        vec![
            Arc::new(Light::new("back_1", 1, head.clone()).with_groups(["back"])),
            Arc::new(Light::new("back_2", 7, head).with_groups(["back"])),
        ]
    }

    #[test]
    fn aggregates_per_light_contributions() {
        let lights = rig();
        let effect = EffectSpec::new(
            "move_and_dim",
            vec![
                TransitionSpec::new("dim", 2.0, 0.0, 1.0).unwrap().into(),
                MovementSpec::new(MovementPath::circle(180.0, 110.0, 20.0), 4.0).into(),
            ],
        );
        let mut ctx = ShowContext::with_seed(3);
        let bound = effect.for_lights(&EventMap::new(), &lights, &mut ctx, 0.0);

        assert!(bound.is_running(1.0));
        let updates = bound.evaluate(1.0);
        assert_eq!(updates.len(), 2);
        let back_1 = updates.get("back_1").unwrap();
        assert_eq!(back_1.get("dim"), Some(&Value::Number(0.5)));
        assert!(back_1.contains_key("pan"));
        assert!(back_1.contains_key("tilt"));
    }

    #[test]
    fn later_transitions_overwrite_same_key() {
        let lights = rig();
        let effect = EffectSpec::new(
            "up_then_pinned",
            vec![
                TransitionSpec::new("dim", 2.0, 0.0, 1.0).unwrap().into(),
                TransitionSpec::new("dim", 2.0, 1.0, 0.0).unwrap().into(),
            ],
        );
        let mut ctx = ShowContext::with_seed(3);
        let bound = effect.for_lights(&EventMap::new(), &lights, &mut ctx, 0.0);
        let updates = bound.evaluate(1.0);
        // The second template's value wins.
        assert_eq!(updates.get("back_1").unwrap().get("dim"), Some(&Value::Number(0.5)));

        let updates = bound.evaluate(3.0);
        assert_eq!(updates.get("back_1").unwrap().get("dim"), Some(&Value::Number(0.0)));
    }

    #[test]
    fn effect_filter_restricts_lights() {
        let lights = rig();
        let effect = EffectSpec::new(
            "solo",
            vec![TransitionSpec::new("dim", 1.0, 0.0, 1.0).unwrap().into()],
        )
        .with_filter(LightFilter::named(["back_2"]));
        let mut ctx = ShowContext::with_seed(3);
        let bound = effect.for_lights(&EventMap::new(), &lights, &mut ctx, 0.0);
        assert_eq!(bound.lights, vec!["back_2".to_owned()]);
        let updates = bound.evaluate(0.5);
        assert!(!updates.contains_key("back_1"));
        assert!(updates.contains_key("back_2"));
    }

    #[test]
    fn expired_effect_stops_running() {
        let lights = rig();
        let effect = EffectSpec::new(
            "blip",
            vec![TransitionSpec::new("dim", 0.5, 0.0, 1.0).unwrap().into()],
        );
        let mut ctx = ShowContext::with_seed(3);
        let bound = effect.for_lights(&EventMap::new(), &lights, &mut ctx, 0.0);
        assert!(bound.is_running(0.4));
        assert!(!bound.is_running(0.6));
    }

    #[test]
    fn merge_updates_last_writer_wins() {
        let mut a = LightUpdates::new();
        a.entry("l1".into())
            .or_default()
            .insert("dim".into(), Value::Number(0.1));
        let mut b = LightUpdates::new();
        b.entry("l1".into())
            .or_default()
            .insert("dim".into(), Value::Number(0.9));
        b.entry("l2".into())
            .or_default()
            .insert("dim".into(), Value::Number(0.4));
        merge_updates(&mut a, b);
        assert_eq!(a.get("l1").unwrap().get("dim"), Some(&Value::Number(0.9)));
        assert_eq!(a.len(), 2);
    }
}
