use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::events::EventMap;
use crate::model::Light;

use super::context::ShowContext;
use super::effect::{merge_updates, BoundEffect, EffectSpec, LightUpdates};
use super::trigger::TriggerExpr;

/// Program-level trigger slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgramTriggers {
    pub run: Option<TriggerExpr>,
    pub stop: Option<TriggerExpr>,
    pub next: Option<TriggerExpr>,
    pub prev: Option<TriggerExpr>,
    pub random: Option<TriggerExpr>,
    /// Evaluated by the owning scene: selecting a program silences its
    /// sibling autoplay programs.
    pub select: Option<TriggerExpr>,
}

fn running_by_default() -> bool {
    true
}

/// Scheduler turning an ordered list of effect templates into live
/// bound effects.
///
/// Single mode keeps at most one bound effect and a cursor, advancing
/// on expiry (autoplay), replaying (loop), or holding until triggered.
/// Multiple mode runs independently-triggered effects concurrently,
/// staging them as pending and expiring them individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    effects: Vec<EffectSpec>,
    pub triggers: ProgramTriggers,
    autoplay: bool,
    looped: bool,
    multiple: bool,
    multiple_all: bool,
    #[serde(skip, default = "running_by_default")]
    is_running: bool,
    #[serde(skip)]
    cursor: Option<usize>,
    #[serde(skip)]
    bound: Option<BoundEffect>,
    #[serde(skip)]
    play_next: bool,
    /// Effect indices selected this tick, not yet bound. Staging order
    /// is insertion order.
    #[serde(skip)]
    pending: IndexSet<usize>,
    /// Bound, still-active effects keyed by index, in staging order —
    /// which is also the merge order (last writer wins).
    #[serde(skip)]
    running: IndexMap<usize, BoundEffect>,
}

impl Program {
    pub fn new(name: impl Into<String>, effects: Vec<EffectSpec>) -> Self {
        Self {
            name: name.into(),
            effects,
            triggers: ProgramTriggers::default(),
            autoplay: true,
            looped: false,
            multiple: false,
            multiple_all: false,
            is_running: true,
            cursor: None,
            bound: None,
            play_next: false,
            pending: IndexSet::new(),
            running: IndexMap::new(),
        }
    }

    /// Disable autoplay: the program holds its current effect and waits
    /// for explicit triggers.
    pub fn manual(mut self) -> Self {
        self.autoplay = false;
        self
    }

    /// Replay the current effect on expiry instead of advancing.
    pub fn looping(mut self) -> Self {
        self.looped = true;
        self
    }

    /// Switch to multiple mode: effects start from their own run
    /// triggers and run concurrently.
    pub fn multiple_mode(mut self) -> Self {
        self.multiple = true;
        self.autoplay = false;
        self
    }

    /// In multiple mode, stage every effect each tick instead of
    /// waiting for per-effect or random triggers.
    pub fn stage_all(mut self) -> Self {
        self.multiple_all = true;
        self
    }

    pub fn with_triggers(mut self, triggers: ProgramTriggers) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn stopped(mut self) -> Self {
        self.is_running = false;
        self
    }

    pub fn autoplay(&self) -> bool {
        self.autoplay
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn effects(&self) -> &[EffectSpec] {
        &self.effects
    }

    /// Advance the cursor (wrapping), drop the bound effect, and start
    /// the newly selected one on the next evaluation.
    pub fn next(&mut self) {
        self.advance(1);
    }

    pub fn prev(&mut self) {
        self.advance(-1);
    }

    pub fn random(&mut self, ctx: &mut ShowContext) {
        if self.effects.is_empty() {
            return;
        }
        let index = ctx.rng().gen_range(0..self.effects.len());
        self.select(index);
    }

    /// Force the cursor to a specific effect.
    pub fn select(&mut self, index: usize) {
        if index < self.effects.len() {
            self.cursor = Some(index);
            self.bound = None;
            self.play_next = true;
        }
    }

    fn advance(&mut self, step: isize) {
        let len = self.effects.len() as isize;
        if len == 0 {
            return;
        }
        let current = self.cursor.unwrap_or(0) as isize;
        self.cursor = Some((current + step).rem_euclid(len) as usize);
        self.bound = None;
        self.play_next = true;
    }

    fn expire(&mut self, now: f64) {
        self.running.retain(|_, b| b.is_running(now));
    }

    /// Evaluate this program's triggers against the tick's data. In
    /// multiple mode, completed effects are expired before staging so
    /// an effect re-triggered on the tick it expires restarts without
    /// dropping a frame.
    pub fn run_triggers(&mut self, data: &EventMap, now: f64, ctx: &mut ShowContext) {
        if let Some(t) = self.triggers.run.as_mut() {
            if t.evaluate(data, now) {
                self.is_running = true;
            }
        }
        if let Some(t) = self.triggers.stop.as_mut() {
            if t.evaluate(data, now) {
                self.is_running = false;
            }
        }

        if self.multiple {
            self.expire(now);
            for (index, effect) in self.effects.iter_mut().enumerate() {
                if let Some(t) = effect.triggers.run.as_mut() {
                    if t.evaluate(data, now) && !self.running.contains_key(&index) {
                        self.pending.insert(index);
                    }
                }
            }
            if self.multiple_all {
                for index in 0..self.effects.len() {
                    if !self.running.contains_key(&index) {
                        self.pending.insert(index);
                    }
                }
            } else if let Some(t) = self.triggers.random.as_mut() {
                if t.evaluate(data, now) {
                    let candidates: Vec<usize> = (0..self.effects.len())
                        .filter(|i| !self.pending.contains(i) && !self.running.contains_key(i))
                        .collect();
                    if !candidates.is_empty() {
                        let pick = ctx.rng().gen_range(0..candidates.len());
                        if let Some(index) = candidates.get(pick) {
                            self.pending.insert(*index);
                        }
                    }
                }
            }
        } else {
            if let Some(t) = self.triggers.next.as_mut() {
                if t.evaluate(data, now) {
                    self.advance(1);
                }
            }
            if let Some(t) = self.triggers.prev.as_mut() {
                if t.evaluate(data, now) {
                    self.advance(-1);
                }
            }
            if let Some(t) = self.triggers.random.as_mut() {
                if t.evaluate(data, now) {
                    let len = self.effects.len();
                    if len > 0 {
                        let index = ctx.rng().gen_range(0..len);
                        self.select(index);
                    }
                }
            }
            let mut selected = None;
            for (index, effect) in self.effects.iter_mut().enumerate() {
                if let Some(t) = effect.triggers.select.as_mut() {
                    if t.evaluate(data, now) {
                        selected = Some(index);
                    }
                }
            }
            if let Some(index) = selected {
                self.select(index);
            }
        }
    }

    /// Produce this tick's updates.
    pub fn evaluate(
        &mut self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> LightUpdates {
        if !self.is_running {
            return LightUpdates::new();
        }
        if self.effects.is_empty() {
            self.cursor = None;
            self.bound = None;
            return LightUpdates::new();
        }

        if self.multiple {
            self.evaluate_multiple(data, lights, ctx, now)
        } else {
            self.evaluate_single(data, lights, ctx, now)
        }
    }

    fn evaluate_multiple(
        &mut self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> LightUpdates {
        self.expire(now);
        let staged: Vec<usize> = self.pending.drain(..).collect();
        for index in staged {
            if self.running.contains_key(&index) {
                continue;
            }
            if let Some(effect) = self.effects.get(index) {
                let bound = effect.for_lights(data, lights, ctx, now);
                self.running.insert(index, bound);
            }
        }

        let mut out = LightUpdates::new();
        for bound in self.running.values() {
            merge_updates(&mut out, bound.evaluate(now));
        }
        out
    }

    fn evaluate_single(
        &mut self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> LightUpdates {
        if let Some(bound) = &self.bound {
            if !bound.is_running(now) {
                self.bound = None;
                if self.autoplay {
                    let len = self.effects.len();
                    self.cursor = Some((self.cursor.unwrap_or(0) + 1) % len);
                    self.play_next = true;
                } else if self.looped {
                    self.play_next = true;
                }
                // Otherwise: hold silent until explicitly retriggered.
            }
        }

        if self.bound.is_none() {
            let bind = if self.cursor.is_none() {
                self.cursor = Some(0);
                true
            } else {
                self.play_next
            };
            if bind {
                self.play_next = false;
                if let Some(effect) = self.cursor.and_then(|i| self.effects.get(i)) {
                    self.bound = Some(effect.for_lights(data, lights, ctx, now));
                }
            }
        }

        self.bound
            .as_ref()
            .map(|b| b.evaluate(now))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::engine::transition::TransitionSpec;
    use crate::engine::trigger::Trigger;
    use crate::events::EventDiff;
    use crate::model::{LightType, ParameterMapping, Value};

    fn lights() -> Vec<Arc<Light>> {
        let kind = Arc::new(
            LightType::new(
                "par",
                2,
                vec![
                    ParameterMapping::new("dim", 1),
                    ParameterMapping::new("strobe", 2),
                ],
            )
            .unwrap(),
        );
        vec![Arc::new(Light::new("l1", 1, kind))]
    }

    fn dim_effect(name: &str, duration: f64) -> EffectSpec {
        EffectSpec::new(
            name,
            vec![TransitionSpec::new("dim", duration, 0.0, 1.0).unwrap().into()],
        )
    }

    fn strobe_effect(name: &str, duration: f64) -> EffectSpec {
        EffectSpec::new(
            name,
            vec![TransitionSpec::new("strobe", duration, 0.0, 1.0)
                .unwrap()
                .into()],
        )
    }

    fn event(name: &str, value: f64) -> EventMap {
        [(name.to_owned(), EventDiff::from_scalar(value))]
            .into_iter()
            .collect()
    }

    #[test]
    fn autoplay_advances_on_expiry() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program = Program::new(
            "chase",
            vec![dim_effect("up", 1.0), strobe_effect("flash", 1.0)],
        );
        let data = EventMap::new();

        program.evaluate(&data, &lights, &mut ctx, 0.0);
        assert_eq!(program.cursor(), Some(0));
        let out = program.evaluate(&data, &lights, &mut ctx, 0.5);
        assert!(out.get("l1").unwrap().contains_key("dim"));

        // Effect 0 expires at t=1: the cursor advances and the next
        // effect rebinds without any trigger.
        program.evaluate(&data, &lights, &mut ctx, 1.5);
        assert_eq!(program.cursor(), Some(1));
        let out = program.evaluate(&data, &lights, &mut ctx, 2.0);
        assert!(out.get("l1").unwrap().contains_key("strobe"));

        // And wraps back around after that one expires too.
        program.evaluate(&data, &lights, &mut ctx, 3.0);
        assert_eq!(program.cursor(), Some(0));
    }

    #[test]
    fn manual_program_holds_after_expiry() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program =
            Program::new("hold", vec![dim_effect("up", 1.0), strobe_effect("flash", 1.0)]).manual();
        let data = EventMap::new();

        program.evaluate(&data, &lights, &mut ctx, 0.0);
        assert!(!program.evaluate(&data, &lights, &mut ctx, 0.5).is_empty());

        // Expired without autoplay or loop: nothing until retriggered.
        assert!(program.evaluate(&data, &lights, &mut ctx, 2.0).is_empty());
        assert!(program.evaluate(&data, &lights, &mut ctx, 2.5).is_empty());

        program.next();
        program.evaluate(&data, &lights, &mut ctx, 3.0);
        assert_eq!(program.cursor(), Some(1));
        let out = program.evaluate(&data, &lights, &mut ctx, 3.5);
        assert!(out.get("l1").unwrap().contains_key("strobe"));
    }

    #[test]
    fn looping_replays_current_effect() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program = Program::new("pulse", vec![dim_effect("up", 1.0)])
            .manual()
            .looping();
        let data = EventMap::new();

        program.evaluate(&data, &lights, &mut ctx, 0.0);
        // Expiry rebinds the same effect with a fresh start time; the
        // midpoint value proves the restart.
        program.evaluate(&data, &lights, &mut ctx, 1.5);
        assert_eq!(program.cursor(), Some(0));
        let out = program.evaluate(&data, &lights, &mut ctx, 2.0);
        let Some(Value::Number(v)) = out.get("l1").unwrap().get("dim").cloned() else {
            panic!("expected dim value")
        };
        assert_eq!(v, 0.5);
    }

    #[test]
    fn run_and_stop_triggers_flip_running() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program = Program::new("gated", vec![dim_effect("up", 10.0)]);
        program.triggers.stop = Some(Trigger::new("ctl/stop", 0.5).into());
        program.triggers.run = Some(Trigger::new("ctl/run", 0.5).into());

        program.run_triggers(&event("ctl/stop", 1.0), 0.0, &mut ctx);
        assert!(!program.is_running());
        assert!(program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0).is_empty());

        program.run_triggers(&event("ctl/run", 1.0), 1.0, &mut ctx);
        assert!(program.is_running());
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 1.0);
        assert!(!program.evaluate(&EventMap::new(), &lights, &mut ctx, 2.0).is_empty());
    }

    #[test]
    fn select_trigger_jumps_cursor() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut effects = vec![dim_effect("up", 5.0), strobe_effect("flash", 1.0)];
        effects.get_mut(1).unwrap().triggers.select = Some(Trigger::new("ctl/select", 0.5).into());
        let mut program = Program::new("sel", effects).manual();

        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        assert_eq!(program.cursor(), Some(0));

        // Select fires mid-run: the running effect is discarded and the
        // cursor lands on the selected index.
        program.run_triggers(&event("ctl/select", 1.0), 1.0, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 1.0);
        assert_eq!(program.cursor(), Some(1));
        let out = program.evaluate(&EventMap::new(), &lights, &mut ctx, 1.5);
        assert!(out.get("l1").unwrap().contains_key("strobe"));
    }

    #[test]
    fn multiple_mode_stages_without_duplicates() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut effects = vec![dim_effect("up", 1.0), strobe_effect("flash", 1.0)];
        effects.get_mut(1).unwrap().triggers.run = Some(Trigger::new("audio/onset", 0.5).into());
        let mut program = Program::new("hits", effects).multiple_mode();

        // Trigger stages and binds the effect.
        program.run_triggers(&event("audio/onset", 1.0), 0.0, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        assert_eq!(program.running.len(), 1);

        // Re-triggering while still running must not duplicate it.
        program.run_triggers(&event("audio/onset", 1.0), 0.5, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.5);
        assert_eq!(program.running.len(), 1);

        // On the tick it expires it may fire again: expiry runs first,
        // so the re-trigger stages a fresh instance.
        program.run_triggers(&event("audio/onset", 1.0), 1.5, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 1.5);
        assert_eq!(program.running.len(), 1);
        let out = program.evaluate(&EventMap::new(), &lights, &mut ctx, 1.6);
        let Some(Value::Number(v)) = out.get("l1").unwrap().get("strobe").cloned() else {
            panic!("expected strobe value")
        };
        // Fresh bind at t=1.5, evaluated at t=1.6.
        assert!((v - 0.1).abs() < 1e-9);
    }

    #[test]
    fn multiple_merges_in_staging_order() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut effects = vec![
            EffectSpec::new(
                "low",
                vec![TransitionSpec::new("dim", 4.0, 0.0, 0.4).unwrap().into()],
            ),
            EffectSpec::new(
                "high",
                vec![TransitionSpec::new("dim", 4.0, 0.0, 1.0).unwrap().into()],
            ),
        ];
        effects.get_mut(0).unwrap().triggers.run = Some(Trigger::new("a", 0.5).into());
        effects.get_mut(1).unwrap().triggers.run = Some(Trigger::new("b", 0.5).into());
        let mut program = Program::new("layered", effects).multiple_mode();

        let mut data = event("a", 1.0);
        data.extend(event("b", 1.0));
        program.run_triggers(&data, 0.0, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);

        // Both run; the later-staged effect wins the shared parameter.
        let out = program.evaluate(&EventMap::new(), &lights, &mut ctx, 2.0);
        let Some(Value::Number(v)) = out.get("l1").unwrap().get("dim").cloned() else {
            panic!("expected dim value")
        };
        assert_eq!(v, 0.5); // effect "high" midpoint, not "low"'s 0.2
    }

    #[test]
    fn stage_all_mode_runs_everything() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program = Program::new(
            "wall",
            vec![dim_effect("up", 1.0), strobe_effect("flash", 1.0)],
        )
        .multiple_mode()
        .stage_all();

        program.run_triggers(&EventMap::new(), 0.0, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        let out = program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.5);
        let params = out.get("l1").unwrap();
        assert!(params.contains_key("dim"));
        assert!(params.contains_key("strobe"));
    }

    #[test]
    fn random_trigger_stages_an_idle_effect() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(5);
        let mut program = Program::new(
            "surprise",
            vec![dim_effect("up", 1.0), strobe_effect("flash", 1.0)],
        )
        .multiple_mode();
        program.triggers.random = Some(Trigger::new("audio/drop", 0.5).into());

        program.run_triggers(&event("audio/drop", 1.0), 0.0, &mut ctx);
        program.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        assert_eq!(program.running.len(), 1);
    }
}
