use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::events::EventMap;
use crate::model::Light;

use super::context::ShowContext;
use super::effect::{merge_updates, LightUpdates};
use super::program::Program;
use super::trigger::TriggerExpr;

/// Scene-level trigger slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneTriggers {
    /// Evaluated by the scene controller: fires to make this scene the
    /// active one.
    pub select: Option<TriggerExpr>,
}

/// A named group of programs. Owns no render state of its own: it
/// forwards triggers and merges child outputs, later programs
/// overwriting earlier ones per (light, parameter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    programs: Vec<Program>,
    pub triggers: SceneTriggers,
}

impl Scene {
    pub fn new(name: impl Into<String>, programs: Vec<Program>) -> Self {
        Self {
            name: name.into(),
            programs,
            triggers: SceneTriggers::default(),
        }
    }

    pub fn with_select_trigger(mut self, expr: impl Into<TriggerExpr>) -> Self {
        self.triggers.select = Some(expr.into());
        self
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn programs_mut(&mut self) -> &mut [Program] {
        &mut self.programs
    }

    /// Forward the tick's data to every child program. If any program's
    /// select trigger fires, each sibling with autoplay set is forced
    /// to run exactly when it is the selected one — selecting one
    /// autoplay program silences the others.
    pub fn run_triggers(&mut self, data: &EventMap, now: f64, ctx: &mut ShowContext) {
        let mut selected = None;
        for (index, program) in self.programs.iter_mut().enumerate() {
            if let Some(t) = program.triggers.select.as_mut() {
                if t.evaluate(data, now) {
                    selected = Some(index);
                }
            }
            program.run_triggers(data, now, ctx);
        }
        if let Some(selected) = selected {
            for (index, program) in self.programs.iter_mut().enumerate() {
                if program.autoplay() {
                    program.set_running(index == selected);
                }
            }
        }
    }

    pub fn evaluate(
        &mut self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> LightUpdates {
        let mut out = LightUpdates::new();
        for program in &mut self.programs {
            merge_updates(&mut out, program.evaluate(data, lights, ctx, now));
        }
        out
    }
}

/// Controller-level trigger slots for scene navigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerTriggers {
    pub next: Option<TriggerExpr>,
    pub prev: Option<TriggerExpr>,
    pub random: Option<TriggerExpr>,
}

/// Top-level container: an ordered list of scenes and a cursor to the
/// active one. Navigation mirrors a single-mode program's cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneController {
    scenes: Vec<Scene>,
    cursor: usize,
    pub triggers: ControllerTriggers,
}

impl SceneController {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self {
            scenes,
            cursor: 0,
            triggers: ControllerTriggers::default(),
        }
    }

    pub fn with_triggers(mut self, triggers: ControllerTriggers) -> Self {
        self.triggers = triggers;
        self
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active(&self) -> Option<&Scene> {
        self.scenes.get(self.cursor)
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn next(&mut self) {
        self.advance(1);
    }

    pub fn prev(&mut self) {
        self.advance(-1);
    }

    pub fn random(&mut self, ctx: &mut ShowContext) {
        if self.scenes.is_empty() {
            return;
        }
        self.cursor = ctx.rng().gen_range(0..self.scenes.len());
    }

    pub fn select(&mut self, index: usize) {
        if index < self.scenes.len() {
            self.cursor = index;
        }
    }

    fn advance(&mut self, step: isize) {
        let len = self.scenes.len() as isize;
        if len == 0 {
            return;
        }
        self.cursor = (self.cursor as isize + step).rem_euclid(len) as usize;
    }

    /// Run the tick's trigger pass. Every scene's own select trigger is
    /// evaluated (an inactive scene can grab the cursor), but program
    /// and effect triggers run only for the active scene — inactive
    /// scenes must not stage effects or burn cooldowns invisibly.
    pub fn run_triggers(&mut self, data: &EventMap, now: f64, ctx: &mut ShowContext) {
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
                let len = self.scenes.len();
                if len > 0 {
                    self.cursor = ctx.rng().gen_range(0..len);
                }
            }
        }

        let mut selected = None;
        for (index, scene) in self.scenes.iter_mut().enumerate() {
            if let Some(t) = scene.triggers.select.as_mut() {
                if t.evaluate(data, now) {
                    selected = Some(index);
                }
            }
        }
        if let Some(index) = selected {
            self.cursor = index;
        }

        if let Some(scene) = self.scenes.get_mut(self.cursor) {
            scene.run_triggers(data, now, ctx);
        }
    }

    /// Evaluate the active scene.
    pub fn evaluate(
        &mut self,
        data: &EventMap,
        lights: &[Arc<Light>],
        ctx: &mut ShowContext,
        now: f64,
    ) -> LightUpdates {
        self.scenes
            .get_mut(self.cursor)
            .map(|s| s.evaluate(data, lights, ctx, now))
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::effect::EffectSpec;
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

    fn program(name: &str, parameter: &str, end: f64) -> Program {
        Program::new(
            name,
            vec![EffectSpec::new(
                format!("{name}_fx"),
                vec![TransitionSpec::new(parameter, 10.0, 0.0, end)
                    .unwrap()
                    .into()],
            )],
        )
    }

    fn event(name: &str, value: f64) -> EventMap {
        [(name.to_owned(), EventDiff::from_scalar(value))]
            .into_iter()
            .collect()
    }

    #[test]
    fn scene_merges_with_later_program_winning() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(9);
        let mut scene = Scene::new(
            "main",
            vec![program("base", "dim", 0.4), program("top", "dim", 1.0)],
        );

        scene.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        let out = scene.evaluate(&EventMap::new(), &lights, &mut ctx, 5.0);
        let Some(Value::Number(v)) = out.get("l1").unwrap().get("dim").cloned() else {
            panic!("expected dim value")
        };
        assert_eq!(v, 0.5); // "top"'s midpoint overwrites "base"'s 0.2
    }

    #[test]
    fn select_silences_sibling_autoplay_programs() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(9);
        let mut a = program("a", "dim", 1.0);
        a.triggers.select = Some(Trigger::new("ctl/select_a", 0.5).into());
        let mut b = program("b", "strobe", 1.0);
        b.triggers.select = Some(Trigger::new("ctl/select_b", 0.5).into());
        let manual = program("c", "dim", 0.7).manual().stopped();
        let mut scene = Scene::new("main", vec![a, b, manual]);

        scene.run_triggers(&event("ctl/select_b", 1.0), 0.0, &mut ctx);
        assert!(!scene.programs()[0].is_running());
        assert!(scene.programs()[1].is_running());
        // Non-autoplay siblings are untouched by selection.
        assert!(!scene.programs()[2].is_running());

        // Selecting the other flips the pair back.
        scene.run_triggers(&event("ctl/select_a", 1.0), 1.0, &mut ctx);
        assert!(scene.programs()[0].is_running());
        assert!(!scene.programs()[1].is_running());
    }

    #[test]
    fn controller_navigation_wraps() {
        let mut ctx = ShowContext::with_seed(9);
        let mut controller = SceneController::new(vec![
            Scene::new("one", vec![]),
            Scene::new("two", vec![]),
        ]);
        controller.triggers.next = Some(Trigger::new("ctl/next", 0.5).into());

        assert_eq!(controller.cursor(), 0);
        controller.run_triggers(&event("ctl/next", 1.0), 0.0, &mut ctx);
        assert_eq!(controller.cursor(), 1);
        controller.run_triggers(&event("ctl/next", 1.0), 1.0, &mut ctx);
        assert_eq!(controller.cursor(), 0);
        controller.prev();
        assert_eq!(controller.cursor(), 1);
    }

    #[test]
    fn scene_select_trigger_grabs_cursor() {
        let mut ctx = ShowContext::with_seed(9);
        let mut controller = SceneController::new(vec![
            Scene::new("one", vec![]),
            Scene::new("two", vec![])
                .with_select_trigger(Trigger::new("ctl/goto_two", 0.5)),
        ]);

        controller.run_triggers(&event("ctl/goto_two", 1.0), 0.0, &mut ctx);
        assert_eq!(controller.cursor(), 1);
        assert_eq!(controller.active().map(|s| s.name.as_str()), Some("two"));
    }

    #[test]
    fn only_active_scene_contributes() {
        let lights = lights();
        let mut ctx = ShowContext::with_seed(9);
        let mut controller = SceneController::new(vec![
            Scene::new("one", vec![program("dim_prog", "dim", 1.0)]),
            Scene::new("two", vec![program("strobe_prog", "strobe", 1.0)]),
        ]);

        controller.evaluate(&EventMap::new(), &lights, &mut ctx, 0.0);
        let out = controller.evaluate(&EventMap::new(), &lights, &mut ctx, 5.0);
        let params = out.get("l1").unwrap();
        assert!(params.contains_key("dim"));
        assert!(!params.contains_key("strobe"));

        controller.next();
        controller.evaluate(&EventMap::new(), &lights, &mut ctx, 5.0);
        let out = controller.evaluate(&EventMap::new(), &lights, &mut ctx, 7.0);
        let params = out.get("l1").unwrap();
        assert!(params.contains_key("strobe"));
    }
}
