//! The show engine: the Transition → Effect → Program → Scene →
//! SceneController scheduling hierarchy plus the trigger layer that
//! drives it. Everything here is pure computation over the tick's
//! event data and an explicit `now` timestamp.

pub mod context;
pub mod effect;
pub mod movement;
pub mod program;
pub mod scene;
pub mod transition;
pub mod trigger;

pub use context::{CycleDirection, ShowContext};
pub use effect::{merge_updates, BoundEffect, EffectSpec, EffectTriggers, LightUpdates, TransitionNode};
pub use movement::{BoundMovement, MovementField, MovementPath, MovementSpec, PanTilt};
pub use program::{Program, ProgramTriggers};
pub use scene::{ControllerTriggers, Scene, SceneController, SceneTriggers};
pub use transition::{BoundTransition, Timing, TransitionField, TransitionSpec, ValueSpec};
pub use trigger::{Comparison, Trigger, TriggerExpr};
