//! A built-in demo rig: real fixture profiles, a small patched light
//! set, and a scene graph that exercises autoplay chases, triggered
//! concurrent effects, movement paths, and beat-relative timing.

use std::sync::Arc;

use crate::engine::{
    EffectSpec, MovementField, MovementPath, MovementSpec, PanTilt, Program, Scene,
    SceneController, TransitionField, TransitionSpec, Trigger, ValueSpec,
};
use crate::error::ShowError;
use crate::model::{ConditionalRanges, Light, LightFilter, LightType, OutputRange, ParameterMapping};
use crate::rig::Rig;

/// 11-channel gobo moving head with 16-bit pan/tilt.
fn gobo_spot() -> Result<LightType, ShowError> {
    LightType::new(
        "GoboSpot540",
        11,
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
            ParameterMapping::new("color", 5).with_labels([
                ("white", (0, 9)),
                ("yellow", (10, 19)),
                ("orange", (20, 29)),
                ("cyan", (30, 39)),
                ("blue", (40, 49)),
                ("green", (50, 59)),
                ("pink", (60, 69)),
                ("red", (70, 79)),
            ]),
            ParameterMapping::new("gobo", 6).with_labels([
                ("open", (0, 7)),
                ("broken_circle", (8, 15)),
                ("burst", (16, 23)),
                ("spot_circle", (24, 31)),
                ("square_spots", (32, 39)),
                ("droplets", (40, 47)),
                ("swirl", (48, 55)),
                ("stripes", (56, 63)),
            ]),
            ParameterMapping::new("strobe", 7).inverted(),
            ParameterMapping::new("dim", 8),
            ParameterMapping::new("speed", 9).inverted(),
            ParameterMapping::new("mode", 10).with_labels([
                ("manual", (0, 59)),
                ("auto", (60, 159)),
                ("sound", (160, 255)),
            ]),
            ParameterMapping::new("reset", 11).with_reset(1, 255),
        ],
    )
}

/// 18-channel RGB wash head; the `rgb` parameter fans across the three
/// color channels.
fn wash_head() -> Result<LightType, ShowError> {
    LightType::new(
        "Wash6in1",
        18,
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
            ParameterMapping::new("speed", 5).inverted(),
            ParameterMapping::new("dim", 6),
            ParameterMapping::new("strobe", 7),
            ParameterMapping::new("rgb", None).multi(["red", "green", "blue"]),
            ParameterMapping::new("red", 8),
            ParameterMapping::new("green", 9),
            ParameterMapping::new("blue", 10),
            ParameterMapping::new("white", 11),
            ParameterMapping::new("amber", 12),
            ParameterMapping::new("uv", 13),
            ParameterMapping::new("mode", 14).with_labels([
                ("manual", (0, 15)),
                ("auto", (16, 128)),
                ("sound", (129, 255)),
            ]),
            ParameterMapping::new("motor_sens", 15),
            ParameterMapping::new("effect", 16),
            ParameterMapping::new("led_sens", 17),
            ParameterMapping::new("reset", 18).with_reset(1, 255),
        ],
    )
}

/// 7-channel laser whose pattern table depends on the selected mode.
fn color_laser() -> Result<LightType, ShowError> {
    LightType::new(
        "ColorLaser4",
        7,
        vec![
            ParameterMapping::new("mode", 1).with_labels([
                ("off", (0, 49)),
                ("static", (50, 99)),
                ("dynamic", (100, 149)),
                ("sound", (150, 199)),
            ]),
            ParameterMapping::new("pattern", 2).with_conditional_labels(vec![
                ConditionalRanges {
                    parameter: "mode".into(),
                    equals: "static".into(),
                    ranges: [
                        ("circle".into(), OutputRange::new(0, 4)),
                        ("dot_circle".into(), OutputRange::new(5, 9)),
                        ("horiz_line".into(), OutputRange::new(20, 24)),
                        ("vert_line".into(), OutputRange::new(30, 34)),
                        ("square".into(), OutputRange::new(100, 104)),
                        ("wave_line".into(), OutputRange::new(230, 234)),
                    ]
                    .into_iter()
                    .collect(),
                },
                ConditionalRanges {
                    parameter: "mode".into(),
                    equals: "dynamic".into(),
                    ranges: [
                        ("circle_to_big".into(), OutputRange::new(0, 4)),
                        ("circle_flash".into(), OutputRange::new(15, 19)),
                        ("circle_roll".into(), OutputRange::new(25, 29)),
                        ("line_scan".into(), OutputRange::new(115, 119)),
                        ("wave_flowing".into(), OutputRange::new(235, 239)),
                    ]
                    .into_iter()
                    .collect(),
                },
            ]),
            ParameterMapping::new("x", 3),
            ParameterMapping::new("y", 4),
            ParameterMapping::new("scan_speed", 5).inverted(),
            ParameterMapping::new("pattern_speed", 6).inverted(),
            ParameterMapping::new("pattern_size", 7),
        ],
    )
}

/// Patch the demo light set: gobo spots across the back and middle,
/// wash heads up front, one laser.
#[allow(clippy::unwrap_used)] // hardcoded profiles are valid by construction
fn demo_lights() -> Vec<Arc<Light>> {
    let spot = Arc::new(gobo_spot().unwrap());
    let wash = Arc::new(wash_head().unwrap());
    let laser = Arc::new(color_laser().unwrap());

    vec![
        Arc::new(Light::new("back_1", 1, spot.clone()).with_groups(["back", "movers"])),
        Arc::new(Light::new("back_2", 12, spot.clone()).with_groups(["back", "movers"])),
        Arc::new(Light::new("mid_1", 23, spot.clone()).with_groups(["mid", "movers"])),
        Arc::new(Light::new("mid_2", 34, spot.clone()).with_groups(["mid", "movers"])),
        Arc::new(Light::new("mid_3", 45, spot.clone()).with_groups(["mid", "movers"])),
        Arc::new(Light::new("mid_4", 56, spot).with_groups(["mid", "movers"])),
        Arc::new(Light::new("front_1", 67, wash.clone()).with_groups(["front", "wash"])),
        Arc::new(Light::new("front_2", 85, wash).with_groups(["front", "wash"])),
        Arc::new(Light::new("laser_1", 103, laser).with_groups(["laser"])),
    ]
}

/// The ambient scene: a beat-synced color walk on the movers, a shared
/// random wash color up front, and a slow staggered orbit.
#[allow(clippy::unwrap_used)] // hardcoded endpoints differ by construction
fn ambient_scene() -> Scene {
    let color_walk = EffectSpec::new(
        "color_walk",
        vec![
            TransitionSpec::new("dim", 2.0, ValueSpec::Current, 1.0)
                .unwrap()
                .with_spread(TransitionField::Delay, 0.25)
                .into(),
            TransitionSpec::new("color", 1.0, ValueSpec::Current, ValueSpec::Cycle)
                .unwrap()
                .with_duration_beats(8.0)
                .into(),
        ],
    )
    .with_filter(LightFilter::grouped(["movers"]));

    let wash_drift = EffectSpec::new(
        "wash_drift",
        vec![
            TransitionSpec::new("dim", 4.0, ValueSpec::Current, "@audio/level/rms")
                .unwrap()
                .into(),
            // One random color per pass, shared across both wash heads.
            TransitionSpec::new("rgb", 4.0, ValueSpec::Current, ValueSpec::RandomRgb)
                .unwrap()
                .keeping([TransitionField::EndValue])
                .into(),
        ],
    )
    .with_filter(LightFilter::grouped(["wash"]));

    let orbit = EffectSpec::new(
        "orbit",
        vec![MovementSpec::new(MovementPath::circle(180.0, 180.0, 20.0), 2.0)
            .with_duration_beats(4.0)
            .with_spread(MovementField::Pan, 50.0)
            .into()],
    )
    .with_filter(LightFilter::grouped(["movers"]));

    Scene::new(
        "ambient",
        vec![
            Program::new("mover_colors", vec![color_walk]),
            Program::new("washes", vec![wash_drift]).looping().manual(),
            Program::new("orbit", vec![orbit]).looping().manual(),
        ],
    )
    .with_select_trigger(Trigger::new("ctl/scene/ambient", 0.5))
}

/// The drop scene: concurrent audio-triggered hits plus a fast sweep.
#[allow(clippy::unwrap_used)] // hardcoded endpoints differ by construction
fn drop_scene() -> Scene {
    let white_flash = EffectSpec::new(
        "white_flash",
        vec![
            TransitionSpec::new("dim", 0.3, 1.0, 0.0).unwrap().into(),
            TransitionSpec::new("color", 0.2, ValueSpec::Current, "white")
                .unwrap()
                .into(),
        ],
    )
    .with_filter(LightFilter::grouped(["back"]))
    .with_run_trigger(Trigger::new("audio/onset/kick", 0.6).with_cooldown_beats(1.0));

    let gobo_punch = EffectSpec::new(
        "gobo_punch",
        vec![
            TransitionSpec::new("gobo", 0.2, ValueSpec::Current, ValueSpec::Random)
                .unwrap()
                .into(),
            TransitionSpec::new("dim", 0.6, 1.0, 0.3).unwrap().into(),
        ],
    )
    .with_filter(LightFilter::grouped(["mid"]))
    .with_run_trigger(Trigger::new("audio/onset/snare", 0.5).with_cooldown(0.5));

    let laser_burst = EffectSpec::new(
        "laser_burst",
        vec![
            TransitionSpec::new("mode", 0.1, ValueSpec::Current, "dynamic")
                .unwrap()
                .into(),
            TransitionSpec::new("pattern", 2.0, ValueSpec::Current, ValueSpec::Next)
                .unwrap()
                .into(),
        ],
    )
    .with_filter(LightFilter::grouped(["laser"]))
    .with_run_trigger(Trigger::new("audio/level/rms", 0.7).with_cooldown(2.0));

    let sweep = EffectSpec::new(
        "sweep",
        vec![MovementSpec::new(
            MovementPath::sweep(PanTilt::new(120.0, 110.0), PanTilt::new(420.0, 110.0)).unwrap(),
            1.0,
        )
        .with_duration_beats(2.0)
        .with_spread(MovementField::Tilt, 15.0)
        .into()],
    )
    .with_filter(LightFilter::grouped(["movers"]));

    Scene::new(
        "drop",
        vec![
            Program::new("hits", vec![white_flash, gobo_punch, laser_burst]).multiple_mode(),
            Program::new("sweeps", vec![sweep]).looping().manual(),
        ],
    )
    .with_select_trigger(Trigger::new("ctl/scene/drop", 0.5))
}

/// Assemble the full demo rig.
pub fn create_demo_rig() -> Result<Rig, ShowError> {
    let mut controller = SceneController::new(vec![ambient_scene(), drop_scene()]);
    controller.triggers.next = Some(Trigger::new("ctl/scene/next", 0.5).into());
    Rig::new(demo_lights(), controller)
}
