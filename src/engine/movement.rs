use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::ShowError;
use crate::events::{beat_seconds, EventMap};
use crate::model::{Easing, Light, LightFilter};

use super::transition::Timing;

/// A pan/tilt position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanTilt {
    pub pan: f64,
    pub tilt: f64,
}

impl PanTilt {
    pub const fn new(pan: f64, tilt: f64) -> Self {
        Self { pan, tilt }
    }
}

/// Parametric 2-axis path, in fixture degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MovementPath {
    /// Orbit around a center: angle sweeps 0→360° over the duration.
    Circle { center: PanTilt, radius: f64 },
    /// Linear interpolation along a closed polygon of points.
    Points(Vec<PanTilt>),
}

impl MovementPath {
    pub fn circle(pan: f64, tilt: f64, radius: f64) -> Self {
        MovementPath::Circle {
            center: PanTilt::new(pan, tilt),
            radius,
        }
    }

    pub fn points(points: Vec<PanTilt>) -> Result<Self, ShowError> {
        if points.is_empty() {
            return Err(ShowError::EmptyPath);
        }
        Ok(MovementPath::Points(points))
    }

    /// Four corners of a `size`-degree square around a center.
    pub fn square(pan: f64, tilt: f64, size: f64) -> Self {
        let h = size / 2.0;
        MovementPath::Points(vec![
            PanTilt::new(pan - h, tilt - h),
            PanTilt::new(pan + h, tilt - h),
            PanTilt::new(pan + h, tilt + h),
            PanTilt::new(pan - h, tilt + h),
        ])
    }

    /// Back-and-forth path between two distinct endpoints.
    pub fn sweep(from: PanTilt, to: PanTilt) -> Result<Self, ShowError> {
        if from == to {
            return Err(ShowError::DegenerateSweep);
        }
        Ok(MovementPath::Points(vec![from, to]))
    }

    /// Shift the whole path and wrap pan/tilt into the light's declared
    /// travel via modulo (spread offsets are cyclic, not clamped).
    fn offset_wrapped(&self, d_pan: f64, d_tilt: f64, ranges: Option<(f64, f64)>) -> Self {
        let wrap = |v: f64, range: Option<f64>| match range {
            Some(r) if r > 0.0 => v.rem_euclid(r),
            _ => v,
        };
        let (pan_range, tilt_range) = match ranges {
            Some((p, t)) => (Some(p), Some(t)),
            None => (None, None),
        };
        let shift = |p: &PanTilt| {
            PanTilt::new(wrap(p.pan + d_pan, pan_range), wrap(p.tilt + d_tilt, tilt_range))
        };
        match self {
            MovementPath::Circle { center, radius } => MovementPath::Circle {
                center: shift(center),
                radius: *radius,
            },
            MovementPath::Points(points) => {
                MovementPath::Points(points.iter().map(shift).collect())
            }
        }
    }

    /// Position along the path at eased progress. For circles the whole
    /// progress is eased into an angle; for polygons the segment index
    /// comes from raw progress and only the intra-segment fraction is
    /// eased.
    fn position(&self, percent: f64, easing: Easing) -> Option<PanTilt> {
        match self {
            MovementPath::Circle { center, radius } => {
                let angle = easing.evaluate(percent) * 360.0;
                let rot = angle.to_radians();
                Some(PanTilt::new(
                    center.pan + rot.sin() * radius,
                    center.tilt + rot.cos() * radius,
                ))
            }
            MovementPath::Points(points) => {
                let n = points.len();
                if n == 0 {
                    return None;
                }
                if n == 1 {
                    return points.first().copied();
                }
                let scaled = percent * n as f64;
                let (segment, fraction) = if scaled >= n as f64 {
                    (n - 1, 1.0)
                } else {
                    (scaled.floor() as usize, scaled.fract())
                };
                let a = points.get(segment)?;
                let b = points.get((segment + 1) % n)?;
                let m = easing.evaluate(fraction);
                Some(PanTilt::new(
                    a.pan + (b.pan - a.pan) * m,
                    a.tilt + (b.tilt - a.tilt) * m,
                ))
            }
        }
    }
}

/// Field a movement spread offset applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementField {
    Duration,
    Delay,
    Pan,
    Tilt,
}

/// A movement template: a path plus the same timing controls a scalar
/// transition has. Binds against lights that declare pan/tilt travel;
/// lights without it bind but contribute nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementSpec {
    pub path: MovementPath,
    pub duration: f64,
    pub delay: f64,
    pub duration_beats: Option<f64>,
    pub delay_beats: Option<f64>,
    pub easing: Easing,
    /// Per-light-index offsets; pan/tilt offsets wrap into the light's
    /// declared travel.
    pub spread: Vec<(MovementField, f64)>,
    pub filter: LightFilter,
}

impl MovementSpec {
    pub fn new(path: MovementPath, duration: f64) -> Self {
        Self {
            path,
            duration,
            delay: 0.0,
            duration_beats: None,
            delay_beats: None,
            easing: Easing::Linear,
            spread: Vec::new(),
            filter: LightFilter::default(),
        }
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

    pub fn with_spread(mut self, field: MovementField, step: f64) -> Self {
        self.spread.push((field, step));
        self
    }

    pub fn with_filter(mut self, filter: LightFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn for_lights(
        &self,
        lights: &[Arc<Light>],
        data: &EventMap,
        now: f64,
    ) -> Vec<BoundMovement> {
        let targets = self.filter.apply(lights);
        let mut out = Vec::with_capacity(targets.len());

        for (index, light) in targets.iter().enumerate() {
            let ranges = light.kind().pan_tilt_ranges();

            let mut duration = self
                .duration_beats
                .and_then(|b| beat_seconds(data, b))
                .unwrap_or(self.duration);
            let mut delay = self
                .delay_beats
                .and_then(|b| beat_seconds(data, b))
                .unwrap_or(self.delay);
            let mut d_pan = 0.0;
            let mut d_tilt = 0.0;
            for (field, step) in &self.spread {
                let offset = index as f64 * step;
                match field {
                    MovementField::Duration => duration = (duration + offset).max(0.0),
                    MovementField::Delay => delay = (delay + offset).max(0.0),
                    MovementField::Pan => d_pan += offset,
                    MovementField::Tilt => d_tilt += offset,
                }
            }

            out.push(BoundMovement {
                light: light.name().to_owned(),
                path: self.path.offset_wrapped(d_pan, d_tilt, ranges),
                ranges,
                easing: self.easing,
                timing: Timing {
                    duration,
                    delay,
                    started_at: now,
                },
            });
        }
        out
    }
}

/// A movement bound to one light. Produces normalized raw pan/tilt
/// values, clamped to the light's declared travel.
#[derive(Debug, Clone)]
pub struct BoundMovement {
    pub light: String,
    pub path: MovementPath,
    /// Declared (pan, tilt) travel in degrees; `None` means this light
    /// cannot move and the transition never produces a value.
    pub ranges: Option<(f64, f64)>,
    pub easing: Easing,
    pub timing: Timing,
}

impl BoundMovement {
    pub fn is_running(&self, now: f64) -> bool {
        self.timing.is_running(now)
    }

    /// Normalized (pan, tilt) raw values at `now`, or nothing before
    /// the delay elapses or on a light with no declared travel.
    pub fn value(&self, now: f64) -> Option<PanTilt> {
        let (pan_range, tilt_range) = self.ranges?;
        let percent = self.timing.percent(now).min(1.0);
        if percent <= 0.0 {
            return None;
        }
        let pos = self.path.position(percent, self.easing)?;
        Some(PanTilt::new(
            pos.pan.clamp(0.0, pan_range) / pan_range,
            pos.tilt.clamp(0.0, tilt_range) / tilt_range,
        ))
    }
}
