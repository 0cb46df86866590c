use serde::{Deserialize, Serialize};

/// RGB color with normalized float channels in [0, 1]. Raw light state
/// stores colors in this form; byte conversion happens at the output
/// projection, not here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

/// The fixed palette random color draws pick from. Saturated primaries
/// and secondaries read better on stage than arbitrary float triples.
pub const PALETTE: &[(&str, Rgb)] = &[
    ("red", Rgb::new(1.0, 0.0, 0.0)),
    ("orange", Rgb::new(1.0, 0.5, 0.0)),
    ("yellow", Rgb::new(1.0, 1.0, 0.0)),
    ("green", Rgb::new(0.0, 1.0, 0.0)),
    ("cyan", Rgb::new(0.0, 1.0, 1.0)),
    ("blue", Rgb::new(0.0, 0.0, 1.0)),
    ("purple", Rgb::new(0.5, 0.0, 1.0)),
    ("magenta", Rgb::new(1.0, 0.0, 1.0)),
    ("white", Rgb::new(1.0, 1.0, 1.0)),
];

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }

    /// Look up a palette color by name.
    pub fn named(name: &str) -> Option<Rgb> {
        PALETTE
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
    }

    /// Clamp all channels into [0, 1].
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
        }
    }

    /// Convert to (hue, lightness, saturation), all in [0, 1].
    pub fn to_hls(self) -> (f64, f64, f64) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        if (max - min).abs() < f64::EPSILON {
            return (0.0, l, 0.0);
        }
        let range = max - min;
        let s = if l <= 0.5 {
            range / (max + min)
        } else {
            range / (2.0 - max - min)
        };
        let rc = (max - self.r) / range;
        let gc = (max - self.g) / range;
        let bc = (max - self.b) / range;
        let h = if (self.r - max).abs() < f64::EPSILON {
            bc - gc
        } else if (self.g - max).abs() < f64::EPSILON {
            2.0 + rc - bc
        } else {
            4.0 + gc - rc
        };
        ((h / 6.0).rem_euclid(1.0), l, s)
    }

    /// Convert from (hue, lightness, saturation), all in [0, 1].
    pub fn from_hls(h: f64, l: f64, s: f64) -> Self {
        if s <= 0.0 {
            return Self::new(l, l, l);
        }
        let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let m1 = 2.0 * l - m2;
        Self::new(
            hue_channel(m1, m2, h + 1.0 / 3.0),
            hue_channel(m1, m2, h),
            hue_channel(m1, m2, h - 1.0 / 3.0),
        )
    }

    /// Interpolate toward `other` in HLS space. Blending hue/lightness/
    /// saturation independently avoids the muddy midpoints a straight
    /// per-channel RGB blend produces near hue wraparound.
    pub fn blend_hls(self, other: Rgb, t: f64) -> Rgb {
        let (h1, l1, s1) = self.to_hls();
        let (h2, l2, s2) = other.to_hls();
        Rgb::from_hls(
            h1 + (h2 - h1) * t,
            l1 + (l2 - l1) * t,
            s1 + (s2 - s1) * t,
        )
    }
}

fn hue_channel(m1: f64, m2: f64, hue: f64) -> f64 {
    let hue = hue.rem_euclid(1.0);
    if hue < 1.0 / 6.0 {
        m1 + (m2 - m1) * hue * 6.0
    } else if hue < 0.5 {
        m2
    } else if hue < 2.0 / 3.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - hue) * 6.0
    } else {
        m1
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn approx_rgb(a: Rgb, b: Rgb) -> bool {
        approx(a.r, b.r) && approx(a.g, b.g) && approx(a.b, b.b)
    }

    #[test]
    fn hls_round_trip() {
        for &(_, c) in PALETTE {
            let (h, l, s) = c.to_hls();
            assert!(
                approx_rgb(Rgb::from_hls(h, l, s), c),
                "{c:?} did not survive HLS round trip"
            );
        }
    }

    #[test]
    fn grayscale_has_no_saturation() {
        let (h, l, s) = Rgb::new(0.4, 0.4, 0.4).to_hls();
        assert!(approx(h, 0.0));
        assert!(approx(l, 0.4));
        assert!(approx(s, 0.0));
    }

    #[test]
    fn blend_endpoints_are_exact() {
        let red = Rgb::new(1.0, 0.0, 0.0);
        let blue = Rgb::new(0.0, 0.0, 1.0);
        assert!(approx_rgb(red.blend_hls(blue, 0.0), red));
        assert!(approx_rgb(red.blend_hls(blue, 1.0), blue));
    }

    #[test]
    fn blend_midpoint_stays_saturated() {
        // HLS blending keeps full saturation between two saturated hues;
        // a per-channel RGB blend would pass through (0.5, 0, 0.5).
        let red = Rgb::new(1.0, 0.0, 0.0);
        let blue = Rgb::new(0.0, 0.0, 1.0);
        let mid = red.blend_hls(blue, 0.5);
        let (_, l, s) = mid.to_hls();
        assert!(approx(l, 0.5));
        assert!(approx(s, 1.0));
    }

    #[test]
    fn named_lookup() {
        assert_eq!(Rgb::named("red"), Some(Rgb::new(1.0, 0.0, 0.0)));
        assert_eq!(Rgb::named("mauve"), None);
    }
}
