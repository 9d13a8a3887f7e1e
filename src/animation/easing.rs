// easing.rs — 缓动函数

use serde::{Deserialize, Serialize};

/// Easing curve applied to normalized tween progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    Linear,
    QuadraticOut,
    #[default]
    CubicOut,
    QuadraticInOut,
}

impl Easing {
    /// 输入 t 会被夹取到 [0, 1]，输出同样落在 [0, 1]
    #[inline]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::QuadraticOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt
            }
            Easing::CubicOut => {
                let omt = 1.0 - t;
                1.0 - omt * omt * omt
            }
            Easing::QuadraticInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u / 2.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 4] = [
        Easing::Linear,
        Easing::QuadraticOut,
        Easing::CubicOut,
        Easing::QuadraticInOut,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for easing in ALL {
            assert_eq!(easing.apply(0.0), 0.0, "{easing:?}");
            assert!((easing.apply(1.0) - 1.0).abs() < 1e-6, "{easing:?}");
        }
    }

    #[test]
    fn input_is_clamped() {
        for easing in ALL {
            assert_eq!(easing.apply(-0.5), 0.0);
            assert!((easing.apply(1.5) - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn ease_out_front_loads_progress() {
        assert!(Easing::QuadraticOut.apply(0.25) > 0.25);
        assert!(Easing::CubicOut.apply(0.25) > Easing::QuadraticOut.apply(0.25));
    }

    #[test]
    fn in_out_is_symmetric() {
        let e = Easing::QuadraticInOut;
        assert!((e.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((e.apply(0.2) + e.apply(0.8) - 1.0).abs() < 1e-6);
    }
}
