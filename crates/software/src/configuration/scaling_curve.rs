use super::RAW_MAX;
use wmidi::{ControlValue, U7};

/// How a raw fader reading is turned into a 7-bit MIDI value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ScalingCurve {
    /// Plain proportional scaling, `128 * raw / 1024`.
    ///
    /// Because of integer truncation the top value of 127 is only reached in the last few counts of the throw. This
    /// is accepted behavior.
    Linear,
    /// Proportional scaling over `offset..=RAW_MAX`, `127 * (raw - offset) / (RAW_MAX - offset)`. Everything at or
    /// below `offset` maps to 0, compensating for a fader that does not rest at 0 V.
    DeadZone {
        /// Raw reading treated as the bottom of the fader's travel. Must be less than [`RAW_MAX`].
        offset: u16,
    },
}

impl ScalingCurve {
    /// Maps a raw reading to a MIDI value. Readings above [`RAW_MAX`] are treated as [`RAW_MAX`].
    pub fn map(&self, raw: u16) -> ControlValue {
        let raw = u32::from(raw.min(RAW_MAX));
        let value = match *self {
            Self::Linear => 128 * raw / (u32::from(RAW_MAX) + 1),
            Self::DeadZone { offset } => {
                let offset = u32::from(offset.min(RAW_MAX - 1));
                127 * raw.saturating_sub(offset) / (u32::from(RAW_MAX) - offset)
            }
        };
        // both arms top out at 127
        U7::from_u8_lossy(value as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEAD_ZONE: ScalingCurve = ScalingCurve::DeadZone { offset: 10 };

    fn map(curve: ScalingCurve, raw: u16) -> u8 {
        u8::from(curve.map(raw))
    }

    mod linear {
        use super::*;

        #[test]
        fn bottom_of_throw() {
            assert_eq!(0, map(ScalingCurve::Linear, 0), "Expected left but got right");
        }

        #[test]
        fn top_of_throw() {
            assert_eq!(127, map(ScalingCurve::Linear, 1023), "Expected left but got right");
        }

        #[test]
        fn truncates() {
            assert_eq!(0, map(ScalingCurve::Linear, 7), "Expected left but got right");
            assert_eq!(1, map(ScalingCurve::Linear, 8), "Expected left but got right");
            assert_eq!(64, map(ScalingCurve::Linear, 512), "Expected left but got right");
            assert_eq!(126, map(ScalingCurve::Linear, 1015), "Expected left but got right");
            assert_eq!(127, map(ScalingCurve::Linear, 1016), "Expected left but got right");
        }

        #[test]
        fn matches_formula_across_range() {
            for raw in 0..=RAW_MAX {
                let expected = (128 * u32::from(raw) / 1024) as u8;
                assert_eq!(expected, map(ScalingCurve::Linear, raw), "raw {}", raw);
                assert!(expected <= 127);
            }
        }

        #[test]
        fn saturates_out_of_range_readings() {
            assert_eq!(127, map(ScalingCurve::Linear, 4095), "Expected left but got right");
        }
    }

    mod dead_zone {
        use super::*;

        #[test]
        fn reading_at_offset_is_zero() {
            assert_eq!(0, map(DEAD_ZONE, 10), "Expected left but got right");
        }

        #[test]
        fn readings_below_offset_are_zero() {
            for raw in 0..10 {
                assert_eq!(0, map(DEAD_ZONE, raw), "raw {}", raw);
            }
        }

        #[test]
        fn top_of_throw() {
            assert_eq!(127, map(DEAD_ZONE, 1023), "Expected left but got right");
        }

        #[test]
        fn midpoint() {
            // 127 * 506 / 1013 = 63.43...
            assert_eq!(63, map(DEAD_ZONE, 516), "Expected left but got right");
        }

        #[test]
        fn matches_formula_across_range() {
            for raw in 0..=RAW_MAX {
                let expected = (127 * u32::from(raw).saturating_sub(10) / 1013) as u8;
                assert_eq!(expected, map(DEAD_ZONE, raw), "raw {}", raw);
                assert!(expected <= 127);
            }
        }

        #[test]
        fn offset_at_ceiling_does_not_divide_by_zero() {
            let curve = ScalingCurve::DeadZone { offset: RAW_MAX };
            assert_eq!(0, map(curve, 1022), "Expected left but got right");
            assert_eq!(127, map(curve, RAW_MAX), "Expected left but got right");
        }
    }
}
