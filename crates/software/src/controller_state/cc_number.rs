use crate::encoder::Direction;
use wmidi::{ControlFunction, U7};

/// The controller number a fader sends on.
///
/// Always within `1..=127`. Controller 0 (bank select) is deliberately out of reach so that turning an encoder all the
/// way down cannot make a fader start switching banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CcNumber(u8);

impl CcNumber {
    /// Lowest reachable controller number.
    pub const MIN: CcNumber = CcNumber(1);
    /// Highest reachable controller number.
    pub const MAX: CcNumber = CcNumber(127);

    /// Constructs a [`CcNumber`], clamping `number` into `1..=127`.
    pub fn new(number: u8) -> Self {
        Self(number.clamp(Self::MIN.0, Self::MAX.0))
    }

    /// Returns the number adjusted by one encoder step. Steps past either end leave the number unchanged.
    pub fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::None => self,
            Direction::Clockwise => Self(self.0.saturating_add(1).min(Self::MAX.0)),
            Direction::CounterClockwise => Self(self.0.saturating_sub(1).max(Self::MIN.0)),
        }
    }

    /// The [`ControlFunction`] to put in a Control Change message.
    pub fn control_function(self) -> ControlFunction {
        ControlFunction(U7::from_u8_lossy(self.0))
    }
}

impl From<CcNumber> for u8 {
    fn from(cc: CcNumber) -> Self {
        cc.0
    }
}
