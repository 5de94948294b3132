//! Decodes the two contacts of a mechanical rotary encoder into single detent steps.
//!
//! Contacts bounce, and polling a bouncing contact naively produces bursts of spurious steps in both directions.
//! [`RotaryDecoder`] only reports a step once the contacts have walked through a complete Gray-code cycle and come back
//! to rest, so chatter on one contact merely moves the decoder back and forth between intermediate states.

/// Result of processing one reading of the encoder's contacts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// No complete step since the previous reading.
    #[default]
    None,
    /// One detent clockwise.
    Clockwise,
    /// One detent counter-clockwise.
    CounterClockwise,
}

const START: u8 = 0x0;
const CW_FINAL: u8 = 0x1;
const CW_BEGIN: u8 = 0x2;
const CW_NEXT: u8 = 0x3;
const CCW_BEGIN: u8 = 0x4;
const CCW_FINAL: u8 = 0x5;
const CCW_NEXT: u8 = 0x6;

const EMIT_CW: u8 = 0x10;
const EMIT_CCW: u8 = 0x20;
const STATE_MASK: u8 = 0x0f;

/// Next state, indexed by current state and then by the contact reading `(b << 1) | a`.
///
/// Both contacts read high at rest (pulled up, open).
const TRANSITIONS: [[u8; 4]; 7] = [
    // START
    [START, CW_BEGIN, CCW_BEGIN, START],
    // CW_FINAL
    [CW_NEXT, START, CW_FINAL, START | EMIT_CW],
    // CW_BEGIN
    [CW_NEXT, CW_BEGIN, START, START],
    // CW_NEXT
    [CW_NEXT, CW_BEGIN, CW_FINAL, START],
    // CCW_BEGIN
    [CCW_NEXT, START, CCW_BEGIN, START],
    // CCW_FINAL
    [CCW_NEXT, CCW_FINAL, START, START | EMIT_CCW],
    // CCW_NEXT
    [CCW_NEXT, CCW_FINAL, CCW_BEGIN, START],
];

/// Full-step quadrature decoder for one encoder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RotaryDecoder {
    state: u8,
}

impl RotaryDecoder {
    /// Constructs a decoder which assumes the encoder is resting on a detent.
    pub const fn new() -> Self {
        Self { state: START }
    }

    /// Feeds the current level of both contacts (`true` = high) to the decoder. Returns the completed step, if any.
    ///
    /// Meant to be called on every pass through the control loop; readings that do not change the contacts are
    /// harmless.
    pub fn process(&mut self, a: bool, b: bool) -> Direction {
        let reading = (usize::from(b) << 1) | usize::from(a);
        let next = TRANSITIONS[usize::from(self.state & STATE_MASK)][reading];
        self.state = next & STATE_MASK;

        match next & !STATE_MASK {
            EMIT_CW => Direction::Clockwise,
            EMIT_CCW => Direction::CounterClockwise,
            _ => Direction::None,
        }
    }
}
