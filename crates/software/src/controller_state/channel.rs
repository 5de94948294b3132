use super::CcNumber;
use wmidi::{ControlValue, U7};

/// One fader and the encoder that picks its controller number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelState {
    pub(super) cc_number: CcNumber,
    pub(super) current_value: ControlValue,
    pub(super) last_sent_value: ControlValue,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ChannelState {
    fn format(&self, fmt: defmt::Formatter) {
        let ChannelState {
            cc_number,
            current_value,
            last_sent_value,
        } = *self;
        defmt::write!(
            fmt,
            "ChannelState {{ cc_number: {}, current_value: {}, last_sent_value: {} }}",
            u8::from(cc_number),
            u8::from(current_value),
            u8::from(last_sent_value)
        );
    }
}

impl ChannelState {
    /// Constructs a channel sending on `cc_number` with its fader at the bottom.
    pub fn new(cc_number: CcNumber) -> Self {
        Self {
            cc_number,
            current_value: U7::from_u8_lossy(0),
            last_sent_value: U7::from_u8_lossy(0),
        }
    }

    /// Controller number the fader sends on.
    pub fn cc_number(&self) -> CcNumber {
        self.cc_number
    }

    /// Value of the most recent fader reading.
    pub fn current_value(&self) -> ControlValue {
        self.current_value
    }

    /// Value carried by the last Control Change sent for this fader.
    pub fn last_sent_value(&self) -> ControlValue {
        self.last_sent_value
    }

    /// Returns `true` if the fader has moved since its value was last sent.
    pub fn is_pending(&self) -> bool {
        self.current_value != self.last_sent_value
    }
}
