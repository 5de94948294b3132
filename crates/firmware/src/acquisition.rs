//! Reads the front panel: one ADC channel per fader and two GPIO contacts per encoder.

use embassy_stm32::{
    adc::{Adc, AnyAdcChannel},
    gpio::Input,
    peripherals::ADC1,
};
use faderbox_lib::{
    configuration::CHANNEL_COUNT,
    controller_state::Sample,
    encoder::RotaryDecoder,
};

/// The two contacts of one encoder and the decoder tracking them.
pub struct Encoder {
    a: Input<'static>,
    b: Input<'static>,
    decoder: RotaryDecoder,
}

impl Encoder {
    /// Both contacts are expected to be configured with pull-ups, so an open contact reads high.
    pub fn new(a: Input<'static>, b: Input<'static>) -> Self {
        Self {
            a,
            b,
            decoder: RotaryDecoder::new(),
        }
    }
}

/// Owns the ADC and every panel input.
pub struct Panel {
    adc: Adc<'static, ADC1>,
    faders: [AnyAdcChannel<ADC1>; CHANNEL_COUNT],
    encoders: [Encoder; CHANNEL_COUNT],
}

impl Panel {
    /// Groups the panel inputs; index `n` of `faders` and `encoders` belong to the same channel.
    pub fn new(
        adc: Adc<'static, ADC1>,
        faders: [AnyAdcChannel<ADC1>; CHANNEL_COUNT],
        encoders: [Encoder; CHANNEL_COUNT],
    ) -> Self {
        Self {
            adc,
            faders,
            encoders,
        }
    }

    /// Takes one reading of every fader and encoder.
    pub fn read(&mut self) -> [Sample; CHANNEL_COUNT] {
        let mut samples = [Sample::default(); CHANNEL_COUNT];
        for ((sample, fader), encoder) in samples
            .iter_mut()
            .zip(self.faders.iter_mut())
            .zip(self.encoders.iter_mut())
        {
            // the ADC samples at 12 bits; the mapping works on 10
            sample.fader = self.adc.blocking_read(fader) >> 2;
            sample.encoder = encoder
                .decoder
                .process(encoder.a.is_high(), encoder.b.is_high());
        }
        samples
    }
}
