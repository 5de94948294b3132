use crate::{
    configuration::{CHANNEL_COUNT, DEFAULT_CC_NUMBERS, MIDI_CHANNEL, SCALING_CURVES},
    display::{CharacterDisplay, Readout},
    encoder::Direction,
    midi::ControlChangeSink,
};

mod cc_number;
pub use cc_number::*;

mod channel;
pub use channel::*;

/// One pass worth of raw input for a single channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// 10-bit fader reading.
    pub fader: u16,
    /// Step reported by the channel's encoder decoder.
    pub encoder: Direction,
}

/// Everything the controller knows: the state of each channel and whether the display is out of date.
///
/// The control loop owns the only instance and hands it by reference to each stage: [`apply`][Self::apply] after
/// reading the panel, [`transmit`][Self::transmit] when MIDI is due and [`present`][Self::present] when the display
/// is due.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerState {
    channels: [ChannelState; CHANNEL_COUNT],
    display_dirty: bool,
    /// What the display is known to show, if anything.
    drawn: Option<Readout>,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerState {
    /// Constructs the power-up state: default controller numbers, all values at 0, display due for a redraw.
    pub fn new() -> Self {
        Self {
            channels: DEFAULT_CC_NUMBERS.map(|cc| ChannelState::new(CcNumber::new(cc))),
            display_dirty: true,
            drawn: None,
        }
    }

    /// Returns the state of each channel, in panel order.
    pub fn channels(&self) -> &[ChannelState; CHANNEL_COUNT] {
        &self.channels
    }

    /// Returns `true` if something shown on the display has changed since it was last drawn.
    pub fn is_display_dirty(&self) -> bool {
        self.display_dirty
    }

    /// Folds one pass of panel readings into the state.
    ///
    /// Each fader reading is scaled with the curve assigned to its position and becomes the channel's current value.
    /// Each encoder step moves the channel's controller number; a move that actually changes the number marks the
    /// display dirty.
    pub fn apply(&mut self, samples: [Sample; CHANNEL_COUNT]) {
        for ((channel, sample), curve) in self.channels.iter_mut().zip(samples).zip(SCALING_CURVES) {
            channel.current_value = curve.map(sample.fader);

            let cc_number = channel.cc_number.step(sample.encoder);
            if cc_number != channel.cc_number {
                channel.cc_number = cc_number;
                self.display_dirty = true;
            }
        }
    }

    /// Sends a Control Change for every channel whose current value differs from the last one sent, in panel order.
    ///
    /// Returns the number of messages sent. Each sent value is recorded as the channel's last sent value and marks the
    /// display dirty. Calling this again without any new readings sends nothing.
    pub fn transmit<S: ControlChangeSink>(&mut self, sink: &mut S) -> usize {
        let mut sent = 0;
        for channel in self.channels.iter_mut().filter(|channel| channel.is_pending()) {
            sink.send_control_change(
                MIDI_CHANNEL,
                channel.cc_number.control_function(),
                channel.current_value,
            );
            channel.last_sent_value = channel.current_value;
            self.display_dirty = true;
            sent += 1;
        }
        sent
    }

    /// Brings the controller number and value rows up to date if the display is dirty. Returns whether anything was
    /// drawn.
    ///
    /// The first call writes both rows in full; after that only the cells whose figures changed are rewritten. The
    /// value row shows the live reading for the first three faders but the last sent value for the fourth. The two
    /// only differ for the few milliseconds between a reading and its transmission.
    ///
    /// If drawing fails the display stays dirty and the next call writes both rows in full again, since whatever
    /// made it onto the display before the failure is unknown.
    pub fn present<D: CharacterDisplay>(&mut self, display: &mut D) -> Result<bool, D::Error> {
        if !self.display_dirty {
            return Ok(false);
        }

        let readout = self.readout();
        if let Err(e) = readout.draw(display, self.drawn.as_ref()) {
            self.drawn = None;
            return Err(e);
        }

        self.drawn = Some(readout);
        self.display_dirty = false;
        Ok(true)
    }

    fn readout(&self) -> Readout {
        let [a, b, c, d] = &self.channels;
        Readout {
            cc_numbers: [a, b, c, d].map(|ch| u8::from(ch.cc_number)),
            values: [
                u8::from(a.current_value),
                u8::from(b.current_value),
                u8::from(c.current_value),
                u8::from(d.last_sent_value),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        configuration::ControlTask,
        display::{COLUMNS, tests::FakeDisplay},
        scheduler::Scheduler,
    };
    use embassy_time::Instant;
    use heapless::Vec;
    use wmidi::{Channel, ControlFunction, ControlValue};

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<(Channel, u8, u8), 16>,
    }

    impl ControlChangeSink for RecordingSink {
        fn send_control_change(&mut self, channel: Channel, function: ControlFunction, value: ControlValue) {
            self.sent
                .push((channel, u8::from(function), u8::from(value)))
                .unwrap();
        }
    }

    struct DiscardingSink;

    impl ControlChangeSink for DiscardingSink {
        fn send_control_change(&mut self, _: Channel, _: ControlFunction, _: ControlValue) {}
    }

    fn faders(readings: [u16; CHANNEL_COUNT]) -> [Sample; CHANNEL_COUNT] {
        readings.map(|fader| Sample {
            fader,
            encoder: Direction::None,
        })
    }

    fn turn(index: usize, direction: Direction) -> [Sample; CHANNEL_COUNT] {
        let mut samples = [Sample::default(); CHANNEL_COUNT];
        samples[index].encoder = direction;
        samples
    }

    /// A state that has been drawn and has nothing left to send.
    fn settled() -> ControllerState {
        let mut state = ControllerState::new();
        state.present(&mut FakeDisplay::default()).unwrap();
        state
    }

    #[test]
    fn power_up_state() {
        let state = ControllerState::new();
        assert!(state.is_display_dirty(), "First refresh should always draw");
        for (channel, cc) in state.channels().iter().zip(DEFAULT_CC_NUMBERS) {
            assert_eq!(cc, u8::from(channel.cc_number()), "Expected left but got right");
            assert_eq!(0, u8::from(channel.current_value()), "Expected left but got right");
            assert_eq!(0, u8::from(channel.last_sent_value()), "Expected left but got right");
        }
    }

    mod apply {
        use super::*;

        #[test]
        fn maps_each_fader_with_its_curve() {
            let mut state = settled();
            state.apply(faders([10, 1023, 0, 1023]));
            let values = state.channels().map(|ch| u8::from(ch.current_value()));
            assert_eq!([0, 127, 0, 127], values, "Expected left but got right");
        }

        #[test]
        fn fader_movement_alone_does_not_dirty_display() {
            let mut state = settled();
            state.apply(faders([512; CHANNEL_COUNT]));
            assert!(!state.is_display_dirty(), "Display should wait for transmission");
        }

        #[test]
        fn encoder_moves_cc_number_and_dirties_display() {
            let mut state = settled();
            state.apply(turn(1, Direction::Clockwise));
            assert_eq!(12, u8::from(state.channels()[1].cc_number()), "Expected left but got right");
            assert!(state.is_display_dirty(), "Display should be dirty");
        }

        #[test]
        fn encoder_at_floor_does_not_dirty_display() {
            let mut state = settled();
            // channel 0 starts at CC 1
            state.apply(turn(0, Direction::CounterClockwise));
            assert_eq!(1, u8::from(state.channels()[0].cc_number()), "Expected left but got right");
            assert!(!state.is_display_dirty(), "Display should stay clean");
        }

        #[test]
        fn cc_number_never_leaves_range() {
            let mut state = settled();
            for _ in 0..200 {
                state.apply(turn(2, Direction::Clockwise));
            }
            assert_eq!(127, u8::from(state.channels()[2].cc_number()), "Expected left but got right");
            for _ in 0..200 {
                state.apply(turn(2, Direction::CounterClockwise));
            }
            assert_eq!(1, u8::from(state.channels()[2].cc_number()), "Expected left but got right");
        }
    }

    mod transmit {
        use super::*;

        #[test]
        fn sends_only_changed_channels_in_order() {
            let mut state = settled();
            state.apply(faders([0, 1023, 0, 512]));
            let mut sink = RecordingSink::default();

            assert_eq!(2, state.transmit(&mut sink), "Expected left but got right");
            assert_eq!(
                &[(Channel::Ch1, 11, 127), (Channel::Ch1, 7, 64)][..],
                &sink.sent[..],
                "Expected left but got right"
            );
        }

        #[test]
        fn records_last_sent_value() {
            let mut state = settled();
            state.apply(faders([300, 400, 500, 600]));
            state.transmit(&mut RecordingSink::default());
            for channel in state.channels() {
                assert_eq!(channel.current_value(), channel.last_sent_value(), "Expected left but got right");
            }
        }

        #[test]
        fn second_call_without_new_readings_sends_nothing() {
            let mut state = settled();
            state.apply(faders([300, 400, 500, 600]));
            state.transmit(&mut RecordingSink::default());

            let mut sink = RecordingSink::default();
            assert_eq!(0, state.transmit(&mut sink), "Expected left but got right");
            assert!(sink.sent.is_empty(), "Nothing should have been sent");
        }

        #[test]
        fn unchanged_reading_sends_nothing() {
            let mut state = settled();
            state.apply(faders([300, 400, 500, 600]));
            state.transmit(&mut RecordingSink::default());
            state.apply(faders([300, 400, 500, 600]));

            assert_eq!(0, state.transmit(&mut RecordingSink::default()), "Expected left but got right");
        }

        #[test]
        fn uses_current_cc_number() {
            let mut state = settled();
            state.apply(turn(3, Direction::CounterClockwise));
            state.apply(faders([0, 0, 0, 1023]));
            let mut sink = RecordingSink::default();
            state.transmit(&mut sink);
            assert_eq!(&[(Channel::Ch1, 6, 127)][..], &sink.sent[..], "Expected left but got right");
        }

        #[test]
        fn dirties_display() {
            let mut state = settled();
            state.apply(faders([0, 0, 0, 1023]));
            state.transmit(&mut RecordingSink::default());
            assert!(state.is_display_dirty(), "Display should be dirty");
        }

        #[test]
        fn nothing_to_send_leaves_display_clean() {
            let mut state = settled();
            state.transmit(&mut RecordingSink::default());
            assert!(!state.is_display_dirty(), "Display should stay clean");
        }
    }

    mod present {
        use super::*;

        #[test]
        fn draws_both_rows_and_clears_dirty_flag() {
            let mut state = ControllerState::new();
            state.apply(faders([1023, 1023, 1023, 1023]));
            state.transmit(&mut RecordingSink::default());

            let mut display = FakeDisplay::default();
            assert_eq!(Ok(true), state.present(&mut display), "Expected left but got right");
            assert_eq!(
                b"   1   11    3    7 ",
                &display.rows[2][..],
                "Expected left but got right"
            );
            assert_eq!(
                b" 127  127  127  127 ",
                &display.rows[3][..],
                "Expected left but got right"
            );
            assert!(!state.is_display_dirty(), "Display should be clean");
        }

        #[test]
        fn skips_when_clean() {
            let mut state = settled();
            let mut display = FakeDisplay::default();
            assert_eq!(Ok(false), state.present(&mut display), "Expected left but got right");
            assert_eq!(0, display.writes, "Nothing should have been drawn");
        }

        #[test]
        fn fourth_column_shows_last_sent_value() {
            let mut state = ControllerState::new();
            state.apply(turn(0, Direction::Clockwise));
            // readings taken but not yet transmitted
            state.apply(faders([1023, 1023, 1023, 1023]));

            let mut display = FakeDisplay::default();
            state.present(&mut display).unwrap();
            assert_eq!(
                b" 127  127  127    0 ",
                &display.rows[3][..],
                "Expected left but got right"
            );
        }

        #[test]
        fn failure_keeps_display_dirty() {
            let mut state = ControllerState::new();
            let mut display = FakeDisplay {
                fail: true,
                ..Default::default()
            };
            assert_eq!(Err(()), state.present(&mut display), "Expected left but got right");
            assert!(state.is_display_dirty(), "Display should still be dirty");

            display.fail = false;
            assert_eq!(Ok(true), state.present(&mut display), "Expected left but got right");
        }

        #[test]
        fn later_draws_rewrite_only_changed_cells() {
            let mut state = ControllerState::new();
            let mut display = FakeDisplay::default();
            state.present(&mut display).unwrap();

            state.apply(faders([0, 0, 0, 1023]));
            state.transmit(&mut RecordingSink::default());
            let before = display.transfers;
            state.present(&mut display).unwrap();

            // one cursor move and three characters
            assert_eq!(before + 4, display.transfers, "Expected left but got right");
            assert_eq!(b"   1   11    3    7 ", &display.rows[2], "Expected left but got right");
            assert_eq!(b"   0    0    0  127 ", &display.rows[3], "Expected left but got right");
        }

        #[test]
        fn failure_forces_full_redraw() {
            let mut state = ControllerState::new();
            let mut display = FakeDisplay::default();
            state.present(&mut display).unwrap();

            state.apply(turn(1, Direction::Clockwise));
            display.fail = true;
            assert_eq!(Err(()), state.present(&mut display), "Expected left but got right");

            display.fail = false;
            display.rows = [[b'#'; COLUMNS]; 4];
            state.present(&mut display).unwrap();
            assert_eq!(b"   1   12    3    7 ", &display.rows[2], "Expected left but got right");
            assert_eq!(b"   0    0    0    0 ", &display.rows[3], "Expected left but got right");
        }

        /// Runs the control loop for one simulated second against a display that takes `transfer_us` per bus
        /// transfer, with the fourth fader moving on every pass. Returns how many times each task ran, along with
        /// the final state and display.
        fn run_for_one_second(transfer_us: u64) -> (usize, usize, ControllerState, FakeDisplay) {
            const PASS_US: u64 = 1_000;

            let mut state = ControllerState::new();
            let mut display = FakeDisplay::default();
            let mut scheduler: Scheduler<ControlTask, 2> = Scheduler::new();
            for task in ControlTask::ALL {
                scheduler
                    .schedule_fixed_rate_at(Instant::from_micros(0), task, task.period())
                    .unwrap();
            }

            let (mut transmits, mut renders) = (0, 0);
            let mut now = 0;
            let mut pass = 0;
            while now < 1_000_000 {
                pass += 1;
                state.apply(faders([0, 0, 0, (pass * 7 % 1024) as u16]));

                let mut busy_us = 0;
                scheduler.poll_at(Instant::from_micros(now), |task| match task {
                    ControlTask::TransmitMidi => {
                        transmits += 1;
                        state.transmit(&mut DiscardingSink);
                    }
                    ControlTask::RefreshDisplay => {
                        renders += 1;
                        let before = display.transfers;
                        state.present(&mut display).unwrap();
                        busy_us += (display.transfers - before) as u64 * transfer_us;
                    }
                });
                now += PASS_US + busy_us;
            }
            (transmits, renders, state, display)
        }

        #[test]
        fn slow_display_does_not_starve_transmission() {
            // roughly what a character costs over a 100 kHz I2C expander
            let (transmits, renders, _, _) = run_for_one_second(1_300);
            assert!(transmits >= 150, "Only {} transmissions in one second", transmits);
            assert!(renders >= 15, "Only {} redraws in one second", renders);
        }

        #[test]
        fn display_matches_state_after_many_partial_draws() {
            let (_, _, mut state, mut display) = run_for_one_second(1_300);
            state.transmit(&mut DiscardingSink);
            state.present(&mut display).unwrap();

            let mut fresh = FakeDisplay::default();
            state.readout().draw(&mut fresh, None).unwrap();
            assert_eq!(fresh.rows[2], display.rows[2], "Expected left but got right");
            assert_eq!(fresh.rows[3], display.rows[3], "Expected left but got right");
        }

        #[test]
        fn dirty_until_presented_then_clean_until_next_change() {
            let mut state = settled();
            state.apply(turn(2, Direction::Clockwise));
            assert!(state.is_display_dirty());
            state.transmit(&mut RecordingSink::default());
            assert!(state.is_display_dirty());

            state.present(&mut FakeDisplay::default()).unwrap();
            assert!(!state.is_display_dirty());
            state.apply(faders([0; CHANNEL_COUNT]));
            state.transmit(&mut RecordingSink::default());
            assert!(!state.is_display_dirty(), "Nothing changed, display should stay clean");
        }
    }
}
