//! This module contains the device's fixed configuration. There is no runtime configuration: the box behaves the
//! same way every time it powers up, and only the controller numbers can be changed (via the encoders) while it runs.

mod control_task;
pub use control_task::*;

mod scaling_curve;
pub use scaling_curve::*;

use wmidi::Channel;

/// Number of fader/encoder pairs on the front panel.
pub const CHANNEL_COUNT: usize = 4;

/// Controller numbers assigned to each fader at power-up:
///
/// - 1: Modulation
/// - 11: Expression
/// - 3: Undefined (can be learned by most DAWs)
/// - 7: Volume
pub const DEFAULT_CC_NUMBERS: [u8; CHANNEL_COUNT] = [1, 11, 3, 7];

/// All Control Change messages are sent on MIDI channel 1. The device is meant to drive one track at a time.
pub const MIDI_CHANNEL: Channel = Channel::Ch1;

/// Largest raw fader reading; faders are sampled at 10 bits.
pub const RAW_MAX: u16 = 1023;

/// Raw reading at which the dead-zone faders start to register movement.
///
/// These faders rest slightly above ground; readings at or below the offset are treated as the bottom of the throw.
pub const DEAD_ZONE_OFFSET: u16 = 10;

/// Scaling curve for each channel, by position. The first two faders have a non-zero resting voltage.
pub const SCALING_CURVES: [ScalingCurve; CHANNEL_COUNT] = [
    ScalingCurve::DeadZone {
        offset: DEAD_ZONE_OFFSET,
    },
    ScalingCurve::DeadZone {
        offset: DEAD_ZONE_OFFSET,
    },
    ScalingCurve::Linear,
    ScalingCurve::Linear,
];
