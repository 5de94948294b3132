//! This crate contains architecture-agnostic logic for Faderbox, a small USB-MIDI controller with four faders, four
//! rotary encoders and a 20x4 character display. Each fader sends [MIDI](https://midi.org/midi-1-0) Control Change
//! messages; the encoder above it picks which controller number the fader drives.
//!
//! Everything here is `no_std` and free of chip-specific code so that it can be exercised on the host with
//! `cargo test`. The firmware crate wires these pieces to the ADC, GPIO, I2C and USB peripherals.

#![deny(missing_docs)]
#![no_std]

pub mod configuration;

/// The per-channel state of the controller and the operations which advance it.
pub mod controller_state;

pub mod display;
pub mod encoder;
pub mod lcd;
pub mod midi;
pub mod scheduler;
