//! Outgoing MIDI: the [`ControlChangeSink`] seam the controller transmits through, the USB-MIDI framing used by the
//! firmware's transport and the bounded queue sitting between the two.
//!
//! The queue only ever holds what is worth sending now. When it is full the oldest packet makes room for the newest,
//! and whatever piled up while no host was listening is thrown away when a host connects or leaves.

use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel as Queue, TrySendError},
};
use wmidi::{Channel, ControlFunction, ControlValue, MidiMessage};

/// Size of a USB-MIDI Event Packet. Every packet is exactly 32 bits.
pub const USB_MIDI_PACKET_LEN: usize = 4;

/// One USB-MIDI Event Packet.
pub type Packet = [u8; USB_MIDI_PACKET_LEN];

/// Code Index Number identifying a Control Change in the packet header, per the USB-MIDI 1.0 class specification.
const CONTROL_CHANGE_CIN: u8 = 0x0B;

/// Anything Control Change messages can be handed to.
///
/// Sending is fire-and-forget. An implementation which cannot deliver a message drops it; the controller does not
/// retry.
pub trait ControlChangeSink {
    /// Sends one Control Change message.
    fn send_control_change(&mut self, channel: Channel, function: ControlFunction, value: ControlValue);
}

/// Frames a Control Change message as a USB-MIDI Event Packet on the given virtual cable.
///
/// The header byte carries the cable number in its high nibble and the Code Index Number in its low nibble; the
/// remaining three bytes are the MIDI message itself.
pub fn control_change_packet(
    cable: u8,
    channel: Channel,
    function: ControlFunction,
    value: ControlValue,
) -> [u8; USB_MIDI_PACKET_LEN] {
    let mut packet = [0_u8; USB_MIDI_PACKET_LEN];
    packet[0] = ((cable & 0x0f) << 4) | CONTROL_CHANGE_CIN;
    let message = MidiMessage::ControlChange(channel, function, value);
    // a Control Change is always three bytes, which is exactly the space left in the packet
    if message.copy_to_slice(&mut packet[1..]).is_err() {
        #[cfg(feature = "defmt")]
        defmt::error!("Control Change did not fit in a USB-MIDI Event Packet");
    }
    packet
}

/// [`ControlChangeSink`] which frames messages for virtual cable `cable` and queues them for the USB transport.
///
/// Never waits. If the queue is full, the oldest queued packet is dropped to make room.
pub struct QueuedSink<'a, M: RawMutex, const N: usize> {
    queue: &'a Queue<M, Packet, N>,
    cable: u8,
}

impl<'a, M: RawMutex, const N: usize> QueuedSink<'a, M, N> {
    /// Constructs a sink feeding `queue`.
    pub const fn new(queue: &'a Queue<M, Packet, N>, cable: u8) -> Self {
        Self { queue, cable }
    }
}

impl<M: RawMutex, const N: usize> ControlChangeSink for QueuedSink<'_, M, N> {
    fn send_control_change(&mut self, channel: Channel, function: ControlFunction, value: ControlValue) {
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "Sending Control Change {} = {} on channel {}",
            u8::from(function),
            u8::from(value),
            channel.number()
        );
        let packet = control_change_packet(self.cable, channel, function, value);
        if let Err(TrySendError::Full(packet)) = self.queue.try_send(packet) {
            #[cfg(feature = "defmt")]
            defmt::warn!("MIDI queue full, dropping oldest packet");
            let _ = self.queue.try_receive();
            let _ = self.queue.try_send(packet);
        }
    }
}

/// Empties `queue`, returning how many packets were thrown away.
pub fn discard_backlog<M: RawMutex, const N: usize>(queue: &Queue<M, Packet, N>) -> usize {
    let mut discarded = 0;
    while queue.try_receive().is_ok() {
        discarded += 1;
    }
    discarded
}
