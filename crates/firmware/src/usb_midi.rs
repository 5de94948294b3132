//! Carries Control Change messages from the control loop to the USB host.
//!
//! The control loop never waits on USB. [`UsbMidiOut`] frames each message as a USB-MIDI Event Packet and drops it into
//! [`MIDI_OUT`]; [`midi_task`] forwards queued packets to the host whenever one is connected. If the queue is full the
//! oldest packet gives way, and anything queued while no host was listening is discarded when one connects or leaves.

use defmt::{debug, info, panic};
use embassy_stm32::{peripherals, usb};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_usb::{UsbDevice, class::midi::MidiClass, driver::EndpointError};
use faderbox_lib::midi::{Packet, QueuedSink, discard_backlog};

pub type UsbDriver = usb::Driver<'static, peripherals::USB_OTG_FS>;

/// Room for a full round of messages from every fader, several times over.
const MIDI_OUT_DEPTH: usize = 16;

/// Packets waiting to be sent to the host.
pub static MIDI_OUT: Channel<CriticalSectionRawMutex, Packet, MIDI_OUT_DEPTH> = Channel::new();

/// USB-MIDI virtual cable the device sends on.
const CABLE: u8 = 0;

/// Control Change sink feeding [`MIDI_OUT`].
pub type UsbMidiOut = QueuedSink<'static, CriticalSectionRawMutex, MIDI_OUT_DEPTH>;

pub fn usb_midi_out() -> UsbMidiOut {
    QueuedSink::new(&MIDI_OUT, CABLE)
}

#[embassy_executor::task]
pub async fn usb_task(mut usb: UsbDevice<'static, UsbDriver>) -> ! {
    usb.run().await
}

#[embassy_executor::task]
pub async fn midi_task(mut class: MidiClass<'static, UsbDriver>) -> ! {
    loop {
        class.wait_connection().await;
        info!("USB connected");
        discard_stale();
        let _ = forward_midi(&mut class).await;
        info!("USB disconnected");
        discard_stale();
    }
}

fn discard_stale() {
    let discarded = discard_backlog(&MIDI_OUT);
    if discarded > 0 {
        debug!("Discarded {} stale MIDI packets", discarded);
    }
}

#[doc(hidden)]
struct Disconnected {}

impl From<EndpointError> for Disconnected {
    fn from(val: EndpointError) -> Self {
        match val {
            EndpointError::BufferOverflow => panic!("Buffer overflow"),
            EndpointError::Disabled => Disconnected {},
        }
    }
}

/// Helper function which writes queued packets to the host until it goes away.
async fn forward_midi<'d, T: usb::Instance + 'd>(
    class: &mut MidiClass<'d, usb::Driver<'d, T>>,
) -> Result<(), Disconnected> {
    loop {
        let packet = MIDI_OUT.receive().await;
        class.write_packet(&packet).await?;
    }
}
