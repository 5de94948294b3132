//! Faderbox is [Embassy](https://embassy.dev)-based firmware for a small USB-MIDI controller: four faders, a rotary
//! encoder above each one, and a 20x4 character display. The firmware runs on the [Nucleo-F767ZI development
//! board](https://www.st.com/en/evaluation-tools/nucleo-f767zi.html), which is powered by an F7-series STM32
//! microcontroller.
//!
//! Each fader sends MIDI Control Change messages on channel 1 whenever it moves. Turning the encoder above a fader
//! changes which controller number it sends. The display shows the controller number and current value of each fader.
//!
//! Sampling happens on every pass through the control loop. Sending MIDI and redrawing the display are fixed-rate tasks
//! run from the same loop by a cooperative [`Scheduler`]; see [`ControlTask`] for their rates.

#![no_std]
#![no_main]

mod acquisition;
mod usb_midi;

use crate::{
    acquisition::{Encoder, Panel},
    usb_midi::{midi_task, usb_midi_out, usb_task},
};
use defmt::*;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_stm32::{
    Config,
    adc::{Adc, AdcChannel},
    bind_interrupts,
    gpio::{Input, Pull},
    i2c::{self, I2c},
    peripherals,
    time::Hertz,
    usb,
};
use embassy_time::Delay;
use embassy_usb::{Builder, class::midi::MidiClass};
use faderbox_lib::{
    configuration::ControlTask,
    controller_state::ControllerState,
    display,
    lcd::{self, Lcd},
    scheduler::Scheduler,
};
use static_cell::StaticCell;

#[cfg(feature = "defmt-rtt")]
use defmt_rtt as _;
#[cfg(not(feature = "panic-probe"))]
use panic_halt as _;
#[cfg(feature = "panic-probe")]
use panic_probe as _;

bind_interrupts!(
    #[doc(hidden)]
    struct Irqs {
        OTG_FS => usb::InterruptHandler<peripherals::USB_OTG_FS>;
    }
);

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Initializing Faderbox");

    let mut config = Config::default();
    {
        use embassy_stm32::rcc::*;
        // hse: high-speed external clock
        config.rcc.hse = Some(Hse {
            freq: Hertz(8_000_000),
            mode: HseMode::Bypass,
        });

        // pll: phase-locked loop, crucial for dividing clock
        config.rcc.pll_src = PllSource::HSE;
        config.rcc.pll = Some(Pll {
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL216,
            divp: Some(PllPDiv::DIV2), // 8mhz / 4 * 216 / 2 = 216Mhz
            // USB OTG FS needs its 48MHz from the main PLL's Q output
            divq: Some(PllQDiv::DIV9), // 8mhz / 4 * 216 / 9 = 48Mhz
            divr: None,
        });
        config.rcc.ahb_pre = AHBPrescaler::DIV1;
        config.rcc.apb1_pre = APBPrescaler::DIV4;
        config.rcc.apb2_pre = APBPrescaler::DIV2;
        config.rcc.sys = Sysclk::PLL1_P;
        config.rcc.mux.clk48sel = mux::Clk48sel::PLL1_Q;
    }
    let p = embassy_stm32::init(config);

    // Create the driver, from the HAL.
    static ENDPOINT_OUT_BUFFER: StaticCell<[u8; 256]> = StaticCell::new();
    let mut config = embassy_stm32::usb::Config::default();

    // The board is powered externally and stays up when unplugged, so VBUS detection is required by the USB spec.
    config.vbus_detection = true;

    let driver = usb::Driver::new_fs(
        p.USB_OTG_FS,
        Irqs,
        p.PA12,
        p.PA11,
        ENDPOINT_OUT_BUFFER.init([0; 256]),
        config,
    );

    // per https://pid.codes, FOSS projects can apply to be listed under the vendor ID owned by InterBiometrics
    let vendor_id = 0x1209;
    let product_id = 0xfade;

    let mut config = embassy_usb::Config::new(vendor_id, product_id);
    config.manufacturer = Some("Faderbox");
    config.product = Some("Faderbox MIDI Controller");
    config.self_powered = true;
    config.max_power = 0;

    // Create embassy-usb DeviceBuilder using the driver and config.
    // It needs some buffers for building the descriptors.
    static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUFFER: StaticCell<[u8; 64]> = StaticCell::new();

    let mut builder = Builder::new(
        driver,
        config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [], // no msos descriptors
        CONTROL_BUFFER.init([0; 64]),
    );

    // one cable in (unused), one cable out
    let class = MidiClass::new(&mut builder, 1, 1, 64);
    let usb = builder.build();

    unwrap!(spawner.spawn(usb_task(usb)));
    unwrap!(spawner.spawn(midi_task(class)));

    // PCF8574 backpack on I2C1: PB8 (SCL) and PB9 (SDA), the Arduino header's I2C pins
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = Hertz(100_000);
    let i2c = I2c::new_blocking(p.I2C1, p.PB8, p.PB9, i2c_config);
    let mut lcd = Lcd::new(i2c, Delay, lcd::DEFAULT_ADDRESS);
    match lcd.init().and_then(|_| display::show_banner(&mut lcd)) {
        Ok(()) => info!("Display initialized"),
        // the controller still works without a display; refreshes will keep retrying
        Err(e) => error!("Display initialization failed: {}", e),
    }

    // faders on the Arduino header's A0-A2, plus PB1; all four are ADC1 inputs
    let adc = Adc::new(p.ADC1);
    let faders = [
        p.PA3.degrade_adc(),
        p.PC0.degrade_adc(),
        p.PC3.degrade_adc(),
        p.PB1.degrade_adc(),
    ];
    let encoders = [
        Encoder::new(Input::new(p.PE9, Pull::Up), Input::new(p.PE11, Pull::Up)),
        Encoder::new(Input::new(p.PE13, Pull::Up), Input::new(p.PF14, Pull::Up)),
        Encoder::new(Input::new(p.PF13, Pull::Up), Input::new(p.PF12, Pull::Up)),
        Encoder::new(Input::new(p.PD15, Pull::Up), Input::new(p.PD14, Pull::Up)),
    ];
    let mut panel = Panel::new(adc, faders, encoders);

    let mut state = ControllerState::new();
    let mut midi_out = usb_midi_out();

    let mut scheduler: Scheduler<ControlTask, { ControlTask::ALL.len() }> = Scheduler::new();
    for task in ControlTask::ALL {
        unwrap!(scheduler.schedule_fixed_rate(task, task.period()));
    }

    info!("Entering control loop");
    loop {
        state.apply(panel.read());

        scheduler.poll(|task| match task {
            ControlTask::TransmitMidi => {
                state.transmit(&mut midi_out);
            }
            ControlTask::RefreshDisplay => {
                if let Err(e) = state.present(&mut lcd) {
                    warn!("Display refresh failed: {}", e);
                }
            }
        });

        // let the USB tasks run
        yield_now().await;
    }
}
