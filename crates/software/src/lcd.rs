//! Driver for an HD44780-compatible character LCD behind a PCF8574 I2C "backpack", the usual pairing for 16x2 and
//! 20x4 hobbyist modules.
//!
//! The PCF8574 is an 8-bit port expander. Its pins are wired to the LCD as follows, so every write to the expander sets
//! the control lines, the backlight and one nibble of data at once:
//!
//! | Bit | Signal            |
//! |-----|-------------------|
//! | 0   | RS (register select) |
//! | 1   | RW (always low, write only) |
//! | 2   | E (enable strobe) |
//! | 3   | Backlight         |
//! | 4-7 | D4-D7             |
//!
//! The controller is driven in 4-bit mode: each byte goes out as two nibbles, high nibble first, each latched by a
//! pulse on E. A character therefore takes four expander writes, which at 100 kHz is a little under a millisecond.

use crate::display::CharacterDisplay;
use embedded_hal::{delay::DelayNs, i2c::I2c};

/// Address of a PCF8574 backpack with all address jumpers open.
pub const DEFAULT_ADDRESS: u8 = 0x27;

const RS: u8 = 0b0000_0001;
const ENABLE: u8 = 0b0000_0100;
const BACKLIGHT: u8 = 0b0000_1000;

const CLEAR_DISPLAY: u8 = 0x01;
const ENTRY_MODE_SET: u8 = 0x04;
const DISPLAY_CONTROL: u8 = 0x08;
const FUNCTION_SET: u8 = 0x20;
const SET_DDRAM_ADDR: u8 = 0x80;

/// Entry mode: cursor moves right, display does not shift.
const ENTRY_LEFT: u8 = 0x02;
/// Display control: display on, cursor and blink off.
const DISPLAY_ON: u8 = 0x04;
/// Function set: two (or, on 20x4 modules, four) line mode, 5x8 font, 4-bit bus.
const TWO_LINE: u8 = 0x08;

/// Start of each row in display RAM on a 20x4 module. Rows 2 and 3 continue rows 0 and 1 in memory.
const ROW_OFFSETS: [u8; 4] = [0x00, 0x40, 0x14, 0x54];

/// Blocking driver for a 20x4 HD44780 display over a PCF8574.
///
/// Construct with [`new`][Self::new], which generates no bus traffic, then call [`init`][Self::init] once the
/// display has had time to power up.
pub struct Lcd<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    backlight: u8,
}

impl<I2C, D> Lcd<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    /// Constructs a driver for the display at `address`. No I2C traffic is generated.
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            backlight: BACKLIGHT,
        }
    }

    /// Runs the HD44780 power-on sequence: forces 4-bit mode, configures the display, clears it and turns the
    /// backlight on.
    ///
    /// The controller may come up in either 8-bit or 4-bit mode, possibly halfway through a byte. Sending the 8-bit
    /// function set three times with generous waits brings it to a known state regardless.
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        // the controller needs more than 40 ms after Vcc rises to 2.7 V
        self.delay.delay_ms(50);
        self.expander_write(0)?;
        self.delay.delay_ms(1000);

        self.write_nibble(0x30)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x30)?;
        self.delay.delay_us(4500);
        self.write_nibble(0x30)?;
        self.delay.delay_us(150);
        self.write_nibble(0x20)?;

        self.command(FUNCTION_SET | TWO_LINE)?;
        self.command(DISPLAY_CONTROL | DISPLAY_ON)?;
        self.clear()?;
        self.command(ENTRY_MODE_SET | ENTRY_LEFT)?;
        self.set_backlight(true)
    }

    /// Switches the backlight on or off.
    pub fn set_backlight(&mut self, on: bool) -> Result<(), I2C::Error> {
        self.backlight = if on { BACKLIGHT } else { 0 };
        self.expander_write(0)
    }

    /// Gives back the bus and delay provider.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn command(&mut self, command: u8) -> Result<(), I2C::Error> {
        self.send(command, 0)
    }

    fn send(&mut self, byte: u8, mode: u8) -> Result<(), I2C::Error> {
        self.write_nibble((byte & 0xf0) | mode)?;
        self.write_nibble(((byte << 4) & 0xf0) | mode)
    }

    /// Puts one nibble (in the high bits of `bits`) on D4-D7 and latches it on the falling edge of E.
    ///
    /// Data and E go out in the same expander write, so each nibble costs two bus transactions.
    fn write_nibble(&mut self, bits: u8) -> Result<(), I2C::Error> {
        self.expander_write(bits | ENABLE)?;
        // enable pulse must be wider than 450 ns
        self.delay.delay_us(1);
        self.expander_write(bits & !ENABLE)?;
        // most commands need more than 37 us to settle
        self.delay.delay_us(50);
        Ok(())
    }

    fn expander_write(&mut self, bits: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[bits | self.backlight])
    }
}

impl<I2C, D> CharacterDisplay for Lcd<I2C, D>
where
    I2C: I2c,
    D: DelayNs,
{
    type Error = I2C::Error;

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.command(CLEAR_DISPLAY)?;
        // clearing is by far the slowest instruction
        self.delay.delay_ms(2);
        Ok(())
    }

    fn set_cursor(&mut self, column: u8, row: u8) -> Result<(), Self::Error> {
        let offset = ROW_OFFSETS[usize::from(row).min(ROW_OFFSETS.len() - 1)];
        self.command(SET_DDRAM_ADDR | offset.wrapping_add(column))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        bytes.iter().try_for_each(|&byte| self.send(byte, RS))
    }
}
