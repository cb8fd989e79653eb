//! Bus link capability
//!
//! The driver never touches hardware directly. It drives five output lines, samples
//! the DRDY input, clocks bytes over SPI and blocks for fixed delays, all through
//! [`BusLink`]. [`HalLink`] implements it on top of the `embedded-hal` 1.0 traits.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use embedded_hal::spi::SpiBus;
use log::{debug, trace};

use crate::registers::{read_frame, write_frame};

/// Minimum chip-select hold after the last SCLK edge.
/// 4 tCLK at 2.048 MHz rounds up to 3 us.
pub const CS_HOLD_US: u32 = 3;

/// Output lines driven by the host
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Line {
    /// PWDN, active low
    PowerDown,
    /// RESET, active low
    Reset,
    /// START, high enables conversions
    Start,
    /// CLKSEL, high selects the internal oscillator
    ClockSelect,
    /// CS, active low
    ChipSelect,
}

/// Exclusive access to the SPI bus, the control lines and a blocking delay
pub trait BusLink {
    type Error: core::fmt::Debug;

    fn set_line(&mut self, line: Line, state: PinState) -> Result<(), Self::Error>;

    /// True when DRDY is low, i.e. a new conversion result is available
    fn data_ready(&mut self) -> Result<bool, Self::Error>;

    /// Full duplex transfer of one byte
    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error>;

    /// Full duplex transfer, received bytes replace the sent ones
    fn transfer_in_place(&mut self, bytes: &mut [u8]) -> Result<(), Self::Error> {
        for b in bytes.iter_mut() {
            *b = self.transfer(*b)?;
        }
        Ok(())
    }

    fn delay_us(&mut self, us: u32);

    fn delay_ms(&mut self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }
}

/// Runs `f` inside one chip-select session: CS low, transfers, hold, CS high.
///
/// CS is raised whether or not `f` succeeds. An error from `f` wins over one
/// from raising CS.
pub fn with_chip_select<L, T, F>(link: &mut L, f: F) -> Result<T, L::Error>
where
    L: BusLink + ?Sized,
    F: FnOnce(&mut L) -> Result<T, L::Error>,
{
    link.set_line(Line::ChipSelect, PinState::Low)?;
    let out = f(link);
    link.delay_us(CS_HOLD_US);
    let released = link.set_line(Line::ChipSelect, PinState::High);
    let out = out?;
    released?;
    Ok(out)
}

/// Single byte command in its own chip-select session
pub fn send_command<L: BusLink + ?Sized>(link: &mut L, opcode: u8) -> Result<(), L::Error> {
    debug!("command 0x{:02X}", opcode);
    with_chip_select(link, |link| link.transfer(opcode).map(|_| ()))
}

/// Write one register, only effective while continuous read is stopped
pub fn write_register<L: BusLink + ?Sized>(link: &mut L, address: u8, value: u8) -> Result<(), L::Error> {
    debug!("Writing to register: 0x{:02x}, value: 0x{:02x}", address, value);
    let mut frame = write_frame(address, value);
    with_chip_select(link, |link| link.transfer_in_place(&mut frame))
}

/// Read one register, only effective while continuous read is stopped
pub fn read_register<L: BusLink + ?Sized>(link: &mut L, address: u8) -> Result<u8, L::Error> {
    let mut frame = read_frame(address);
    with_chip_select(link, |link| link.transfer_in_place(&mut frame))?;
    debug!("Reading from register: 0x{:02x} = 0x{:02x}", address, frame[2]);
    Ok(frame[2])
}

/// Errors from [`HalLink`]
#[derive(Debug)]
pub enum LinkError<S, P> {
    Spi(S),
    Pin(P),
}

/// Control lines of one ADS129x. All outputs share a pin type.
pub struct HalPins<OUT, IN> {
    pub pwdn: OUT,
    pub reset: OUT,
    pub start: OUT,
    pub clksel: OUT,
    pub cs: OUT,
    pub drdy: IN,
}

/// [`BusLink`] over an `embedded-hal` SPI bus, GPIO pins and delay.
///
/// The bus must be configured for SPI mode 1 without hardware chip-select, as CS
/// timing is driven from here.
pub struct HalLink<SPI, OUT, IN, D> {
    spi: SPI,
    pins: HalPins<OUT, IN>,
    delay: D,
}

impl<SPI, OUT, IN, D> HalLink<SPI, OUT, IN, D>
where
    SPI: SpiBus,
    OUT: OutputPin,
    IN: InputPin<Error = OUT::Error>,
    D: DelayNs,
{
    pub fn new(spi: SPI, pins: HalPins<OUT, IN>, delay: D) -> Self {
        HalLink { spi, pins, delay }
    }

    /// Give back the underlying peripherals
    pub fn release(self) -> (SPI, HalPins<OUT, IN>, D) {
        (self.spi, self.pins, self.delay)
    }

    fn pin(&mut self, line: Line) -> &mut OUT {
        match line {
            Line::PowerDown => &mut self.pins.pwdn,
            Line::Reset => &mut self.pins.reset,
            Line::Start => &mut self.pins.start,
            Line::ClockSelect => &mut self.pins.clksel,
            Line::ChipSelect => &mut self.pins.cs,
        }
    }
}

impl<SPI, OUT, IN, D> BusLink for HalLink<SPI, OUT, IN, D>
where
    SPI: SpiBus,
    OUT: OutputPin,
    IN: InputPin<Error = OUT::Error>,
    D: DelayNs,
{
    type Error = LinkError<SPI::Error, OUT::Error>;

    fn set_line(&mut self, line: Line, state: PinState) -> Result<(), Self::Error> {
        trace!("{:?} -> {:?}", line, state);
        self.pin(line).set_state(state).map_err(LinkError::Pin)
    }

    fn data_ready(&mut self) -> Result<bool, Self::Error> {
        self.pins.drdy.is_low().map_err(LinkError::Pin)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut buf = [byte];
        self.transfer_in_place(&mut buf)?;
        Ok(buf[0])
    }

    fn transfer_in_place(&mut self, bytes: &mut [u8]) -> Result<(), Self::Error> {
        self.spi.transfer_in_place(bytes).map_err(LinkError::Spi)?;
        // CS hold is measured from the last clock edge, so drain the bus first
        self.spi.flush().map_err(LinkError::Spi)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Event, SimulatedChip};

    #[test]
    fn test_chip_select_hold() {
        let mut sim = SimulatedChip::new(0x92);
        sim.set_line(Line::PowerDown, PinState::High).unwrap();
        with_chip_select(&mut sim, |link| link.transfer(0x00)).unwrap();

        let events = sim.events();
        let low = events
            .iter()
            .find_map(|e| match e {
                Event::Line { line: Line::ChipSelect, state: PinState::Low, .. } => Some(e.at()),
                _ => None,
            })
            .unwrap();
        let high = events
            .iter()
            .find_map(|e| match e {
                Event::Line { line: Line::ChipSelect, state: PinState::High, .. } => Some(e.at()),
                _ => None,
            })
            .unwrap();
        assert!(high - low >= u64::from(CS_HOLD_US));
    }

    /// Link whose SPI transfers always fail
    #[derive(Default)]
    struct BrokenBus {
        cs_low: bool,
        transfers: usize,
    }

    #[derive(Debug, PartialEq)]
    struct BusFault;

    impl BusLink for BrokenBus {
        type Error = BusFault;

        fn set_line(&mut self, line: Line, state: PinState) -> Result<(), BusFault> {
            if line == Line::ChipSelect {
                self.cs_low = state == PinState::Low;
            }
            Ok(())
        }

        fn data_ready(&mut self) -> Result<bool, BusFault> {
            Ok(false)
        }

        fn transfer(&mut self, _byte: u8) -> Result<u8, BusFault> {
            self.transfers += 1;
            Err(BusFault)
        }

        fn delay_us(&mut self, _us: u32) {}
    }

    #[test]
    fn test_failed_transfer_releases_chip_select() {
        let mut bus = BrokenBus::default();
        assert_eq!(read_register(&mut bus, 0x00), Err(BusFault));
        assert!(!bus.cs_low);
        assert_eq!(bus.transfers, 1);

        assert_eq!(send_command(&mut bus, 0x11), Err(BusFault));
        assert!(!bus.cs_low);
    }

    #[test]
    fn test_default_transfer_in_place() {
        let mut sim = SimulatedChip::new(0x92);
        let mut buf = [0x11, 0x22];
        // nothing drives MISO while the part is powered down
        with_chip_select(&mut sim, |link| link.transfer_in_place(&mut buf)).unwrap();
        assert_eq!(buf, [0xFF, 0xFF]);
    }
}
