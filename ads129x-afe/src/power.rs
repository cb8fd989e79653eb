//! Power, reset and conversion state machine
//!
//! ```text
//!            power_up(cold)                 standby()
//!   Off ──> Resetting ──> Idle ───────────────────────> Standby
//!    ^                     │ ^ <─────────────────────────┘ wake()
//!    │      start_stream() v │ stop_stream()
//!    │                  Streaming
//!    └── power_down() from any state
//! ```

use embedded_hal::digital::PinState;
use log::{debug, info};

use crate::error::Error;
use crate::link::{send_command, BusLink, Line};
use crate::registers::cmd;

/// VCAP1 charge time after a cold power-up
pub const VCAP_CHARGE_MS: u32 = 200;
/// RESET low pulse width, datasheet minimum is 2 tCLK
pub const RESET_PULSE_US: u32 = 1;
/// Wait after RESET rises before the first command, 18 tCLK
pub const RESET_SETTLE_US: u32 = 9;
/// Settle time after WAKEUP before the next command
pub const WAKE_SETTLE_US: u32 = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PowerState {
    Off,
    Resetting,
    /// Powered, continuous read stopped, registers accessible
    Idle,
    Standby,
    Streaming,
}

/// Owns the [`PowerState`] and is the only thing that changes it
#[derive(Debug)]
pub struct PowerSequencer {
    state: PowerState,
}

impl PowerSequencer {
    pub fn new() -> Self {
        PowerSequencer { state: PowerState::Off }
    }

    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Fail with [`Error::State`] unless the sequencer is in one of `allowed`
    pub fn require<E>(&self, op: &'static str, allowed: &[PowerState]) -> Result<(), Error<E>> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::State { op, state: self.state })
        }
    }

    /// Power-cycle and reset the part, leaving it in `Idle` with continuous read stopped.
    ///
    /// `cold` waits for VCAP1 to charge; skip it when the part was only powered down
    /// briefly. A dead bus is not detected here, the next ID read will show it.
    pub fn power_up<L: BusLink>(&mut self, link: &mut L, cold: bool) -> Result<(), Error<L::Error>> {
        info!("Powering up ADC ({})", if cold { "cold" } else { "warm" });
        self.state = PowerState::Resetting;

        link.set_line(Line::PowerDown, PinState::Low).map_err(Error::Link)?;
        link.set_line(Line::Start, PinState::Low).map_err(Error::Link)?;
        link.set_line(Line::ClockSelect, PinState::High).map_err(Error::Link)?;
        link.set_line(Line::ChipSelect, PinState::High).map_err(Error::Link)?;
        link.set_line(Line::PowerDown, PinState::High).map_err(Error::Link)?;
        link.set_line(Line::Reset, PinState::High).map_err(Error::Link)?;

        if cold {
            link.delay_ms(VCAP_CHARGE_MS);
        }

        link.set_line(Line::Reset, PinState::Low).map_err(Error::Link)?;
        link.delay_us(RESET_PULSE_US);
        link.set_line(Line::Reset, PinState::High).map_err(Error::Link)?;
        link.delay_us(RESET_SETTLE_US);

        // the part wakes up in continuous read mode
        send_command(link, cmd::SDATAC).map_err(Error::Link)?;

        self.transition(PowerState::Idle);
        Ok(())
    }

    pub fn power_down<L: BusLink>(&mut self, link: &mut L) -> Result<(), Error<L::Error>> {
        link.set_line(Line::PowerDown, PinState::Low).map_err(Error::Link)?;
        self.transition(PowerState::Off);
        Ok(())
    }

    pub fn standby<L: BusLink>(&mut self, link: &mut L) -> Result<(), Error<L::Error>> {
        self.require("standby", &[PowerState::Idle])?;
        send_command(link, cmd::STANDBY).map_err(Error::Link)?;
        self.transition(PowerState::Standby);
        Ok(())
    }

    pub fn wake<L: BusLink>(&mut self, link: &mut L) -> Result<(), Error<L::Error>> {
        self.require("wake", &[PowerState::Standby])?;
        send_command(link, cmd::WAKEUP).map_err(Error::Link)?;
        link.delay_us(WAKE_SETTLE_US);
        self.transition(PowerState::Idle);
        Ok(())
    }

    pub fn start_stream<L: BusLink>(&mut self, link: &mut L) -> Result<(), Error<L::Error>> {
        self.require("start_stream", &[PowerState::Idle])?;
        link.set_line(Line::Start, PinState::High).map_err(Error::Link)?;
        send_command(link, cmd::RDATAC).map_err(Error::Link)?;
        self.transition(PowerState::Streaming);
        Ok(())
    }

    pub fn stop_stream<L: BusLink>(&mut self, link: &mut L) -> Result<(), Error<L::Error>> {
        self.require("stop_stream", &[PowerState::Streaming])?;
        link.set_line(Line::Start, PinState::Low).map_err(Error::Link)?;
        send_command(link, cmd::SDATAC).map_err(Error::Link)?;
        self.transition(PowerState::Idle);
        Ok(())
    }

    fn transition(&mut self, to: PowerState) {
        debug!("power state {:?} -> {:?}", self.state, to);
        self.state = to;
    }
}

impl Default for PowerSequencer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedChip;
    use core::convert::Infallible;

    fn up(cold: bool) -> (PowerSequencer, SimulatedChip) {
        let mut sim = SimulatedChip::new(0x92);
        let mut seq = PowerSequencer::new();
        seq.power_up(&mut sim, cold).unwrap();
        (seq, sim)
    }

    #[test]
    fn test_cold_power_up_waits_for_vcap() {
        let (seq, sim) = up(true);
        assert_eq!(seq.state(), PowerState::Idle);

        let powered = sim.line_change(Line::PowerDown, PinState::High, 0).unwrap();
        let reset_low = sim.line_change(Line::Reset, PinState::Low, powered).unwrap();
        assert!(reset_low - powered >= 200_000);
    }

    #[test]
    fn test_warm_power_up_skips_vcap_wait() {
        let (seq, sim) = up(false);
        assert_eq!(seq.state(), PowerState::Idle);

        let powered = sim.line_change(Line::PowerDown, PinState::High, 0).unwrap();
        let reset_low = sim.line_change(Line::Reset, PinState::Low, powered).unwrap();
        assert!(reset_low - powered < 1_000);
    }

    #[test]
    fn test_reset_pulse_timing() {
        let (_, sim) = up(true);
        let reset_low = sim.line_change(Line::Reset, PinState::Low, 0).unwrap();
        let reset_high = sim.line_change(Line::Reset, PinState::High, reset_low).unwrap();
        assert!(reset_high - reset_low >= 1);

        // first chip-select after reset must wait 9us
        let cs_low = sim.line_change(Line::ChipSelect, PinState::Low, reset_high).unwrap();
        assert!(cs_low - reset_high >= 9);

        assert_eq!(sim.commands(), vec![cmd::SDATAC]);
        assert!(!sim.is_continuous());
        assert_eq!(sim.hold_violations(), 0);
    }

    #[test]
    fn test_standby_and_wake() {
        let (mut seq, mut sim) = up(false);
        seq.standby(&mut sim).unwrap();
        assert_eq!(seq.state(), PowerState::Standby);
        assert!(sim.is_standby());

        let before = sim.now_us();
        seq.wake(&mut sim).unwrap();
        assert_eq!(seq.state(), PowerState::Idle);
        assert!(!sim.is_standby());
        assert!(sim.now_us() - before >= u64::from(WAKE_SETTLE_US));
    }

    #[test]
    fn test_stream_toggle() {
        let (mut seq, mut sim) = up(false);
        seq.start_stream(&mut sim).unwrap();
        assert_eq!(seq.state(), PowerState::Streaming);
        assert!(sim.is_converting() && sim.is_continuous());

        seq.stop_stream(&mut sim).unwrap();
        assert_eq!(seq.state(), PowerState::Idle);
        assert!(!sim.is_converting() && !sim.is_continuous());
        assert_eq!(sim.commands(), vec![cmd::SDATAC, cmd::RDATAC, cmd::SDATAC]);
    }

    #[test]
    fn test_rejected_transitions() {
        let mut sim = SimulatedChip::new(0x92);
        let mut seq = PowerSequencer::new();
        assert!(matches!(
            seq.standby(&mut sim),
            Err(Error::State { op: "standby", state: PowerState::Off })
        ));
        assert!(seq.start_stream(&mut sim).is_err());
        assert!(seq.wake(&mut sim).is_err());
        assert!(sim.events().is_empty());

        seq.power_up(&mut sim, false).unwrap();
        seq.start_stream(&mut sim).unwrap();
        assert!(seq.standby(&mut sim).is_err());
        assert!(seq.require::<Infallible>("configure", &[PowerState::Idle]).is_err());
    }

    #[test]
    fn test_power_down_from_anywhere() {
        let (mut seq, mut sim) = up(false);
        seq.start_stream(&mut sim).unwrap();
        seq.power_down(&mut sim).unwrap();
        assert_eq!(seq.state(), PowerState::Off);
        assert!(!sim.is_powered());

        // warm power-up after a power-down works without a state error
        seq.power_up(&mut sim, false).unwrap();
        assert_eq!(seq.state(), PowerState::Idle);
    }
}
