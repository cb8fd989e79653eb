//! Channel plan to register writes
//!
//! [`register_writes`] is a pure function of the plan and settings; the device
//! façade pushes its output over the bus in order. Order matters: the
//! right-leg-drive registers come last because their mask is accumulated while
//! walking the channels.

use crate::plan::{ChannelPlan, ChannelRole};
use crate::registers::{
    addr, channel_off, channel_register, channel_setting, config2, config3, config4, gpio, resp, Gain,
    InputMux,
};

/// One register write
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RegisterWrite {
    pub address: u8,
    pub value: u8,
}

impl RegisterWrite {
    pub const fn new(address: u8, value: u8) -> Self {
        RegisterWrite { address, value }
    }
}

/// Acquisition parameters that are not per channel
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AcquisitionSettings {
    /// Written to CONFIG1 verbatim, see [`crate::registers::config1`]
    pub resolution_rate: u8,
    /// Feed every connected channel from the internal square wave instead of its electrodes
    pub use_test_signal: bool,
    /// Keep the leading status/GPIO word of each frame
    pub include_gpio: bool,
}

impl Default for AcquisitionSettings {
    fn default() -> Self {
        AcquisitionSettings {
            resolution_rate: crate::registers::config1::HIGH_RES_1K_SPS,
            use_test_signal: false,
            include_gpio: false,
        }
    }
}

/// Derive the ordered register writes that realise `plan`
pub fn register_writes(plan: &ChannelPlan, settings: &AcquisitionSettings) -> Vec<RegisterWrite> {
    let mut writes = Vec::with_capacity(plan.available_channels() + 8);
    let mut rld_bits: u8 = 0;

    // floating CMOS inputs flicker and add noise, so drive every GPIO
    writes.push(RegisterWrite::new(addr::GPIO, gpio::ALL_OUTPUT));
    writes.push(RegisterWrite::new(addr::CONFIG1, settings.resolution_rate));

    if settings.use_test_signal {
        writes.push(RegisterWrite::new(addr::CONFIG2, config2::CONST | config2::INT_TEST_2HZ));
        for i in 0..plan.available_channels() {
            let value = if plan.role(i).is_connected() {
                channel_setting(Gain::X12, InputMux::TestSignal)
            } else {
                channel_off()
            };
            writes.push(RegisterWrite::new(channel_register(i), value));
        }
    } else {
        writes.push(RegisterWrite::new(addr::CONFIG2, config2::CONST | config2::INT_TEST_DC));
        for i in 0..plan.available_channels() {
            match plan.role(i) {
                ChannelRole::RespirationSeries => {
                    writes.push(RegisterWrite::new(
                        addr::RESP,
                        resp::DEMOD_EN1 | resp::MOD_EN1 | resp::PH_135 | resp::CONST | resp::INT_SIG_INT,
                    ));
                    writes.push(RegisterWrite::new(addr::CONFIG4, config4::CONST | config4::RESP_FREQ_32K_HZ));
                    writes.push(RegisterWrite::new(channel_register(i), channel_setting(Gain::X4, InputMux::Electrode)));
                }
                ChannelRole::Physiological => {
                    writes.push(RegisterWrite::new(channel_register(i), channel_setting(Gain::X12, InputMux::Electrode)));
                    rld_bits |= 1 << i;
                }
                ChannelRole::ExternalSensor => {
                    writes.push(RegisterWrite::new(channel_register(i), channel_setting(Gain::X12, InputMux::Electrode)));
                }
                ChannelRole::Unconnected => {
                    writes.push(RegisterWrite::new(channel_register(i), channel_off()));
                }
            }
        }
    }

    if rld_bits != 0 {
        writes.push(RegisterWrite::new(
            addr::CONFIG3,
            config3::RLDREF_INT | config3::PD_RLD | config3::PD_REFBUF | config3::CONST,
        ));
        writes.push(RegisterWrite::new(addr::RLD_SENSP, rld_bits));
        writes.push(RegisterWrite::new(addr::RLD_SENSN, rld_bits));
    } else {
        writes.push(RegisterWrite::new(addr::CONFIG3, config3::PD_REFBUF | config3::CONST));
    }

    writes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::config1;
    use ChannelRole::*;

    fn writes_for(roles: &[ChannelRole], available: usize, test_signal: bool) -> Vec<RegisterWrite> {
        let plan = ChannelPlan::build(roles, available).unwrap();
        let settings = AcquisitionSettings { use_test_signal: test_signal, ..Default::default() };
        register_writes(&plan, &settings)
    }

    fn value_of(writes: &[RegisterWrite], address: u8) -> Option<u8> {
        writes.iter().find(|w| w.address == address).map(|w| w.value)
    }

    #[test]
    fn test_two_electrodes_on_eight_channels() {
        let writes = writes_for(&[Physiological, Physiological, Unconnected, Unconnected], 8, false);

        assert_eq!(writes[0], RegisterWrite::new(addr::GPIO, 0x00));
        assert_eq!(writes[1], RegisterWrite::new(addr::CONFIG1, config1::HIGH_RES_1K_SPS));
        assert_eq!(writes[2], RegisterWrite::new(addr::CONFIG2, 0x13));
        assert_eq!(value_of(&writes, channel_register(0)), Some(0x60));
        assert_eq!(value_of(&writes, channel_register(1)), Some(0x60));
        for i in 2..8 {
            assert_eq!(value_of(&writes, channel_register(i)), Some(0x81));
        }

        let tail = &writes[writes.len() - 3..];
        assert_eq!(tail[0], RegisterWrite::new(addr::CONFIG3, 0xCC));
        assert_eq!(tail[1], RegisterWrite::new(addr::RLD_SENSP, 0b0000_0011));
        assert_eq!(tail[2], RegisterWrite::new(addr::RLD_SENSN, 0b0000_0011));
    }

    #[test]
    fn test_every_unconnected_slot_is_shorted() {
        let roles = [Unconnected, ExternalSensor, Unconnected, Physiological, Unconnected];
        for test_signal in [false, true] {
            let writes = writes_for(&roles, 6, test_signal);
            for i in [0, 2, 4, 5] {
                assert_eq!(value_of(&writes, channel_register(i)), Some(channel_off()), "slot {}", i);
            }
        }
    }

    #[test]
    fn test_rld_mask_iff_physiological() {
        let cases: [(&[ChannelRole], bool); 4] = [
            (&[ExternalSensor, ExternalSensor], false),
            (&[RespirationSeries, Unconnected], false),
            (&[ExternalSensor, Unconnected, Physiological], true),
            (&[], false),
        ];
        for (roles, expect_rld) in cases {
            let writes = writes_for(roles, 4, false);
            let sensp = value_of(&writes, addr::RLD_SENSP);
            assert_eq!(sensp.map_or(false, |m| m != 0), expect_rld, "{:?}", roles);
            if !expect_rld {
                assert_eq!(value_of(&writes, addr::CONFIG3), Some(0xC0));
                assert_eq!(value_of(&writes, addr::RLD_SENSN), None);
            }
        }

        let writes = writes_for(&[ExternalSensor, Unconnected, Physiological], 4, false);
        assert_eq!(value_of(&writes, addr::RLD_SENSP), Some(0b100));
    }

    #[test]
    fn test_respiration_channel() {
        let writes = writes_for(&[RespirationSeries, Physiological], 8, false);
        assert_eq!(value_of(&writes, addr::RESP), Some(0xF6));
        assert_eq!(value_of(&writes, addr::CONFIG4), Some(0x20));
        assert_eq!(value_of(&writes, addr::CH1SET), Some(0x40));

        let resp_pos = writes.iter().position(|w| w.address == addr::RESP).unwrap();
        assert_eq!(writes[resp_pos + 1].address, addr::CONFIG4);
        assert_eq!(writes[resp_pos + 2].address, addr::CH1SET);
    }

    #[test]
    fn test_internal_test_signal() {
        let writes = writes_for(&[Physiological, ExternalSensor], 4, true);
        assert_eq!(value_of(&writes, addr::CONFIG2), Some(0x11));
        assert_eq!(value_of(&writes, channel_register(0)), Some(0x65));
        assert_eq!(value_of(&writes, channel_register(1)), Some(0x65));
        assert_eq!(value_of(&writes, channel_register(2)), Some(0x81));
        assert_eq!(value_of(&writes, channel_register(3)), Some(0x81));
        // no electrodes in the loop, so no right-leg-drive
        assert_eq!(value_of(&writes, addr::CONFIG3), Some(0xC0));
        assert_eq!(value_of(&writes, addr::RESP), None);
    }

    #[test]
    fn test_resolution_rate_verbatim() {
        let plan = ChannelPlan::build(&[Physiological], 4).unwrap();
        let settings = AcquisitionSettings { resolution_rate: config1::LOW_POWER_250_SPS, ..Default::default() };
        let writes = register_writes(&plan, &settings);
        assert_eq!(value_of(&writes, addr::CONFIG1), Some(0x06));
    }
}
