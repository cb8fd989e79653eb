//! Register map, command opcodes and bit-field encoding for the ADS129x family.
//!
//! Values follow the ADS1294/6/8(R) datasheet (SBAS459). Everything in here is
//! static data or a pure function of its arguments.

/// Single byte commands, sent while chip-select is low
pub mod cmd {
    pub const WAKEUP: u8 = 0x02;
    pub const STANDBY: u8 = 0x04;
    pub const RESET: u8 = 0x06;
    pub const START: u8 = 0x08;
    pub const STOP: u8 = 0x0A;
    /// Enable read data continuous mode
    pub const RDATAC: u8 = 0x10;
    /// Stop read data continuous mode, required for register access
    pub const SDATAC: u8 = 0x11;
    pub const RDATA: u8 = 0x12;
    pub const RREG: u8 = 0x20;
    pub const WREG: u8 = 0x40;
}

/// Register addresses
pub mod addr {
    /// Factory programmed, read-only
    pub const ID: u8 = 0x00;
    pub const CONFIG1: u8 = 0x01;
    pub const CONFIG2: u8 = 0x02;
    pub const CONFIG3: u8 = 0x03;
    pub const LOFF: u8 = 0x04;
    pub const CH1SET: u8 = 0x05;
    pub const CH8SET: u8 = 0x0C;
    pub const RLD_SENSP: u8 = 0x0D;
    pub const RLD_SENSN: u8 = 0x0E;
    pub const LOFF_SENSP: u8 = 0x0F;
    pub const LOFF_SENSN: u8 = 0x10;
    pub const LOFF_FLIP: u8 = 0x11;
    pub const LOFF_STATP: u8 = 0x12;
    pub const LOFF_STATN: u8 = 0x13;
    pub const GPIO: u8 = 0x14;
    pub const PACE: u8 = 0x15;
    pub const RESP: u8 = 0x16;
    pub const CONFIG4: u8 = 0x17;
    pub const WCT1: u8 = 0x18;
    pub const WCT2: u8 = 0x19;

    /// Number of addressable registers
    pub const COUNT: usize = 0x1A;
}

/// CONFIG2: test signal generation. Bits[7:6,3] must be 0.
pub mod config2 {
    pub const CONST: u8 = 0x00;
    /// Internal square wave, 1x amplitude, pulsed at fCLK/2^20
    pub const INT_TEST_2HZ: u8 = 0x11;
    /// Internal test signal at DC
    pub const INT_TEST_DC: u8 = 0x13;
}

/// CONFIG3: reference buffer and right-leg-drive. Bit[6] must be 1.
pub mod config3 {
    pub const CONST: u8 = 0x40;
    /// Internal reference buffer enabled
    pub const PD_REFBUF: u8 = 0x80;
    /// RLDREF generated internally at (AVDD - AVSS) / 2
    pub const RLDREF_INT: u8 = 0x08;
    /// RLD buffer enabled
    pub const PD_RLD: u8 = 0x04;
}

/// CHnSET: power-down, PGA gain and input multiplexer
pub mod chnset {
    pub const CONST: u8 = 0x00;
    /// Channel power-down, pair with the shorted input mux
    pub const PD_CH: u8 = 0x80;
    pub const GAIN_MASK: u8 = 0x70;
    pub const MUX_MASK: u8 = 0x07;
}

/// GPIO register; all zero sets every pin to output
pub mod gpio {
    pub const ALL_OUTPUT: u8 = 0x00;
}

/// RESP: respiration control. Bit[5] must be 1.
pub mod resp {
    pub const CONST: u8 = 0x20;
    pub const DEMOD_EN1: u8 = 0x80;
    pub const MOD_EN1: u8 = 0x40;
    pub const PH_135: u8 = 0x14;
    /// Internal respiration with internal signals
    pub const INT_SIG_INT: u8 = 0x02;
}

/// CONFIG4: respiration modulation frequency and misc. Bits[4,0] must be 0.
pub mod config4 {
    pub const CONST: u8 = 0x00;
    pub const RESP_FREQ_32K_HZ: u8 = 0x20;
}

/// CONFIG1 values, bit 7 selects high-resolution mode
pub mod config1 {
    pub const HIGH_RES_32K_SPS: u8 = 0x80;
    pub const HIGH_RES_16K_SPS: u8 = 0x81;
    pub const HIGH_RES_8K_SPS: u8 = 0x82;
    pub const HIGH_RES_4K_SPS: u8 = 0x83;
    pub const HIGH_RES_2K_SPS: u8 = 0x84;
    pub const HIGH_RES_1K_SPS: u8 = 0x85;
    pub const HIGH_RES_500_SPS: u8 = 0x86;
    pub const LOW_POWER_16K_SPS: u8 = 0x00;
    pub const LOW_POWER_8K_SPS: u8 = 0x01;
    pub const LOW_POWER_4K_SPS: u8 = 0x02;
    pub const LOW_POWER_2K_SPS: u8 = 0x03;
    pub const LOW_POWER_1K_SPS: u8 = 0x04;
    pub const LOW_POWER_500_SPS: u8 = 0x05;
    pub const LOW_POWER_250_SPS: u8 = 0x06;
}

/// Bytes per channel sample and per status word
pub const BYTES_PER_SLOT: usize = 3;

/// Largest channel count in the family
pub const MAX_CHANNELS: usize = 8;

/// Programmable gain, encoded in CHnSET bits [6:4]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Gain {
    X6 = 0x00,
    X1 = 0x10,
    X2 = 0x20,
    X3 = 0x30,
    X4 = 0x40,
    X8 = 0x50,
    X12 = 0x60,
}

/// Channel input multiplexer, CHnSET bits [2:0]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum InputMux {
    /// Normal electrode input
    Electrode = 0x00,
    /// Inputs shorted, for offset/noise or an unused channel
    Shorted = 0x01,
    RldMeasure = 0x02,
    Mvdd = 0x03,
    Temperature = 0x04,
    TestSignal = 0x05,
    RldDrp = 0x06,
    RldDrn = 0x07,
}

/// Value for an active CHnSET register
pub const fn channel_setting(gain: Gain, mux: InputMux) -> u8 {
    chnset::CONST | gain as u8 | mux as u8
}

/// Value for a powered-down, shorted CHnSET register
pub const fn channel_off() -> u8 {
    chnset::PD_CH | InputMux::Shorted as u8
}

/// CHnSET address for a zero based channel index
pub const fn channel_register(index: usize) -> u8 {
    addr::CH1SET + index as u8
}

/// `[WREG | addr, count - 1, value]` for a single register write
pub const fn write_frame(address: u8, value: u8) -> [u8; 3] {
    [cmd::WREG | address, 0x00, value]
}

/// `[RREG | addr, count - 1, dummy]`; the value is clocked out on the last byte
pub const fn read_frame(address: u8) -> [u8; 3] {
    [cmd::RREG | address, 0x00, 0x00]
}
