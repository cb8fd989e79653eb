//! Part identification from the read-only ID register
//!
//! | ID     | Part     |
//! |--------|----------|
//! | `0x90` | ADS1294  |
//! | `0x91` | ADS1296  |
//! | `0x92` | ADS1298  |
//! | `0xD0` | ADS1294R |
//! | `0xD1` | ADS1296R |
//! | `0xD2` | ADS1298R |
//! | `0x3E` | ADS1299  |

/// What the connected part can do
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DeviceIdentity {
    /// 4, 6 or 8. Zero means the ID did not decode, which almost always means a
    /// broken bus rather than an unknown part.
    pub available_channels: usize,
    /// Respiration demodulator present (the `R` variants)
    pub respiration_capable: bool,
    /// Raw ID register
    pub id: u8,
}

impl DeviceIdentity {
    pub fn decode(id: u8) -> Self {
        // 3 least significant bits report the channel count
        let available_channels = match id & 0b111 {
            0b000 => 4,
            0b001 => 6,
            0b010 => 8,
            0b110 => 8,
            _ => 0,
        };
        // ID[7:6] == 11 only on the R parts, ID[7:5] == 100 on the others
        let respiration_capable = (id >> 5) & 0b110 == 0b110;

        DeviceIdentity { available_channels, respiration_capable, id }
    }

    /// False for the comms failure sentinel
    pub fn is_recognized(&self) -> bool {
        self.available_channels != 0
    }
}
