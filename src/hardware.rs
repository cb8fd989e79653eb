use ads129x_afe::{HalLink, HalPins};
use anyhow::{Context, Result};
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, Delay, SpidevBus};
use log::{info, warn};
use std::path::PathBuf;

use crate::config::{PinConfig, SpiConfig};

const CONSUMER: &str = "ads129x-streamer";

/// spidev bus, character-device GPIO lines and a thread-sleep delay
pub type HardwareLink = HalLink<SpidevBus, CdevPin, CdevPin, Delay>;

/// Open the SPI device and request the control lines
pub fn open(spi: &SpiConfig, pins: &PinConfig) -> Result<HardwareLink> {
    if !PathBuf::from(&spi.device).exists() {
        return Err(anyhow::anyhow!("SPI device not found: {}", spi.device));
    }
    let bus = open_spi(spi)?;
    info!("SPI device initialized: {} at {} Hz", spi.device, spi.speed_hz);

    let mut chip = Chip::new(&pins.gpio_chip).context(format!("Failed to open GPIO chip: {}", pins.gpio_chip))?;
    // PWDN and RESET start low so the part stays off until the power-up sequence
    let pins = HalPins {
        pwdn: output(&mut chip, pins.pwdn, 0)?,
        reset: output(&mut chip, pins.reset, 0)?,
        start: output(&mut chip, pins.start, 0)?,
        clksel: output(&mut chip, pins.clksel, 1)?,
        cs: output(&mut chip, pins.cs, 1)?,
        drdy: input(&mut chip, pins.drdy)?,
    };

    Ok(HalLink::new(bus, pins, Delay))
}

fn open_spi(spi: &SpiConfig) -> Result<SpidevBus> {
    if spi.mode != 1 {
        warn!("SPI mode {} configured, the ADS129x samples in mode 1", spi.mode);
    }
    let mode = match spi.mode {
        0 => SpiModeFlags::SPI_MODE_0,
        1 => SpiModeFlags::SPI_MODE_1,
        2 => SpiModeFlags::SPI_MODE_2,
        3 => SpiModeFlags::SPI_MODE_3,
        other => return Err(anyhow::anyhow!("Invalid SPI mode: {}", other)),
    };

    let mut bus = SpidevBus::open(&spi.device).context(format!("Failed to open SPI device: {}", spi.device))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(spi.speed_hz)
        // chip-select is a GPIO line so its hold time can be honoured
        .mode(mode | SpiModeFlags::SPI_NO_CS)
        .build();
    bus.configure(&options).context("Failed to configure SPI device")?;
    Ok(bus)
}

fn output(chip: &mut Chip, offset: u32, initial: u8) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::OUTPUT, initial, CONSUMER))
        .context(format!("Failed to request GPIO line {} as output", offset))?;
    CdevPin::new(handle).context(format!("Failed to wrap GPIO line {}", offset))
}

fn input(chip: &mut Chip, offset: u32) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .and_then(|line| line.request(LineRequestFlags::INPUT, 0, CONSUMER))
        .context(format!("Failed to request GPIO line {} as input", offset))?;
    CdevPin::new(handle).context(format!("Failed to wrap GPIO line {}", offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_missing_device_is_reported() {
        let mut config = Config::default();
        config.spi.device = "/dev/does-not-exist-spidev9.9".to_string();
        let err = open(&config.spi, &config.pins).err().unwrap();
        assert!(err.to_string().contains("SPI device not found"));
    }
}
