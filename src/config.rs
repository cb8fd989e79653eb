use ads129x_afe::registers::config1;
use ads129x_afe::{AcquisitionSettings, ChannelRole};
use serde::{Deserialize, Serialize};

/// `spi.device` value selecting the simulated chip instead of spidev
pub const SIMULATED_DEVICE: &str = "sim";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub spi: SpiConfig,
    pub pins: PinConfig,
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpiConfig {
    pub device: String,
    pub speed_hz: u32,
    /// The ADS129x only talks SPI mode 1
    pub mode: u8,
}

/// GPIO character device and line offsets of the control lines
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinConfig {
    pub gpio_chip: String,
    pub pwdn: u32,
    pub reset: u32,
    pub start: u32,
    pub clksel: u32,
    pub cs: u32,
    pub drdy: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Role per channel, starting at channel 1
    pub channels: Vec<ChannelRole>,
    /// Raw CONFIG1 value
    #[serde(default = "default_resolution_rate")]
    pub resolution_rate: u8,
    #[serde(default)]
    pub test_signal: bool,
    #[serde(default)]
    pub include_gpio: bool,
    #[serde(default = "default_cold_start")]
    pub cold_start: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Gap between two DRDY samples
    pub interval_us: u32,
    pub frames_per_poll: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON lines file, stdout when absent
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub syslog: bool,
}

fn default_resolution_rate() -> u8 {
    config1::HIGH_RES_500_SPS
}

fn default_cold_start() -> bool {
    true
}

impl Config {
    pub fn is_simulated(&self) -> bool {
        self.spi.device == SIMULATED_DEVICE
    }

    /// Hardware side of the config, a change here needs a restart
    pub fn same_hardware(&self, other: &Config) -> bool {
        self.spi == other.spi && self.pins == other.pins
    }
}

impl AcquisitionConfig {
    pub fn settings(&self) -> AcquisitionSettings {
        AcquisitionSettings {
            resolution_rate: self.resolution_rate,
            use_test_signal: self.test_signal,
            include_gpio: self.include_gpio,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_us: 100,
            frames_per_poll: 50,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spi: SpiConfig {
                device: "/dev/spidev0.0".to_string(),
                speed_hz: 2_000_000,
                mode: 1,
            },
            pins: PinConfig {
                gpio_chip: "/dev/gpiochip0".to_string(),
                pwdn: 17,
                reset: 27,
                start: 22,
                clksel: 23,
                cs: 8,
                drdy: 24,
            },
            acquisition: AcquisitionConfig {
                channels: vec![ChannelRole::Physiological, ChannelRole::Physiological],
                resolution_rate: default_resolution_rate(),
                test_signal: false,
                include_gpio: false,
                cold_start: default_cold_start(),
            },
            polling: PollingConfig::default(),
            output: OutputConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
spi:
  device: sim
  speed_hz: 1000000
  mode: 1
pins:
  gpio_chip: /dev/gpiochip1
  pwdn: 1
  reset: 2
  start: 3
  clksel: 4
  cs: 5
  drdy: 6
acquisition:
  channels: [respiration_series, physiological, unconnected, external_sensor]
  include_gpio: true
"#;

    #[test]
    fn test_parse_with_defaults() {
        let config: Config = serde_yaml::from_str(SAMPLE).unwrap();
        assert!(config.is_simulated());
        assert_eq!(config.pins.drdy, 6);
        assert_eq!(
            config.acquisition.channels,
            vec![
                ChannelRole::RespirationSeries,
                ChannelRole::Physiological,
                ChannelRole::Unconnected,
                ChannelRole::ExternalSensor
            ]
        );
        assert_eq!(config.acquisition.resolution_rate, config1::HIGH_RES_500_SPS);
        assert!(config.acquisition.cold_start);
        assert_eq!(config.polling, PollingConfig::default());
        assert_eq!(config.output.path, None);
        assert!(!config.logging.syslog);

        let settings = config.acquisition.settings();
        assert!(settings.include_gpio);
        assert!(!settings.use_test_signal);
    }

    #[test]
    fn test_default_round_trips_through_yaml() {
        let config = Config::default();
        let text = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
        assert!(!parsed.is_simulated());
    }

    #[test]
    fn test_same_hardware() {
        let a = Config::default();
        let mut b = a.clone();
        b.acquisition.test_signal = true;
        assert!(a.same_hardware(&b));
        b.pins.drdy = 5;
        assert!(!a.same_hardware(&b));
    }
}
