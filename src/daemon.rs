use ads129x_afe::{Ads129x, BusLink, ChannelPlan, PowerState};
use anyhow::{Context, Result};
use log::{info, warn};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::config::Config;
use crate::sink::FrameSink;

/// How long to wait for DRDY before giving up on a frame
const DRDY_TIMEOUT_US: u32 = 1_000_000;

pub struct Daemon<L: BusLink> {
    adc: Ads129x<L>,
    config: Config,
    plan: ChannelPlan,
    sink: FrameSink,
}

impl<L> Daemon<L>
where
    L: BusLink,
    L::Error: Send + Sync + 'static,
{
    pub fn new(link: L, config: Config) -> Result<Self> {
        let sink = FrameSink::open(&config.output)?;
        Self::with_sink(link, config, sink)
    }

    pub fn with_sink(link: L, config: Config, sink: FrameSink) -> Result<Self> {
        let mut adc = Ads129x::new(link);
        let plan = Self::bring_up(&mut adc, &config, config.acquisition.cold_start)?;
        info!("DRDY poll interval: {}us", config.polling.interval_us);
        info!("Session {}", sink.session());
        Ok(Daemon { adc, config, plan, sink })
    }

    /// Power up, identify, configure and start streaming
    fn bring_up(adc: &mut Ads129x<L>, config: &Config, cold: bool) -> Result<ChannelPlan> {
        let acquisition = &config.acquisition;

        adc.power_up(cold).context("Power-up failed")?;
        let identity = adc.identify().context("Failed to read device id")?;
        if !identity.is_recognized() {
            return Err(anyhow::anyhow!("ADC comms error, device id 0x{:02X} not recognized", identity.id));
        }

        let plan = ChannelPlan::build(&acquisition.channels, identity.available_channels)
            .context("Invalid channel configuration")?;
        for (i, role) in plan.roles().iter().enumerate() {
            info!("  - Channel {}: {:?}", i + 1, role);
        }

        let plan = adc.configure(&plan, &acquisition.settings()).context("Failed to configure ADC")?;
        adc.start_stream().context("Failed to start streaming")?;
        Ok(plan)
    }

    pub async fn poll(&mut self) -> Result<()> {
        let interval = Duration::from_micros(u64::from(self.config.polling.interval_us.max(1)));

        for _ in 0..self.config.polling.frames_per_poll {
            if !self.wait_data_ready(interval).await? {
                warn!("No DRDY within {}ms", DRDY_TIMEOUT_US / 1000);
                break;
            }
            let frame = self.adc.fetch_frame(&self.plan).context("Frame read failed")?;
            self.sink.write(&frame)?;
        }
        self.sink.flush()?;

        // let the signal handlers in between batches
        tokio::task::yield_now().await;
        Ok(())
    }

    /// Sample DRDY every `interval` without blocking the runtime
    async fn wait_data_ready(&mut self, interval: Duration) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_micros(u64::from(DRDY_TIMEOUT_US));
        loop {
            if self.adc.data_ready().context("DRDY poll failed")? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            sleep(interval).await;
        }
    }

    /// Apply a new configuration and replay the whole start-up sequence.
    /// The chip keeps its supply, so the VCAP charge wait is skipped.
    ///
    /// A rejected configuration leaves the previous one streaming. If even that
    /// cannot be restored the chip is left stopped; check [`is_streaming`](Self::is_streaming).
    pub fn reload_config(&mut self, new_config: Config) -> Result<()> {
        if !self.config.same_hardware(&new_config) {
            warn!("SPI and pin changes take effect after a restart");
        }
        ChannelPlan::build(&new_config.acquisition.channels, self.plan.available_channels())
            .context("Invalid channel configuration")?;
        let sink = if new_config.output != self.config.output {
            Some(FrameSink::open(&new_config.output)?)
        } else {
            None
        };

        self.stop()?;
        match Self::bring_up(&mut self.adc, &new_config, false) {
            Ok(plan) => self.plan = plan,
            Err(e) => {
                warn!("Reload failed, restoring previous configuration: {:#}", e);
                self.plan = Self::bring_up(&mut self.adc, &self.config, false)?;
                return Err(e);
            }
        }

        if let Some(sink) = sink {
            self.sink.flush()?;
            self.sink = sink;
        }
        self.config = new_config;
        self.sink.new_session();
        info!("Configuration reloaded successfully");
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.adc.state() == PowerState::Streaming
    }

    /// Stop streaming and power the chip down
    pub fn shutdown(&mut self) -> Result<()> {
        self.stop()?;
        self.adc.power_down().context("Power-down failed")?;
        self.sink.flush()
    }

    fn stop(&mut self) -> Result<()> {
        if self.is_streaming() {
            self.adc.stop_stream().context("Failed to stop streaming")?;
        }
        Ok(())
    }

    pub fn adc(&self) -> &Ads129x<L> {
        &self.adc
    }

    pub fn plan(&self) -> &ChannelPlan {
        &self.plan
    }
}
