use log::{debug, info, warn};

use crate::configure::{register_writes, AcquisitionSettings};
use crate::error::Error;
use crate::identity::DeviceIdentity;
use crate::link::{self, BusLink};
use crate::plan::{ChannelPlan, ChannelRole};
use crate::power::{PowerSequencer, PowerState};
use crate::registers::addr;
use crate::stream::{self, AcquisitionFrame};

/// States in which the part answers register reads
const REGISTER_READ: &[PowerState] = &[PowerState::Idle, PowerState::Standby];
/// Registers are only written with the converter idle
const REGISTER_WRITE: &[PowerState] = &[PowerState::Idle];

/// One ADS129x on an exclusive [`BusLink`].
///
/// # Example
///
/// ```
/// use ads129x_afe::{Ads129x, AcquisitionSettings, ChannelRole, SimulatedChip};
///
/// let mut adc = Ads129x::new(SimulatedChip::new(0x92));
/// let plan = adc
///     .start_up(&[ChannelRole::Physiological, ChannelRole::Physiological], &AcquisitionSettings::default())
///     .unwrap();
/// adc.start_stream().unwrap();
/// let frame = adc.fetch_frame(&plan).unwrap();
/// assert_eq!(frame.samples.len(), 2);
/// ```
pub struct Ads129x<L: BusLink> {
    link: L,
    power: PowerSequencer,
    identity: Option<DeviceIdentity>,
}

impl<L: BusLink> Ads129x<L> {
    pub fn new(link: L) -> Self {
        Ads129x { link, power: PowerSequencer::new(), identity: None }
    }

    pub fn state(&self) -> PowerState {
        self.power.state()
    }

    /// Identity from the last [`identify`](Self::identify), cleared on power-down
    pub fn identity(&self) -> Option<DeviceIdentity> {
        self.identity
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Give back the bus link
    pub fn release(self) -> L {
        self.link
    }

    pub fn power_up(&mut self, cold: bool) -> Result<(), Error<L::Error>> {
        self.identity = None;
        self.power.power_up(&mut self.link, cold)
    }

    pub fn power_down(&mut self) -> Result<(), Error<L::Error>> {
        self.identity = None;
        self.power.power_down(&mut self.link)?;
        info!("ADC powered down");
        Ok(())
    }

    pub fn standby(&mut self) -> Result<(), Error<L::Error>> {
        self.power.standby(&mut self.link)
    }

    pub fn wake(&mut self) -> Result<(), Error<L::Error>> {
        self.power.wake(&mut self.link)
    }

    pub fn start_stream(&mut self) -> Result<(), Error<L::Error>> {
        self.power.start_stream(&mut self.link)?;
        info!("Streaming started");
        Ok(())
    }

    pub fn stop_stream(&mut self) -> Result<(), Error<L::Error>> {
        self.power.stop_stream(&mut self.link)?;
        info!("Streaming stopped");
        Ok(())
    }

    /// Read and decode the ID register.
    ///
    /// An unrecognised ID is not an error: it comes back with
    /// `available_channels == 0` and callers must check before going on.
    pub fn identify(&mut self) -> Result<DeviceIdentity, Error<L::Error>> {
        let id = self.read_register(addr::ID)?;
        let identity = DeviceIdentity::decode(id);
        if identity.is_recognized() {
            info!(
                "ADC id 0x{:02X}: {} channels, respiration {}",
                id,
                identity.available_channels,
                if identity.respiration_capable { "yes" } else { "no" }
            );
        } else {
            warn!("ADC id 0x{:02X} not recognized, ADC comms error", id);
        }
        self.identity = Some(identity);
        Ok(identity)
    }

    /// Push the register writes for `plan` and return the plan with the GPIO word
    /// flag from `settings` applied; that is the plan to hand to
    /// [`fetch_frame`](Self::fetch_frame).
    pub fn configure(&mut self, plan: &ChannelPlan, settings: &AcquisitionSettings) -> Result<ChannelPlan, Error<L::Error>> {
        self.power.require("configure", &[PowerState::Idle])?;

        if plan.has_respiration() && !settings.use_test_signal {
            if let Some(identity) = self.identity.filter(|id| !id.respiration_capable) {
                warn!("respiration channel requested but part 0x{:02X} has no demodulator", identity.id);
            }
        }

        let writes = register_writes(plan, settings);
        debug!("Applying {} register writes", writes.len());
        for w in &writes {
            link::write_register(&mut self.link, w.address, w.value).map_err(Error::Link)?;
        }

        let plan = plan.clone().with_gpio_word(settings.include_gpio);
        info!(
            "Configured {} of {} channels, {} bytes per frame",
            plan.connected_count(),
            plan.available_channels(),
            plan.frame_size()
        );
        Ok(plan)
    }

    /// Clock out one frame. Gate on [`data_ready`](Self::data_ready), the chip gives
    /// no sign when a frame is stale or half shifted.
    pub fn fetch_frame(&mut self, plan: &ChannelPlan) -> Result<AcquisitionFrame, Error<L::Error>> {
        self.power.require("fetch_frame", &[PowerState::Streaming])?;
        stream::read_frame(&mut self.link, plan).map_err(Error::Link)
    }

    /// DRDY sampled once
    pub fn data_ready(&mut self) -> Result<bool, Error<L::Error>> {
        self.link.data_ready().map_err(Error::Link)
    }

    /// Poll DRDY up to `max_polls` times, `interval_us` apart. False if it never went low.
    pub fn wait_data_ready(&mut self, interval_us: u32, max_polls: u32) -> Result<bool, Error<L::Error>> {
        for _ in 0..max_polls {
            if self.data_ready()? {
                return Ok(true);
            }
            self.link.delay_us(interval_us);
        }
        Ok(false)
    }

    /// Cold power-up, identify, validate `roles` and configure.
    ///
    /// Turns the unrecognised-ID sentinel into [`Error::Unrecognized`] so nothing is
    /// written to a part that is not there.
    pub fn start_up(&mut self, roles: &[ChannelRole], settings: &AcquisitionSettings) -> Result<ChannelPlan, Error<L::Error>> {
        self.power_up(true)?;
        let identity = self.identify()?;
        if !identity.is_recognized() {
            return Err(Error::Unrecognized { id: identity.id });
        }
        let plan = ChannelPlan::build(roles, identity.available_channels)?;
        self.configure(&plan, settings)
    }

    pub fn send_command(&mut self, opcode: u8) -> Result<(), Error<L::Error>> {
        self.power.require("send_command", &[PowerState::Idle, PowerState::Standby, PowerState::Streaming])?;
        link::send_command(&mut self.link, opcode).map_err(Error::Link)
    }

    pub fn read_register(&mut self, address: u8) -> Result<u8, Error<L::Error>> {
        self.power.require("read_register", REGISTER_READ)?;
        link::read_register(&mut self.link, address).map_err(Error::Link)
    }

    pub fn write_register(&mut self, address: u8, value: u8) -> Result<(), Error<L::Error>> {
        self.power.require("write_register", REGISTER_WRITE)?;
        link::write_register(&mut self.link, address, value).map_err(Error::Link)
    }
}
