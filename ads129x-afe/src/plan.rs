use serde::{Deserialize, Serialize};

use crate::error::PlanError;
use crate::registers::{BYTES_PER_SLOT, MAX_CHANNELS};

/// What is wired to a channel input
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    /// Powered down and shorted
    #[default]
    Unconnected,
    /// Body electrode, also feeds the right-leg-drive reference
    Physiological,
    /// Any other sensor, kept out of the right-leg-drive loop
    ExternalSensor,
    /// Respiration impedance, only wired on channel 1
    RespirationSeries,
}

impl ChannelRole {
    pub fn is_connected(self) -> bool {
        self != ChannelRole::Unconnected
    }
}

/// Validated per-channel roles for one device, and the frame geometry they imply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelPlan {
    roles: Vec<ChannelRole>,
    available_channels: usize,
    connected_count: usize,
    include_gpio_word: bool,
}

impl ChannelPlan {
    /// Check `roles` against a device with `available_channels` inputs.
    /// Slots past the end of `roles` are treated as unconnected.
    pub fn build(roles: &[ChannelRole], available_channels: usize) -> Result<Self, PlanError> {
        // CH8SET is followed by RLD_SENSP, there is no ninth channel register
        if available_channels > MAX_CHANNELS {
            return Err(PlanError::TooManyChannels { available: available_channels });
        }
        if roles.len() > available_channels {
            return Err(PlanError::TooManyRoles { roles: roles.len(), available: available_channels });
        }

        let mut respiration = roles
            .iter()
            .enumerate()
            .filter(|(_, role)| **role == ChannelRole::RespirationSeries)
            .map(|(i, _)| i);
        if let Some(first) = respiration.next() {
            if respiration.next().is_some() {
                return Err(PlanError::DuplicateRespiration);
            }
            if first != 0 {
                return Err(PlanError::RespirationNotFirst { index: first });
            }
        }

        Ok(ChannelPlan {
            roles: roles.to_vec(),
            available_channels,
            connected_count: roles.iter().filter(|r| r.is_connected()).count(),
            include_gpio_word: false,
        })
    }

    /// Same plan, keeping or dropping the leading status/GPIO word of each frame
    pub fn with_gpio_word(mut self, include: bool) -> Self {
        self.include_gpio_word = include;
        self
    }

    /// Role of a physical slot, unplanned slots are unconnected
    pub fn role(&self, index: usize) -> ChannelRole {
        self.roles.get(index).copied().unwrap_or_default()
    }

    pub fn roles(&self) -> &[ChannelRole] {
        &self.roles
    }

    /// Zero based indices of the connected channels, in frame order
    pub fn connected_channels(&self) -> impl Iterator<Item = usize> + '_ {
        self.roles.iter().enumerate().filter(|(_, r)| r.is_connected()).map(|(i, _)| i)
    }

    pub fn available_channels(&self) -> usize {
        self.available_channels
    }

    pub fn connected_count(&self) -> usize {
        self.connected_count
    }

    pub fn include_gpio_word(&self) -> bool {
        self.include_gpio_word
    }

    pub fn has_respiration(&self) -> bool {
        self.role(0) == ChannelRole::RespirationSeries
    }

    /// Bytes kept from each frame
    pub fn frame_size(&self) -> usize {
        (self.connected_count + usize::from(self.include_gpio_word)) * BYTES_PER_SLOT
    }

    /// Bytes the chip clocks out per frame, status word plus every physical channel
    pub fn wire_size(&self) -> usize {
        (self.available_channels + 1) * BYTES_PER_SLOT
    }
}
