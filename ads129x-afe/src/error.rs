use thiserror::Error;

use crate::power::PowerState;

/// Reasons a channel plan is rejected. Raised before any register write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("plan declares {roles} channels but the device has {available}")]
    TooManyRoles { roles: usize, available: usize },

    #[error("device reports {available} channels, the family has at most 8")]
    TooManyChannels { available: usize },

    #[error("respiration role declared more than once")]
    DuplicateRespiration,

    #[error("respiration role at channel {index}, only channel 0 is wired for it")]
    RespirationNotFirst { index: usize },
}

/// Driver errors. `E` is the error type of the injected [`BusLink`](crate::BusLink).
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The SPI bus or a control line failed. Never retried.
    #[error("bus link failure: {0:?}")]
    Link(E),

    #[error("invalid channel plan: {0}")]
    Plan(#[from] PlanError),

    #[error("`{op}` is not allowed in power state {state:?}")]
    State { op: &'static str, state: PowerState },

    /// The identity register did not match a known part, usually a dead bus
    #[error("unrecognized device id 0x{id:02X}, check ADC communication")]
    Unrecognized { id: u8 },
}
