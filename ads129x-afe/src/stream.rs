//! Continuous-read frame decoding
//!
//! Each frame on the wire is a 24-bit status word followed by one 24-bit sample for
//! every physical channel, MSB first, whatever the channel configuration. Only
//! the blocks the plan asks for are kept.

use serde::Serialize;

use crate::link::{with_chip_select, BusLink};
use crate::plan::ChannelPlan;
use crate::registers::{BYTES_PER_SLOT, MAX_CHANNELS};

/// Largest frame any part in the family clocks out
pub const MAX_WIRE_BYTES: usize = (MAX_CHANNELS + 1) * BYTES_PER_SLOT;

/// Raw status word at the head of each frame: `1100` sync, LOFF_STATP, LOFF_STATN, GPIO[4:1]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StatusWord(pub u32);

impl StatusWord {
    /// The top nibble is always `1100` on a healthy bus
    pub fn is_synced(self) -> bool {
        self.0 >> 20 == 0b1100
    }

    /// GPIO4..GPIO1 data bits
    pub fn gpio(self) -> u8 {
        (self.0 & 0x0F) as u8
    }
}

/// One decoded frame. Samples follow channel order, connected channels only.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AcquisitionFrame {
    pub status: Option<StatusWord>,
    pub samples: Vec<i32>,
}

impl AcquisitionFrame {
    /// Bytes kept from the wire, equals the plan's frame size
    pub fn byte_len(&self) -> usize {
        (self.samples.len() + usize::from(self.status.is_some())) * BYTES_PER_SLOT
    }
}

/// Sign-extend a big-endian 24-bit two's complement sample
pub fn sample_from_be(bytes: [u8; 3]) -> i32 {
    i32::from_be_bytes([bytes[0], bytes[1], bytes[2], 0]) >> 8
}

fn word_from_be(bytes: [u8; 3]) -> u32 {
    u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
}

/// Pick the blocks `plan` keeps out of one wire frame
pub fn decode_frame(plan: &ChannelPlan, wire: &[u8]) -> AcquisitionFrame {
    let mut blocks = wire.chunks_exact(BYTES_PER_SLOT).map(|b| [b[0], b[1], b[2]]);

    let status = blocks.next().filter(|_| plan.include_gpio_word()).map(|b| StatusWord(word_from_be(b)));

    let samples = blocks
        .take(plan.available_channels())
        .enumerate()
        .filter(|(i, _)| plan.role(*i).is_connected())
        .map(|(_, b)| sample_from_be(b))
        .collect();

    AcquisitionFrame { status, samples }
}

/// Clock one whole frame off the bus in a single chip-select session and decode it
pub(crate) fn read_frame<L: BusLink + ?Sized>(link: &mut L, plan: &ChannelPlan) -> Result<AcquisitionFrame, L::Error> {
    let mut buf = [0u8; MAX_WIRE_BYTES];
    let wire = &mut buf[..plan.wire_size().min(MAX_WIRE_BYTES)];
    with_chip_select(link, |link| link.transfer_in_place(&mut *wire))?;
    Ok(decode_frame(plan, wire))
}
