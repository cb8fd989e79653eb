//! Simulated ADS129x
//!
//! [`SimulatedChip`] implements [`BusLink`] with a register file, command decoding,
//! continuous-read frame generation and a virtual microsecond clock that only
//! moves on delays. Every line change, command and register access is recorded
//! with its timestamp so timing contracts can be checked after the fact. The log
//! keeps the most recent [`EVENT_LOG_LIMIT`] to [`EVENT_LOG_LIMIT`] * 2 events.
//!
//! [`SimulatedChip::with_wall_clock`] lets the clock also follow real time, so a
//! host that waits with its own timer still sees DRDY assert.

use core::convert::Infallible;
use std::time::Instant;

use embedded_hal::digital::PinState;
use log::trace;

use crate::link::{BusLink, Line, CS_HOLD_US};
use crate::registers::{addr, cmd, BYTES_PER_SLOT, MAX_CHANNELS};

/// Sync nibble the chip puts in front of every status word
const STATUS_SYNC: u32 = 0xC0_0000;

/// Events kept once the log is trimmed
pub const EVENT_LOG_LIMIT: usize = 4096;

/// Something the host did to the chip, stamped with the virtual time in us
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line { at: u64, line: Line, state: PinState },
    Command { at: u64, opcode: u8 },
    RegisterWrite { at: u64, address: u8, value: u8 },
    RegisterRead { at: u64, address: u8, value: u8 },
    /// Chip-select was raised after `bytes` transfers
    Session { at: u64, bytes: usize },
}

impl Event {
    pub fn at(&self) -> u64 {
        match *self {
            Event::Line { at, .. }
            | Event::Command { at, .. }
            | Event::RegisterWrite { at, .. }
            | Event::RegisterRead { at, .. }
            | Event::Session { at, .. } => at,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy)]
enum Decode {
    Opcode,
    Count { access: Access, address: u8 },
    Data { access: Access, address: u8, remaining: usize },
}

pub struct SimulatedChip {
    id: u8,
    connected: bool,
    now_us: u64,
    epoch: Option<Instant>,
    events: Vec<Event>,
    registers: [u8; addr::COUNT],

    powered: bool,
    reset_high: bool,
    start_high: bool,
    cs_low: bool,

    continuous: bool,
    converting: bool,
    standby: bool,

    decode: Decode,
    session_bytes: usize,
    last_transfer_us: u64,
    hold_violations: usize,

    frame: Vec<u8>,
    frame_pos: usize,
    frames_served: u64,
    next_sample_us: u64,
    channel_values: Option<[i32; MAX_CHANNELS]>,
}

impl SimulatedChip {
    /// Create an unpowered chip answering with `id` in its ID register
    pub fn new(id: u8) -> Self {
        let mut chip = SimulatedChip {
            id,
            connected: true,
            now_us: 0,
            epoch: None,
            events: Vec::new(),
            registers: [0; addr::COUNT],
            powered: false,
            reset_high: false,
            start_high: false,
            cs_low: false,
            continuous: true,
            converting: false,
            standby: false,
            decode: Decode::Opcode,
            session_bytes: 0,
            last_transfer_us: 0,
            hold_violations: 0,
            frame: Vec::new(),
            frame_pos: 0,
            frames_served: 0,
            next_sample_us: 0,
            channel_values: None,
        };
        chip.reset_registers();
        chip
    }

    /// Let the clock run at least as fast as real time from now on
    pub fn with_wall_clock(mut self) -> Self {
        self.epoch = Some(Instant::now());
        self
    }

    /// A disconnected chip leaves MISO floating high on every transfer
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Emit these raw 24-bit values on every frame instead of the default ramp
    pub fn set_channel_values(&mut self, values: [i32; MAX_CHANNELS]) {
        self.channel_values = Some(values);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// `(address, value)` of every register write the chip accepted, in order
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::RegisterWrite { address, value, .. } => Some((address, value)),
                _ => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match *e {
                Event::Command { opcode, .. } => Some(opcode),
                _ => None,
            })
            .collect()
    }

    /// Timestamp of the first change of `line` to `state` at or after `from`
    pub fn line_change(&self, line: Line, state: PinState, from: u64) -> Option<u64> {
        self.events.iter().find_map(|e| match *e {
            Event::Line { at, line: l, state: s } if l == line && s == state && at >= from => Some(at),
            _ => None,
        })
    }

    pub fn register(&self, address: u8) -> u8 {
        self.registers[address as usize]
    }

    pub fn now_us(&self) -> u64 {
        self.now_us
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    pub fn is_converting(&self) -> bool {
        self.converting
    }

    pub fn is_standby(&self) -> bool {
        self.standby
    }

    /// Chip-select sessions closed sooner than [`CS_HOLD_US`] after the last byte
    pub fn hold_violations(&self) -> usize {
        self.hold_violations
    }

    pub fn frames_served(&self) -> u64 {
        self.frames_served
    }

    /// Raw 24-bit value the chip reports for `channel` in frame number `seq`
    pub fn channel_value(&self, seq: u64, channel: usize) -> i32 {
        match self.channel_values {
            Some(values) => values[channel],
            None => (channel as i32 - 3) * 1000 + (seq % 1000) as i32,
        }
    }

    fn record(&mut self, event: Event) {
        if self.events.len() >= EVENT_LOG_LIMIT * 2 {
            self.events.drain(..EVENT_LOG_LIMIT);
        }
        self.events.push(event);
    }

    fn sync_clock(&mut self) {
        if let Some(epoch) = self.epoch {
            let wall = u64::try_from(epoch.elapsed().as_micros()).unwrap_or(u64::MAX);
            self.now_us = self.now_us.max(wall);
        }
    }

    fn reset_registers(&mut self) {
        self.registers = [0; addr::COUNT];
        self.registers[addr::ID as usize] = self.id;
        self.registers[addr::CONFIG1 as usize] = 0x06;
        self.registers[addr::CONFIG2 as usize] = 0x40;
        self.registers[addr::CONFIG3 as usize] = 0x40;
        self.registers[addr::GPIO as usize] = 0x0F;
        // the part powers up in continuous read mode
        self.continuous = true;
        self.standby = false;
        self.converting = self.start_high;
    }

    fn sample_period_us(&self) -> u64 {
        let config1 = self.registers[addr::CONFIG1 as usize];
        let base: u64 = if config1 & 0x80 != 0 { 32_000 } else { 16_000 };
        let rate = base >> u64::from((config1 & 0x07).min(6));
        1_000_000 / rate
    }

    fn channel_count(&self) -> usize {
        match self.id & 0x07 {
            0b000 => 4,
            0b001 => 6,
            _ => MAX_CHANNELS,
        }
    }

    fn streaming(&self) -> bool {
        self.powered && self.continuous && self.converting && !self.standby
    }

    fn load_frame(&mut self) {
        self.frame.clear();
        self.frame_pos = 0;
        if !self.streaming() {
            return;
        }
        let gpio = u32::from(self.registers[addr::GPIO as usize] >> 4);
        let status = STATUS_SYNC | gpio;
        self.frame.extend_from_slice(&status.to_be_bytes()[1..]);
        for channel in 0..self.channel_count() {
            let raw = self.channel_value(self.frames_served, channel) as u32;
            self.frame.extend_from_slice(&raw.to_be_bytes()[1..]);
        }
    }

    fn execute(&mut self, opcode: u8) {
        self.record(Event::Command { at: self.now_us, opcode });
        match opcode {
            cmd::WAKEUP => self.standby = false,
            cmd::STANDBY => self.standby = true,
            cmd::RESET => self.reset_registers(),
            cmd::START => {
                self.converting = true;
                self.next_sample_us = self.now_us + self.sample_period_us();
            }
            cmd::STOP => self.converting = false,
            cmd::RDATAC => self.continuous = true,
            cmd::SDATAC => self.continuous = false,
            _ => {}
        }
    }

    fn clock(&mut self, mosi: u8) -> u8 {
        match self.decode {
            Decode::Opcode => {
                let miso = self.frame_byte();
                match mosi & 0xE0 {
                    cmd::RREG => {
                        self.decode = Decode::Count { access: Access::Read, address: mosi & 0x1F }
                    }
                    cmd::WREG => {
                        self.decode = Decode::Count { access: Access::Write, address: mosi & 0x1F }
                    }
                    _ if mosi == 0x00 => {}
                    _ => self.execute(mosi),
                }
                miso
            }
            Decode::Count { access, address } => {
                self.decode = Decode::Data { access, address, remaining: usize::from(mosi) + 1 };
                0x00
            }
            Decode::Data { access, address, remaining } => {
                let miso = self.register_access(access, address, mosi);
                self.decode = if remaining > 1 {
                    Decode::Data { access, address: address.wrapping_add(1), remaining: remaining - 1 }
                } else {
                    Decode::Opcode
                };
                miso
            }
        }
    }

    fn frame_byte(&mut self) -> u8 {
        match self.frame.get(self.frame_pos) {
            Some(&b) => {
                self.frame_pos += 1;
                b
            }
            None => 0x00,
        }
    }

    fn register_access(&mut self, access: Access, address: u8, mosi: u8) -> u8 {
        let idx = address as usize;
        // register opcodes are ignored while in continuous read mode
        if self.continuous || idx >= addr::COUNT {
            return 0x00;
        }
        match access {
            Access::Read => {
                let value = self.registers[idx];
                self.record(Event::RegisterRead { at: self.now_us, address, value });
                value
            }
            Access::Write => {
                if address != addr::ID {
                    self.registers[idx] = mosi;
                    self.record(Event::RegisterWrite { at: self.now_us, address, value: mosi });
                }
                0x00
            }
        }
    }
}

impl BusLink for SimulatedChip {
    type Error = Infallible;

    fn set_line(&mut self, line: Line, state: PinState) -> Result<(), Infallible> {
        self.sync_clock();
        trace!("sim {:?} -> {:?} at {}us", line, state, self.now_us);
        self.record(Event::Line { at: self.now_us, line, state });
        let high = state == PinState::High;
        match line {
            Line::PowerDown => {
                if high && !self.powered {
                    self.powered = true;
                    self.reset_registers();
                }
                self.powered = high;
            }
            Line::Reset => {
                if high && !self.reset_high && self.powered {
                    self.reset_registers();
                }
                self.reset_high = high;
            }
            Line::Start => {
                if high && !self.start_high {
                    self.next_sample_us = self.now_us + self.sample_period_us();
                }
                self.start_high = high;
                self.converting = high;
            }
            Line::ClockSelect => {}
            Line::ChipSelect => {
                if !high && !self.cs_low {
                    self.decode = Decode::Opcode;
                    self.session_bytes = 0;
                    self.load_frame();
                } else if high && self.cs_low {
                    if self.session_bytes > 0 && self.now_us < self.last_transfer_us + u64::from(CS_HOLD_US) {
                        self.hold_violations += 1;
                    }
                    if self.frame_pos >= BYTES_PER_SLOT {
                        self.frames_served += 1;
                        self.next_sample_us = self.now_us + self.sample_period_us();
                    }
                    self.frame.clear();
                    self.frame_pos = 0;
                    self.record(Event::Session { at: self.now_us, bytes: self.session_bytes });
                }
                self.cs_low = !high;
            }
        }
        Ok(())
    }

    fn data_ready(&mut self) -> Result<bool, Infallible> {
        self.sync_clock();
        Ok(self.streaming() && self.now_us >= self.next_sample_us)
    }

    fn transfer(&mut self, byte: u8) -> Result<u8, Infallible> {
        if !self.connected || !self.powered || !self.cs_low {
            return Ok(0xFF);
        }
        self.session_bytes += 1;
        self.last_transfer_us = self.now_us;
        Ok(self.clock(byte))
    }

    fn delay_us(&mut self, us: u32) {
        self.now_us += u64::from(us);
    }
}
