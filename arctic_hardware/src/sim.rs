//! In-process stand-in for the CCD controller.
//!
//! Exposure time, pause/resume and readout progress are derived from an
//! injected [`Clock`], so tests can drive a full exposure deterministically.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use arctic_traits::opcodes::*;
use arctic_traits::{Clock, DeviceGateway, HwResult, MonotonicClock};

use crate::error::HwError;

/// Pixels per second for each `SPS` rate code.
fn pixel_rate_for(code: u32) -> Option<f64> {
    match code {
        RATE_SLOW => Some(208_000.0),
        RATE_MEDIUM => Some(444_000.0),
        RATE_FAST => Some(1_019_000.0),
        _ => None,
    }
}

/// One command as received by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentCommand {
    pub board_id: u32,
    pub cmd: u32,
    pub args: [u32; 3],
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Idle,
    Exposing {
        segment_start: Instant,
        accumulated: Duration,
    },
    Paused {
        accumulated: Duration,
    },
    Readout {
        started: Instant,
        total: u64,
    },
}

/// Simulated controller implementing [`DeviceGateway`].
pub struct SimulatedController<C: Clock = MonotonicClock> {
    clock: C,
    device_count: usize,
    connected: bool,
    open: bool,
    buffer: Vec<u8>,
    image_cols: u32,
    image_rows: u32,
    exposure_ms: u32,
    phase: Phase,
    open_shutter_on_expose: bool,
    shutter_open: bool,
    pixel_rate_hz: f64,
    firmware: Option<PathBuf>,
    forced_reply: Option<(u32, i32)>,
    commands: Vec<SentCommand>,
}

impl SimulatedController<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new())
    }
}

impl Default for SimulatedController<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> SimulatedController<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            device_count: 1,
            connected: true,
            open: false,
            buffer: Vec::new(),
            image_cols: 0,
            image_rows: 0,
            exposure_ms: 0,
            phase: Phase::Idle,
            open_shutter_on_expose: false,
            shutter_open: false,
            pixel_rate_hz: 444_000.0,
            firmware: None,
            forced_reply: None,
            commands: Vec::new(),
        }
    }

    /// Pretend `n` interface cards are installed.
    pub fn with_device_count(mut self, n: usize) -> Self {
        self.device_count = n;
        self
    }

    /// Simulate a controller that is unplugged or powered off.
    pub fn disconnected(mut self) -> Self {
        self.connected = false;
        self
    }

    /// Make every future `cmd` reply with `code` instead of executing.
    pub fn force_reply(&mut self, cmd: u32, code: i32) {
        self.forced_reply = Some((cmd, code));
    }

    pub fn clear_forced_reply(&mut self) {
        self.forced_reply = None;
    }

    /// Every command received, in order.
    pub fn commands(&self) -> &[SentCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Image size programmed via `WRM`, as (cols, rows).
    pub fn image_dims(&self) -> (u32, u32) {
        (self.image_cols, self.image_rows)
    }

    pub fn exposure_ms(&self) -> u32 {
        self.exposure_ms
    }

    /// Whether the shutter is open right now.
    pub fn shutter_open(&self) -> bool {
        self.shutter_open
    }

    pub fn pixel_rate_hz(&self) -> f64 {
        self.pixel_rate_hz
    }

    pub fn firmware(&self) -> Option<&Path> {
        self.firmware.as_deref()
    }

    /// Move the exposure/readout model forward to the clock's current time.
    fn advance(&mut self) {
        let now = self.clock.now();
        if let Phase::Exposing {
            segment_start,
            accumulated,
        } = self.phase
        {
            let target = Duration::from_millis(u64::from(self.exposure_ms));
            let remaining = target.saturating_sub(accumulated);
            if now.saturating_duration_since(segment_start) >= remaining {
                self.shutter_open = false;
                let total = u64::from(self.image_cols) * u64::from(self.image_rows);
                tracing::debug!(total, "sim: exposure complete, readout started");
                self.phase = Phase::Readout {
                    started: segment_start + remaining,
                    total,
                };
            }
        }
        if let Phase::Readout { total, .. } = self.phase
            && self.pixels_read(now) >= total
        {
            self.write_image(total);
            tracing::debug!(total, "sim: readout complete");
            self.phase = Phase::Idle;
        }
    }

    fn pixels_read(&self, now: Instant) -> u64 {
        match self.phase {
            Phase::Readout { started, total } => {
                let secs = now.saturating_duration_since(started).as_secs_f64();
                ((secs * self.pixel_rate_hz) as u64).min(total)
            }
            _ => 0,
        }
    }

    /// Fill the first `pixels` 16-bit words with a non-zero ramp.
    fn write_image(&mut self, pixels: u64) {
        let n = usize::try_from(pixels)
            .unwrap_or(usize::MAX)
            .min(self.buffer.len() / 2);
        for (i, px) in self.buffer.chunks_exact_mut(2).take(n).enumerate() {
            let value = 1000u16 + (i % 97) as u16;
            px.copy_from_slice(&value.to_le_bytes());
        }
    }

    fn execute(&mut self, board_id: u32, cmd: u32, arg1: u32, arg2: u32) -> i32 {
        if !matches!(board_id, PCI_ID | TIM_ID | UTIL_ID) {
            return ERR;
        }
        if let Some((forced_cmd, code)) = self.forced_reply
            && forced_cmd == cmd
        {
            return code;
        }
        self.advance();
        match cmd {
            SET => {
                self.exposure_ms = arg1;
                // Shortening a running exposure below its elapsed time ends it now.
                if let Phase::Exposing {
                    segment_start,
                    accumulated,
                } = self.phase
                {
                    let now = self.clock.now();
                    let exposed = accumulated + now.saturating_duration_since(segment_start);
                    if exposed >= Duration::from_millis(u64::from(arg1)) {
                        self.shutter_open = false;
                        self.phase = Phase::Readout {
                            started: now,
                            total: u64::from(self.image_cols) * u64::from(self.image_rows),
                        };
                    }
                }
                DON
            }
            SEX => match self.phase {
                Phase::Idle => {
                    self.shutter_open = self.open_shutter_on_expose;
                    self.phase = Phase::Exposing {
                        segment_start: self.clock.now(),
                        accumulated: Duration::ZERO,
                    };
                    DON
                }
                _ => ERR,
            },
            PEX => match self.phase {
                Phase::Exposing {
                    segment_start,
                    accumulated,
                } => {
                    let elapsed = self.clock.now().saturating_duration_since(segment_start);
                    self.shutter_open = false;
                    self.phase = Phase::Paused {
                        accumulated: accumulated + elapsed,
                    };
                    DON
                }
                _ => ERR,
            },
            REX => match self.phase {
                Phase::Paused { accumulated } => {
                    self.shutter_open = self.open_shutter_on_expose;
                    self.phase = Phase::Exposing {
                        segment_start: self.clock.now(),
                        accumulated,
                    };
                    DON
                }
                _ => ERR,
            },
            OSH => {
                self.shutter_open = true;
                DON
            }
            CSH => {
                self.shutter_open = false;
                DON
            }
            WRM => {
                if arg1 == (Y_MEM | ADDR_IMAGE_COLS) {
                    self.image_cols = arg2;
                } else if arg1 == (Y_MEM | ADDR_IMAGE_ROWS) {
                    self.image_rows = arg2;
                }
                DON
            }
            SPS => match pixel_rate_for(arg1) {
                Some(rate) => {
                    self.pixel_rate_hz = rate;
                    DON
                }
                None => ERR,
            },
            SSS | SSP | SOS | SXY => DON,
            _ => ERR,
        }
    }
}

impl<C: Clock> DeviceGateway for SimulatedController<C> {
    fn device_count(&self) -> usize {
        self.device_count
    }

    fn open(&mut self, index: usize, buffer_bytes: usize) -> HwResult<()> {
        if index >= self.device_count {
            return Err(Box::new(HwError::NoDevice {
                index,
                count: self.device_count,
            }));
        }
        tracing::debug!(index, buffer_bytes, "sim: open");
        self.buffer = vec![0; buffer_bytes];
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> HwResult<()> {
        tracing::debug!("sim: close");
        self.open = false;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn is_controller_connected(&mut self) -> bool {
        self.open && self.connected
    }

    fn setup_controller(
        &mut self,
        _reset: bool,
        load_timing_firmware: bool,
        _power_on: bool,
        rows: u32,
        cols: u32,
        timing_firmware: &Path,
    ) -> HwResult<()> {
        if !self.open {
            return Err(Box::new(HwError::NotOpen));
        }
        if !self.connected {
            return Err(Box::new(HwError::Disconnected));
        }
        if load_timing_firmware {
            if timing_firmware.as_os_str().is_empty() {
                return Err(Box::new(HwError::Firmware(String::from("<empty path>"))));
            }
            self.firmware = Some(timing_firmware.to_path_buf());
        }
        self.image_rows = rows;
        self.image_cols = cols;
        Ok(())
    }

    fn command(
        &mut self,
        board_id: u32,
        cmd: u32,
        arg1: u32,
        arg2: u32,
        arg3: u32,
    ) -> HwResult<i32> {
        if !self.open {
            return Err(Box::new(HwError::NotOpen));
        }
        if !self.connected {
            return Err(Box::new(HwError::Disconnected));
        }
        self.commands.push(SentCommand {
            board_id,
            cmd,
            args: [arg1, arg2, arg3],
        });
        let reply = self.execute(board_id, cmd, arg1, arg2);
        tracing::trace!(board_id, cmd, arg1, arg2, arg3, reply, "sim: command");
        Ok(reply)
    }

    fn is_readout(&mut self) -> bool {
        self.advance();
        matches!(self.phase, Phase::Readout { .. })
    }

    fn pixel_count(&mut self) -> u64 {
        self.advance();
        self.pixels_read(self.clock.now())
    }

    fn common_buffer(&self) -> &[u8] {
        &self.buffer
    }

    fn common_buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    fn fill_common_buffer(&mut self, value: u8) -> HwResult<()> {
        if !self.open {
            return Err(Box::new(HwError::NotOpen));
        }
        self.buffer.fill(value);
        Ok(())
    }

    fn set_open_shutter(&mut self, open: bool) -> HwResult<()> {
        self.open_shutter_on_expose = open;
        Ok(())
    }

    fn stop_exposure(&mut self) -> HwResult<()> {
        tracing::debug!("sim: hard stop");
        self.shutter_open = false;
        self.phase = Phase::Idle;
        Ok(())
    }
}
