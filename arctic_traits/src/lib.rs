//! Hardware seams for the exposure controller.
//!
//! The controller core never talks to a PCIe card, a FITS library or a
//! deinterlacing routine directly; it goes through the traits below. Every
//! fallible call returns a boxed error so real drivers and simulators can use
//! their own error types.

pub mod clock;
pub mod opcodes;

pub use clock::{Clock, MonotonicClock};

use std::path::Path;

/// Boxed error crossing a trait boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for trait-boundary calls.
pub type HwResult<T> = Result<T, BoxError>;

/// Link to the CCD controller: command channel plus the shared image buffer.
///
/// Calls may block for a hardware round trip; no timeout is implied.
pub trait DeviceGateway {
    /// Number of controller interface cards found on the host.
    fn device_count(&self) -> usize;

    /// Open device `index` and map a shared image buffer of `buffer_bytes`.
    fn open(&mut self, index: usize, buffer_bytes: usize) -> HwResult<()>;

    fn close(&mut self) -> HwResult<()>;

    fn is_controller_connected(&mut self) -> bool;

    /// Reset, load firmware and power the controller.
    ///
    /// `rows` and `cols` are the maximum image dimensions the buffer can hold.
    fn setup_controller(
        &mut self,
        reset: bool,
        load_timing_firmware: bool,
        power_on: bool,
        rows: u32,
        cols: u32,
        timing_firmware: &Path,
    ) -> HwResult<()>;

    /// Send one 5-word command and return the controller's reply word.
    fn command(&mut self, board_id: u32, cmd: u32, arg1: u32, arg2: u32, arg3: u32)
    -> HwResult<i32>;

    /// True while the controller is shifting pixels into the shared buffer.
    fn is_readout(&mut self) -> bool;

    /// Pixels transferred so far in the current readout.
    fn pixel_count(&mut self) -> u64;

    fn common_buffer(&self) -> &[u8];

    fn common_buffer_mut(&mut self) -> &mut [u8];

    /// Overwrite the whole shared buffer with `value`.
    fn fill_common_buffer(&mut self, value: u8) -> HwResult<()>;

    /// Whether the shutter should open during the next exposure.
    fn set_open_shutter(&mut self, open: bool) -> HwResult<()>;

    /// Hard stop of any exposure or readout in progress.
    fn stop_exposure(&mut self) -> HwResult<()>;
}

/// Pixel reassembly applied to the raw buffer before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeinterlaceAlgorithm {
    /// Single-amplifier data is already in image order.
    None,
    /// Four-quadrant readout; each amplifier's pixels are interleaved.
    QuadCcd,
}

/// Reorders amplifier-interleaved 16-bit pixels in place.
///
/// There is no options argument: the camera never passes algorithm options,
/// so implementations that take them apply their defaults.
pub trait Deinterlacer {
    fn run(
        &mut self,
        pixels: &mut [u8],
        rows: u32,
        cols: u32,
        algorithm: DeinterlaceAlgorithm,
    ) -> HwResult<()>;
}

/// Persists one 16-bit image.
pub trait ImageWriter {
    /// Create the output at `path` for an image of `width` x `height` pixels.
    fn create(&mut self, path: &Path, width: u32, height: u32) -> HwResult<()>;

    /// Write the pixels; `pixels.len()` must equal width * height * 2.
    fn write(&mut self, pixels: &[u8]) -> HwResult<()>;
}
