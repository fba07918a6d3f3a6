//! Readout configuration and detector geometry.
//!
//! All window coordinates are in binned pixels. In multi-amplifier (quad)
//! mode each amplifier reads half the chip along each axis, so raw extents are
//! binned per half; this keeps quad images an even number of pixels wide and
//! high, which the deinterlacer relies on.

use arctic_config::{AmpsCfg, RateCfg, ReadoutCfg};
use arctic_traits::DeinterlaceAlgorithm;
use arctic_traits::opcodes::{
    AMP_0, AMP_1, AMP_2, AMP_3, AMP_ALL, RATE_FAST, RATE_MEDIUM, RATE_SLOW,
};

use crate::error::{Axis, CameraError, ConfigError, Result};

/// Unbinned active columns.
pub const CCD_WIDTH: u32 = 4096;
/// Unbinned active rows.
pub const CCD_HEIGHT: u32 = 4096;
/// Unbinned overscan columns read after the active area.
pub const X_OVERSCAN: u32 = 114;
/// Prescan columns per amplifier that `SXY` cannot skip, in binned pixels.
pub const X_BINNED_PRESCAN_PER_AMP: u32 = 2;
/// Rows between the upper and lower amplifier images in quad readout.
pub const Y_QUAD_BORDER: u32 = 2;
pub const MAX_BIN_FACTOR: u32 = 4;
pub const BYTES_PER_PIXEL: usize = 2;

/// Which amplifier(s) read the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadoutAmps {
    /// Lower left.
    LL,
    /// Lower right.
    LR,
    /// Upper right.
    UR,
    /// Upper left.
    UL,
    /// All four at once.
    Quad,
}

impl ReadoutAmps {
    pub const ALL: [ReadoutAmps; 5] = [
        ReadoutAmps::LL,
        ReadoutAmps::LR,
        ReadoutAmps::UR,
        ReadoutAmps::UL,
        ReadoutAmps::Quad,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReadoutAmps::LL => "LL",
            ReadoutAmps::LR => "LR",
            ReadoutAmps::UR => "UR",
            ReadoutAmps::UL => "UL",
            ReadoutAmps::Quad => "Quad",
        }
    }

    pub fn num_amps(self) -> u32 {
        match self {
            ReadoutAmps::Quad => 4,
            ReadoutAmps::LL | ReadoutAmps::LR | ReadoutAmps::UR | ReadoutAmps::UL => 1,
        }
    }

    /// Argument of the `SOS` command.
    pub fn cmd_value(self) -> u32 {
        match self {
            ReadoutAmps::LL => AMP_0,
            ReadoutAmps::LR => AMP_1,
            ReadoutAmps::UR => AMP_2,
            ReadoutAmps::UL => AMP_3,
            ReadoutAmps::Quad => AMP_ALL,
        }
    }

    pub fn deinterlace_algorithm(self) -> DeinterlaceAlgorithm {
        match self {
            ReadoutAmps::LL | ReadoutAmps::LR | ReadoutAmps::UR | ReadoutAmps::UL => {
                DeinterlaceAlgorithm::None
            }
            ReadoutAmps::Quad => DeinterlaceAlgorithm::QuadCcd,
        }
    }
}

impl core::fmt::Display for ReadoutAmps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<AmpsCfg> for ReadoutAmps {
    fn from(a: AmpsCfg) -> Self {
        match a {
            AmpsCfg::Ll => ReadoutAmps::LL,
            AmpsCfg::Lr => ReadoutAmps::LR,
            AmpsCfg::Ur => ReadoutAmps::UR,
            AmpsCfg::Ul => ReadoutAmps::UL,
            AmpsCfg::Quad => ReadoutAmps::Quad,
        }
    }
}

/// Pixel clock speed; slower is quieter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadoutRate {
    Slow,
    Medium,
    Fast,
}

impl ReadoutRate {
    pub const ALL: [ReadoutRate; 3] = [ReadoutRate::Slow, ReadoutRate::Medium, ReadoutRate::Fast];

    pub fn name(self) -> &'static str {
        match self {
            ReadoutRate::Slow => "Slow",
            ReadoutRate::Medium => "Medium",
            ReadoutRate::Fast => "Fast",
        }
    }

    /// Argument of the `SPS` command.
    pub fn cmd_value(self) -> u32 {
        match self {
            ReadoutRate::Slow => RATE_SLOW,
            ReadoutRate::Medium => RATE_MEDIUM,
            ReadoutRate::Fast => RATE_FAST,
        }
    }

    /// Whole-chip pixels per second.
    pub fn pixel_frequency_hz(self) -> f64 {
        match self {
            ReadoutRate::Slow => 208_000.0,
            ReadoutRate::Medium => 444_000.0,
            ReadoutRate::Fast => 1_019_000.0,
        }
    }
}

impl core::fmt::Display for ReadoutRate {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<RateCfg> for ReadoutRate {
    fn from(r: RateCfg) -> Self {
        match r {
            RateCfg::Slow => ReadoutRate::Slow,
            RateCfg::Medium => ReadoutRate::Medium,
            RateCfg::Fast => ReadoutRate::Fast,
        }
    }
}

/// Columns `SXY` should skip for a given column bin factor, so the last
/// binned column holds only data and not a mix of data and overscan.
pub fn x_skip_for_bin(bin_fac_col: u32) -> Option<u32> {
    match bin_fac_col {
        1 | 2 | 4 => Some(4),
        3 => Some(3),
        _ => None,
    }
}

#[inline]
fn bin_extent(extent: u32, bin: u32, per_half: bool) -> u32 {
    if per_half {
        (extent / 2).checked_div(bin).unwrap_or(0) * 2
    } else {
        extent.checked_div(bin).unwrap_or(0)
    }
}

/// Readout configuration. Replaced wholesale on every update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraConfig {
    pub readout_amps: ReadoutAmps,
    pub readout_rate: ReadoutRate,
    pub bin_fac_col: u32,
    pub bin_fac_row: u32,
    pub win_start_col: u32,
    pub win_start_row: u32,
    pub win_width: u32,
    pub win_height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            readout_amps: ReadoutAmps::Quad,
            readout_rate: ReadoutRate::Medium,
            bin_fac_col: 2,
            bin_fac_row: 2,
            win_start_col: 0,
            win_start_row: 0,
            win_width: CCD_WIDTH / 2,
            win_height: CCD_HEIGHT / 2,
        }
    }
}

impl CameraConfig {
    /// Same settings, with the window reset to the full binned chip.
    pub fn with_full_window(mut self) -> Self {
        self.win_start_col = 0;
        self.win_start_row = 0;
        self.win_width = self.binned_ccd_width();
        self.win_height = self.binned_ccd_height();
        self
    }

    pub fn num_amps(&self) -> u32 {
        self.readout_amps.num_amps()
    }

    /// Only single-amplifier readout supports sub-windows.
    pub fn can_window(&self) -> bool {
        self.num_amps() == 1
    }

    pub fn compute_binned_width(&self, unbinned: u32) -> u32 {
        bin_extent(unbinned, self.bin_fac_col, self.num_amps() > 1)
    }

    pub fn compute_binned_height(&self, unbinned: u32) -> u32 {
        bin_extent(unbinned, self.bin_fac_row, self.num_amps() > 1)
    }

    /// Active area width in binned pixels.
    pub fn binned_ccd_width(&self) -> u32 {
        self.compute_binned_width(CCD_WIDTH)
    }

    /// Active area height in binned pixels.
    pub fn binned_ccd_height(&self) -> u32 {
        self.compute_binned_height(CCD_HEIGHT)
    }

    pub fn is_full_window(&self) -> bool {
        self.win_start_col == 0
            && self.win_start_row == 0
            && self.win_width >= self.binned_ccd_width()
            && self.win_height >= self.binned_ccd_height()
    }

    /// Columns read out: window, residual prescan and binned overscan.
    // Keep in step with `max_width`.
    pub fn binned_width(&self) -> u32 {
        let x_prescan = X_BINNED_PRESCAN_PER_AMP * if self.num_amps() > 1 { 2 } else { 1 };
        self.win_width
            .saturating_add(x_prescan)
            .saturating_add(self.compute_binned_width(X_OVERSCAN))
    }

    /// Rows read out: window plus the quad border.
    // Keep in step with `max_height`.
    pub fn binned_height(&self) -> u32 {
        let border = if self.num_amps() > 1 { Y_QUAD_BORDER } else { 0 };
        self.win_height.saturating_add(border)
    }

    /// Widest possible image: unbinned, full frame, all amplifiers.
    pub const fn max_width() -> u32 {
        CCD_WIDTH + 2 * X_BINNED_PRESCAN_PER_AMP + X_OVERSCAN
    }

    /// Tallest possible image: unbinned, full frame, all amplifiers.
    pub const fn max_height() -> u32 {
        CCD_HEIGHT + Y_QUAD_BORDER
    }

    /// Size of the shared buffer needed for any configuration.
    pub const fn max_image_bytes() -> usize {
        Self::max_width() as usize * Self::max_height() as usize * BYTES_PER_PIXEL
    }

    /// Bytes of pixel data produced by this configuration.
    pub fn image_bytes(&self) -> usize {
        self.binned_width() as usize * self.binned_height() as usize * BYTES_PER_PIXEL
    }

    /// Check the configuration, reporting the first problem found.
    ///
    /// User mistakes come back as `CameraError::Config`. A quad image with odd
    /// dimensions, or one larger than the buffer, means the geometry formulas
    /// above are wrong and is reported as `CameraError::Invariant`.
    pub fn assert_valid(&self) -> Result<()> {
        if !self.is_full_window() && !self.can_window() {
            return Err(ConfigError::WindowingNotAllowed {
                amps: self.readout_amps,
            }
            .into());
        }
        check_bin(Axis::Col, self.bin_fac_col)?;
        check_bin(Axis::Row, self.bin_fac_row)?;

        let ccd_width = self.binned_ccd_width();
        let ccd_height = self.binned_ccd_height();
        if self.win_start_col >= ccd_width {
            return Err(ConfigError::WindowStart {
                axis: Axis::Col,
                value: self.win_start_col,
                limit: ccd_width,
            }
            .into());
        }
        if self.win_start_row >= ccd_height {
            return Err(ConfigError::WindowStart {
                axis: Axis::Row,
                value: self.win_start_row,
                limit: ccd_height,
            }
            .into());
        }
        let width_limit = ccd_width - self.win_start_col;
        if self.win_width < 1 || self.win_width > width_limit {
            return Err(ConfigError::WindowExtent {
                axis: Axis::Col,
                value: self.win_width,
                limit: width_limit,
            }
            .into());
        }
        let height_limit = ccd_height - self.win_start_row;
        if self.win_height < 1 || self.win_height > height_limit {
            return Err(ConfigError::WindowExtent {
                axis: Axis::Row,
                value: self.win_height,
                limit: height_limit,
            }
            .into());
        }

        check_geometry(self.num_amps(), self.binned_width(), self.binned_height())
    }
}

/// Image dimensions the readout and the shared buffer can both take.
fn check_geometry(num_amps: u32, width: u32, height: u32) -> Result<()> {
    if num_amps > 1 && (width % 2 != 0 || height % 2 != 0) {
        return Err(CameraError::Invariant(format!(
            "{num_amps} amplifiers need even dimensions, got {width}x{height}"
        )));
    }
    let (max_w, max_h) = (CameraConfig::max_width(), CameraConfig::max_height());
    if width > max_w || height > max_h {
        return Err(CameraError::Invariant(format!(
            "binned image {width}x{height} exceeds buffer geometry {max_w}x{max_h}"
        )));
    }
    Ok(())
}

fn check_bin(axis: Axis, value: u32) -> Result<()> {
    if !(1..=MAX_BIN_FACTOR).contains(&value) {
        return Err(ConfigError::BinFactor {
            axis,
            value,
            max: MAX_BIN_FACTOR,
        }
        .into());
    }
    Ok(())
}

impl core::fmt::Display for CameraConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "CameraConfig(readoutAmps={}, readoutRate={}, binFacCol={}, binFacRow={}, \
             winStartCol={}, winStartRow={}, winWidth={}, winHeight={})",
            self.readout_amps,
            self.readout_rate,
            self.bin_fac_col,
            self.bin_fac_row,
            self.win_start_col,
            self.win_start_row,
            self.win_width,
            self.win_height
        )
    }
}

impl From<&ReadoutCfg> for CameraConfig {
    /// Build from the `[readout]` section. The result still needs `assert_valid`.
    fn from(cfg: &ReadoutCfg) -> Self {
        let base = CameraConfig {
            readout_amps: cfg.amps.into(),
            readout_rate: cfg.rate.into(),
            bin_fac_col: cfg.bin_col,
            bin_fac_row: cfg.bin_row,
            ..CameraConfig::default()
        };
        match cfg.window {
            Some(win) => CameraConfig {
                win_start_col: win.start_col,
                win_start_row: win.start_row,
                win_width: win.width,
                win_height: win.height,
                ..base
            },
            None => base.with_full_window(),
        }
    }
}
