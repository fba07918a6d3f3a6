//! Controller command vocabulary.
//!
//! Opcodes are 24-bit words, most of them three ASCII capitals
//! (`SEX` = 0x53_45_58). Board identifiers select which controller board a
//! command is routed to.

/// Interface (PCI/PCIe) board.
pub const PCI_ID: u32 = 1;
/// Timing board; owns exposure, readout and geometry.
pub const TIM_ID: u32 = 2;
/// Utility board.
pub const UTIL_ID: u32 = 3;

/// Reply: command completed.
pub const DON: i32 = 0x44_4F_4E;
/// Reply: command failed.
pub const ERR: i32 = 0x45_52_52;

/// Set exposure time (ms).
pub const SET: u32 = 0x53_45_54;
/// Start exposure.
pub const SEX: u32 = 0x53_45_58;
/// Pause exposure.
pub const PEX: u32 = 0x50_45_58;
/// Resume exposure.
pub const REX: u32 = 0x52_45_58;
/// Open shutter.
pub const OSH: u32 = 0x4F_53_48;
/// Close shutter.
pub const CSH: u32 = 0x43_53_48;
/// Write memory: `WRM <space|addr> <value>`.
pub const WRM: u32 = 0x57_52_4D;
/// Set subarray sizes: `SSS <bias width> <cols> <rows>`.
pub const SSS: u32 = 0x53_53_53;
/// Set subarray position: `SSP <row> <col> <bias offset>`.
pub const SSP: u32 = 0x53_53_50;
/// Set output source (amplifier): `SOS <amp> DON`.
pub const SOS: u32 = 0x53_4F_53;
/// Set pixel speed: `SPS <rate> DON`.
pub const SPS: u32 = 0x53_50_53;
/// Set rows/columns skipped before data: `SXY <cols> <rows>`.
pub const SXY: u32 = 0x53_58_59;

/// Y memory space selector for `WRM`.
pub const Y_MEM: u32 = 0x40_00_00;
/// `WRM` address of the image width (columns).
pub const ADDR_IMAGE_COLS: u32 = 0x1;
/// `WRM` address of the image height (rows).
pub const ADDR_IMAGE_ROWS: u32 = 0x2;
/// `WRM` address of the column bin factor.
pub const ADDR_BIN_COL: u32 = 0x5;
/// `WRM` address of the row bin factor.
pub const ADDR_BIN_ROW: u32 = 0x6;

/// Lower-left amplifier (`__C`).
pub const AMP_0: u32 = 0x5F_5F_43;
/// Lower-right amplifier (`__D`).
pub const AMP_1: u32 = 0x5F_5F_44;
/// Upper-right amplifier (`__B`).
pub const AMP_2: u32 = 0x5F_5F_42;
/// Upper-left amplifier (`__A`).
pub const AMP_3: u32 = 0x5F_5F_41;
/// All four amplifiers (`ALL`).
pub const AMP_ALL: u32 = 0x41_4C_4C;

/// Slow readout (`SLW`).
pub const RATE_SLOW: u32 = 0x53_4C_57;
/// Medium readout (`MED`).
pub const RATE_MEDIUM: u32 = 0x4D_45_44;
/// Fast readout (`FST`).
pub const RATE_FAST: u32 = 0x46_53_54;
