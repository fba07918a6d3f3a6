//! Device-side implementations of the `arctic_traits` seams.
//!
//! Only the simulator lives here; the PCIe driver is provided by the vendor
//! library and wrapped outside this workspace.
pub mod error;
pub mod sim;
pub mod util;

pub use error::HwError;
pub use sim::{SentCommand, SimulatedController};
pub use util::wait_until;
