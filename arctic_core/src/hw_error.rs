//! Maps `Box<dyn Error>` from trait boundaries to typed `CameraError`.
//!
//! The traits in `arctic_traits` use `Box<dyn Error + Send + Sync>` so any
//! driver can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `arctic_hardware::HwError`.

use crate::error::{CameraError, CommandError};

/// Map a gateway error raised outside command dispatch to a `CameraError`.
pub fn map_hw_error(context: &str, e: &(dyn std::error::Error + 'static)) -> CameraError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<arctic_hardware::HwError>() {
            return match hw {
                arctic_hardware::HwError::Disconnected => {
                    CameraError::Device(format!("{context}: controller is disconnected"))
                }
                other => CameraError::Device(format!("{context}: {other}")),
            };
        }
    }

    CameraError::Device(format!("{context}: {e}"))
}

/// Map a transport failure while dispatching `description`.
pub fn map_transport_error(
    description: &str,
    e: &(dyn std::error::Error + 'static),
) -> CameraError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(arctic_hardware::HwError::Disconnected) =
            e.downcast_ref::<arctic_hardware::HwError>()
        {
            return CameraError::Device(format!("{description}: controller is disconnected"));
        }
    }

    CameraError::Command(CommandError::Transport {
        description: description.to_string(),
        message: e.to_string(),
    })
}
