//! Controller command encoding and dispatch.

use arctic_traits::DeviceGateway;
use arctic_traits::opcodes::{DON, PCI_ID, TIM_ID, UTIL_ID};

use crate::error::{CommandError, Result};
use crate::hw_error::map_transport_error;

/// Board a command is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardId {
    Pci,
    Timing,
    Utility,
}

impl BoardId {
    pub fn value(self) -> u32 {
        match self {
            BoardId::Pci => PCI_ID,
            BoardId::Timing => TIM_ID,
            BoardId::Utility => UTIL_ID,
        }
    }
}

impl TryFrom<u32> for BoardId {
    type Error = CommandError;

    fn try_from(v: u32) -> std::result::Result<Self, Self::Error> {
        match v {
            PCI_ID => Ok(BoardId::Pci),
            TIM_ID => Ok(BoardId::Timing),
            UTIL_ID => Ok(BoardId::Utility),
            other => Err(CommandError::UnknownBoard(other)),
        }
    }
}

/// Render a 24-bit code as its three-letter mnemonic, or as hex when any
/// byte is outside `A..=Z`.
pub fn format_cmd(code: u32) -> String {
    let bytes = [(code >> 16) as u8, (code >> 8) as u8, code as u8];
    if code <= 0xFF_FFFF && bytes.iter().all(u8::is_ascii_uppercase) {
        bytes.iter().map(|&b| char::from(b)).collect()
    } else {
        format!("0x{code:x}")
    }
}

/// One 5-word controller command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub board: BoardId,
    pub cmd: u32,
    pub args: [u32; 3],
}

impl Command {
    pub fn new(board: BoardId, cmd: u32, arg1: u32, arg2: u32, arg3: u32) -> Self {
        Self {
            board,
            cmd,
            args: [arg1, arg2, arg3],
        }
    }
}

impl core::fmt::Display for Command {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let [a1, a2, a3] = self.args;
        write!(
            f,
            "board=0x{:x} {} 0x{a1:x} 0x{a2:x} 0x{a3:x}",
            self.board.value(),
            format_cmd(self.cmd)
        )
    }
}

/// Send a command and require a `DON` reply.
///
/// `description` names the operation in errors and logs. An unknown
/// `board_id` is rejected before the gateway is touched.
pub fn run_command<G: DeviceGateway + ?Sized>(
    gateway: &mut G,
    description: &str,
    board_id: u32,
    cmd: u32,
    arg1: u32,
    arg2: u32,
    arg3: u32,
) -> Result<()> {
    let board = BoardId::try_from(board_id)?;
    send(gateway, description, Command::new(board, cmd, arg1, arg2, arg3))
}

/// Typed variant of [`run_command`].
pub fn send<G: DeviceGateway + ?Sized>(
    gateway: &mut G,
    description: &str,
    command: Command,
) -> Result<()> {
    let [a1, a2, a3] = command.args;
    tracing::debug!(%command, description, "sending command");
    let reply = gateway
        .command(command.board.value(), command.cmd, a1, a2, a3)
        .map_err(|e| map_transport_error(description, &*e))?;
    tracing::debug!(description, reply = %format_cmd(reply as u32), "reply");
    if reply != DON {
        return Err(CommandError::Failed {
            description: description.to_string(),
            code: reply,
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arctic_traits::opcodes::{ERR, SEX, Y_MEM};

    #[test]
    fn mnemonics_render_as_letters() {
        assert_eq!(format_cmd(SEX), "SEX");
        assert_eq!(format_cmd(DON as u32), "DON");
        assert_eq!(format_cmd(ERR as u32), "ERR");
        assert_eq!(format_cmd(Y_MEM | 5), "0x400005");
        assert_eq!(format_cmd(0x1_444F4E), "0x1444f4e");
    }

    #[test]
    fn board_ids_round_trip() {
        for b in [BoardId::Pci, BoardId::Timing, BoardId::Utility] {
            assert_eq!(BoardId::try_from(b.value()), Ok(b));
        }
        assert_eq!(BoardId::try_from(7), Err(CommandError::UnknownBoard(7)));
    }

    #[test]
    fn command_display_names_opcode() {
        let c = Command::new(BoardId::Timing, SEX, 0, 0, 0);
        assert_eq!(c.to_string(), "board=0x2 SEX 0x0 0x0 0x0");
    }
}
