//! RCON protocol handling
//!
//! Packet framing for the Source/Minecraft remote console protocol and
//! helpers for interpreting command responses.

mod packet;
mod response;

pub use packet::{
    CommandError, FrameError, Packet, PacketType, read_packet, validate_command, write_packet,
};
pub use response::{PlayerList, parse_player_counts, parse_player_list};
