//! Packetization and reassembly.
//!
//! An encoded message is split into [`Packet`]s of at most
//! [`MAX_BLOCK_SIZE`](crate::limits::MAX_BLOCK_SIZE) bytes for the
//! distributed store. For an input of length `L > 0` there are
//! `ceil(L / MAX_BLOCK_SIZE)` packets and every packet but the last is
//! full. Empty input becomes a single empty packet.
//!
//! # Example
//!
//! ```
//! use postern_mail::chunking::{reassemble, split_into_packets};
//! use postern_mail::MessageId;
//!
//! let data = vec![0u8; 100_000];
//! let packets = split_into_packets(MessageId::generate(), &data).unwrap();
//! assert_eq!(packets.len(), 4);
//! assert_eq!(packets[3].payload().len(), 7840);
//!
//! assert_eq!(reassemble(packets).unwrap(), data);
//! ```

mod packet;
mod reassembly;

pub use packet::{split_into_packets, Packet};
pub use reassembly::{reassemble, PacketReassembler};
