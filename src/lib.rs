pub mod command;
pub mod hardware;
pub mod response;
pub mod serial;
pub mod servo;

/// Low byte of the one's complement of the sum of `packet`. Computed over
/// the id, length, command and payload bytes of a frame (headers and the
/// checksum byte itself excluded).
fn checksum(packet: &[u8]) -> u8 {
    !packet.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}
