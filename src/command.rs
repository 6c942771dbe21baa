use crate::{
    checksum,
    hardware::{Instruction, ServoId},
};

pub(crate) const FRAME_HEADER: u8 = 0x55;

/// One addressed request. A fresh frame is built for every call; nothing
/// is cached between invocations.
#[derive(Debug, Clone, Copy)]
pub struct Command {
    pub id: ServoId,
    pub instruction: Instruction,
}

impl Command {
    pub fn new(id: ServoId, instruction: Instruction) -> Self {
        Self { id, instruction }
    }

    /// Serialize to wire bytes:
    /// `[0x55][0x55][id][length][command][payload..][checksum]` where
    /// `length = 3 + payload.len()` and the checksum covers the id byte
    /// through the last payload byte.
    pub(crate) fn build(&self) -> Vec<u8> {
        let payload = self.instruction.payload();
        let length = payload.len() as u8 + 3;

        let mut frame = Vec::with_capacity(payload.len() + 6);
        frame.extend([
            FRAME_HEADER,
            FRAME_HEADER,
            self.id.into(),
            length,
            self.instruction.id(),
        ]);
        frame.extend(payload);
        frame.push(checksum(&frame[2..]));

        frame
    }
}
