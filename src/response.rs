use thiserror::Error;

use crate::{
    checksum,
    hardware::{ServoId, ServoIdError},
};

/// A reply frame that passed the shape and checksum checks.
#[derive(Debug, Clone)]
pub struct Response {
    pub id: ServoId,
    pub command: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Response format is invalid.")]
    Malformed,
    #[error("Checksum does not match.")]
    ChecksumMismatch,
    #[error("The id is not valid: {0}")]
    IdInvalid(#[from] ServoIdError),
    #[error("Expected command {expected}, received {received}.")]
    UnexpectedCommand { expected: u8, received: u8 },
    #[error("Expected a {expected} byte payload, received {received} bytes.")]
    UnexpectedLength { expected: u8, received: usize },
}

impl TryFrom<&[u8]> for Response {
    type Error = ResponseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let id = value.get(2);
        let length = value.get(3);
        let command = value.get(4);

        // Make sure the frame has the required fields.
        let (Some(&id), Some(&length), Some(&command)) = (id, length, command) else {
            return Err(ResponseError::Malformed);
        };

        // The length field counts the command, payload and checksum bytes,
        // so 3 is its floor; the full frame carries the two headers and
        // the id on top.
        if length < 3 || value.len() != length as usize + 3 {
            return Err(ResponseError::Malformed);
        }

        let id = ServoId::try_from(id)?;

        // Make sure the checksum is valid.
        let rx_checksum = value[value.len() - 1];
        if rx_checksum != checksum(&value[2..value.len() - 1]) {
            return Err(ResponseError::ChecksumMismatch);
        }

        let payload = Vec::from(&value[5..value.len() - 1]);

        Ok(Self {
            id,
            command,
            payload,
        })
    }
}

impl Response {
    /// Reject a reply whose command id or payload size differs from what
    /// the request called for. A frame is either fully valid or rejected.
    pub(crate) fn expect(self, command: u8, payload_len: u8) -> Result<Self, ResponseError> {
        if self.command != command {
            return Err(ResponseError::UnexpectedCommand {
                expected: command,
                received: self.command,
            });
        }

        if self.payload.len() != payload_len as usize {
            return Err(ResponseError::UnexpectedLength {
                expected: payload_len,
                received: self.payload.len(),
            });
        }

        Ok(self)
    }
}
