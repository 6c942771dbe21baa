use angle::Angle;
use serialport::SerialPort;
use thiserror::Error;

use crate::{
    command::Command,
    hardware::{Instruction, LedError, Limit, LoadMode, Mode, ModeRead, MoveTime, PowerLed, ServoId},
    response::Response,
    serial::{self, ExchangeError, Session, Transport},
};

#[derive(Debug, Error)]
pub enum ServoError {
    #[error("Unable to open the serial device: {0}")]
    Open(#[from] serialport::Error),
    #[error("Exchange failed: {0}")]
    Exchange(#[from] ExchangeError),
}

/// One raw position unit is 0.24 degrees (1000 units = 240 degrees).
const DEGREES_PER_UNIT: f32 = 0.24;

/// Client for one servo (or the whole bus when bound to the broadcast id).
/// Owns the session, and through it the transport, for its lifetime.
pub struct Servo<T: Transport> {
    id: ServoId,
    session: Session<T>,
}

impl Servo<Box<dyn SerialPort>> {
    /// Open the serial device at `path` and bind to `id`.
    pub fn open(path: &str, baud_rate: u32, id: ServoId) -> Result<Self, ServoError> {
        let port = serial::open(path, baud_rate)?;
        Ok(Self::new(id, Session::new(port)))
    }
}

impl<T: Transport> Servo<T> {
    pub fn new(id: ServoId, session: Session<T>) -> Self {
        Self { id, session }
    }

    pub fn id(&self) -> ServoId {
        self.id
    }

    /// Give up the session (and with it the transport handle).
    pub fn into_session(self) -> Session<T> {
        self.session
    }

    /// Fire-and-forget write: success means the frame left the host.
    fn write(&mut self, instruction: Instruction) -> Result<(), ServoError> {
        self.session.send(&Command::new(self.id, instruction))?;
        Ok(())
    }

    fn read(&mut self, instruction: Instruction) -> Result<Response, ServoError> {
        self.read_from(self.id, instruction)
    }

    fn read_from(&mut self, id: ServoId, instruction: Instruction) -> Result<Response, ServoError> {
        let reply_len = instruction.reply_payload_len();
        let command = Command::new(id, instruction);
        Ok(self.session.exchange(&command, reply_len)?)
    }

    /// Start moving to `position` (clamped to [0, 1000], in 0.24 degree
    /// units), aiming to arrive in `time` milliseconds. A time too short
    /// for the distance means full speed.
    pub fn move_time_write(&mut self, position: i16, time: u16) -> Result<(), ServoError> {
        self.write(Instruction::move_time_write(position, time))
    }

    /// Read back the target set by [`Servo::move_time_write`].
    pub fn move_time_read(&mut self) -> Result<MoveTime, ServoError> {
        let response = self.read(Instruction::MoveTimeRead)?;
        MoveTime::from_payload(&response.payload).ok_or(ExchangeError::Corrupted.into())
    }

    /// Like [`Servo::move_time_write`], but the servo holds the move until
    /// [`Servo::move_start`] arrives.
    pub fn move_time_wait_write(&mut self, position: i16, time: u16) -> Result<(), ServoError> {
        self.write(Instruction::move_time_wait_write(position, time))
    }

    pub fn move_time_wait_read(&mut self) -> Result<MoveTime, ServoError> {
        let response = self.read(Instruction::MoveTimeWaitRead)?;
        MoveTime::from_payload(&response.payload).ok_or(ExchangeError::Corrupted.into())
    }

    /// Trigger a pending wait-move.
    pub fn move_start(&mut self) -> Result<(), ServoError> {
        self.write(Instruction::MoveStart)
    }

    /// Stop the current move immediately.
    pub fn move_stop(&mut self) -> Result<(), ServoError> {
        self.write(Instruction::MoveStop)
    }

    /// Convenience wrapper over [`Servo::move_time_write`] taking an angle
    /// instead of raw units.
    pub fn move_to_angle<A: Angle<f32>>(&mut self, angle: A, time: u16) -> Result<(), ServoError> {
        let position = (angle.to_deg().as_value() / DEGREES_PER_UNIT).round() as i16;
        self.move_time_write(position, time)
    }

    /// Assign a new id. The client rebinds to it once the frame is sent,
    /// so follow-up commands reach the renamed device.
    pub fn id_write(&mut self, new_id: ServoId) -> Result<(), ServoError> {
        self.write(Instruction::IdWrite { id: new_id })?;
        self.id = new_id;
        Ok(())
    }

    /// Discover the id of the connected servo. Always issued to the
    /// broadcast address, whatever id the client is bound to: a caller
    /// who knew the id would not need to ask. Only meaningful with a
    /// single device on the bus.
    pub fn id_read(&mut self) -> Result<ServoId, ServoError> {
        let response = self.read_from(ServoId::broadcast(), Instruction::IdRead)?;
        let &[id] = response.payload.as_slice() else {
            return Err(ExchangeError::Corrupted.into());
        };
        ServoId::try_from(id).map_err(|_| ExchangeError::Corrupted.into())
    }

    /// Adjust the position offset (homing), in 0.24 degree units. Volatile
    /// until persisted with [`Servo::angle_offset_write`].
    pub fn angle_offset_adjust(&mut self, delta: i8) -> Result<(), ServoError> {
        self.write(Instruction::AngleOffsetAdjust { delta })
    }

    /// Persist the current offset across power cycles.
    pub fn angle_offset_write(&mut self) -> Result<(), ServoError> {
        self.write(Instruction::AngleOffsetWrite)
    }

    pub fn angle_offset_read(&mut self) -> Result<i8, ServoError> {
        let response = self.read(Instruction::AngleOffsetRead)?;
        self.single_byte(response).map(|byte| byte as i8)
    }

    /// Restrict movement to [min, max]; min is clamped to [0, 999] and max
    /// to [min + 1, 1000]. Persists across power cycles.
    pub fn angle_limit_write(&mut self, min: i16, max: i16) -> Result<(), ServoError> {
        self.write(Instruction::angle_limit_write(min, max))
    }

    pub fn angle_limit_read(&mut self) -> Result<Limit, ServoError> {
        let response = self.read(Instruction::AngleLimitRead)?;
        Limit::from_payload(&response.payload).ok_or(ExchangeError::Corrupted.into())
    }

    /// Input voltage window in mV; outside it the servo drops torque and
    /// blinks the LED (if configured). min is clamped to [4500, 11999] and
    /// max to [min + 1, 12000].
    pub fn vin_limit_write(&mut self, min: i16, max: i16) -> Result<(), ServoError> {
        self.write(Instruction::vin_limit_write(min, max))
    }

    pub fn vin_limit_read(&mut self) -> Result<Limit, ServoError> {
        let response = self.read(Instruction::VinLimitRead)?;
        Limit::from_payload(&response.payload).ok_or(ExchangeError::Corrupted.into())
    }

    /// Maximum temperature in Celsius before the servo drops torque,
    /// clamped to [50, 100].
    pub fn temp_max_limit_write(&mut self, max: u8) -> Result<(), ServoError> {
        self.write(Instruction::temp_max_limit_write(max))
    }

    pub fn temp_max_limit_read(&mut self) -> Result<u8, ServoError> {
        let response = self.read(Instruction::TempMaxLimitRead)?;
        self.single_byte(response)
    }

    /// Current temperature in Celsius.
    pub fn temp_read(&mut self) -> Result<u8, ServoError> {
        let response = self.read(Instruction::TempRead)?;
        self.single_byte(response)
    }

    /// Input voltage in mV.
    pub fn vin_read(&mut self) -> Result<u16, ServoError> {
        let response = self.read(Instruction::VinRead)?;
        match response.payload.as_slice() {
            &[low, high] => Ok(u16::from_le_bytes([low, high])),
            _ => Err(ExchangeError::Corrupted.into()),
        }
    }

    /// Current position in 0.24 degree units. Can come back slightly
    /// negative when the servo rests just below its zero point.
    pub fn pos_read(&mut self) -> Result<i16, ServoError> {
        let response = self.read(Instruction::PosRead)?;
        match response.payload.as_slice() {
            &[low, high] => Ok(i16::from_le_bytes([low, high])),
            _ => Err(ExchangeError::Corrupted.into()),
        }
    }

    /// Switch between position control and continuous rotation. Speed is
    /// clamped to [-1000, 1000] and only meaningful in motor mode.
    pub fn mode_write(&mut self, mode: Mode, speed: i16) -> Result<(), ServoError> {
        self.write(Instruction::mode_write(mode, speed))
    }

    pub fn mode_read(&mut self) -> Result<ModeRead, ServoError> {
        let response = self.read(Instruction::ModeRead)?;
        ModeRead::from_payload(&response.payload).ok_or(ExchangeError::Corrupted.into())
    }

    /// Load (hold position under torque) or unload (free rotation).
    pub fn load_write(&mut self, load: LoadMode) -> Result<(), ServoError> {
        self.write(Instruction::LoadWrite { load })
    }

    pub fn load_read(&mut self) -> Result<LoadMode, ServoError> {
        let response = self.read(Instruction::LoadRead)?;
        let byte = self.single_byte(response)?;
        LoadMode::n(byte).ok_or(ExchangeError::Corrupted.into())
    }

    pub fn led_ctrl_write(&mut self, led: PowerLed) -> Result<(), ServoError> {
        self.write(Instruction::LedCtrlWrite { led })
    }

    pub fn led_ctrl_read(&mut self) -> Result<PowerLed, ServoError> {
        let response = self.read(Instruction::LedCtrlRead)?;
        let byte = self.single_byte(response)?;
        PowerLed::n(byte).ok_or(ExchangeError::Corrupted.into())
    }

    /// Choose which fault conditions the LED blinks for.
    pub fn led_error_write(&mut self, config: LedError) -> Result<(), ServoError> {
        self.write(Instruction::LedErrorWrite { config })
    }

    pub fn led_error_read(&mut self) -> Result<LedError, ServoError> {
        let response = self.read(Instruction::LedErrorRead)?;
        self.single_byte(response).map(LedError::from_byte)
    }

    fn single_byte(&self, response: Response) -> Result<u8, ServoError> {
        match response.payload.as_slice() {
            &[byte] => Ok(byte),
            _ => Err(ExchangeError::Corrupted.into()),
        }
    }
}
