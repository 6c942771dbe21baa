use enumn::N;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServoIdError {
    #[error("ID value out of allowed range.")]
    Range,
    #[error("ID cannot be broadcast.")]
    MustNotBroadcast,
}

/// Bus address of one servo. 254 addresses every device on the line and is
/// only answered for id discovery and assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServoId {
    Broadcast,
    Single(u8),
}

impl ServoId {
    const BROADCAST: u8 = 254;
    const MIN: u8 = 1;
    const MAX: u8 = 253;

    pub fn broadcast() -> Self {
        Self::Broadcast
    }

    pub fn single(value: u8) -> Result<Self, ServoIdError> {
        match value {
            Self::BROADCAST => Err(ServoIdError::MustNotBroadcast),
            Self::MIN..=Self::MAX => Ok(Self::Single(value)),
            _ => Err(ServoIdError::Range),
        }
    }

    pub fn value(self) -> u8 {
        match self {
            Self::Broadcast => Self::BROADCAST,
            Self::Single(x) => x,
        }
    }
}

impl From<ServoId> for u8 {
    fn from(id: ServoId) -> Self {
        id.value()
    }
}

impl TryFrom<u8> for ServoId {
    type Error = ServoIdError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == Self::BROADCAST {
            return Ok(Self::Broadcast);
        }

        Self::single(value)
    }
}

/// Position or speed control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, N)]
#[repr(u8)]
pub enum Mode {
    Servo = 0,
    Motor = 1,
}

/// Whether the servo powers its output to hold position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, N)]
#[repr(u8)]
pub enum LoadMode {
    Unload = 0,
    Load = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, N)]
#[repr(u8)]
pub enum PowerLed {
    On = 0,
    Off = 1,
}

/// Target set by a move command. Position is in units of 0.24 degrees,
/// time is the commanded travel duration in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveTime {
    pub position: u16,
    pub time: u16,
}

impl MoveTime {
    pub(crate) fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            &[p0, p1, t0, t1] => Some(Self {
                position: u16::from_le_bytes([p0, p1]),
                time: u16::from_le_bytes([t0, t1]),
            }),
            _ => None,
        }
    }
}

/// A min/max pair, used for both angle limits (0.24 degree units) and
/// input voltage limits (millivolts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub min: i16,
    pub max: i16,
}

impl Limit {
    pub(crate) fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            &[min0, min1, max0, max1] => Some(Self {
                min: i16::from_le_bytes([min0, min1]),
                max: i16::from_le_bytes([max0, max1]),
            }),
            _ => None,
        }
    }
}

/// Mode reported by the servo; speed is zero in servo mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeRead {
    pub mode: Mode,
    pub speed: i16,
}

impl ModeRead {
    pub(crate) fn from_payload(payload: &[u8]) -> Option<Self> {
        match payload {
            &[mode, _, s0, s1] => Some(Self {
                mode: Mode::n(mode)?,
                speed: i16::from_le_bytes([s0, s1]),
            }),
            _ => None,
        }
    }
}

/// Fault conditions the status LED blinks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedError {
    pub over_temperature: bool,
    pub over_voltage: bool,
    pub stall: bool,
}

impl LedError {
    pub(crate) fn to_byte(self) -> u8 {
        (self.over_temperature as u8) | (self.over_voltage as u8) << 1 | (self.stall as u8) << 2
    }

    pub(crate) fn from_byte(value: u8) -> Self {
        Self {
            over_temperature: value & 0x1 > 0,
            over_voltage: value & 0x2 > 0,
            stall: value & 0x4 > 0,
        }
    }
}

/// Inclusive parameter bound applied before a value is encoded.
#[derive(Debug, Clone, Copy)]
struct Clamp {
    min: i16,
    max: i16,
}

impl Clamp {
    const fn apply(self, value: i16) -> i16 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

const POSITION: Clamp = Clamp { min: 0, max: 1000 };
const SPEED: Clamp = Clamp {
    min: -1000,
    max: 1000,
};
const ANGLE_MIN: Clamp = Clamp { min: 0, max: 999 };
const VIN_MIN: Clamp = Clamp {
    min: 4500,
    max: 11999,
};
const TEMP_MAX: Clamp = Clamp { min: 50, max: 100 };

/// The upper limit of a min/max pair must stay above the (already clamped)
/// lower limit and below the hardware ceiling.
const fn clamp_pair(min: i16, max: i16, lower: Clamp, ceiling: i16) -> (i16, i16) {
    let min = lower.apply(min);
    let max = Clamp {
        min: min + 1,
        max: ceiling,
    }
    .apply(max);
    (min, max)
}

/// One entry of the command catalog. Variants hold already-clamped
/// parameters; use the constructor functions rather than building variants
/// directly so the clamping rules are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MoveTimeWrite { position: u16, time: u16 },
    MoveTimeRead,
    MoveTimeWaitWrite { position: u16, time: u16 },
    MoveTimeWaitRead,
    MoveStart,
    MoveStop,
    IdWrite { id: ServoId },
    IdRead,
    AngleOffsetAdjust { delta: i8 },
    AngleOffsetWrite,
    AngleOffsetRead,
    AngleLimitWrite { min: i16, max: i16 },
    AngleLimitRead,
    VinLimitWrite { min: i16, max: i16 },
    VinLimitRead,
    TempMaxLimitWrite { max: u8 },
    TempMaxLimitRead,
    TempRead,
    VinRead,
    PosRead,
    ModeWrite { mode: Mode, speed: i16 },
    ModeRead,
    LoadWrite { load: LoadMode },
    LoadRead,
    LedCtrlWrite { led: PowerLed },
    LedCtrlRead,
    LedErrorWrite { config: LedError },
    LedErrorRead,
}

impl Instruction {
    /// Position is clamped to [0, 1000]; time is transmitted unclamped.
    pub fn move_time_write(position: i16, time: u16) -> Self {
        Self::MoveTimeWrite {
            position: POSITION.apply(position) as u16,
            time,
        }
    }

    /// Same clamping as [`Instruction::move_time_write`]; the move is held
    /// until a move-start command arrives.
    pub fn move_time_wait_write(position: i16, time: u16) -> Self {
        Self::MoveTimeWaitWrite {
            position: POSITION.apply(position) as u16,
            time,
        }
    }

    /// min is clamped to [0, 999], max to [min + 1, 1000].
    pub fn angle_limit_write(min: i16, max: i16) -> Self {
        let (min, max) = clamp_pair(min, max, ANGLE_MIN, 1000);
        Self::AngleLimitWrite { min, max }
    }

    /// min is clamped to [4500, 11999] mV, max to [min + 1, 12000] mV.
    pub fn vin_limit_write(min: i16, max: i16) -> Self {
        let (min, max) = clamp_pair(min, max, VIN_MIN, 12000);
        Self::VinLimitWrite { min, max }
    }

    /// Clamped to [50, 100] degrees Celsius.
    pub fn temp_max_limit_write(max: u8) -> Self {
        Self::TempMaxLimitWrite {
            max: TEMP_MAX.apply(max as i16) as u8,
        }
    }

    /// Speed is clamped to [-1000, 1000] and forced to zero in servo mode,
    /// where it has no meaning.
    pub fn mode_write(mode: Mode, speed: i16) -> Self {
        let speed = match mode {
            Mode::Servo => 0,
            Mode::Motor => SPEED.apply(speed),
        };
        Self::ModeWrite { mode, speed }
    }

    /// Command id byte on the wire.
    pub(crate) fn id(&self) -> u8 {
        match self {
            Self::MoveTimeWrite { .. } => 1,
            Self::MoveTimeRead => 2,
            Self::MoveTimeWaitWrite { .. } => 7,
            Self::MoveTimeWaitRead => 8,
            Self::MoveStart => 11,
            Self::MoveStop => 12,
            Self::IdWrite { .. } => 13,
            Self::IdRead => 14,
            Self::AngleOffsetAdjust { .. } => 17,
            Self::AngleOffsetWrite => 18,
            Self::AngleOffsetRead => 19,
            Self::AngleLimitWrite { .. } => 20,
            Self::AngleLimitRead => 21,
            Self::VinLimitWrite { .. } => 22,
            Self::VinLimitRead => 23,
            Self::TempMaxLimitWrite { .. } => 24,
            Self::TempMaxLimitRead => 25,
            Self::TempRead => 26,
            Self::VinRead => 27,
            Self::PosRead => 28,
            Self::ModeWrite { .. } => 29,
            Self::ModeRead => 30,
            Self::LoadWrite { .. } => 31,
            Self::LoadRead => 32,
            Self::LedCtrlWrite { .. } => 33,
            Self::LedCtrlRead => 34,
            Self::LedErrorWrite { .. } => 35,
            Self::LedErrorRead => 36,
        }
    }

    /// Request payload bytes, multi-byte fields low byte first.
    pub(crate) fn payload(&self) -> Vec<u8> {
        match *self {
            Self::MoveTimeWrite { position, time }
            | Self::MoveTimeWaitWrite { position, time } => {
                let [p0, p1] = position.to_le_bytes();
                let [t0, t1] = time.to_le_bytes();
                Vec::from([p0, p1, t0, t1])
            }
            Self::IdWrite { id } => Vec::from([id.value()]),
            Self::AngleOffsetAdjust { delta } => Vec::from([delta as u8]),
            Self::AngleLimitWrite { min, max } | Self::VinLimitWrite { min, max } => {
                let [min0, min1] = min.to_le_bytes();
                let [max0, max1] = max.to_le_bytes();
                Vec::from([min0, min1, max0, max1])
            }
            Self::TempMaxLimitWrite { max } => Vec::from([max]),
            Self::ModeWrite { mode, speed } => {
                let [s0, s1] = speed.to_le_bytes();
                Vec::from([mode as u8, 0, s0, s1])
            }
            Self::LoadWrite { load } => Vec::from([load as u8]),
            Self::LedCtrlWrite { led } => Vec::from([led as u8]),
            Self::LedErrorWrite { config } => Vec::from([config.to_byte()]),
            Self::MoveTimeRead
            | Self::MoveTimeWaitRead
            | Self::MoveStart
            | Self::MoveStop
            | Self::IdRead
            | Self::AngleOffsetWrite
            | Self::AngleOffsetRead
            | Self::AngleLimitRead
            | Self::VinLimitRead
            | Self::TempMaxLimitRead
            | Self::TempRead
            | Self::VinRead
            | Self::PosRead
            | Self::ModeRead
            | Self::LoadRead
            | Self::LedCtrlRead
            | Self::LedErrorRead => Vec::new(),
        }
    }

    /// Payload length of the expected reply. Write commands are fire and
    /// forget; the device never answers them.
    pub(crate) fn reply_payload_len(&self) -> u8 {
        match self {
            Self::MoveTimeRead
            | Self::MoveTimeWaitRead
            | Self::AngleLimitRead
            | Self::VinLimitRead
            | Self::ModeRead => 4,
            Self::VinRead | Self::PosRead => 2,
            Self::IdRead
            | Self::AngleOffsetRead
            | Self::TempMaxLimitRead
            | Self::TempRead
            | Self::LoadRead
            | Self::LedCtrlRead
            | Self::LedErrorRead => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_id_rejects_broadcast_and_out_of_range() {
        assert!(matches!(
            ServoId::single(254),
            Err(ServoIdError::MustNotBroadcast)
        ));
        assert!(matches!(ServoId::single(0), Err(ServoIdError::Range)));
        assert!(matches!(ServoId::single(255), Err(ServoIdError::Range)));
        assert_eq!(ServoId::single(5).unwrap().value(), 5);
        assert_eq!(ServoId::try_from(254).unwrap(), ServoId::Broadcast);
    }

    #[test]
    fn move_position_is_clamped() {
        assert_eq!(
            Instruction::move_time_write(-20, 0),
            Instruction::MoveTimeWrite {
                position: 0,
                time: 0
            }
        );
        assert_eq!(
            Instruction::move_time_write(1001, 0),
            Instruction::MoveTimeWrite {
                position: 1000,
                time: 0
            }
        );
        assert_eq!(
            Instruction::move_time_write(500, 65535),
            Instruction::MoveTimeWrite {
                position: 500,
                time: 65535
            }
        );
    }

    #[test]
    fn angle_limits_keep_max_above_min() {
        let cases = [
            (-5, 2000, 0, 1000),
            (500, 500, 500, 501),
            (999, -100, 999, 1000),
            (1500, 1500, 999, 1000),
        ];
        for (min, max, want_min, want_max) in cases {
            assert_eq!(
                Instruction::angle_limit_write(min, max),
                Instruction::AngleLimitWrite {
                    min: want_min,
                    max: want_max
                }
            );
        }
    }

    #[test]
    fn vin_limits_keep_max_above_min() {
        let cases = [
            (0, 20000, 4500, 12000),
            (9000, 8000, 9000, 9001),
            (12000, 12000, 11999, 12000),
        ];
        for (min, max, want_min, want_max) in cases {
            assert_eq!(
                Instruction::vin_limit_write(min, max),
                Instruction::VinLimitWrite {
                    min: want_min,
                    max: want_max
                }
            );
        }
    }

    #[test]
    fn temp_limit_is_clamped() {
        assert_eq!(
            Instruction::temp_max_limit_write(20),
            Instruction::TempMaxLimitWrite { max: 50 }
        );
        assert_eq!(
            Instruction::temp_max_limit_write(200),
            Instruction::TempMaxLimitWrite { max: 100 }
        );
        assert_eq!(
            Instruction::temp_max_limit_write(85),
            Instruction::TempMaxLimitWrite { max: 85 }
        );
    }

    #[test]
    fn servo_mode_forces_zero_speed() {
        assert_eq!(
            Instruction::mode_write(Mode::Servo, 700),
            Instruction::ModeWrite {
                mode: Mode::Servo,
                speed: 0
            }
        );
        assert_eq!(
            Instruction::mode_write(Mode::Motor, -3000),
            Instruction::ModeWrite {
                mode: Mode::Motor,
                speed: -1000
            }
        );
    }

    #[test]
    fn led_error_bits_round_trip() {
        let config = LedError {
            over_temperature: true,
            over_voltage: false,
            stall: true,
        };
        assert_eq!(config.to_byte(), 0x05);
        assert_eq!(LedError::from_byte(0x05), config);

        let all = LedError::from_byte(0xFF);
        assert!(all.over_temperature && all.over_voltage && all.stall);
        assert_eq!(all.to_byte(), 0x07);
    }

    #[test]
    fn move_time_decodes_little_endian() {
        assert_eq!(
            MoveTime::from_payload(&[0xF4, 0x01, 0xE8, 0x03]),
            Some(MoveTime {
                position: 500,
                time: 1000
            })
        );
        assert_eq!(MoveTime::from_payload(&[0xF4, 0x01]), None);
    }

    #[test]
    fn limit_decodes_signed_values() {
        assert_eq!(
            Limit::from_payload(&[0x18, 0xFC, 0xE8, 0x03]),
            Some(Limit {
                min: -1000,
                max: 1000
            })
        );
    }

    #[test]
    fn mode_read_decodes_speed_and_rejects_bad_mode() {
        assert_eq!(
            ModeRead::from_payload(&[1, 0, 0x18, 0xFC]),
            Some(ModeRead {
                mode: Mode::Motor,
                speed: -1000
            })
        );
        assert_eq!(ModeRead::from_payload(&[2, 0, 0, 0]), None);
    }
}
