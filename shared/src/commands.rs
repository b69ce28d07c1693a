//! Tello Command Vocabulary
//!
//! Formats SDK commands and applies the range limits the drone enforces.
//! Out-of-range arguments are clamped rather than rejected.

use std::fmt;

/// Argument limits accepted by the drone
pub mod limits {
    /// Movement distance in cm
    pub const MIN_DISTANCE: i32 = 20;
    pub const MAX_DISTANCE: i32 = 500;

    /// Rotation angle in degrees
    pub const MIN_ANGLE: i32 = 1;
    pub const MAX_ANGLE: i32 = 3600;

    /// Speed in cm/s
    pub const MIN_SPEED: i32 = 10;
    pub const MAX_SPEED: i32 = 100;

    /// Remote-control channel value
    pub const MIN_RC: i32 = -100;
    pub const MAX_RC: i32 = 100;
}

pub fn clamp_distance(distance: i32) -> i32 {
    distance.clamp(limits::MIN_DISTANCE, limits::MAX_DISTANCE)
}

pub fn clamp_angle(angle: i32) -> i32 {
    angle.clamp(limits::MIN_ANGLE, limits::MAX_ANGLE)
}

pub fn clamp_speed(speed: i32) -> i32 {
    speed.clamp(limits::MIN_SPEED, limits::MAX_SPEED)
}

pub fn clamp_rc(value: i32) -> i32 {
    value.clamp(limits::MIN_RC, limits::MAX_RC)
}

/// Linear movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Back,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Forward => "forward",
            Direction::Back => "back",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Yaw rotation direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rotation::Clockwise => "cw",
            Rotation::CounterClockwise => "ccw",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query commands answered with a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadCommand {
    /// Current speed setting (cm/s)
    Speed,
    /// Battery percentage
    Battery,
    /// Motor-on time (s)
    FlightTime,
    /// Wi-Fi SNR
    Wifi,
    /// SDK version
    Sdk,
    /// Serial number
    SerialNumber,
}

impl ReadCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadCommand::Speed => "speed?",
            ReadCommand::Battery => "battery?",
            ReadCommand::FlightTime => "time?",
            ReadCommand::Wifi => "wifi?",
            ReadCommand::Sdk => "sdk?",
            ReadCommand::SerialNumber => "sn?",
        }
    }

    /// Look up a query by its wire text
    pub fn from_wire(text: &str) -> Option<Self> {
        match text.trim() {
            "speed?" => Some(ReadCommand::Speed),
            "battery?" => Some(ReadCommand::Battery),
            "time?" => Some(ReadCommand::FlightTime),
            "wifi?" => Some(ReadCommand::Wifi),
            "sdk?" => Some(ReadCommand::Sdk),
            "sn?" => Some(ReadCommand::SerialNumber),
            _ => None,
        }
    }
}

/// A single command in the Tello SDK vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelloCommand {
    /// Enter SDK mode
    Command,
    Takeoff,
    Land,
    StreamOn,
    StreamOff,
    /// Stop all motors immediately
    Emergency,
    Move { direction: Direction, distance: i32 },
    Rotate { rotation: Rotation, angle: i32 },
    Speed(i32),
    /// Remote-control channels: left/right, forward/back, up/down, yaw
    Rc {
        left_right: i32,
        forward_back: i32,
        up_down: i32,
        yaw: i32,
    },
    Read(ReadCommand),
}

impl TelloCommand {
    /// Format the command as sent on the wire, with arguments clamped
    pub fn to_wire(&self) -> String {
        match self {
            TelloCommand::Command => "command".into(),
            TelloCommand::Takeoff => "takeoff".into(),
            TelloCommand::Land => "land".into(),
            TelloCommand::StreamOn => "streamon".into(),
            TelloCommand::StreamOff => "streamoff".into(),
            TelloCommand::Emergency => "emergency".into(),
            TelloCommand::Move {
                direction,
                distance,
            } => format!("{} {}", direction, clamp_distance(*distance)),
            TelloCommand::Rotate { rotation, angle } => {
                format!("{} {}", rotation, clamp_angle(*angle))
            }
            TelloCommand::Speed(speed) => format!("speed {}", clamp_speed(*speed)),
            TelloCommand::Rc {
                left_right,
                forward_back,
                up_down,
                yaw,
            } => format!(
                "rc {} {} {} {}",
                clamp_rc(*left_right),
                clamp_rc(*forward_back),
                clamp_rc(*up_down),
                clamp_rc(*yaw)
            ),
            TelloCommand::Read(query) => query.as_str().into(),
        }
    }
}

impl fmt::Display for TelloCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_wire())
    }
}
