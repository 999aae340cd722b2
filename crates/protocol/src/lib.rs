//! The things the Scribit firmware understands: G-code motion programs,
//! and the closed set of discrete commands that the jog tools can ask for.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

mod gcode;

pub use gcode::{GCode, MotionProgram};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("pen slot must be 1..4, got {0}")]
    InvalidPenSlot(u8),
    #[error("malformed G-code line {0:?}")]
    MalformedLine(String),
}

/// Absolute carousel angles (degrees) at which each pen is presented to the wall.
const PEN_SLOT_ANGLES: [f64; 4] = [89.0, 161.0, 233.0, 305.0];

/// One of the four pen positions on the carousel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PenSlot(u8);

impl PenSlot {
    pub const ALL: [PenSlot; 4] = [PenSlot(1), PenSlot(2), PenSlot(3), PenSlot(4)];

    pub fn new(slot: u8) -> Result<Self, ProtocolError> {
        if (1..=4).contains(&slot) {
            Ok(PenSlot(slot))
        } else {
            Err(ProtocolError::InvalidPenSlot(slot))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// The carousel angle of this slot, in degrees. This is fixed for the
    /// lifetime of the robot.
    pub fn angle(self) -> f64 {
        PEN_SLOT_ANGLES[self.0 as usize - 1]
    }
}

impl TryFrom<u8> for PenSlot {
    type Error = ProtocolError;

    fn try_from(slot: u8) -> Result<Self, ProtocolError> {
        PenSlot::new(slot)
    }
}

impl From<PenSlot> for u8 {
    fn from(slot: PenSlot) -> u8 {
        slot.0
    }
}

impl fmt::Display for PenSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PenSlot {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        let slot = s
            .trim()
            .parse::<u8>()
            .map_err(|_| ProtocolError::InvalidPenSlot(0))?;
        PenSlot::new(slot)
    }
}

/// The adjustable parameters of the static jog commands.
///
/// `step` is millimeters of cord for cord jogs, and degrees for carousel
/// jogs. Two keys are equal exactly when their fields are bit-for-bit
/// equal, so that a key can be used in a hash map.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct JogKey {
    pub step: f64,
    pub feed: u32,
}

impl JogKey {
    pub fn new(step: f64, feed: u32) -> Self {
        Self { step, feed }
    }
}

impl PartialEq for JogKey {
    fn eq(&self, other: &Self) -> bool {
        self.step.to_bits() == other.step.to_bits() && self.feed == other.feed
    }
}

impl Eq for JogKey {}

impl std::hash::Hash for JogKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.step.to_bits().hash(state);
        self.feed.hash(state);
    }
}

/// Manual cord jogs, in motor space. These don't need to know where the
/// head is on the wall.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CordJog {
    /// Both cords in, which moves up-ish.
    BothIn,
    /// Both cords out, which moves down-ish.
    BothOut,
    LeftIn,
    LeftOut,
    RightIn,
    RightOut,
    /// Left in and right out.
    Leftish,
    /// Left out and right in.
    Rightish,
}

impl CordJog {
    pub const ALL: [CordJog; 8] = [
        CordJog::BothIn,
        CordJog::BothOut,
        CordJog::LeftIn,
        CordJog::LeftOut,
        CordJog::RightIn,
        CordJog::RightOut,
        CordJog::Leftish,
        CordJog::Rightish,
    ];

    /// The direction of each cord's change, as (left, right).
    pub fn signs(self) -> (f64, f64) {
        use CordJog::*;
        match self {
            BothIn => (-1.0, -1.0),
            BothOut => (1.0, 1.0),
            LeftIn => (-1.0, 0.0),
            LeftOut => (1.0, 0.0),
            RightIn => (0.0, -1.0),
            RightOut => (0.0, 1.0),
            Leftish => (-1.0, 1.0),
            Rightish => (1.0, -1.0),
        }
    }

    fn name(self) -> &'static str {
        use CordJog::*;
        match self {
            BothIn => "BOTH_IN",
            BothOut => "BOTH_OUT",
            LeftIn => "L_IN",
            LeftOut => "L_OUT",
            RightIn => "R_IN",
            RightOut => "R_OUT",
            Leftish => "LEFTISH",
            Rightish => "RIGHTISH",
        }
    }
}

/// Direction of a manual carousel jog. Counter-clockwise increases the angle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Ccw,
    Cw,
}

impl Rotation {
    pub fn sign(self) -> f64 {
        match self {
            Rotation::Ccw => 1.0,
            Rotation::Cw => -1.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PenAction {
    Up,
    Down,
}

/// The closed set of discrete commands.
///
/// Cord and carousel jogs are *static*: their motion program only depends
/// on the [`JogKey`]. Pen selection and homing are *dynamic*, because they
/// depend on (and change) the carousel angle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandId {
    Cord(CordJog),
    Carousel(Rotation),
    Pen(PenSlot, PenAction),
    Home,
}

impl CommandId {
    pub fn is_dynamic(self) -> bool {
        matches!(self, CommandId::Pen(..) | CommandId::Home)
    }

    /// Every command, in a stable order.
    pub fn all() -> impl Iterator<Item = CommandId> {
        let cords = CordJog::ALL.into_iter().map(CommandId::Cord);
        let carousel = [Rotation::Ccw, Rotation::Cw]
            .into_iter()
            .map(CommandId::Carousel);
        let pens = PenSlot::ALL.into_iter().flat_map(|slot| {
            [PenAction::Up, PenAction::Down]
                .into_iter()
                .map(move |action| CommandId::Pen(slot, action))
        });
        cords
            .chain(carousel)
            .chain(pens)
            .chain(std::iter::once(CommandId::Home))
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandId::Cord(jog) => f.write_str(jog.name()),
            CommandId::Carousel(Rotation::Ccw) => f.write_str("CAR_CCW"),
            CommandId::Carousel(Rotation::Cw) => f.write_str("CAR_CW"),
            CommandId::Pen(slot, PenAction::Up) => write!(f, "P{slot}_UP"),
            CommandId::Pen(slot, PenAction::Down) => write!(f, "P{slot}_DOWN"),
            CommandId::Home => f.write_str("G77"),
        }
    }
}

impl FromStr for CommandId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, ProtocolError> {
        if let Some(jog) = CordJog::ALL.into_iter().find(|jog| jog.name() == s) {
            return Ok(CommandId::Cord(jog));
        }
        let cmd = match s {
            "CAR_CCW" => CommandId::Carousel(Rotation::Ccw),
            "CAR_CW" => CommandId::Carousel(Rotation::Cw),
            "G77" => CommandId::Home,
            _ => {
                let pen = s.strip_prefix('P').and_then(|rest| {
                    let (slot, action) = rest.split_once('_')?;
                    let slot = slot.parse::<u8>().ok().and_then(|n| PenSlot::new(n).ok())?;
                    let action = match action {
                        "UP" => PenAction::Up,
                        "DOWN" => PenAction::Down,
                        _ => return None,
                    };
                    Some(CommandId::Pen(slot, action))
                });
                pen.ok_or_else(|| ProtocolError::UnknownCommand(s.to_owned()))?
            }
        };
        Ok(cmd)
    }
}
