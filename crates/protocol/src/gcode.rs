use std::{fmt, str::FromStr};

use scribit_geom::CordDelta;
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A single line of a motion program.
///
/// The text produced by `Display` is what the firmware consumes, so it has to
/// stay byte-for-byte stable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum GCode {
    /// `G21`
    Millimeters,
    /// `G90`
    Absolute,
    /// `G91`
    Incremental,
    /// `M17`
    EnableMotors,
    /// `G1 X.. Y.. F..`
    ///
    /// The firmware's axis convention is that `X` is the change in the left
    /// cord and `Y` is the *negated* change in the right cord. Use
    /// [`GCode::cord_move`] to get that right.
    CordMove { x: f64, y: f64, feed: u32 },
    /// `G1 Z.. F..`: absolute or incremental depending on the current mode.
    CarouselMove { z: f64, feed: u32 },
    /// `G77`: home the carousel against its hall sensor.
    HomeCarousel,
    /// `G92 Z..`: declare the current carousel angle.
    SetCarouselAngle { z: f64 },
    /// `G101`: pulse the pen mechanism.
    PenPulse,
    /// `G4 S..`
    Dwell { seconds: f64 },
}

impl GCode {
    pub fn cord_move(delta: &CordDelta, feed: u32) -> GCode {
        GCode::CordMove {
            x: delta.left.get(),
            y: -delta.right.get(),
            feed,
        }
    }

    /// A pause. Negative (and NaN) durations are clamped to zero.
    pub fn dwell(seconds: f64) -> GCode {
        // Not `max`, which keeps -0.0 and would print as "S-0.000".
        let seconds = if seconds > 0.0 { seconds } else { 0.0 };
        GCode::Dwell { seconds }
    }
}

impl fmt::Display for GCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GCode::Millimeters => f.write_str("G21"),
            GCode::Absolute => f.write_str("G90"),
            GCode::Incremental => f.write_str("G91"),
            GCode::EnableMotors => f.write_str("M17"),
            GCode::CordMove { x, y, feed } => write!(f, "G1 X{x:.3} Y{y:.3} F{feed}"),
            GCode::CarouselMove { z, feed } => write!(f, "G1 Z{z:.3} F{feed}"),
            GCode::HomeCarousel => f.write_str("G77"),
            GCode::SetCarouselAngle { z } => write!(f, "G92 Z{z}"),
            GCode::PenPulse => f.write_str("G101"),
            GCode::Dwell { seconds } => write!(f, "G4 S{seconds:.3}"),
        }
    }
}

#[derive(Clone, Copy, Default)]
struct Words {
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    s: Option<f64>,
    f: Option<u32>,
}

impl Words {
    fn parse<'a>(
        line: &str,
        words: impl Iterator<Item = &'a str>,
    ) -> Result<Words, ProtocolError> {
        let malformed = || ProtocolError::MalformedLine(line.to_owned());
        let mut ret = Words::default();
        for word in words {
            let mut chars = word.chars();
            let letter = chars.next();
            let value = chars.as_str();
            let num = || value.parse::<f64>().map_err(|_| malformed());
            match letter {
                Some('X') => ret.x = Some(num()?),
                Some('Y') => ret.y = Some(num()?),
                Some('Z') => ret.z = Some(num()?),
                Some('S') => ret.s = Some(num()?),
                // Feeds are integers on the wire, but be lenient with "F600.0".
                Some('F') => ret.f = Some(num()?.round() as u32),
                _ => return Err(malformed()),
            }
        }
        Ok(ret)
    }
}

impl FromStr for GCode {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<GCode, ProtocolError> {
        let malformed = || ProtocolError::MalformedLine(line.to_owned());
        let mut words = line.split_whitespace();
        let code = words.next().ok_or_else(malformed)?;
        let params = Words::parse(line, words)?;

        let simple = |cmd: GCode| {
            let Words { x, y, z, s, f } = &params;
            if x.is_none() && y.is_none() && z.is_none() && s.is_none() && f.is_none() {
                Ok(cmd)
            } else {
                Err(malformed())
            }
        };

        match code {
            "G21" => simple(GCode::Millimeters),
            "G90" => simple(GCode::Absolute),
            "G91" => simple(GCode::Incremental),
            "M17" => simple(GCode::EnableMotors),
            "G77" => simple(GCode::HomeCarousel),
            "G101" => simple(GCode::PenPulse),
            "G1" => match params {
                Words {
                    x: Some(x),
                    y: Some(y),
                    z: None,
                    s: None,
                    f: Some(feed),
                } => Ok(GCode::CordMove { x, y, feed }),
                Words {
                    x: None,
                    y: None,
                    z: Some(z),
                    s: None,
                    f: Some(feed),
                } => Ok(GCode::CarouselMove { z, feed }),
                _ => Err(malformed()),
            },
            "G92" => match params {
                Words {
                    z: Some(z),
                    x: None,
                    y: None,
                    s: None,
                    f: None,
                } => Ok(GCode::SetCarouselAngle { z }),
                _ => Err(malformed()),
            },
            "G4" => match params {
                Words {
                    s: Some(seconds),
                    x: None,
                    y: None,
                    z: None,
                    f: None,
                } => Ok(GCode::dwell(seconds)),
                _ => Err(malformed()),
            },
            _ => Err(malformed()),
        }
    }
}

/// An ordered sequence of G-code lines.
///
/// Programs are built with the planner's program builder and are immutable
/// afterwards. The textual form has one command per line, each line
/// terminated by `\n`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionProgram {
    lines: Vec<GCode>,
}

impl MotionProgram {
    pub fn lines(&self) -> &[GCode] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl FromIterator<GCode> for MotionProgram {
    fn from_iter<I: IntoIterator<Item = GCode>>(iter: I) -> Self {
        MotionProgram {
            lines: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for MotionProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl FromStr for MotionProgram {
    type Err = ProtocolError;

    /// Parses a program, skipping blank lines and `;` comments.
    fn from_str(s: &str) -> Result<MotionProgram, ProtocolError> {
        s.lines()
            .map(|line| line.split(';').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .map(str::parse::<GCode>)
            .collect()
    }
}
