//! Building motion programs out of blocks.
//!
//! Every program starts with the setup block (millimeters, incremental
//! positioning, motors on), and every block leaves the firmware in
//! incremental mode, so that cord moves can be appended after any block.
//! There is no way to append a raw line.

use scribit_geom::{segment_travel, Config, CordDelta, LenExt as _, LeftRight, WallPoint};
use scribit_protocol::{CommandId, GCode, JogKey, MotionProgram, PenAction, PenSlot, Rotation};

use crate::{Carousel, Error, Result};

/// Number of pen pulses for a pen-down. Fewer than three don't latch reliably.
pub const PEN_DOWN_PULSES: usize = 3;

#[derive(Clone, Debug)]
pub struct ProgramBuilder {
    lines: Vec<GCode>,
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramBuilder {
    /// A new program, already containing the setup block.
    pub fn new() -> Self {
        ProgramBuilder {
            lines: vec![GCode::Millimeters, GCode::Incremental, GCode::EnableMotors],
        }
    }

    pub fn build(&self) -> MotionProgram {
        self.lines.iter().copied().collect()
    }

    /// Change the cord lengths by `delta`.
    pub fn cord_jog(&mut self, delta: &CordDelta, feed: u32) -> &mut Self {
        self.lines.push(GCode::cord_move(delta, feed));
        self
    }

    /// Move the head in a straight line (in cord space) from `from` to `to`.
    pub fn cord_move(
        &mut self,
        geom: &Config,
        from: &WallPoint,
        to: &WallPoint,
        feed: u32,
    ) -> &mut Self {
        self.cord_jog(&geom.cord_delta(from, to), feed)
    }

    /// Move the head from `from` to `to`, cutting the move into pieces no
    /// longer than `max_segment` in wall space. Returns the new head position.
    pub fn travel(
        &mut self,
        geom: &Config,
        from: WallPoint,
        to: WallPoint,
        max_segment: f64,
        feed: u32,
    ) -> WallPoint {
        let mut pos = from;
        for p in segment_travel(from, to, max_segment) {
            self.cord_move(geom, &pos, &p, feed);
            pos = p;
        }
        pos
    }

    /// A manual carousel rotation by `step` degrees.
    pub fn carousel_jog(&mut self, rotation: Rotation, step: f64, feed: u32) -> &mut Self {
        self.lines.push(GCode::CarouselMove {
            z: rotation.sign() * step,
            feed,
        });
        self
    }

    /// Rotate the carousel (counter-clockwise only) to present `slot`. For
    /// a pen-down, also latch the pen.
    pub fn select_pen(
        &mut self,
        carousel: &mut Carousel,
        slot: PenSlot,
        action: PenAction,
        feed: u32,
    ) -> &mut Self {
        let target = carousel.select_target(slot);
        log::debug!("pen {slot} {action:?}: carousel to {target}");
        self.lines.extend([
            GCode::Absolute,
            GCode::CarouselMove { z: target, feed },
            GCode::Incremental,
        ]);
        if action == PenAction::Down {
            self.latch_pen();
        }
        self
    }

    /// Put the currently selected pen down.
    pub fn latch_pen(&mut self) -> &mut Self {
        self.lines.extend([GCode::PenPulse; PEN_DOWN_PULSES]);
        self
    }

    /// Home the carousel and pin its angle to the known reference.
    pub fn home(&mut self, carousel: &mut Carousel) -> &mut Self {
        let angle = carousel.home();
        self.lines.extend([
            GCode::Absolute,
            GCode::HomeCarousel,
            GCode::SetCarouselAngle { z: angle },
            GCode::Incremental,
        ]);
        self
    }

    /// Pause. Negative durations are treated as zero.
    pub fn dwell(&mut self, seconds: f64) -> &mut Self {
        self.lines.push(GCode::dwell(seconds));
        self
    }
}

/// The program for a static jog command. This is a pure function of its
/// arguments.
pub fn static_program(key: JogKey, cmd: CommandId) -> Result<MotionProgram> {
    let mut prog = ProgramBuilder::new();
    match cmd {
        CommandId::Cord(jog) => {
            let (left, right) = jog.signs();
            let delta = LeftRight {
                left: (left * key.step).mm(),
                right: (right * key.step).mm(),
            };
            prog.cord_jog(&delta, key.feed);
        }
        CommandId::Carousel(rotation) => {
            prog.carousel_jog(rotation, key.step, key.feed);
        }
        CommandId::Pen(..) | CommandId::Home => return Err(Error::DynamicCommand(cmd)),
    }
    Ok(prog.build())
}

/// The program for a pen or home command. This updates the carousel.
pub fn dynamic_program(
    cmd: CommandId,
    carousel: &mut Carousel,
    pen_feed: u32,
) -> Result<MotionProgram> {
    let mut prog = ProgramBuilder::new();
    match cmd {
        CommandId::Pen(slot, action) => {
            prog.select_pen(carousel, slot, action, pen_feed);
        }
        CommandId::Home => {
            prog.home(carousel);
        }
        CommandId::Cord(_) | CommandId::Carousel(_) => return Err(Error::StaticCommand(cmd)),
    }
    Ok(prog.build())
}
