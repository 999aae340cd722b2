//! Shared state for interactive jogging.
//!
//! Two loops share a [`JogSession`]: the input loop issues commands (and is
//! the only thing that changes the carousel angle), while a server hands
//! out the program text for previously issued commands. Each piece of
//! state has its own lock; a change of jog parameters in the middle of a
//! request is fine, as long as each read is atomic.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use scribit_protocol::{CommandId, JogKey};

use crate::{
    lock,
    program::dynamic_program,
    Carousel, Error, ProgramCache, Result,
};

pub const DEFAULT_PEN_FEED: u32 = 2000;

#[derive(Debug)]
pub struct JogSession {
    carousel: Mutex<Carousel>,
    cache: ProgramCache,
    params: Mutex<JogKey>,
    // The most recent program for each dynamic command.
    latest: Mutex<HashMap<CommandId, Arc<str>>>,
    pen_feed: u32,
}

impl JogSession {
    pub fn new(params: JogKey) -> Self {
        JogSession {
            carousel: Mutex::new(Carousel::new()),
            cache: ProgramCache::new(),
            params: Mutex::new(params),
            latest: Mutex::new(HashMap::new()),
            pen_feed: DEFAULT_PEN_FEED,
        }
    }

    pub fn with_pen_feed(mut self, pen_feed: u32) -> Self {
        self.pen_feed = pen_feed;
        self
    }

    pub fn params(&self) -> JogKey {
        *lock(&self.params)
    }

    pub fn set_params(&self, params: JogKey) {
        *lock(&self.params) = params;
    }

    pub fn carousel_angle(&self) -> Option<f64> {
        lock(&self.carousel).current()
    }

    pub fn cache(&self) -> &ProgramCache {
        &self.cache
    }

    /// Generate the program for `cmd`, updating the carousel angle if the
    /// command moves the carousel.
    pub fn issue(&self, cmd: CommandId) -> Result<Arc<str>> {
        let key = self.params();
        match cmd {
            CommandId::Pen(..) | CommandId::Home => {
                let mut carousel = lock(&self.carousel);
                let text: Arc<str> = dynamic_program(cmd, &mut carousel, self.pen_feed)?
                    .to_string()
                    .into();
                lock(&self.latest).insert(cmd, Arc::clone(&text));
                Ok(text)
            }
            CommandId::Carousel(rotation) => {
                let text = self.cache.get(key, cmd)?;
                let angle = lock(&self.carousel).apply_relative_jog(rotation.sign() * key.step);
                log::debug!("manual carousel jog, angle now {angle:?}");
                Ok(text)
            }
            CommandId::Cord(_) => self.cache.get(key, cmd),
        }
    }

    /// The program to hand out for `cmd`: the latest one for dynamic
    /// commands, and the one for the current jog parameters otherwise.
    pub fn program(&self, cmd: CommandId) -> Result<Arc<str>> {
        if cmd.is_dynamic() {
            lock(&self.latest)
                .get(&cmd)
                .cloned()
                .ok_or(Error::NotGenerated(cmd))
        } else {
            self.cache.get(self.params(), cmd)
        }
    }

    pub fn program_by_name(&self, name: &str) -> Result<Arc<str>> {
        self.program(name.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use scribit_protocol::{CordJog, PenAction, PenSlot, Rotation};

    use super::*;

    fn pen(n: u8, action: PenAction) -> CommandId {
        CommandId::Pen(PenSlot::new(n).unwrap(), action)
    }

    #[test]
    fn pen_select_depends_on_carousel() {
        let session = JogSession::new(JogKey::new(2.0, 900));
        session.issue(CommandId::Home).unwrap();
        session.issue(pen(4, PenAction::Up)).unwrap();

        let first = session.issue(pen(1, PenAction::Down)).unwrap();
        assert_eq!(
            &*first,
            "G21\nG91\nM17\nG90\nG1 Z449.000 F2000\nG91\nG101\nG101\nG101\n"
        );
        assert_eq!(session.carousel_angle(), Some(449.0));

        // A manual jog past the slot makes the next select go around again.
        session.set_params(JogKey::new(10.0, 900));
        session.issue(CommandId::Carousel(Rotation::Ccw)).unwrap();
        assert_eq!(session.carousel_angle(), Some(459.0));
        let second = session.issue(pen(1, PenAction::Down)).unwrap();
        assert_ne!(first, second);
        assert_eq!(session.carousel_angle(), Some(809.0));

        // Dynamic commands never went through the cache.
        assert_eq!(session.cache().len(), 1);
    }

    #[test]
    fn serving() {
        let session = JogSession::new(JogKey::new(2.0, 900));
        assert_eq!(
            session.program_by_name("P2_DOWN"),
            Err(Error::NotGenerated(pen(2, PenAction::Down)))
        );
        assert_eq!(
            session.program_by_name("P9_DOWN"),
            Err(Error::UnknownCommand("P9_DOWN".to_owned()))
        );

        let issued = session.issue(pen(2, PenAction::Down)).unwrap();
        assert_eq!(session.program_by_name("P2_DOWN").unwrap(), issued);

        let jog = session.program_by_name("L_IN").unwrap();
        assert_eq!(&*jog, "G21\nG91\nM17\nG1 X-2.000 Y-0.000 F900\n");
        assert_eq!(session.issue(CommandId::Cord(CordJog::LeftIn)).unwrap(), jog);
        assert_eq!(session.cache().computations(), 1);
    }

    #[test]
    fn unhomed_carousel_jog_is_untracked() {
        let session = JogSession::new(JogKey::new(30.0, 900));
        session.issue(CommandId::Carousel(Rotation::Cw)).unwrap();
        assert_eq!(session.carousel_angle(), None);
    }

    #[test]
    fn input_and_server_loops() {
        let session = JogSession::new(JogKey::new(2.0, 900));
        session.issue(CommandId::Home).unwrap();

        std::thread::scope(|s| {
            s.spawn(|| {
                for i in 0..200u8 {
                    let n = i % 4 + 1;
                    session.issue(pen(n, PenAction::Up)).unwrap();
                }
            });
            s.spawn(|| {
                let mut last = f64::NEG_INFINITY;
                for _ in 0..200 {
                    let angle = session.carousel_angle().unwrap();
                    assert!(angle >= last);
                    last = angle;
                    session.program_by_name("BOTH_OUT").unwrap();
                }
            });
        });

        // 200 selects cycling 1..4 starting from home: 50 full turns, ending on slot 4.
        assert_eq!(session.carousel_angle(), Some(305.0 + 49.0 * 360.0));
    }
}
