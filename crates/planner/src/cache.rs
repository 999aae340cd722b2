use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use scribit_protocol::{CommandId, JogKey};

use crate::{lock, program::static_program, Error, Result};

/// Memoized program text for the static jog commands.
///
/// The key space is small (a handful of step and feed choices times a
/// handful of commands), so entries are never evicted.
#[derive(Debug, Default)]
pub struct ProgramCache {
    // A single lock around the whole lookup-or-compute, so concurrent
    // misses on the same key compute the program only once.
    programs: Mutex<HashMap<(JogKey, CommandId), Arc<str>>>,
    computations: AtomicUsize,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The program text for a static command.
    ///
    /// Pen selection and homing depend on the carousel angle, so asking for
    /// them here is an error.
    pub fn get(&self, key: JogKey, cmd: CommandId) -> Result<Arc<str>> {
        if cmd.is_dynamic() {
            return Err(Error::DynamicCommand(cmd));
        }

        let mut programs = lock(&self.programs);
        if let Some(text) = programs.get(&(key, cmd)) {
            return Ok(Arc::clone(text));
        }

        log::debug!("building {cmd} for step={} feed={}", key.step, key.feed);
        let text: Arc<str> = static_program(key, cmd)?.to_string().into();
        self.computations.fetch_add(1, Ordering::Relaxed);
        programs.insert((key, cmd), Arc::clone(&text));
        Ok(text)
    }

    /// How many programs have been built so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        lock(&self.programs).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use scribit_protocol::{CordJog, PenAction, PenSlot, Rotation};

    use super::*;

    #[test]
    fn computes_once() {
        let cache = ProgramCache::new();
        let key = JogKey::new(2.0, 900);
        let cmd = CommandId::Cord(CordJog::LeftOut);

        let a = cache.get(key, cmd).unwrap();
        let b = cache.get(JogKey::new(2.0, 900), cmd).unwrap();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.computations(), 1);

        cache.get(JogKey::new(5.0, 900), cmd).unwrap();
        cache.get(key, CommandId::Carousel(Rotation::Ccw)).unwrap();
        assert_eq!(cache.computations(), 3);
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn rejects_dynamic_commands() {
        let cache = ProgramCache::new();
        let key = JogKey::new(2.0, 900);
        let pen = CommandId::Pen(PenSlot::new(1).unwrap(), PenAction::Down);
        assert_eq!(cache.get(key, pen), Err(Error::DynamicCommand(pen)));
        assert_eq!(
            cache.get(key, CommandId::Home),
            Err(Error::DynamicCommand(CommandId::Home))
        );
        assert!(cache.is_empty());
        assert_eq!(cache.computations(), 0);
    }

    #[test]
    fn concurrent_misses() {
        let cache = ProgramCache::new();
        let keys = [JogKey::new(1.0, 600), JogKey::new(2.0, 900)];
        let cmds: Vec<CommandId> = CommandId::all().filter(|c| !c.is_dynamic()).collect();

        let results: Vec<Vec<Arc<str>>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        let mut out = Vec::new();
                        for key in keys {
                            for &cmd in &cmds {
                                out.push(cache.get(key, cmd).unwrap());
                            }
                        }
                        out
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.computations(), keys.len() * cmds.len());
        for r in &results[1..] {
            assert_eq!(r, &results[0]);
        }
    }
}
