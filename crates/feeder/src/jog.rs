//! Interactive jogging from the keyboard.

use std::sync::Arc;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use futures::StreamExt;
use scribit_planner::JogSession;
use scribit_protocol::{CommandId, CordJog, JogKey, PenAction, PenSlot, Rotation};

use crate::mqtt::Robot;

pub const STEP_CHOICES: [f64; 11] = [
    0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 50.0, 72.0, 90.0, 100.0, 200.0,
];
pub const FEED_CHOICES: [u32; 6] = [600, 900, 1200, 1800, 2400, 3000];

const HELP: &str = "\
Arrows / WASD : up = both in, down = both out, left = leftish, right = rightish\r
Q / E         : left cord in / out\r
Z / C         : right cord in / out\r
J / K         : carousel CCW / CW by step\r
1 2 3 4       : pen 1-4 down\r
! @ # $       : pen 1-4 up\r
H             : home the carousel\r
[ / ]         : step down / up\r
- / =         : feed down / up\r
X             : stop\r
Esc / Ctrl-G  : quit\r
";

/// A fixed list of choices, and the current one.
#[derive(Clone, Debug)]
pub struct Ladder<T: 'static> {
    choices: &'static [T],
    idx: usize,
}

impl<T: Copy + Into<f64>> Ladder<T> {
    /// Starts at the choice closest to `initial`.
    pub fn new(choices: &'static [T], initial: f64) -> Self {
        let idx = choices
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                let da = ((**a).into() - initial).abs();
                let db = ((**b).into() - initial).abs();
                da.total_cmp(&db)
            })
            .map_or(0, |(i, _)| i);
        Ladder { choices, idx }
    }

    pub fn get(&self) -> T {
        self.choices[self.idx]
    }

    pub fn up(&mut self) {
        self.idx = (self.idx + 1).min(self.choices.len() - 1);
    }

    pub fn down(&mut self) {
        self.idx = self.idx.saturating_sub(1);
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Issue(CommandId),
    StepDown,
    StepUp,
    FeedDown,
    FeedUp,
    Reset,
    Quit,
}

fn pen(n: u8, action: PenAction) -> Option<Action> {
    let slot = PenSlot::new(n).ok()?;
    Some(Action::Issue(CommandId::Pen(slot, action)))
}

pub fn action_for(key: &KeyEvent) -> Option<Action> {
    use CordJog::*;

    let cord = |jog| Some(Action::Issue(CommandId::Cord(jog)));
    match key.code {
        KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char('g') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Up => cord(BothIn),
        KeyCode::Down => cord(BothOut),
        KeyCode::Left => cord(Leftish),
        KeyCode::Right => cord(Rightish),
        KeyCode::Char(c) => match c {
            'w' | 'W' => cord(BothIn),
            's' | 'S' => cord(BothOut),
            'a' | 'A' => cord(Leftish),
            'd' | 'D' => cord(Rightish),
            'q' | 'Q' => cord(LeftIn),
            'e' | 'E' => cord(LeftOut),
            'z' | 'Z' => cord(RightIn),
            'c' | 'C' => cord(RightOut),
            'j' | 'J' => Some(Action::Issue(CommandId::Carousel(Rotation::Ccw))),
            'k' | 'K' => Some(Action::Issue(CommandId::Carousel(Rotation::Cw))),
            '1'..='4' => pen(c as u8 - b'0', PenAction::Down),
            '!' => pen(1, PenAction::Up),
            '@' => pen(2, PenAction::Up),
            '#' => pen(3, PenAction::Up),
            '$' => pen(4, PenAction::Up),
            'H' => Some(Action::Issue(CommandId::Home)),
            '[' => Some(Action::StepDown),
            ']' => Some(Action::StepUp),
            '-' => Some(Action::FeedDown),
            '=' => Some(Action::FeedUp),
            'x' | 'X' => Some(Action::Reset),
            _ => None,
        },
        _ => None,
    }
}

fn status(msg: &str) {
    eprint!("{msg}\r\n");
}

async fn input_loop(
    session: &JogSession,
    robot: &Robot,
    mut step: Ladder<f64>,
    mut feed: Ladder<u32>,
) -> anyhow::Result<()> {
    let mut events = EventStream::new();
    while let Some(ev) = events.next().await.transpose()? {
        let Event::Key(ev) = ev else {
            continue;
        };
        if ev.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = action_for(&ev) else {
            continue;
        };

        match action {
            Action::Quit => return Ok(()),
            Action::Reset => {
                robot.reset().await?;
                status("stop");
            }
            Action::StepDown => step.down(),
            Action::StepUp => step.up(),
            Action::FeedDown => feed.down(),
            Action::FeedUp => feed.up(),
            Action::Issue(cmd) => {
                if let Err(e) = session.issue(cmd) {
                    status(&format!("{cmd}: {e}"));
                    continue;
                }
                let payload = robot.run(cmd).await?;
                let params = session.params();
                status(&format!(
                    "{cmd}  step={} feed={}  payload={payload:?}",
                    params.step, params.feed
                ));
            }
        }

        if matches!(
            action,
            Action::StepDown | Action::StepUp | Action::FeedDown | Action::FeedUp
        ) {
            session.set_params(JogKey::new(step.get(), feed.get()));
            status(&format!("step={} feed={}", step.get(), feed.get()));
        }
    }
    Err(anyhow::anyhow!("event stream ended"))
}

/// Reads keys until the user quits. The terminal is in raw mode for the
/// duration.
pub async fn run(session: Arc<JogSession>, robot: &Robot) -> anyhow::Result<()> {
    let params = session.params();
    let step = Ladder::new(&STEP_CHOICES, params.step);
    let feed = Ladder::new(&FEED_CHOICES, params.feed as f64);
    session.set_params(JogKey::new(step.get(), feed.get()));

    let config = robot.config();
    eprintln!("HTTP health: http://{}/health", config.host_ip);
    eprintln!("robot: {}  suffix: ;{}", config.robot_id, config.suffix);
    eprintln!("step={} feed={}", step.get(), feed.get());
    eprint!("{HELP}");

    enable_raw_mode()?;
    let result = input_loop(&session, robot, step, feed).await;
    disable_raw_mode()?;

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn ladders() {
        let mut step = Ladder::new(&STEP_CHOICES, 3.0);
        assert_eq!(step.get(), 2.0);
        step.down();
        step.down();
        step.down();
        assert_eq!(step.get(), 0.5);

        let mut feed = Ladder::new(&FEED_CHOICES, 5000.0);
        assert_eq!(feed.get(), 3000);
        feed.up();
        assert_eq!(feed.get(), 3000);
        feed.down();
        assert_eq!(feed.get(), 2400);

        assert_eq!(Ladder::new(&FEED_CHOICES, 900.0).get(), 900);
        assert_eq!(Ladder::new(&STEP_CHOICES, 75.0).get(), 72.0);
    }

    #[test]
    fn keys() {
        let cord = |jog| Some(Action::Issue(CommandId::Cord(jog)));
        assert_eq!(action_for(&key(KeyCode::Up)), cord(CordJog::BothIn));
        assert_eq!(action_for(&key(KeyCode::Char('a'))), cord(CordJog::Leftish));
        assert_eq!(action_for(&key(KeyCode::Char('C'))), cord(CordJog::RightOut));
        assert_eq!(
            action_for(&key(KeyCode::Char('3'))),
            Some(Action::Issue(CommandId::Pen(PenSlot::new(3).unwrap(), PenAction::Down)))
        );
        assert_eq!(
            action_for(&key(KeyCode::Char('@'))),
            Some(Action::Issue(CommandId::Pen(PenSlot::new(2).unwrap(), PenAction::Up)))
        );
        assert_eq!(
            action_for(&key(KeyCode::Char('J'))),
            Some(Action::Issue(CommandId::Carousel(Rotation::Ccw)))
        );
        assert_eq!(action_for(&key(KeyCode::Char('H'))), Some(Action::Issue(CommandId::Home)));
        // Homing takes a deliberate shift.
        assert_eq!(action_for(&key(KeyCode::Char('h'))), None);
        assert_eq!(action_for(&key(KeyCode::Char(']'))), Some(Action::StepUp));
        assert_eq!(action_for(&key(KeyCode::Esc)), Some(Action::Quit));
        assert_eq!(
            action_for(&KeyEvent::new(KeyCode::Char('g'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(action_for(&key(KeyCode::Char('g'))), None);
        assert_eq!(action_for(&key(KeyCode::Char('5'))), None);
    }
}
