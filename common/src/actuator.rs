use log::info;

use crate::{
    display::{self, LINE_STATUS},
    hal::{Clock, Display, OutputLine},
    types::{ActuatorCommand, Direction},
};

/// Drives the widen and narrow lines with blocking, non-overlapping pulses.
#[derive(Debug)]
pub struct ActuatorDriver<O> {
    widen: O,
    narrow: O,
    pulses: u64,
}

impl<O: OutputLine> ActuatorDriver<O> {
    pub fn new(mut widen: O, mut narrow: O) -> Self {
        widen.set_active(false);
        narrow.set_active(false);
        Self {
            widen,
            narrow,
            pulses: 0,
        }
    }

    pub fn fire<C: Clock, D: Display>(
        &mut self,
        direction: Direction,
        duration_ms: u64,
        clock: &mut C,
        screen: &mut D,
    ) {
        screen.write(LINE_STATUS, 0, &display::relay_line(direction, duration_ms));
        info!("pulse {} for {duration_ms} ms", direction.as_str());

        let line = match direction {
            Direction::Widen => &mut self.widen,
            Direction::Narrow => &mut self.narrow,
        };
        line.set_active(true);
        clock.sleep_ms(duration_ms);
        line.set_active(false);

        self.pulses = self.pulses.saturating_add(1);
    }

    pub fn execute<C: Clock, D: Display>(
        &mut self,
        command: ActuatorCommand,
        clock: &mut C,
        screen: &mut D,
    ) {
        match command.action.direction() {
            Some(direction) => self.fire(direction, command.duration_ms, clock, screen),
            None => screen.write(LINE_STATUS, 0, &display::hold_line()),
        }
    }

    pub fn pulse_count(&self) -> u64 {
        self.pulses
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::types::Action;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Line {
        name: &'static str,
        log: Log,
    }

    impl OutputLine for Line {
        fn set_active(&mut self, active: bool) {
            self.log
                .borrow_mut()
                .push(format!("{}={}", self.name, if active { "on" } else { "off" }));
        }
    }

    struct Clk(Log);

    impl Clock for Clk {
        fn now_ms(&self) -> u64 {
            0
        }

        fn sleep_ms(&mut self, ms: u64) {
            self.0.borrow_mut().push(format!("sleep {ms}"));
        }
    }

    struct Screen(Log);

    impl Display for Screen {
        fn write(&mut self, line: u8, _column: u8, text: &str) {
            self.0.borrow_mut().push(format!("{line}:{}", text.trim_end()));
        }
    }

    fn rig() -> (ActuatorDriver<Line>, Clk, Screen, Log) {
        let log: Log = Rc::default();
        let driver = ActuatorDriver::new(
            Line {
                name: "widen",
                log: log.clone(),
            },
            Line {
                name: "narrow",
                log: log.clone(),
            },
        );
        log.borrow_mut().clear();
        (driver, Clk(log.clone()), Screen(log.clone()), log)
    }

    #[test]
    fn fire_holds_selected_line_for_duration() {
        let (mut driver, mut clock, mut screen, log) = rig();

        driver.fire(Direction::Narrow, 100, &mut clock, &mut screen);

        assert_eq!(
            *log.borrow(),
            vec![
                "3:Relay CLOSE 100ms".to_string(),
                "narrow=on".to_string(),
                "sleep 100".to_string(),
                "narrow=off".to_string(),
            ]
        );
        assert_eq!(driver.pulse_count(), 1);
    }

    #[test]
    fn execute_widen_uses_widen_line() {
        let (mut driver, mut clock, mut screen, log) = rig();

        driver.execute(
            ActuatorCommand {
                action: Action::Widen,
                duration_ms: 2_000,
            },
            &mut clock,
            &mut screen,
        );

        let log = log.borrow();
        assert!(log.contains(&"widen=on".to_string()));
        assert!(log.contains(&"sleep 2000".to_string()));
        assert!(!log.iter().any(|entry| entry.starts_with("narrow")));
    }

    #[test]
    fn execute_hold_only_updates_status() {
        let (mut driver, mut clock, mut screen, log) = rig();

        driver.execute(ActuatorCommand::hold(), &mut clock, &mut screen);

        assert_eq!(*log.borrow(), vec!["3:Relay HOLD".to_string()]);
        assert_eq!(driver.pulse_count(), 0);
    }

    #[test]
    fn new_forces_lines_inactive() {
        let log: Log = Rc::default();
        let _driver = ActuatorDriver::new(
            Line {
                name: "widen",
                log: log.clone(),
            },
            Line {
                name: "narrow",
                log: log.clone(),
            },
        );

        assert_eq!(
            *log.borrow(),
            vec!["widen=off".to_string(), "narrow=off".to_string()]
        );
    }
}
