use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use dronewatch_core::{Applied, LogSink, ParseError, SubmitSink, TelemetryView};
use dronewatch_link::LinkEvent;
use tracing::{info, warn};

use crate::config::ParsePolicy;

/// What the run loop should do after an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Redraw,
    Quit,
}

/// Routes link and keyboard events into the view model.
pub struct Controller {
    view: TelemetryView,
    policy: ParsePolicy,
    sink: Box<dyn SubmitSink + Send>,
}

impl Controller {
    pub fn new(policy: ParsePolicy) -> Self {
        Self::with_sink(policy, Box::new(LogSink))
    }

    pub fn with_sink(policy: ParsePolicy, sink: Box<dyn SubmitSink + Send>) -> Self {
        Self { view: TelemetryView::new(), policy, sink }
    }

    pub fn view(&self) -> &TelemetryView {
        &self.view
    }

    pub fn mount(&mut self) -> bool {
        self.view.open()
    }

    pub fn teardown(&mut self) -> bool {
        self.view.close()
    }

    /// `None` means the link's channel is gone, same as a remote close.
    pub fn on_link_event(
        &mut self,
        event: Option<LinkEvent>,
        now: DateTime<Utc>,
    ) -> Result<Control, ParseError> {
        match event {
            Some(LinkEvent::Frame(text)) => match self.view.ingest(&text, now) {
                Ok(Applied::Updated) => Ok(Control::Redraw),
                Ok(Applied::Dropped) => Ok(Control::Continue),
                Err(err) => match self.policy {
                    ParsePolicy::Fail => Err(err),
                    ParsePolicy::Drop => {
                        warn!(error = %err, frame = %text, "dropping malformed telemetry frame");
                        Ok(Control::Continue)
                    }
                },
            },
            Some(LinkEvent::Closed) | None => {
                if self.view.is_connected() {
                    info!(samples = self.view.samples_applied(), "telemetry source went away");
                }
                self.view.link_lost();
                Ok(Control::Redraw)
            }
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.kind != KeyEventKind::Press {
            return Control::Continue;
        }
        match key.code {
            KeyCode::Esc => Control::Quit,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Control::Quit,
            KeyCode::Enter => {
                self.view.submit(self.sink.as_mut());
                Control::Continue
            }
            KeyCode::Backspace => {
                self.view.draft_mut().pop();
                Control::Redraw
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.view.draft_mut().push(c);
                Control::Redraw
            }
            _ => Control::Continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use dronewatch_core::{LinkState, Position};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl SubmitSink for Recorder {
        fn submitted(&mut self, value: &str) {
            self.0.lock().unwrap().push(value.to_string());
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn frame(text: &str) -> Option<LinkEvent> {
        Some(LinkEvent::Frame(text.to_string()))
    }

    fn mounted(policy: ParsePolicy) -> Controller {
        let mut c = Controller::new(policy);
        assert!(c.mount());
        c
    }

    #[test]
    fn valid_frame_updates_and_redraws() {
        let mut c = mounted(ParsePolicy::Fail);
        assert_eq!(c.on_link_event(frame(r#"{"x":1,"y":2,"z":3}"#), now()), Ok(Control::Redraw));
        assert_eq!(c.view().position(), Position { x_px: 30.0, y_px: 60.0, z: 3.0 });
    }

    #[test]
    fn fail_policy_surfaces_parse_errors() {
        let mut c = mounted(ParsePolicy::Fail);
        let err = c.on_link_event(frame("garbage"), now()).unwrap_err();
        assert!(matches!(err, ParseError::Malformed(_)));
    }

    #[test]
    fn drop_policy_skips_bad_frames() {
        let mut c = mounted(ParsePolicy::Drop);
        let bad = frame(r#"{"x":"a","y":2,"z":3}"#);
        assert_eq!(c.on_link_event(bad, now()), Ok(Control::Continue));
        assert_eq!(c.on_link_event(frame(r#"{"x":1,"y":2,"z":3}"#), now()), Ok(Control::Redraw));
        assert_eq!(c.view().altitude().len(), 1);
    }

    #[test]
    fn remote_close_disconnects_silently() {
        let mut c = mounted(ParsePolicy::Fail);
        c.on_link_event(frame(r#"{"x":1,"y":1,"z":1}"#), now()).unwrap();
        assert_eq!(c.on_link_event(Some(LinkEvent::Closed), now()), Ok(Control::Redraw));
        assert_eq!(c.view().link_state(), LinkState::Disconnected);
        assert_eq!(c.on_link_event(frame(r#"{"x":5,"y":5,"z":5}"#), now()), Ok(Control::Continue));
        assert_eq!(c.view().position().z, 1.0);
    }

    #[test]
    fn typing_and_submitting() {
        let rec = Recorder::default();
        let mut c = Controller::with_sink(ParsePolicy::Fail, Box::new(rec.clone()));
        c.mount();

        for ch in "abx".chars() {
            assert_eq!(c.on_key(key(KeyCode::Char(ch))), Control::Redraw);
        }
        c.on_key(key(KeyCode::Backspace));
        c.on_key(key(KeyCode::Char('c')));
        assert_eq!(c.on_key(key(KeyCode::Enter)), Control::Continue);

        assert_eq!(*rec.0.lock().unwrap(), vec!["abc".to_string()]);
        assert_eq!(c.view().draft().as_str(), "abc");
        assert!(c.view().altitude().is_empty());
        assert_eq!(c.view().position(), Position::default());
    }

    #[test]
    fn quit_keys() {
        let mut c = mounted(ParsePolicy::Fail);
        assert_eq!(c.on_key(key(KeyCode::Esc)), Control::Quit);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(c.on_key(ctrl_c), Control::Quit);
        assert!(c.view().draft().is_empty());
    }

    #[test]
    fn teardown_happens_once() {
        let mut c = mounted(ParsePolicy::Fail);
        assert!(c.teardown());
        assert!(!c.teardown());
    }
}
