use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::form::{InputDraft, SubmitSink};
use crate::sample::{ParseError, TelemetrySample};

/// Telemetry units to pixels.
pub const PIXELS_PER_UNIT: f64 = 30.0;
/// Points kept from the previous series before each append.
pub const SERIES_RETAIN: usize = 100;
pub const SERIES_CAPACITY: usize = SERIES_RETAIN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x_px: f64,
    pub y_px: f64,
    pub z: f64,
}

impl Position {
    pub fn from_sample(sample: &TelemetrySample) -> Self {
        Self {
            x_px: sample.x * PIXELS_PER_UNIT,
            y_px: sample.y * PIXELS_PER_UNIT,
            z: sample.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AltitudePoint {
    pub time: DateTime<Utc>,
    pub altitude: f64,
}

/// Sliding window of altitude points in arrival order.
#[derive(Debug, Clone, Default)]
pub struct AltitudeSeries {
    points: VecDeque<AltitudePoint>,
}

impl AltitudeSeries {
    /// Keep the last `SERIES_RETAIN` points, then append.
    pub fn push(&mut self, point: AltitudePoint) {
        while self.points.len() > SERIES_RETAIN {
            self.points.pop_front();
        }
        self.points.push_back(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AltitudePoint> {
        self.points.iter()
    }

    pub fn oldest(&self) -> Option<&AltitudePoint> {
        self.points.front()
    }

    pub fn latest(&self) -> Option<&AltitudePoint> {
        self.points.back()
    }

    /// Altitude range over the window, `None` when empty.
    pub fn altitude_range(&self) -> Option<(f64, f64)> {
        let mut it = self.points.iter().map(|p| p.altitude);
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), a| (lo.min(a), hi.max(a))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Outcome of feeding one message into the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Updated,
    /// Arrived while disconnected; state untouched.
    Dropped,
}

/// View model: owns every piece of state the rendered surface is computed from.
#[derive(Debug, Clone)]
pub struct TelemetryView {
    link: LinkState,
    opened: bool,
    position: Position,
    altitude: AltitudeSeries,
    draft: InputDraft,
    last_sample: Option<TelemetrySample>,
    samples_applied: u64,
}

impl Default for TelemetryView {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryView {
    pub fn new() -> Self {
        Self {
            link: LinkState::Disconnected,
            opened: false,
            position: Position::default(),
            altitude: AltitudeSeries::default(),
            draft: InputDraft::default(),
            last_sample: None,
            samples_applied: 0,
        }
    }

    /// Mount. Only the first call connects; there is no reconnect.
    pub fn open(&mut self) -> bool {
        if self.opened {
            return false;
        }
        self.opened = true;
        self.link = LinkState::Connected;
        debug!("telemetry view connected");
        true
    }

    /// Teardown. Returns true only for the call that actually released the link.
    pub fn close(&mut self) -> bool {
        if self.link == LinkState::Disconnected {
            return false;
        }
        self.link = LinkState::Disconnected;
        debug!(samples = self.samples_applied, "telemetry view closed");
        true
    }

    /// The remote side went away. Silent; the view keeps its last state.
    pub fn link_lost(&mut self) {
        self.link = LinkState::Disconnected;
    }

    pub fn link_state(&self) -> LinkState {
        self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link == LinkState::Connected
    }

    /// Decode and apply one text frame. Frames arriving after close are
    /// dropped without being decoded.
    pub fn ingest(&mut self, frame: &str, now: DateTime<Utc>) -> Result<Applied, ParseError> {
        if !self.is_connected() {
            return Ok(Applied::Dropped);
        }
        let sample = TelemetrySample::decode(frame)?;
        Ok(self.apply_sample(sample, now))
    }

    /// Replace the position and append to the altitude window in one step.
    pub fn apply_sample(&mut self, sample: TelemetrySample, now: DateTime<Utc>) -> Applied {
        if !self.is_connected() {
            return Applied::Dropped;
        }
        self.position = Position::from_sample(&sample);
        self.altitude.push(AltitudePoint { time: now, altitude: sample.z });
        self.last_sample = Some(sample);
        self.samples_applied += 1;
        Applied::Updated
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn altitude(&self) -> &AltitudeSeries {
        &self.altitude
    }

    pub fn last_sample(&self) -> Option<TelemetrySample> {
        self.last_sample
    }

    pub fn samples_applied(&self) -> u64 {
        self.samples_applied
    }

    pub fn draft(&self) -> &InputDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut InputDraft {
        &mut self.draft
    }

    /// Hand the draft to `sink`. Touches no view state and keeps the draft.
    pub fn submit(&self, sink: &mut dyn SubmitSink) {
        sink.submitted(self.draft.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn mounted() -> TelemetryView {
        let mut v = TelemetryView::new();
        assert!(v.open());
        v
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl SubmitSink for Recorder {
        fn submitted(&mut self, value: &str) {
            self.0.push(value.to_string());
        }
    }

    #[test]
    fn starts_disconnected_with_zero_state() {
        let v = TelemetryView::new();
        assert_eq!(v.link_state(), LinkState::Disconnected);
        assert_eq!(v.position(), Position::default());
        assert!(v.altitude().is_empty());
        assert!(v.draft().is_empty());
    }

    #[test]
    fn position_is_scaled_exactly() {
        let mut v = mounted();
        v.apply_sample(TelemetrySample::new(0.1, -7.3, 1234.5678), t0());
        let p = v.position();
        assert_eq!(p.x_px, 0.1 * 30.0);
        assert_eq!(p.y_px, -7.3 * 30.0);
        assert_eq!(p.z, 1234.5678);
    }

    #[test]
    fn series_length_is_min_of_n_and_capacity() {
        for n in [0usize, 1, 50, 100, 101, 102, 250] {
            let mut v = mounted();
            for i in 0..n {
                let t = t0() + Duration::milliseconds(i as i64);
                v.apply_sample(TelemetrySample::new(0.0, 0.0, i as f64), t);
            }
            assert_eq!(v.altitude().len(), n.min(SERIES_CAPACITY), "n = {}", n);
        }
    }

    #[test]
    fn series_stays_in_processing_order() {
        let mut v = mounted();
        for i in 0..150 {
            let t = t0() + Duration::milliseconds(i * 10);
            v.apply_sample(TelemetrySample::new(1.0, 1.0, 0.0), t);
        }
        let times: Vec<_> = v.altitude().iter().map(|p| p.time).collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn replaying_a_sample_appends_twice() {
        let mut v = mounted();
        let s = TelemetrySample::new(2.0, 3.0, 4.0);
        v.apply_sample(s, t0());
        let first = v.position();
        v.apply_sample(s, t0());
        assert_eq!(v.position(), first);
        assert_eq!(v.altitude().len(), 2);
    }

    #[test]
    fn first_drop_happens_after_window_fills() {
        let mut v = mounted();
        for i in 1..=101 {
            v.apply_sample(TelemetrySample::new(0.0, 0.0, i as f64), t0() + Duration::seconds(i));
        }
        assert_eq!(v.altitude().len(), 101);
        assert_eq!(v.altitude().oldest().unwrap().altitude, 1.0);

        v.apply_sample(TelemetrySample::new(0.0, 0.0, 102.0), t0() + Duration::seconds(102));
        let alts: Vec<f64> = v.altitude().iter().map(|p| p.altitude).collect();
        assert_eq!(alts.len(), 101);
        assert_eq!(alts[0], 2.0);
        assert_eq!(alts[100], 102.0);
    }

    #[test]
    fn mount_ingest_teardown_scenario() {
        let mut v = mounted();
        assert_eq!(v.ingest(r#"{"x":1,"y":2,"z":3}"#, t0()), Ok(Applied::Updated));
        assert_eq!(v.position(), Position { x_px: 30.0, y_px: 60.0, z: 3.0 });
        assert_eq!(v.altitude().len(), 1);

        for z in 4..=103 {
            let frame = format!(r#"{{"x":0,"y":0,"z":{}}}"#, z);
            v.ingest(&frame, t0() + Duration::seconds(z)).unwrap();
        }
        assert_eq!(v.altitude().len(), 101);
        assert_eq!(v.altitude().oldest().unwrap().altitude, 3.0);

        v.ingest(r#"{"x":0,"y":0,"z":104}"#, t0() + Duration::seconds(104)).unwrap();
        assert_eq!(v.altitude().len(), 101);
        assert_eq!(v.altitude().oldest().unwrap().altitude, 4.0);

        assert!(v.close());
        assert!(!v.close());

        let before = (v.position(), v.altitude().len(), v.samples_applied());
        assert_eq!(v.ingest(r#"{"x":9,"y":9,"z":9}"#, t0()), Ok(Applied::Dropped));
        assert_eq!(before, (v.position(), v.altitude().len(), v.samples_applied()));
    }

    #[test]
    fn malformed_frame_leaves_state_untouched() {
        let mut v = mounted();
        v.apply_sample(TelemetrySample::new(1.0, 1.0, 1.0), t0());
        let err = v.ingest(r#"{"x":1,"y":1}"#, t0()).unwrap_err();
        assert_eq!(err, ParseError::MissingField("z"));
        assert_eq!(v.altitude().len(), 1);
        assert_eq!(v.samples_applied(), 1);
    }

    #[test]
    fn frames_after_close_are_not_even_decoded() {
        let mut v = mounted();
        v.close();
        assert_eq!(v.ingest("not json", t0()), Ok(Applied::Dropped));
    }

    #[test]
    fn no_reopen_after_teardown_or_loss() {
        let mut v = mounted();
        assert!(!v.open());
        v.link_lost();
        assert_eq!(v.link_state(), LinkState::Disconnected);
        assert!(!v.open());
        assert!(!v.close());
    }

    #[test]
    fn submit_logs_once_and_keeps_everything() {
        let mut v = mounted();
        v.apply_sample(TelemetrySample::new(1.0, 2.0, 3.0), t0());
        v.draft_mut().set("abc");
        let pos = v.position();

        let mut sink = Recorder::default();
        v.submit(&mut sink);

        assert_eq!(sink.0, vec!["abc".to_string()]);
        assert_eq!(v.draft().as_str(), "abc");
        assert_eq!(v.position(), pos);
        assert_eq!(v.altitude().len(), 1);
    }

    #[test]
    fn altitude_range_spans_window() {
        let mut v = mounted();
        assert_eq!(v.altitude().altitude_range(), None);
        for z in [5.0, -2.0, 11.0, 3.0] {
            v.apply_sample(TelemetrySample::new(0.0, 0.0, z), t0());
        }
        assert_eq!(v.altitude().altitude_range(), Some((-2.0, 11.0)));
    }
}
