pub mod endpoint;
pub mod form;
pub mod sample;
pub mod view;

pub use endpoint::*;
pub use form::{InputDraft, LogSink, SubmitSink};
pub use sample::{ParseError, TelemetrySample};
pub use view::{
    AltitudePoint, AltitudeSeries, Applied, LinkState, Position, TelemetryView, PIXELS_PER_UNIT,
    SERIES_CAPACITY, SERIES_RETAIN,
};
