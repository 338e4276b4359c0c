use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("chatterbox.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter =
    Counter::new("chatterbox.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("chatterbox.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("chatterbox.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("chatterbox.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("chatterbox.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("chatterbox.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("chatterbox.stream.duration_seconds");

pub(crate) static SESSIONS_PROMOTED: Counter = Counter::new("chatterbox.sessions.promoted");
pub(crate) static SESSIONS_DELETED: Counter = Counter::new("chatterbox.sessions.deleted");
pub(crate) static SENDS_REJECTED_BUSY: Counter = Counter::new("chatterbox.sends.rejected_busy");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&SESSIONS_PROMOTED);
    collector.register_counter(&SESSIONS_DELETED);
    collector.register_counter(&SENDS_REJECTED_BUSY);
}
