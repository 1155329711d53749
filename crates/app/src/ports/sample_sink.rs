//! Sample sink port — where metric producers deliver their readings.

use std::future::Future;
use std::sync::Arc;

use relayhub_domain::rule::Sample;

/// Accepts metric samples tagged by source (e.g. `relay_1`, `environmental`).
pub trait SampleSink: Send + Sync {
    /// Deliver one sample. Never fails from the producer's point of view.
    fn ingest(&self, source: &str, sample: &Sample) -> impl Future<Output = ()> + Send;
}

impl<T: SampleSink> SampleSink for Arc<T> {
    fn ingest(&self, source: &str, sample: &Sample) -> impl Future<Output = ()> + Send {
        (**self).ingest(source, sample)
    }
}
