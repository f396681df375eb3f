//! Best-effort arrival fan-out.

use futures::future::join_all;
use tracing::warn;

use crate::kmb::{EtaDto, KmbError, KmbSource};

/// Arrival predictions for one stop, or the error fetching them.
#[derive(Debug)]
pub struct StopArrivals {
    pub stop_id: String,
    pub result: Result<Vec<EtaDto>, KmbError>,
}

impl StopArrivals {
    /// Arrivals if the fetch succeeded.
    pub fn arrivals(&self) -> Option<&[EtaDto]> {
        self.result.as_deref().ok()
    }
}

/// Fetch arrivals for every stop concurrently.
///
/// One result per input stop, in input order. A failed stop is logged and
/// carried as an error; it never cancels or fails its siblings.
pub async fn fetch_arrivals<S, I>(source: &S, stop_ids: I) -> Vec<StopArrivals>
where
    S: KmbSource,
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let futures = stop_ids.into_iter().map(|id| {
        let stop_id = id.as_ref().to_string();
        async move {
            let result = source.fetch_stop_eta(&stop_id).await;
            if let Err(e) = &result {
                warn!(stop_id = %stop_id, error = %e, "Failed to fetch arrivals");
            }
            StopArrivals { stop_id, result }
        }
    });

    join_all(futures).await
}
