use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::metrics::rate;
use crate::rest::{ConnectionsResponse, RawConnection};

/// A connection row with throughput derived from the previous poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStats {
    pub raw: RawConnection,
    pub inbps: f64,
    pub outbps: f64,
}

/// Keeps the last connection table and when it was taken, so the next table
/// can be turned into rates.
#[derive(Debug, Default)]
pub struct ConnectionSampler {
    previous: HashMap<String, RawConnection>,
    sampled_at: Option<DateTime<Utc>>,
}

impl ConnectionSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive rates for `current` against the retained sample, then retain
    /// `current`. Peers missing from `current` are forgotten.
    pub fn sample(
        &mut self,
        current: ConnectionsResponse,
        now: DateTime<Utc>,
    ) -> HashMap<String, ConnectionStats> {
        let elapsed_secs = self
            .sampled_at
            .map(|prev| now.signed_duration_since(prev).num_milliseconds() as f64 / 1000.0)
            .unwrap_or(0.0);

        let stats = current
            .iter()
            .map(|(node_id, raw)| {
                let prev = self.previous.get(node_id);
                let stats = ConnectionStats {
                    inbps: rate(
                        prev.map(|p| p.in_bytes_total),
                        raw.in_bytes_total,
                        elapsed_secs,
                    ),
                    outbps: rate(
                        prev.map(|p| p.out_bytes_total),
                        raw.out_bytes_total,
                        elapsed_secs,
                    ),
                    raw: raw.clone(),
                };
                (node_id.clone(), stats)
            })
            .collect();

        self.previous = current;
        self.sampled_at = Some(now);
        stats
    }

    /// Forget everything, as after a daemon restart.
    pub fn reset(&mut self) {
        self.previous.clear();
        self.sampled_at = None;
    }
}
