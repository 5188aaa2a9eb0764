use crate::destination::{point_topic, polygon_topic};
use crate::{Payload, Point, Polygon, PublishError, Publisher, SessionId};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;

pub const DEFAULT_POLYGON_THRESHOLD: usize = 4;

#[derive(Debug, Clone, Copy)]
pub struct AccumulatorConfig {
    /// Number of buffered points that completes a polygon.
    pub threshold: NonZeroUsize,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            threshold: NonZeroUsize::new(DEFAULT_POLYGON_THRESHOLD)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandlePointError {
    #[error("failed to broadcast point to {destination}: {source}")]
    PointBroadcast {
        destination: String,
        #[source]
        source: PublishError,
    },
    #[error("failed to publish polygon to {destination}: {source}")]
    PolygonBroadcast {
        destination: String,
        #[source]
        source: PublishError,
    },
}

type SessionBuffer = Arc<Mutex<Vec<Point>>>;

/// Groups the points of every drawing session into polygons.
///
/// Each session owns its own buffer lock, so sessions never wait on each
/// other. The table itself is sharded and only write-locked for the shard of
/// a session that is seen for the first time.
pub struct SessionAccumulator<P> {
    threshold: usize,
    sessions: DashMap<SessionId, SessionBuffer>,
    publisher: P,
}

impl<P: Publisher> SessionAccumulator<P> {
    pub fn new(config: AccumulatorConfig, publisher: P) -> Self {
        Self {
            threshold: config.threshold.get(),
            sessions: DashMap::new(),
            publisher,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Broadcasts `point` to the session and buffers it, publishing and
    /// resetting the buffer once it holds `threshold` points.
    ///
    /// When the polygon cannot be published the point is taken back out of
    /// the buffer, so the buffer is cleared exactly when a polygon went out.
    pub fn handle_point(&self, session_id: &str, point: Point) -> Result<(), HandlePointError> {
        log::debug!("New point for session {:?}: {:?}", session_id, point);

        let destination = point_topic(session_id);
        self.publisher
            .publish(&destination, Payload::Point(point))
            .map_err(|source| HandlePointError::PointBroadcast {
                destination,
                source,
            })?;

        let buffer = self.buffer(session_id);
        let mut points = buffer.lock();
        points.push(point);
        log::debug!("Session {:?} now has {} points", session_id, points.len());

        if points.len() < self.threshold {
            return Ok(());
        }

        let destination = polygon_topic(session_id);
        let polygon = Polygon::new(points.clone());
        log::info!(
            "Polygon of {} points complete for session {:?}",
            polygon.len(),
            session_id
        );
        if let Err(source) = self
            .publisher
            .publish(&destination, Payload::Polygon(polygon))
        {
            points.pop();
            return Err(HandlePointError::PolygonBroadcast {
                destination,
                source,
            });
        }
        points.clear();

        Ok(())
    }

    /// Number of points buffered for the session right now. Zero for a
    /// session that never received a point.
    pub fn point_count(&self, session_id: &str) -> usize {
        let buffer = match self.sessions.get(session_id) {
            Some(entry) => Arc::clone(entry.value()),
            None => return 0,
        };
        let len = buffer.lock().len();
        len
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // The shard guard is released before the caller locks the buffer.
    fn buffer(&self, session_id: &str) -> SessionBuffer {
        if let Some(entry) = self.sessions.get(session_id) {
            return Arc::clone(entry.value());
        }
        let entry = self
            .sessions
            .entry(session_id.to_owned())
            .or_insert_with(SessionBuffer::default);
        Arc::clone(entry.value())
    }
}
