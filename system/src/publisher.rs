use crate::Payload;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("messaging fabric is closed")]
    Closed,
}

/// Outbound half of the messaging fabric.
///
/// Implementations must not block: the accumulator calls `publish` while it
/// holds a session's buffer.
pub trait Publisher {
    fn publish(&self, destination: &str, payload: Payload) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for std::sync::Arc<P> {
    fn publish(&self, destination: &str, payload: Payload) -> Result<(), PublishError> {
        (**self).publish(destination, payload)
    }
}
