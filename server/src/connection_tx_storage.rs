use crate::connection::ConnectionEvent;
use std::collections::HashMap;
use system::{ConnectionId, Payload, ServerFrame};
use tokio::sync::mpsc::error::TrySendError;

pub type ConnectionTx = tokio::sync::mpsc::Sender<ConnectionEvent>;

pub struct ConnectionTxStorage {
    connection_txs: HashMap<ConnectionId, ConnectionTx>,
}

impl ConnectionTxStorage {
    pub fn new() -> Self {
        Self {
            connection_txs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, connection_id: ConnectionId, tx: ConnectionTx) {
        self.connection_txs.insert(connection_id, tx);
    }

    /// Never waits: a connection that can't keep up misses the event.
    ///
    /// Returns `false` once the receiving side of the connection is gone.
    pub fn send(&self, to: &ConnectionId, event: ConnectionEvent) -> bool {
        let tx = match self.connection_txs.get(to) {
            Some(tx) => tx,
            None => {
                log::warn!("Tried to send to unknown connection {}", to);
                return true;
            }
        };
        match tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(ConnectionEvent::Frame(ServerFrame::Message {
                destination,
                body: Payload::Polygon(_),
            }))) => {
                log::error!(
                    "Dropped polygon on {} for connection {}: queue is full",
                    destination,
                    to
                );
                true
            }
            Err(TrySendError::Full(_)) => {
                log::warn!("Dropped event for connection {}: queue is full", to);
                true
            }
            Err(TrySendError::Closed(_)) => {
                log::debug!("Connection {} is gone", to);
                false
            }
        }
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<ConnectionTx> {
        self.connection_txs.remove(connection_id)
    }
}
