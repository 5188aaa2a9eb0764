use std::collections::{HashMap, HashSet};
use std::num::Wrapping;
use system::ConnectionId;

/// Who is subscribed to what.
pub struct BrokerState {
    connection_id_source: Wrapping<ConnectionId>,
    connections: HashSet<ConnectionId>,
    subscriptions: HashMap<String, Vec<ConnectionId>>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum BrokerError {
    UnknownConnection,
}

impl BrokerState {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            connections: HashSet::new(),
            subscriptions: HashMap::new(),
        }
    }

    pub fn create_connection(&mut self) -> ConnectionId {
        let connection_id = self.new_connection_id();
        self.connections.insert(connection_id);
        connection_id
    }

    pub fn subscribe(
        &mut self,
        connection_id: ConnectionId,
        destination: &str,
    ) -> Result<(), BrokerError> {
        if !self.connections.contains(&connection_id) {
            return Err(BrokerError::UnknownConnection);
        }
        let subscribers = self
            .subscriptions
            .entry(destination.to_owned())
            .or_default();
        if !subscribers.contains(&connection_id) {
            subscribers.push(connection_id);
            log::info!("Connection {} subscribed to {}", connection_id, destination);
        }
        Ok(())
    }

    pub fn unsubscribe(&mut self, connection_id: ConnectionId, destination: &str) {
        if let Some(subscribers) = self.subscriptions.get_mut(destination) {
            subscribers.retain(|c| *c != connection_id);
            if subscribers.is_empty() {
                self.subscriptions.remove(destination);
            }
        }
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId) -> bool {
        self.subscriptions.retain(|_, subscribers| {
            subscribers.retain(|c| *c != connection_id);
            !subscribers.is_empty()
        });
        self.connections.remove(&connection_id)
    }

    pub fn subscribers(&self, destination: &str) -> &[ConnectionId] {
        self.subscriptions
            .get(destination)
            .map(|s| s.as_slice())
            .unwrap_or(&[])
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        loop {
            self.connection_id_source += Wrapping(1);
            let candidate = self.connection_id_source.0;
            if !self.connections.contains(&candidate) {
                break candidate;
            }
        }
    }
}
