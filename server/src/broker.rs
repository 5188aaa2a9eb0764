use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};

use system::{ConnectionId, Payload, PublishError, Publisher, ServerFrame};

use crate::broker_state::BrokerState;
use crate::connection::ConnectionEvent;
use crate::connection_tx_storage::{ConnectionTx, ConnectionTxStorage};

#[derive(Debug)]
pub enum BrokerCommand {
    Connect {
        tx: ConnectionTx,
    },
    Disconnect {
        from: ConnectionId,
    },
    Subscribe {
        from: ConnectionId,
        destination: String,
    },
    Unsubscribe {
        from: ConnectionId,
        destination: String,
    },
    Publish {
        destination: String,
        payload: Payload,
    },
}

/// Handle to the broker task. Sending never waits.
#[derive(Clone, Debug)]
pub struct BrokerTx {
    tx: UnboundedSender<BrokerCommand>,
}

impl BrokerTx {
    pub fn send(&self, command: BrokerCommand) -> Result<(), PublishError> {
        self.tx.send(command).map_err(|_| PublishError::Closed)
    }

    /// A handle whose commands land in the returned receiver instead of a
    /// running broker.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, tokio::sync::mpsc::UnboundedReceiver<BrokerCommand>) {
        let (tx, rx) = unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Publisher for BrokerTx {
    fn publish(&self, destination: &str, payload: Payload) -> Result<(), PublishError> {
        self.send(BrokerCommand::Publish {
            destination: destination.to_owned(),
            payload,
        })
    }
}

struct Broker {
    state: BrokerState,
    connections: ConnectionTxStorage,
}

impl Broker {
    fn new() -> Self {
        Self {
            state: BrokerState::new(),
            connections: ConnectionTxStorage::new(),
        }
    }

    fn handle_command(&mut self, command: BrokerCommand) {
        match command {
            BrokerCommand::Connect { tx } => {
                let connection_id = self.state.create_connection();
                self.connections.insert(connection_id, tx);
                log::info!("Connection {} registered", connection_id);
                if !self
                    .connections
                    .send(&connection_id, ConnectionEvent::Connected { connection_id })
                {
                    self.drop_connection(connection_id);
                }
            }
            BrokerCommand::Disconnect { from } => self.drop_connection(from),
            BrokerCommand::Subscribe { from, destination } => {
                if let Err(err) = self.state.subscribe(from, &destination) {
                    log::warn!(
                        "Connection {} can't subscribe to {}: {:?}",
                        from,
                        destination,
                        err
                    );
                }
            }
            BrokerCommand::Unsubscribe { from, destination } => {
                self.state.unsubscribe(from, &destination);
            }
            BrokerCommand::Publish {
                destination,
                payload,
            } => {
                let mut gone = Vec::new();
                for connection_id in self.state.subscribers(&destination) {
                    let event = ConnectionEvent::Frame(ServerFrame::Message {
                        destination: destination.clone(),
                        body: payload.clone(),
                    });
                    if !self.connections.send(connection_id, event) {
                        gone.push(*connection_id);
                    }
                }
                for connection_id in gone {
                    self.drop_connection(connection_id);
                }
            }
        }
    }

    fn drop_connection(&mut self, connection_id: ConnectionId) {
        self.state.disconnect(connection_id);
        if self.connections.remove(&connection_id).is_some() {
            log::info!("Connection {} unregistered", connection_id);
        }
    }
}

pub fn spawn_broker() -> BrokerTx {
    let (tx, mut rx) = unbounded_channel::<BrokerCommand>();

    tokio::spawn(async move {
        let mut broker = Broker::new();

        while let Some(command) = rx.recv().await {
            broker.handle_command(command);
        }
        log::info!("Broker stopped");
    });

    BrokerTx { tx }
}
