pub mod broker;
mod broker_state;
pub mod config;
pub mod connection;
mod connection_tx_storage;
pub mod handlers;

/// The accumulator as wired into the server: publishing goes through the broker.
pub type Accumulator = system::SessionAccumulator<broker::BrokerTx>;
