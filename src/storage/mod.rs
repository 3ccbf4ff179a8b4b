//! Durable per-user state. [gateway::PersistenceGateway] is the only thing that knows how
//! [entities::UserState] is laid out in a [store::KeyValueStore].

pub mod entities;
pub mod gateway;
pub mod store;
