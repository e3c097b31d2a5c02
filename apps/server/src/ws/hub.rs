//! Connection registry: routes outbound events to live sessions.
//!
//! One entry per identified user. A reconnect replaces the previous
//! entry; unregistration is token-guarded so a stale connection cannot
//! evict its replacement.

use actix::prelude::{Message, Recipient};
use dashmap::DashMap;
use uuid::Uuid;

use crate::ws::protocol::ServerMsg;

#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct OutboundEvent(pub ServerMsg);

struct ConnectionHandle {
    conn_id: Uuid,
    recipient: Recipient<OutboundEvent>,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<i64, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register(&self, user_id: i64, conn_id: Uuid, recipient: Recipient<OutboundEvent>) {
        self.connections
            .insert(user_id, ConnectionHandle { conn_id, recipient });
    }

    /// Remove the user's entry, but only if it still belongs to this
    /// connection.
    pub fn unregister(&self, user_id: i64, conn_id: Uuid) {
        self.connections
            .remove_if(&user_id, |_, handle| handle.conn_id == conn_id);
    }

    /// Deliver one message; returns false when the user has no live
    /// connection (the game outcome stands either way).
    pub fn send_to_user(&self, user_id: i64, msg: ServerMsg) -> bool {
        match self.connections.get(&user_id) {
            Some(handle) => {
                let _ = handle.recipient.do_send(OutboundEvent(msg));
                true
            }
            None => false,
        }
    }

    /// Deliver to every connected user except one (lobby announcements).
    pub fn broadcast_except(&self, except_user_id: i64, msg: ServerMsg) {
        for entry in self.connections.iter() {
            if *entry.key() == except_user_id {
                continue;
            }
            let _ = entry.value().recipient.do_send(OutboundEvent(msg.clone()));
        }
    }

    pub fn connected_count(&self) -> usize {
        self.connections.len()
    }
}
