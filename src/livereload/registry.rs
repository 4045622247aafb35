//! Registry of negotiated live-reload clients and the broadcast fan-out.
//!
//! Connections enter the registry only after negotiating the official
//! protocol and leave it when their socket closes. Delivery to each client
//! goes through its own bounded channel, so one slow consumer never blocks
//! another; a client whose channel is gone is dropped from the registry
//! during the broadcast.

use crate::livereload::protocol::LiveReloadMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// One negotiated connection as the registry sees it: the outbound queue and
/// the origins its `info` messages reported.
#[derive(Debug)]
struct ClientHandle {
    tx: mpsc::Sender<String>,
    first_origin: Option<String>,
    last_origin: Option<String>,
}

impl ClientHandle {
    /// A client that reported different first and last origins navigated
    /// away from the served site; its page is no longer ours to reload.
    fn navigated_away(&self) -> bool {
        match (&self.first_origin, &self.last_origin) {
            (Some(first), Some(last)) => first != last,
            _ => false,
        }
    }
}

/// Process-wide set of active live-reload clients.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashMap<usize, ClientHandle>>,
    next_id: RwLock<usize>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly negotiated client. Returns its registry id.
    pub fn register(&self, tx: mpsc::Sender<String>) -> usize {
        let id = {
            let mut next_id = self.next_id.write();
            let id = *next_id;
            *next_id += 1;
            id
        };
        self.clients.write().insert(
            id,
            ClientHandle {
                tx,
                first_origin: None,
                last_origin: None,
            },
        );
        id
    }

    /// Remove a client on socket close.
    pub fn deregister(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    /// Record a page origin from an `info` message: the first report sets
    /// the first origin, every later one sets the last origin.
    pub fn record_origin(&self, id: usize, origin: String) {
        if let Some(client) = self.clients.write().get_mut(&id) {
            if client.first_origin.is_none() {
                client.first_origin = Some(origin);
            } else {
                client.last_origin = Some(origin);
            }
        }
    }

    /// Number of active clients.
    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Send a reload command for `path` to every active client still on its
    /// original site. Returns how many clients were notified.
    pub async fn broadcast_reload(&self, path: &str) -> usize {
        let json = serde_json::to_string(&LiveReloadMessage::reload(path))
            .unwrap_or_else(|_| "{}".to_string());

        // snapshot senders under the lock, send outside it
        let targets: Vec<(usize, mpsc::Sender<String>)> = self
            .clients
            .read()
            .iter()
            .filter(|(_, client)| !client.navigated_away())
            .map(|(id, client)| (*id, client.tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut failed_ids = Vec::new();
        for (id, tx) in targets {
            if tx.send(json.clone()).await.is_err() {
                failed_ids.push(id);
            } else {
                delivered += 1;
            }
        }
        for id in failed_ids {
            self.deregister(id);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_deregister() {
        let registry = ClientRegistry::new();
        let (tx1, _rx1) = mpsc::channel(16);
        let (tx2, _rx2) = mpsc::channel(16);

        let id1 = registry.register(tx1);
        let id2 = registry.register(tx2);
        assert_ne!(id1, id2);
        assert_eq!(registry.client_count(), 2);

        registry.deregister(id1);
        assert_eq!(registry.client_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_delivers_reload() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);
        registry.register(tx);

        let delivered = registry.broadcast_reload("/style.css").await;
        assert_eq!(delivered, 1);

        let json = rx.recv().await.unwrap();
        let msg: LiveReloadMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, LiveReloadMessage::reload("/style.css"));
    }

    #[tokio::test]
    async fn test_navigated_away_client_is_skipped() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);
        let id = registry.register(tx);

        registry.record_origin(id, "http://localhost:4433".to_string());
        registry.record_origin(id, "https://elsewhere.example".to_string());

        let delivered = registry.broadcast_reload("/index.html").await;
        assert_eq!(delivered, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_same_origin_navigation_still_reloads() {
        let registry = ClientRegistry::new();
        let (tx, mut rx) = mpsc::channel(16);
        let id = registry.register(tx);

        registry.record_origin(id, "http://localhost:4433".to_string());
        registry.record_origin(id, "http://localhost:4433".to_string());

        let delivered = registry.broadcast_reload("/index.html").await;
        assert_eq!(delivered, 1);
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_dead_channel_drops_client() {
        let registry = ClientRegistry::new();
        let (tx, rx) = mpsc::channel(16);
        registry.register(tx);
        drop(rx);

        let delivered = registry.broadcast_reload("/a.js").await;
        assert_eq!(delivered, 0);
        assert_eq!(registry.client_count(), 0);
    }
}
