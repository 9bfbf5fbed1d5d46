//! Connected targets still waiting for a handshake

use std::collections::HashMap;
use tokio::net::TcpStream;
use tracing::warn;

use sqlsweep_common::PeerKey;

/// Open sockets keyed by canonical peer key.
///
/// Dropping a stream closes it, so removing an entry is closing it.
#[derive(Debug, Default)]
pub struct PendingTable {
    entries: HashMap<PeerKey, TcpStream>,
}

impl PendingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `stream` under `key`. Returns `true` when an earlier
    /// connection to the same peer was closed and replaced.
    pub fn insert(&mut self, key: PeerKey, stream: TcpStream) -> bool {
        let peer = key.clone();
        match self.entries.insert(key, stream) {
            Some(_previous) => {
                warn!(%peer, "duplicate target, replacing earlier connection");
                true
            }
            None => false,
        }
    }

    /// Remove and return the connection for `key`, if one is pending.
    pub fn take(&mut self, key: &PeerKey) -> Option<TcpStream> {
        self.entries.remove(key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &PeerKey) -> bool {
        self.entries.contains_key(key)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &PeerKey> {
        self.entries.keys()
    }

    /// Close every remaining connection; returns how many were open.
    pub fn close_all(&mut self) -> usize {
        let closed = self.entries.len();
        self.entries.clear();
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn connected_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (client, server)
    }

    #[tokio::test]
    async fn test_insert_and_take() {
        let (client, _server) = connected_pair().await;
        let key = PeerKey::from(client.peer_addr().unwrap());

        let mut table = PendingTable::new();
        assert!(!table.insert(key.clone(), client));
        assert_eq!(table.len(), 1);
        assert!(table.contains(&key));

        assert!(table.take(&key).is_some());
        assert!(table.take(&key).is_none());
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_key_replaces_and_closes() {
        let (first, mut first_server) = connected_pair().await;
        let (second, _second_server) = connected_pair().await;
        let key = PeerKey::new("10.0.0.5".parse().unwrap(), 3306);

        let mut table = PendingTable::new();
        assert!(!table.insert(key.clone(), first));
        assert!(table.insert(key.clone(), second));
        assert_eq!(table.len(), 1);

        let mut buf = [0u8; 1];
        assert_eq!(first_server.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_of_reset_peer_is_still_replaced() {
        let (first, first_server) = connected_pair().await;
        let (second, _second_server) = connected_pair().await;
        first_server.set_linger(Some(std::time::Duration::ZERO)).unwrap();
        drop(first_server);
        let key = PeerKey::new("10.0.0.5".parse().unwrap(), 3306);

        let mut table = PendingTable::new();
        table.insert(key.clone(), first);
        assert!(table.insert(key.clone(), second));
        assert_eq!(table.len(), 1);
        assert!(table.take(&key).is_some());
    }

    #[tokio::test]
    async fn test_close_all() {
        let (a, mut a_server) = connected_pair().await;
        let (b, _b_server) = connected_pair().await;

        let mut table = PendingTable::new();
        table.insert(PeerKey::new("10.0.0.1".parse().unwrap(), 3306), a);
        table.insert(PeerKey::new("10.0.0.2".parse().unwrap(), 3306), b);

        assert_eq!(table.close_all(), 2);
        assert!(table.is_empty());
        let mut buf = [0u8; 1];
        assert_eq!(a_server.read(&mut buf).await.unwrap(), 0);
    }
}
