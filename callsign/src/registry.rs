//! Directory of the connected clients.
//!
//! A name points to at most one live connection and to the address the client
//! was last seen from. Sessions register themselves when their WebSocket is
//! accepted and remove themselves by connection identity when their read loop
//! exits, so a session which lost its name to a newer session never removes
//! the newer one.
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, trace};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::{send, Result};

/// Identity of an accepted connection.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        ConnectionId(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_hyphenated())
    }
}

/// Writable side of a connection. Cloning it doesn't clone the connection, every
/// clone feeds the same writer task.
#[derive(Clone, Debug)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outgoing: mpsc::Sender<Message>,
}

impl ConnectionHandle {
    pub fn new(outgoing: mpsc::Sender<Message>) -> Self {
        Self {
            id: ConnectionId::new(),
            outgoing,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a text frame to the writer task of the connection.
    pub async fn send_text(&self, text: String) -> Result<()> {
        send!(self.outgoing, Message::Text(text))?;

        Ok(())
    }

    /// Queue a raw WebSocket message, close frames included.
    pub async fn send_message(&self, message: Message) -> Result<()> {
        send!(self.outgoing, message)?;

        Ok(())
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.outgoing.is_closed()
    }
}

#[derive(Debug)]
struct Entry {
    address: String,
    /// `None` if the name was only registered via the HTTP register call.
    connection: Option<ConnectionHandle>,
}

#[derive(Default)]
struct Entries {
    by_name: HashMap<String, Entry>,
    /// Reverse index of the connections to avoid scanning on removal.
    by_connection: HashMap<ConnectionId, String>,
}

/// Name to connection and address mapping shared by all the sessions.
#[derive(Default)]
pub struct Registry {
    entries: RwLock<Entries>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the connection under `name`, replacing any connection already
    /// registered there. The replaced connection stays open, it just cannot be
    /// reached by name anymore.
    pub fn add(&self, name: &str, connection: ConnectionHandle, address: &str) {
        let mut entries = self.entries.write();
        let id = connection.id();

        let previous = entries.by_name.insert(
            name.to_string(),
            Entry {
                address: address.to_string(),
                connection: Some(connection),
            },
        );

        if let Some(displaced) = previous.and_then(|e| e.connection) {
            if displaced.id() != id {
                debug!("Connection {} lost name {name} to {id}", displaced.id());

                entries.by_connection.remove(&displaced.id());
            }
        }

        entries.by_connection.insert(id, name.to_string());

        debug!("Registered {name} from {address} connection = {id}");
    }

    /// Record the address of `name` without attaching a connection.
    pub fn register_address(&self, name: &str, address: &str) {
        let mut entries = self.entries.write();

        entries
            .by_name
            .entry(name.to_string())
            .and_modify(|e| e.address = address.to_string())
            .or_insert_with(|| Entry {
                address: address.to_string(),
                connection: None,
            });

        debug!("Registered address of {name} as {address}");
    }

    /// Remove the entry which holds exactly this connection. Returns the name it
    /// was registered under, or `None` if the connection was not (or no longer)
    /// registered.
    pub fn remove_by_connection(&self, id: ConnectionId) -> Option<String> {
        let mut entries = self.entries.write();
        let name = entries.by_connection.remove(&id)?;

        let holds_connection = entries
            .by_name
            .get(&name)
            .and_then(|e| e.connection.as_ref())
            .is_some_and(|c| c.id() == id);

        if holds_connection {
            entries.by_name.remove(&name);

            debug!("Unregistered {name} connection = {id}");

            Some(name)
        } else {
            None
        }
    }

    /// Connection registered under `name` if there is any.
    pub fn get_connection(&self, name: &str) -> Option<ConnectionHandle> {
        let entries = self.entries.read();
        let connection = entries.by_name.get(name).and_then(|e| e.connection.clone());

        trace!("Lookup {name} found = {}", connection.is_some());

        connection
    }

    /// Snapshot of all registered names with their addresses.
    pub fn list(&self) -> BTreeMap<String, String> {
        let entries = self.entries.read();

        entries
            .by_name
            .iter()
            .map(|(name, e)| (name.clone(), e.address.clone()))
            .collect()
    }

    /// Number of names having a live connection.
    pub fn connected(&self) -> usize {
        self.entries.read().by_connection.len()
    }
}
