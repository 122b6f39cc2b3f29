//! The realtime relay
//!
//! A room-keyed broadcast broker. Connections join rooms (an event or a
//! story being viewed) and every publish to a room is forwarded to all of
//! its current members, the publisher included. No history, no replay, no
//! delivery guarantee and no auth at this layer: frames only notify viewers
//! of writes that already passed the authenticated store path, and a full
//! reload always recovers correct state.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use musicbee_core::relay::{RelayFrame, Room};
use musicbee_util_error::FmtCompact as _;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{StreamExt as _, StreamMap};
use tracing::debug;

use crate::SharedState;

const LOG_TARGET: &str = "musicbee::relay";

/// Per-room fan-out capacity; a viewer this far behind is dropped into
/// lagging and just misses frames.
const ROOM_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct RelayBroker {
    rooms: Mutex<HashMap<Room, broadcast::Sender<RelayFrame>>>,
}

impl RelayBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a room
    ///
    /// Dropping the returned receiver is leaving.
    pub fn join(&self, room: Room) -> broadcast::Receiver<RelayFrame> {
        self.rooms
            .lock()
            .expect("Locking failed")
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Forward a frame to every current member of its room
    ///
    /// Returns how many connections it went to; zero when nobody is joined,
    /// which is not an error.
    pub fn publish(&self, frame: &RelayFrame) -> usize {
        let Some(room) = frame.publish_room() else {
            return 0;
        };

        let mut rooms = self.rooms.lock().expect("Locking failed");
        let Some(tx) = rooms.get(&room) else {
            return 0;
        };

        match tx.send(frame.clone()) {
            Ok(count) => count,
            Err(_) => {
                // Last member left; drop the room.
                rooms.remove(&room);
                0
            }
        }
    }
}

pub async fn ws_handler(
    State(state): State<SharedState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_connection(state, socket))
}

async fn relay_connection(state: SharedState, mut socket: WebSocket) {
    let mut rooms: StreamMap<Room, BroadcastStream<RelayFrame>> = StreamMap::new();

    loop {
        tokio::select! {
            incoming = socket.recv() => {
                let Some(Ok(msg)) = incoming else {
                    break;
                };
                let Message::Text(text) = msg else {
                    continue;
                };
                let frame: RelayFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(err) => {
                        debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Ignoring malformed relay frame");
                        continue;
                    }
                };

                match frame {
                    RelayFrame::JoinStoryRoom { room } => {
                        let room = Room::Story(room);
                        rooms.insert(room, BroadcastStream::new(state.relay.join(room)));
                    }
                    RelayFrame::JoinEventRoom { room } => {
                        let room = Room::Event(room);
                        rooms.insert(room, BroadcastStream::new(state.relay.join(room)));
                    }
                    RelayFrame::LeaveStoryRoom { room } => {
                        rooms.remove(&Room::Story(room));
                    }
                    frame => {
                        state.relay.publish(&frame);
                    }
                }
            }
            Some((_room, frame)) = rooms.next(), if !rooms.is_empty() => {
                // A lagging receiver just misses frames.
                let Ok(frame) = frame else {
                    continue;
                };
                let Ok(text) = serde_json::to_string(&frame) else {
                    continue;
                };
                if socket.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    debug!(target: LOG_TARGET, "Relay connection closed");
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use musicbee_core::StoryId;
    use musicbee_core::id::Username;
    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;

    fn comment_frame(room: StoryId, text: &str) -> RelayFrame {
        RelayFrame::NewComment {
            username: Username::from_str("user1").expect("Valid username"),
            comment: text.to_owned(),
            room,
        }
    }

    #[test]
    fn publish_reaches_all_members_including_publisher() {
        let broker = RelayBroker::new();
        let s1 = StoryId::from_bytes([1; 16]);
        let room = Room::Story(s1);

        let mut tab_a = broker.join(room);
        let mut tab_b = broker.join(room);
        let mut other = broker.join(Room::Story(StoryId::from_bytes([2; 16])));

        let frame = comment_frame(s1, "hello");
        assert_eq!(broker.publish(&frame), 2);

        assert_eq!(tab_a.try_recv().expect("Delivered"), frame);
        assert_eq!(tab_b.try_recv().expect("Delivered"), frame);
        // Never joined s1, never observes it
        assert_eq!(other.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn leaving_stops_delivery() {
        let broker = RelayBroker::new();
        let s1 = StoryId::from_bytes([1; 16]);
        let room = Room::Story(s1);

        let mut staying = broker.join(room);
        let leaving = broker.join(room);
        drop(leaving);

        assert_eq!(broker.publish(&comment_frame(s1, "after leave")), 1);
        assert!(staying.try_recv().is_ok());
    }

    #[test]
    fn publish_to_empty_room_delivers_nowhere() {
        let broker = RelayBroker::new();
        let s1 = StoryId::from_bytes([1; 16]);

        // Never-joined room
        assert_eq!(broker.publish(&comment_frame(s1, "void")), 0);

        // Joined once, then everyone left
        let rx = broker.join(Room::Story(s1));
        drop(rx);
        assert_eq!(broker.publish(&comment_frame(s1, "void")), 0);
        assert_eq!(broker.publish(&comment_frame(s1, "still void")), 0);
    }

    #[test]
    fn join_frames_are_not_publishable() {
        let broker = RelayBroker::new();
        let frame = RelayFrame::JoinStoryRoom {
            room: StoryId::from_bytes([1; 16]),
        };
        assert_eq!(broker.publish(&frame), 0);
    }
}
