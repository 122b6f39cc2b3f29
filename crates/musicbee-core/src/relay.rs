//! Wire shapes of the realtime relay channel
//!
//! The relay is advisory UI-liveness only: messages notify viewers of
//! writes that already committed to the store, so dropped or missed frames
//! are recovered by a plain reload.

use std::fmt;

use crate::entity::StoryDetails;
use crate::id::Username;
use crate::{EventId, StoryId};

/// A broadcast grouping of connections
///
/// Keyed by the event or story being viewed; joining scopes which `new
/// comment`/`new event story` frames a connection observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    Event(EventId),
    Story(StoryId),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::Event(id) => write!(f, "event:{id}"),
            Room::Story(id) => write!(f, "story:{id}"),
        }
    }
}

/// A single JSON frame on the relay channel
///
/// The `type` names are fixed wire contract; both directions use the same
/// envelope. Join/leave frames are only meaningful client-to-server; the
/// `new *` frames flow both ways (a connection may publish, and the server
/// publishes on commit). Event rooms are left by disconnecting.
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(tag = "type")
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    #[cfg_attr(feature = "serde", serde(rename = "join story room"))]
    JoinStoryRoom { room: StoryId },
    #[cfg_attr(feature = "serde", serde(rename = "leave story room"))]
    LeaveStoryRoom { room: StoryId },
    #[cfg_attr(feature = "serde", serde(rename = "join event room"))]
    JoinEventRoom { room: EventId },
    #[cfg_attr(feature = "serde", serde(rename = "new comment"))]
    NewComment {
        username: Username,
        comment: String,
        room: StoryId,
    },
    #[cfg_attr(feature = "serde", serde(rename = "new event comment"))]
    NewEventComment {
        username: Username,
        comment: String,
        room: EventId,
    },
    #[cfg_attr(feature = "serde", serde(rename = "new event story"))]
    NewEventStory { room: EventId, story: StoryDetails },
}

impl RelayFrame {
    /// The room a publish frame is addressed to; `None` for join/leave.
    pub fn publish_room(&self) -> Option<Room> {
        match self {
            RelayFrame::JoinStoryRoom { .. }
            | RelayFrame::LeaveStoryRoom { .. }
            | RelayFrame::JoinEventRoom { .. } => None,
            RelayFrame::NewComment { room, .. } => Some(Room::Story(*room)),
            RelayFrame::NewEventComment { room, .. } => Some(Room::Event(*room)),
            RelayFrame::NewEventStory { room, .. } => Some(Room::Event(*room)),
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn frame_type_names_are_wire_contract() {
        let frame = RelayFrame::NewComment {
            username: Username::from_str("user1").expect("Valid username"),
            comment: "hello".into(),
            room: StoryId::ZERO,
        };
        let json = serde_json::to_value(&frame).expect("Can't fail");
        assert_eq!(json["type"], "new comment");

        let join = RelayFrame::JoinStoryRoom { room: StoryId::ZERO };
        let json = serde_json::to_value(&join).expect("Can't fail");
        assert_eq!(json["type"], "join story room");
    }
}
