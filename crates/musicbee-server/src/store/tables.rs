use bincode::{Decode, Encode};
use musicbee_core::entity::RsvpState;
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{CommentId, EventId, ImageId, StoryId, Timestamp};

#[macro_export]
macro_rules! def_table {
    ($(#[$outer:meta])*
        $name:ident : $k:ty => $v:ty) => {
        #[allow(unused)]
        $(#[$outer])*
        pub mod $name {
            use super::*;
            pub type Key = $k;
            pub type Value = $v;
            pub type Definition<'a> = redb_bincode::TableDefinition<'a, Key, Value>;
            pub trait ReadableTable: redb_bincode::ReadableTable<Key, Value> {}
            impl<RT> ReadableTable for RT where RT: redb_bincode::ReadableTable<Key, Value> {}
            pub type Table<'a> = redb_bincode::Table<'a, Key, Value>;
            pub const TABLE: Definition = redb_bincode::TableDefinition::new(stringify!($name));
        }
    };
}

def_table! {
    /// Tracks store schema version
    db_version: () => u64
}

// USERS
def_table!(users: Username => UserRecord);
/// (follower, followee); the reverse direction is kept alongside so both
/// profile lists are range scans.
def_table!(user_follows: (Username, Username) => FollowRecord);
def_table!(user_followers: (Username, Username) => FollowRecord);

// GENRES (static reference data, seeded at open)
def_table!(genres: GenreId => GenreRecord);

// EVENTS
def_table!(events: EventId => EventRecord);
def_table!(events_by_time: (Timestamp, EventId) => ());
/// One row per (event, user); a single row holding the state is what makes
/// interested/going structurally exclusive.
def_table!(event_rsvps: (EventId, Username) => RsvpRecord);
def_table!(event_comments: (EventId, Timestamp, CommentId) => CommentRecord);

// STORIES
def_table!(stories: StoryId => StoryRecord);
def_table!(stories_by_time: (Timestamp, StoryId) => ());
def_table!(stories_by_owner: (Username, StoryId) => ());
def_table!(stories_by_event: (EventId, StoryId) => ());
def_table!(story_likes: (StoryId, Username) => ());
def_table!(story_comments: (StoryId, Timestamp, CommentId) => CommentRecord);

// IMAGES
def_table!(images: ImageId => ImageRecord);


#[derive(Debug, Encode, Decode, Clone)]
pub struct UserRecord {
    pub display_name: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<ImageId>,
    pub favorite_genres: Vec<GenreId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone, Copy)]
pub struct FollowRecord {
    pub since: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct GenreRecord {
    pub name: String,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct EventRecord {
    pub name: String,
    pub organiser: Username,
    pub venue_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub genres: Vec<GenreId>,
    pub description: String,
    pub image: Option<ImageId>,
    pub created_at: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone, Copy, PartialEq, Eq)]
pub enum RsvpKind {
    Interested,
    Going,
}

impl RsvpKind {
    pub fn as_state(self) -> RsvpState {
        match self {
            RsvpKind::Interested => RsvpState::Interested,
            RsvpKind::Going => RsvpState::Going,
        }
    }
}

#[derive(Debug, Encode, Decode, Clone, Copy)]
pub struct RsvpRecord {
    pub kind: RsvpKind,
    pub since: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct CommentRecord {
    pub author: Username,
    pub text: String,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct StoryRecord {
    pub owner: Username,
    pub image: ImageId,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub created_at: Timestamp,
    pub event: Option<EventId>,
}

#[derive(Debug, Encode, Decode, Clone)]
pub struct ImageRecord {
    pub mime: String,
    pub data: Vec<u8>,
}
