use bincode::{Decode, Encode};
use musicbee_core::entity::{EventDetails, StoryDetails, UserProfile};
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{EventId, ImageId, StoryId, Timestamp};

#[macro_export]
macro_rules! def_store {
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

def_store! {
    /// Tracks mirror schema version
    db_version: () => u64
}

// OBJECT STORES
//
// One store per entity kind, keyed by the entity's natural key. Records are
// snapshots of whatever the last successful fetch returned.
def_store!(user_store: Username => UserMirrorRecord);
def_store!(event_store: EventId => EventMirrorRecord);
def_store!(story_store: StoryId => StoryMirrorRecord);
def_store!(genre_store: GenreId => GenreMirrorRecord);

// SECONDARY INDEXES
//
// The `user_store` key doubles as the unique username index. The rest are
// non-unique: a single-record lookup through them returns the first match.
def_store!(event_by_organiser: (Username, EventId) => ());
def_store!(story_by_owner: (Username, StoryId) => ());
def_store!(story_by_event: (EventId, StoryId) => ());

/// Snapshot of a user at last successful fetch
///
/// Relational fields arrive flattened to display scalars; the mirror holds
/// what rendering needs, not referential integrity.
#[derive(Debug, Encode, Decode, Clone, PartialEq, Eq)]
pub struct UserMirrorRecord {
    pub username: Username,
    pub display_name: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<ImageId>,
    pub favorite_genres: Vec<String>,
    pub followers: Vec<Username>,
    pub following: Vec<Username>,
    pub fetched_at: Timestamp,
}

impl UserMirrorRecord {
    pub fn snapshot(profile: &UserProfile, fetched_at: Timestamp) -> Self {
        Self {
            username: profile.username.clone(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            bio: profile.bio.clone(),
            avatar: profile.avatar,
            favorite_genres: profile
                .favorite_genres
                .iter()
                .map(|g| g.name.clone())
                .collect(),
            followers: profile.followers.clone(),
            following: profile.following.clone(),
            fetched_at,
        }
    }
}

#[derive(Debug, Encode, Decode, Clone, PartialEq)]
pub struct EventMirrorRecord {
    pub id: EventId,
    pub name: String,
    pub organiser: Username,
    pub venue_address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub genre_names: Vec<String>,
    pub description: String,
    pub image: Option<ImageId>,
    pub interested: Vec<Username>,
    pub going: Vec<Username>,
    pub comments: Vec<CommentMirrorRecord>,
    pub fetched_at: Timestamp,
}

impl EventMirrorRecord {
    pub fn snapshot(event: &EventDetails, fetched_at: Timestamp) -> Self {
        Self {
            id: event.id,
            name: event.name.clone(),
            organiser: event.organiser.clone(),
            venue_address: event.venue.address.clone(),
            latitude: event.venue.latitude,
            longitude: event.venue.longitude,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            genre_names: event.genres.iter().map(|g| g.name.clone()).collect(),
            description: event.description.clone(),
            image: event.image,
            interested: event.interested.clone(),
            going: event.going.clone(),
            comments: event
                .comments
                .iter()
                .map(|c| CommentMirrorRecord {
                    author: c.author.clone(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect(),
            fetched_at,
        }
    }
}

#[derive(Debug, Encode, Decode, Clone, PartialEq, Eq)]
pub struct StoryMirrorRecord {
    pub id: StoryId,
    pub owner: Username,
    pub image: ImageId,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub created_at: Timestamp,
    pub event: Option<EventId>,
    pub likes: Vec<Username>,
    pub comments: Vec<CommentMirrorRecord>,
    pub fetched_at: Timestamp,
}

#[derive(Debug, Encode, Decode, Clone, PartialEq, Eq)]
pub struct CommentMirrorRecord {
    pub author: Username,
    pub text: String,
    pub created_at: Timestamp,
}

impl StoryMirrorRecord {
    pub fn snapshot(story: &StoryDetails, fetched_at: Timestamp) -> Self {
        Self {
            id: story.id,
            owner: story.owner.clone(),
            image: story.image,
            caption: story.caption.clone(),
            location: story.location.clone(),
            created_at: story.created_at,
            event: story.event,
            likes: story.likes.clone(),
            comments: story
                .comments
                .iter()
                .map(|c| CommentMirrorRecord {
                    author: c.author.clone(),
                    text: c.text.clone(),
                    created_at: c.created_at,
                })
                .collect(),
            fetched_at,
        }
    }
}

#[derive(Debug, Encode, Decode, Clone, PartialEq, Eq)]
pub struct GenreMirrorRecord {
    pub id: GenreId,
    pub name: String,
}
