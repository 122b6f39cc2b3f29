//! Wire-level entity shapes
//!
//! These are the denormalized records the request handlers return: every
//! direct relation is resolved to what rendering needs (usernames, genre
//! names), never to bare foreign keys the caller would have to chase.

use crate::id::{GenreId, Username};
use crate::{CommentId, EventId, ImageId, StoryId, Timestamp};

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Venue {
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub username: Username,
    pub display_name: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<ImageId>,
    pub favorite_genres: Vec<Genre>,
    pub followers: Vec<Username>,
    pub following: Vec<Username>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq)]
pub struct EventDetails {
    pub id: EventId,
    pub name: String,
    pub organiser: Username,
    pub venue: Venue,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub genres: Vec<Genre>,
    pub description: String,
    pub image: Option<ImageId>,
    pub interested: Vec<Username>,
    pub going: Vec<Username>,
    pub comments: Vec<CommentView>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryDetails {
    pub id: StoryId,
    pub owner: Username,
    pub image: ImageId,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub created_at: Timestamp,
    pub event: Option<EventId>,
    pub likes: Vec<Username>,
    pub comments: Vec<CommentView>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub id: CommentId,
    pub author: Username,
    pub text: String,
    pub created_at: Timestamp,
}

/// Membership a user can hold on an event, at most one at a time
#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize),
    serde(rename_all = "lowercase")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsvpState {
    Interested,
    Going,
    None,
}

// Request bodies

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct SignInRequest {
    pub username: Username,
    pub display_name: String,
    pub email: String,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, Default)]
pub struct ProfileEdit {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub favorite_genres: Option<Vec<GenreId>>,
    pub avatar: Option<ImageId>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct EventCreate {
    pub name: String,
    pub venue: Venue,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub genres: Vec<GenreId>,
    pub description: String,
    pub image: Option<ImageId>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, Default)]
pub struct EventEdit {
    pub name: Option<String>,
    pub venue: Option<Venue>,
    pub starts_at: Option<Timestamp>,
    pub ends_at: Option<Timestamp>,
    pub genres: Option<Vec<GenreId>>,
    pub description: Option<String>,
    pub image: Option<ImageId>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct RsvpRequest {
    pub state: RsvpState,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct StoryCreate {
    pub image: ImageId,
    pub caption: Option<String>,
    pub location: Option<String>,
    pub event: Option<EventId>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct CaptionEdit {
    pub caption: Option<String>,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone)]
pub struct CommentCreate {
    pub text: String,
}

#[cfg_attr(
    feature = "serde",
    derive(::serde::Serialize, ::serde::Deserialize)
)]
#[derive(Debug, Clone, Copy)]
pub struct ImageUploaded {
    pub id: ImageId,
}
