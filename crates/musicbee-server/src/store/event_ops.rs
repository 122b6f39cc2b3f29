use musicbee_core::entity::{
    CommentView, EventCreate, EventDetails, EventEdit, RsvpState, Venue,
};
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{CommentId, EventId, Timestamp};
use redb_bincode::ReadableTable as _;

use super::{
    CommentRecord, EventRecord, RsvpKind, RsvpRecord, Store, StoreResult, event_comments,
    event_rsvps, events, events_by_time, genres,
};

#[derive(Debug)]
pub enum EventWriteOutcome {
    Done(EventDetails),
    NotFound,
    NotOrganiser,
    UnknownGenre(GenreId),
}

impl Store {
    pub async fn create_event(
        &self,
        organiser: &Username,
        create: EventCreate,
    ) -> StoreResult<EventWriteOutcome> {
        let organiser = organiser.clone();
        self.write_with(move |tx| {
            let mut events_table = tx.open_table(&events::TABLE)?;
            let mut by_time_table = tx.open_table(&events_by_time::TABLE)?;
            let rsvps_table = tx.open_table(&event_rsvps::TABLE)?;
            let comments_table = tx.open_table(&event_comments::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            for genre in &create.genres {
                if genres_table.get(genre)?.is_none() {
                    return Ok(EventWriteOutcome::UnknownGenre(genre.clone()));
                }
            }

            let id = EventId::generate();
            let record = EventRecord {
                name: create.name,
                organiser,
                venue_address: create.venue.address,
                latitude: create.venue.latitude,
                longitude: create.venue.longitude,
                starts_at: create.starts_at,
                ends_at: create.ends_at,
                genres: create.genres,
                description: create.description,
                image: create.image,
                created_at: Timestamp::now(),
            };

            by_time_table.insert(&(record.starts_at, id), &())?;
            events_table.insert(&id, &record)?;

            let details = Self::read_event_details_tx(
                id,
                &events_table,
                &rsvps_table,
                &comments_table,
                &genres_table,
            )?
            .expect("Just inserted");
            Ok(EventWriteOutcome::Done(details))
        })
        .await
    }

    pub async fn get_event_details(&self, id: EventId) -> StoreResult<Option<EventDetails>> {
        self.read_with(|tx| {
            let events_table = tx.open_table(&events::TABLE)?;
            let rsvps_table = tx.open_table(&event_rsvps::TABLE)?;
            let comments_table = tx.open_table(&event_comments::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            Self::read_event_details_tx(
                id,
                &events_table,
                &rsvps_table,
                &comments_table,
                &genres_table,
            )
        })
        .await
    }

    /// Events starting at or after `from`, soonest first
    pub async fn list_upcoming_events(
        &self,
        from: Timestamp,
        genre: Option<GenreId>,
        limit: usize,
    ) -> StoreResult<Vec<EventDetails>> {
        self.read_with(|tx| {
            let events_table = tx.open_table(&events::TABLE)?;
            let by_time_table = tx.open_table(&events_by_time::TABLE)?;
            let rsvps_table = tx.open_table(&event_rsvps::TABLE)?;
            let comments_table = tx.open_table(&event_comments::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            let mut ret = vec![];
            for record in
                by_time_table.range((from, EventId::ZERO)..=(Timestamp::MAX, EventId::MAX))?
            {
                if limit <= ret.len() {
                    break;
                }
                let (k, _) = record?;
                let (_, event_id) = k.value();

                let Some(details) = Self::read_event_details_tx(
                    event_id,
                    &events_table,
                    &rsvps_table,
                    &comments_table,
                    &genres_table,
                )?
                else {
                    continue;
                };

                if let Some(genre) = &genre {
                    if !details.genres.iter().any(|g| g.id == *genre) {
                        continue;
                    }
                }

                ret.push(details);
            }
            Ok(ret)
        })
        .await
    }

    pub async fn edit_event(
        &self,
        actor: &Username,
        id: EventId,
        edit: EventEdit,
    ) -> StoreResult<EventWriteOutcome> {
        let actor = actor.clone();
        self.write_with(move |tx| {
            let mut events_table = tx.open_table(&events::TABLE)?;
            let mut by_time_table = tx.open_table(&events_by_time::TABLE)?;
            let rsvps_table = tx.open_table(&event_rsvps::TABLE)?;
            let comments_table = tx.open_table(&event_comments::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            let Some(mut record) = events_table.get(&id)?.map(|g| g.value()) else {
                return Ok(EventWriteOutcome::NotFound);
            };

            if record.organiser != actor {
                return Ok(EventWriteOutcome::NotOrganiser);
            }

            if let Some(genres) = &edit.genres {
                for genre in genres {
                    if genres_table.get(genre)?.is_none() {
                        return Ok(EventWriteOutcome::UnknownGenre(genre.clone()));
                    }
                }
                record.genres = genres.clone();
            }

            if let Some(name) = edit.name {
                record.name = name;
            }
            if let Some(Venue {
                address,
                latitude,
                longitude,
            }) = edit.venue
            {
                record.venue_address = address;
                record.latitude = latitude;
                record.longitude = longitude;
            }
            if let Some(starts_at) = edit.starts_at {
                if starts_at != record.starts_at {
                    by_time_table.remove(&(record.starts_at, id))?;
                    by_time_table.insert(&(starts_at, id), &())?;
                    record.starts_at = starts_at;
                }
            }
            if let Some(ends_at) = edit.ends_at {
                record.ends_at = ends_at;
            }
            if let Some(description) = edit.description {
                record.description = description;
            }
            if let Some(image) = edit.image {
                record.image = Some(image);
            }

            events_table.insert(&id, &record)?;

            let details = Self::read_event_details_tx(
                id,
                &events_table,
                &rsvps_table,
                &comments_table,
                &genres_table,
            )?
            .expect("Just updated");
            Ok(EventWriteOutcome::Done(details))
        })
        .await
    }

    /// Set-exclusive interested/going transition
    ///
    /// A single row per (event, user) holds the membership, so "going"
    /// replacing "interested" (and vice versa) is a plain overwrite inside
    /// one write transaction; concurrent submissions serialize on the
    /// store's single writer and the sets can never both contain the user.
    pub async fn set_rsvp(
        &self,
        actor: &Username,
        id: EventId,
        state: RsvpState,
    ) -> StoreResult<Option<EventDetails>> {
        let actor = actor.clone();
        self.write_with(move |tx| {
            let events_table = tx.open_table(&events::TABLE)?;
            let mut rsvps_table = tx.open_table(&event_rsvps::TABLE)?;
            let comments_table = tx.open_table(&event_comments::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            if events_table.get(&id)?.is_none() {
                return Ok(None);
            }

            let key = (id, actor);
            match state {
                RsvpState::None => {
                    rsvps_table.remove(&key)?;
                }
                RsvpState::Interested => {
                    rsvps_table.insert(
                        &key,
                        &RsvpRecord {
                            kind: RsvpKind::Interested,
                            since: Timestamp::now(),
                        },
                    )?;
                }
                RsvpState::Going => {
                    rsvps_table.insert(
                        &key,
                        &RsvpRecord {
                            kind: RsvpKind::Going,
                            since: Timestamp::now(),
                        },
                    )?;
                }
            }

            Self::read_event_details_tx(
                id,
                &events_table,
                &rsvps_table,
                &comments_table,
                &genres_table,
            )
        })
        .await
    }

    pub async fn add_event_comment(
        &self,
        author: &Username,
        id: EventId,
        text: String,
    ) -> StoreResult<Option<CommentView>> {
        let author = author.clone();
        self.write_with(move |tx| {
            let events_table = tx.open_table(&events::TABLE)?;
            let mut comments_table = tx.open_table(&event_comments::TABLE)?;

            if events_table.get(&id)?.is_none() {
                return Ok(None);
            }

            let comment_id = CommentId::generate();
            // Clock ties would make key order diverge from creation order;
            // nudge past the newest existing comment.
            let last_ts = comments_table
                .range((id, Timestamp::ZERO, CommentId::ZERO)..=(id, Timestamp::MAX, CommentId::MAX))?
                .next_back()
                .transpose()?
                .map(|(k, _)| k.value().1);
            let mut created_at = Timestamp::now();
            if let Some(last_ts) = last_ts {
                if created_at <= last_ts {
                    created_at = Timestamp(last_ts.0 + 1);
                }
            }
            comments_table.insert(
                &(id, created_at, comment_id),
                &CommentRecord {
                    author: author.clone(),
                    text: text.clone(),
                },
            )?;

            Ok(Some(CommentView {
                id: comment_id,
                author,
                text,
                created_at,
            }))
        })
        .await
    }

    pub(crate) fn read_event_details_tx(
        id: EventId,
        events_table: &impl events::ReadableTable,
        rsvps_table: &impl event_rsvps::ReadableTable,
        comments_table: &impl event_comments::ReadableTable,
        genres_table: &impl genres::ReadableTable,
    ) -> StoreResult<Option<EventDetails>> {
        let Some(record) = events_table.get(&id)?.map(|g| g.value()) else {
            return Ok(None);
        };

        let mut interested = vec![];
        let mut going = vec![];
        for rsvp in rsvps_table
            .range((id, Username::range_min())..=(id, Username::range_max()))?
        {
            let (k, v) = rsvp?;
            let (_, username) = k.value();
            match v.value().kind {
                RsvpKind::Interested => interested.push(username),
                RsvpKind::Going => going.push(username),
            }
        }

        let comments = Self::read_comment_range_tx(
            (id, Timestamp::ZERO, CommentId::ZERO)..=(id, Timestamp::MAX, CommentId::MAX),
            comments_table,
        )?;

        let genres = Self::resolve_genres_tx(&record.genres, genres_table)?;

        Ok(Some(EventDetails {
            id,
            name: record.name,
            organiser: record.organiser,
            venue: Venue {
                address: record.venue_address,
                latitude: record.latitude,
                longitude: record.longitude,
            },
            starts_at: record.starts_at,
            ends_at: record.ends_at,
            genres,
            description: record.description,
            image: record.image,
            interested,
            going,
            comments,
        }))
    }

    /// Comments come back in key order, which is creation order.
    pub(crate) fn read_comment_range_tx<K>(
        range: impl std::ops::RangeBounds<K>,
        table: &impl redb_bincode::ReadableTable<K, CommentRecord>,
    ) -> StoreResult<Vec<CommentView>>
    where
        K: bincode::Encode + bincode::Decode<()> + CommentKeyed,
    {
        table
            .range(range)?
            .map(|res| {
                let (k, v) = res?;
                let (created_at, comment_id) = k.value().comment_key();
                let record = v.value();
                Ok(CommentView {
                    id: comment_id,
                    author: record.author,
                    text: record.text,
                    created_at,
                })
            })
            .collect()
    }
}

/// Composite comment keys, whatever the parent entity
pub trait CommentKeyed {
    fn comment_key(&self) -> (Timestamp, CommentId);
}

impl CommentKeyed for (EventId, Timestamp, CommentId) {
    fn comment_key(&self) -> (Timestamp, CommentId) {
        (self.1, self.2)
    }
}

impl CommentKeyed for (musicbee_core::StoryId, Timestamp, CommentId) {
    fn comment_key(&self) -> (Timestamp, CommentId) {
        (self.1, self.2)
    }
}
