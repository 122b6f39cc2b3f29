use musicbee_core::entity::{CommentView, StoryCreate, StoryDetails};
use musicbee_core::id::Username;
use musicbee_core::{CommentId, EventId, StoryId, Timestamp};
use redb_bincode::ReadableTable as _;

use super::{
    CommentRecord, Store, StoreResult, StoryRecord, WriteOutcome, events, images, stories,
    stories_by_event, stories_by_owner, stories_by_time, story_comments, story_likes,
};

#[derive(Debug)]
pub enum StoryCreateOutcome {
    Created(StoryDetails),
    UnknownEvent,
    UnknownImage,
}

impl Store {
    pub async fn create_story(
        &self,
        owner: &Username,
        create: StoryCreate,
    ) -> StoreResult<StoryCreateOutcome> {
        let owner = owner.clone();
        self.write_with(move |tx| {
            let events_table = tx.open_table(&events::TABLE)?;
            let images_table = tx.open_table(&images::TABLE)?;
            let mut stories_table = tx.open_table(&stories::TABLE)?;
            let mut by_time_table = tx.open_table(&stories_by_time::TABLE)?;
            let mut by_owner_table = tx.open_table(&stories_by_owner::TABLE)?;
            let mut by_event_table = tx.open_table(&stories_by_event::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            if images_table.get(&create.image)?.is_none() {
                return Ok(StoryCreateOutcome::UnknownImage);
            }
            if let Some(event) = create.event {
                if events_table.get(&event)?.is_none() {
                    return Ok(StoryCreateOutcome::UnknownEvent);
                }
            }

            let id = StoryId::generate();
            let record = StoryRecord {
                owner: owner.clone(),
                image: create.image,
                caption: create.caption,
                location: create.location,
                created_at: Timestamp::now(),
                event: create.event,
            };

            by_time_table.insert(&(record.created_at, id), &())?;
            by_owner_table.insert(&(owner, id), &())?;
            if let Some(event) = record.event {
                by_event_table.insert(&(event, id), &())?;
            }
            stories_table.insert(&id, &record)?;

            let details =
                Self::read_story_details_tx(id, &stories_table, &likes_table, &comments_table)?
                    .expect("Just inserted");
            Ok(StoryCreateOutcome::Created(details))
        })
        .await
    }

    pub async fn get_story_details(&self, id: StoryId) -> StoreResult<Option<StoryDetails>> {
        self.read_with(|tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            Self::read_story_details_tx(id, &stories_table, &likes_table, &comments_table)
        })
        .await
    }

    pub async fn stories_of_user(&self, owner: &Username) -> StoreResult<Vec<StoryDetails>> {
        let owner = owner.clone();
        self.read_with(|tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let by_owner_table = tx.open_table(&stories_by_owner::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            let mut ret = vec![];
            for record in by_owner_table
                .range((owner.clone(), StoryId::ZERO)..=(owner.clone(), StoryId::MAX))?
            {
                let (k, _) = record?;
                let (_, story_id) = k.value();
                if let Some(details) = Self::read_story_details_tx(
                    story_id,
                    &stories_table,
                    &likes_table,
                    &comments_table,
                )? {
                    ret.push(details);
                }
            }
            // Index order is by id; the profile grid wants newest first.
            ret.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(ret)
        })
        .await
    }

    pub async fn stories_of_event(&self, event: EventId) -> StoreResult<Vec<StoryDetails>> {
        self.read_with(|tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let by_event_table = tx.open_table(&stories_by_event::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            let mut ret = vec![];
            for record in
                by_event_table.range((event, StoryId::ZERO)..=(event, StoryId::MAX))?
            {
                let (k, _) = record?;
                let (_, story_id) = k.value();
                if let Some(details) = Self::read_story_details_tx(
                    story_id,
                    &stories_table,
                    &likes_table,
                    &comments_table,
                )? {
                    ret.push(details);
                }
            }
            ret.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(ret)
        })
        .await
    }

    /// Stories of the users `viewer` follows, newest first
    pub async fn story_feed(&self, viewer: &Username, limit: usize) -> StoreResult<Vec<StoryDetails>> {
        let followees = self.followees_of(viewer).await?;
        self.read_with(|tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let by_time_table = tx.open_table(&stories_by_time::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            let mut ret = vec![];
            for record in by_time_table.range(..)?.rev() {
                if limit <= ret.len() {
                    break;
                }
                let (k, _) = record?;
                let (_, story_id) = k.value();

                let Some(details) = Self::read_story_details_tx(
                    story_id,
                    &stories_table,
                    &likes_table,
                    &comments_table,
                )?
                else {
                    continue;
                };

                if !followees.contains(&details.owner) {
                    continue;
                }

                ret.push(details);
            }
            Ok(ret)
        })
        .await
    }

    pub async fn edit_story_caption(
        &self,
        actor: &Username,
        id: StoryId,
        caption: Option<String>,
    ) -> StoreResult<WriteOutcome<StoryDetails>> {
        let actor = actor.clone();
        self.write_with(move |tx| {
            let mut stories_table = tx.open_table(&stories::TABLE)?;
            let likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            let Some(mut record) = stories_table.get(&id)?.map(|g| g.value()) else {
                return Ok(WriteOutcome::NotFound);
            };

            if record.owner != actor {
                return Ok(WriteOutcome::Denied);
            }

            record.caption = caption;
            stories_table.insert(&id, &record)?;

            let details =
                Self::read_story_details_tx(id, &stories_table, &likes_table, &comments_table)?
                    .expect("Just updated");
            Ok(WriteOutcome::Done(details))
        })
        .await
    }

    pub async fn delete_story(
        &self,
        actor: &Username,
        id: StoryId,
    ) -> StoreResult<WriteOutcome<()>> {
        let actor = actor.clone();
        self.write_with(move |tx| {
            let mut stories_table = tx.open_table(&stories::TABLE)?;
            let mut by_time_table = tx.open_table(&stories_by_time::TABLE)?;
            let mut by_owner_table = tx.open_table(&stories_by_owner::TABLE)?;
            let mut by_event_table = tx.open_table(&stories_by_event::TABLE)?;
            let mut likes_table = tx.open_table(&story_likes::TABLE)?;
            let mut comments_table = tx.open_table(&story_comments::TABLE)?;

            let Some(record) = stories_table.get(&id)?.map(|g| g.value()) else {
                return Ok(WriteOutcome::NotFound);
            };

            if record.owner != actor {
                return Ok(WriteOutcome::Denied);
            }

            stories_table.remove(&id)?;
            by_time_table.remove(&(record.created_at, id))?;
            by_owner_table.remove(&(record.owner, id))?;
            if let Some(event) = record.event {
                by_event_table.remove(&(event, id))?;
            }
            let like_keys = likes_table
                .range((id, Username::range_min())..=(id, Username::range_max()))?
                .map(|res| Ok(res?.0.value()))
                .collect::<StoreResult<Vec<_>>>()?;
            for key in like_keys {
                likes_table.remove(&key)?;
            }

            let comment_keys = comments_table
                .range((id, Timestamp::ZERO, CommentId::ZERO)..=(id, Timestamp::MAX, CommentId::MAX))?
                .map(|res| Ok(res?.0.value()))
                .collect::<StoreResult<Vec<_>>>()?;
            for key in comment_keys {
                comments_table.remove(&key)?;
            }

            Ok(WriteOutcome::Done(()))
        })
        .await
    }

    /// Like is a set-membership toggle
    pub async fn toggle_story_like(
        &self,
        actor: &Username,
        id: StoryId,
    ) -> StoreResult<Option<StoryDetails>> {
        let actor = actor.clone();
        self.write_with(move |tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let mut likes_table = tx.open_table(&story_likes::TABLE)?;
            let comments_table = tx.open_table(&story_comments::TABLE)?;

            if stories_table.get(&id)?.is_none() {
                return Ok(None);
            }

            let key = (id, actor);
            if likes_table.remove(&key)?.is_none() {
                likes_table.insert(&key, &())?;
            }

            Self::read_story_details_tx(id, &stories_table, &likes_table, &comments_table)
        })
        .await
    }

    pub async fn add_story_comment(
        &self,
        author: &Username,
        id: StoryId,
        text: String,
    ) -> StoreResult<Option<CommentView>> {
        let author = author.clone();
        self.write_with(move |tx| {
            let stories_table = tx.open_table(&stories::TABLE)?;
            let mut comments_table = tx.open_table(&story_comments::TABLE)?;

            if stories_table.get(&id)?.is_none() {
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

    pub(crate) fn read_story_details_tx(
        id: StoryId,
        stories_table: &impl stories::ReadableTable,
        likes_table: &impl story_likes::ReadableTable,
        comments_table: &impl story_comments::ReadableTable,
    ) -> StoreResult<Option<StoryDetails>> {
        let Some(record) = stories_table.get(&id)?.map(|g| g.value()) else {
            return Ok(None);
        };

        let likes = likes_table
            .range((id, Username::range_min())..=(id, Username::range_max()))?
            .map(|res| Ok(res?.0.value().1))
            .collect::<StoreResult<Vec<_>>>()?;

        let comments = Self::read_comment_range_tx(
            (id, Timestamp::ZERO, CommentId::ZERO)..=(id, Timestamp::MAX, CommentId::MAX),
            comments_table,
        )?;

        Ok(Some(StoryDetails {
            id,
            owner: record.owner,
            image: record.image,
            caption: record.caption,
            location: record.location,
            created_at: record.created_at,
            event: record.event,
            likes,
            comments,
        }))
    }
}
