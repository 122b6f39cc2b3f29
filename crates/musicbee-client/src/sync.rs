//! The sync controller
//!
//! Remote-first view loading: one attempt against the remote store, then an
//! immediate fall back to the local mirror, and a best-effort write-through
//! of whatever the remote returned. No retries, no backoff, no timeout
//! beyond the transport's own.

use musicbee_client_db::{
    EventMirrorRecord, GenreMirrorRecord, StoryMirrorRecord, UserMirrorRecord,
};
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{EventId, StoryId, Timestamp};
use musicbee_util_error::FmtCompact as _;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::{Client, LOG_TARGET};

/// What a view load produced
///
/// `Cached` carries the same record shape as `Fresh`, so renderers don't
/// care where the data came from; they only get to mention it is stale.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState<T> {
    Fresh(T),
    Cached(T),
    Unavailable,
}

impl<T> ViewState<T> {
    pub fn is_fresh(&self) -> bool {
        matches!(self, ViewState::Fresh(_))
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, ViewState::Cached(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            ViewState::Fresh(value) | ViewState::Cached(value) => Some(value),
            ViewState::Unavailable => None,
        }
    }
}

/// Tracks the in-flight work of one view
///
/// Every write-through spawned while loading a view lands here. Dropping
/// the context aborts whatever is still running, so a torn-down view leaves
/// nothing behind; call [`ViewContext::finish`] instead to let the
/// best-effort writes run to completion.
#[derive(Debug, Default)]
pub struct ViewContext {
    tasks: JoinSet<()>,
}

impl ViewContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn track(&mut self, fut: impl Future<Output = ()> + Send + 'static) {
        self.tasks.spawn(fut);
    }

    /// Detach the tracked tasks and let them drain in the background.
    pub fn finish(mut self) {
        tokio::spawn(async move { while self.tasks.join_next().await.is_some() {} });
    }

    /// Wait for every tracked task; write-through is best-effort, so this
    /// only matters when something needs to observe the mirror afterwards.
    pub async fn drain(&mut self) {
        while self.tasks.join_next().await.is_some() {}
    }
}

macro_rules! mirror_put_later {
    ($fn_name:ident, $put:ident, $record:ty) => {
        fn $fn_name(&self, ctx: &mut ViewContext, record: $record) {
            let mirror = self.mirror.clone();
            ctx.track(async move {
                if let Err(err) = mirror.$put(record).await {
                    // Best-effort: a stale cache is acceptable degradation,
                    // but the degradation should be visible in the logs.
                    warn!(
                        target: LOG_TARGET,
                        err = %err.fmt_compact(),
                        "Mirror write-through failed"
                    );
                }
            });
        }
    };
}

impl Client {
    mirror_put_later!(put_user_later, put_user, UserMirrorRecord);
    mirror_put_later!(put_event_later, put_event, EventMirrorRecord);
    mirror_put_later!(put_story_later, put_story, StoryMirrorRecord);
    mirror_put_later!(put_genre_later, put_genre, GenreMirrorRecord);

    pub async fn load_user(
        &self,
        ctx: &mut ViewContext,
        username: &Username,
    ) -> ViewState<UserMirrorRecord> {
        match self.fetch_user(username).await {
            Ok(profile) => {
                let record = UserMirrorRecord::snapshot(&profile, Timestamp::now());
                self.put_user_later(ctx, record.clone());
                ViewState::Fresh(record)
            }
            Err(err) => {
                debug!(target: LOG_TARGET, %username, err = %err.fmt_compact(), "Remote user load failed, trying mirror");
                match self.mirror.get_user(username).await {
                    Ok(Some(record)) => ViewState::Cached(record),
                    Ok(None) => ViewState::Unavailable,
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    pub async fn load_event(
        &self,
        ctx: &mut ViewContext,
        id: EventId,
    ) -> ViewState<EventMirrorRecord> {
        match self.fetch_event(id).await {
            Ok(details) => {
                let record = EventMirrorRecord::snapshot(&details, Timestamp::now());
                self.put_event_later(ctx, record.clone());
                ViewState::Fresh(record)
            }
            Err(err) => {
                debug!(target: LOG_TARGET, %id, err = %err.fmt_compact(), "Remote event load failed, trying mirror");
                match self.mirror.get_event(id).await {
                    Ok(Some(record)) => ViewState::Cached(record),
                    Ok(None) => ViewState::Unavailable,
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    pub async fn load_story(
        &self,
        ctx: &mut ViewContext,
        id: StoryId,
    ) -> ViewState<StoryMirrorRecord> {
        match self.fetch_story(id).await {
            Ok(details) => {
                let record = StoryMirrorRecord::snapshot(&details, Timestamp::now());
                self.put_story_later(ctx, record.clone());
                ViewState::Fresh(record)
            }
            Err(err) => {
                debug!(target: LOG_TARGET, %id, err = %err.fmt_compact(), "Remote story load failed, trying mirror");
                match self.mirror.get_story(id).await {
                    Ok(Some(record)) => ViewState::Cached(record),
                    Ok(None) => ViewState::Unavailable,
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    /// Upcoming events, optionally narrowed to one genre
    pub async fn load_upcoming_events(
        &self,
        ctx: &mut ViewContext,
        genre: Option<&GenreId>,
    ) -> ViewState<Vec<EventMirrorRecord>> {
        match self.fetch_upcoming_events(genre).await {
            Ok(events) => {
                let fetched_at = Timestamp::now();
                let records: Vec<_> = events
                    .iter()
                    .map(|event| EventMirrorRecord::snapshot(event, fetched_at))
                    .collect();
                // One put per item; commit order across items is left to the
                // runtime.
                for record in &records {
                    self.put_event_later(ctx, record.clone());
                }
                ViewState::Fresh(records)
            }
            Err(err) => {
                debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Remote event list failed, trying mirror");
                let genre_name = match genre {
                    Some(id) => match self.mirror.get_genre(id).await {
                        Ok(genre) => genre.map(|g| g.name),
                        Err(_) => None,
                    },
                    None => None,
                };
                match self.mirror.all_events().await {
                    Ok(mut records) => {
                        if let Some(name) = genre_name {
                            records.retain(|record| record.genre_names.contains(&name));
                        }
                        records.sort_by_key(|record| record.starts_at);
                        ViewState::Cached(records)
                    }
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    pub async fn load_user_stories(
        &self,
        ctx: &mut ViewContext,
        username: &Username,
    ) -> ViewState<Vec<StoryMirrorRecord>> {
        match self.fetch_user_stories(username).await {
            Ok(stories) => ViewState::Fresh(self.snapshot_stories(ctx, &stories)),
            Err(err) => {
                debug!(target: LOG_TARGET, %username, err = %err.fmt_compact(), "Remote story list failed, trying mirror");
                match self.mirror.stories_by_owner(username).await {
                    Ok(records) => ViewState::Cached(records),
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    pub async fn load_event_stories(
        &self,
        ctx: &mut ViewContext,
        id: EventId,
    ) -> ViewState<Vec<StoryMirrorRecord>> {
        match self.fetch_event_stories(id).await {
            Ok(stories) => ViewState::Fresh(self.snapshot_stories(ctx, &stories)),
            Err(err) => {
                debug!(target: LOG_TARGET, %id, err = %err.fmt_compact(), "Remote story list failed, trying mirror");
                match self.mirror.stories_by_event(id).await {
                    Ok(records) => ViewState::Cached(records),
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    /// Stories of followed users
    ///
    /// The mirror has no idea who follows whom, so offline the fallback is
    /// everything it holds. Lossier than the live feed, still better than a
    /// blank page.
    pub async fn load_feed(&self, ctx: &mut ViewContext) -> ViewState<Vec<StoryMirrorRecord>> {
        match self.fetch_feed().await {
            Ok(stories) => ViewState::Fresh(self.snapshot_stories(ctx, &stories)),
            Err(err) => {
                debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Remote feed failed, trying mirror");
                match self.mirror.all_stories().await {
                    Ok(mut records) => {
                        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                        ViewState::Cached(records)
                    }
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    pub async fn load_genres(&self, ctx: &mut ViewContext) -> ViewState<Vec<GenreMirrorRecord>> {
        match self.fetch_genres().await {
            Ok(genres) => {
                let records: Vec<_> = genres
                    .into_iter()
                    .map(|genre| GenreMirrorRecord {
                        id: genre.id,
                        name: genre.name,
                    })
                    .collect();
                for record in &records {
                    self.put_genre_later(ctx, record.clone());
                }
                ViewState::Fresh(records)
            }
            Err(err) => {
                debug!(target: LOG_TARGET, err = %err.fmt_compact(), "Remote genre list failed, trying mirror");
                match self.mirror.all_genres().await {
                    Ok(records) if !records.is_empty() => ViewState::Cached(records),
                    Ok(_) => ViewState::Unavailable,
                    Err(err) => {
                        warn!(target: LOG_TARGET, err = %err.fmt_compact(), "Mirror read failed");
                        ViewState::Unavailable
                    }
                }
            }
        }
    }

    fn snapshot_stories(
        &self,
        ctx: &mut ViewContext,
        stories: &[musicbee_core::entity::StoryDetails],
    ) -> Vec<StoryMirrorRecord> {
        let fetched_at = Timestamp::now();
        let records: Vec<_> = stories
            .iter()
            .map(|story| StoryMirrorRecord::snapshot(story, fetched_at))
            .collect();
        for record in &records {
            self.put_story_later(ctx, record.clone());
        }
        records
    }
}
