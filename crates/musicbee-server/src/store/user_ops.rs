use musicbee_core::Timestamp;
use musicbee_core::entity::{Genre, ProfileEdit, UserProfile};
use musicbee_core::id::{GenreId, Username};
use redb_bincode::ReadableTable as _;

use super::{
    FollowRecord, Store, StoreResult, UserRecord, genres, user_followers, user_follows, users,
};

/// Outcome of a profile update
#[derive(Debug)]
pub enum ProfileUpdateOutcome {
    Updated(UserProfile),
    NotFound,
    DuplicateEmail,
    UnknownGenre(GenreId),
}

impl Store {
    /// The identity-provider callback analog
    ///
    /// First sign-in creates the account; later sign-ins leave the stored
    /// profile alone. Returns whether the account was created.
    pub async fn upsert_user_on_sign_in(
        &self,
        username: &Username,
        display_name: &str,
        email: &str,
    ) -> StoreResult<bool> {
        let username = username.clone();
        let display_name = display_name.to_owned();
        let email = email.to_owned();
        self.write_with(move |tx| {
            let mut users_table = tx.open_table(&users::TABLE)?;

            if users_table.get(&username)?.is_some() {
                return Ok(false);
            }

            users_table.insert(
                &username,
                &UserRecord {
                    display_name,
                    email,
                    bio: String::new(),
                    avatar: None,
                    favorite_genres: vec![],
                    created_at: Timestamp::now(),
                },
            )?;
            Ok(true)
        })
        .await
    }

    pub async fn get_user_profile(&self, username: &Username) -> StoreResult<Option<UserProfile>> {
        let username = username.clone();
        self.read_with(|tx| {
            let users_table = tx.open_table(&users::TABLE)?;
            let follows_table = tx.open_table(&user_follows::TABLE)?;
            let followers_table = tx.open_table(&user_followers::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            Self::read_profile_tx(
                &username,
                &users_table,
                &follows_table,
                &followers_table,
                &genres_table,
            )
        })
        .await
    }

    pub async fn update_profile(
        &self,
        username: &Username,
        edit: ProfileEdit,
    ) -> StoreResult<ProfileUpdateOutcome> {
        let username = username.clone();
        self.write_with(move |tx| {
            let mut users_table = tx.open_table(&users::TABLE)?;
            let follows_table = tx.open_table(&user_follows::TABLE)?;
            let followers_table = tx.open_table(&user_followers::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            let Some(mut record) = users_table.get(&username)?.map(|g| g.value()) else {
                return Ok(ProfileUpdateOutcome::NotFound);
            };

            if let Some(email) = &edit.email {
                // Linear scan; the unique-email constraint is not worth an
                // index at this scale.
                for user in users_table.range(..)? {
                    let (k, v) = user?;
                    if k.value() != username && v.value().email == *email {
                        return Ok(ProfileUpdateOutcome::DuplicateEmail);
                    }
                }
                record.email = email.clone();
            }

            if let Some(favorite_genres) = &edit.favorite_genres {
                for genre in favorite_genres {
                    if genres_table.get(genre)?.is_none() {
                        return Ok(ProfileUpdateOutcome::UnknownGenre(genre.clone()));
                    }
                }
                record.favorite_genres = favorite_genres.clone();
            }

            if let Some(display_name) = edit.display_name {
                record.display_name = display_name;
            }
            if let Some(bio) = edit.bio {
                record.bio = bio;
            }
            if let Some(avatar) = edit.avatar {
                record.avatar = Some(avatar);
            }

            users_table.insert(&username, &record)?;

            let profile = Self::read_profile_tx(
                &username,
                &users_table,
                &follows_table,
                &followers_table,
                &genres_table,
            )?
            .expect("Just inserted");
            Ok(ProfileUpdateOutcome::Updated(profile))
        })
        .await
    }

    /// Follow/unfollow toggle
    ///
    /// Returns the followee's refreshed profile, or `None` when the followee
    /// does not exist.
    pub async fn toggle_follow(
        &self,
        follower: &Username,
        followee: &Username,
    ) -> StoreResult<Option<UserProfile>> {
        let follower = follower.clone();
        let followee = followee.clone();
        self.write_with(move |tx| {
            let users_table = tx.open_table(&users::TABLE)?;
            let mut follows_table = tx.open_table(&user_follows::TABLE)?;
            let mut followers_table = tx.open_table(&user_followers::TABLE)?;
            let genres_table = tx.open_table(&genres::TABLE)?;

            if users_table.get(&followee)?.is_none() {
                return Ok(None);
            }

            let key = (follower.clone(), followee.clone());
            let reverse_key = (followee.clone(), follower.clone());
            if follows_table.remove(&key)?.is_some() {
                followers_table.remove(&reverse_key)?;
            } else {
                let record = FollowRecord {
                    since: Timestamp::now(),
                };
                follows_table.insert(&key, &record)?;
                followers_table.insert(&reverse_key, &record)?;
            }

            Self::read_profile_tx(
                &followee,
                &users_table,
                &follows_table,
                &followers_table,
                &genres_table,
            )
        })
        .await
    }

    pub async fn followees_of(&self, username: &Username) -> StoreResult<Vec<Username>> {
        let username = username.clone();
        self.read_with(|tx| {
            let follows_table = tx.open_table(&user_follows::TABLE)?;
            Self::read_follow_range_tx(&username, &follows_table)
        })
        .await
    }

    pub(crate) fn read_profile_tx(
        username: &Username,
        users_table: &impl users::ReadableTable,
        follows_table: &impl user_follows::ReadableTable,
        followers_table: &impl user_followers::ReadableTable,
        genres_table: &impl genres::ReadableTable,
    ) -> StoreResult<Option<UserProfile>> {
        let Some(record) = users_table.get(username)?.map(|g| g.value()) else {
            return Ok(None);
        };

        let following = Self::read_follow_range_tx(username, follows_table)?;
        let followers = Self::read_follow_range_tx(username, followers_table)?;
        let favorite_genres = Self::resolve_genres_tx(&record.favorite_genres, genres_table)?;

        Ok(Some(UserProfile {
            username: username.clone(),
            display_name: record.display_name,
            email: record.email,
            bio: record.bio,
            avatar: record.avatar,
            favorite_genres,
            followers,
            following,
        }))
    }

    fn read_follow_range_tx(
        username: &Username,
        table: &impl redb_bincode::ReadableTable<(Username, Username), FollowRecord>,
    ) -> StoreResult<Vec<Username>> {
        table
            .range(
                (username.clone(), Username::range_min())
                    ..=(username.clone(), Username::range_max()),
            )?
            .map(|res| Ok(res?.0.value().1))
            .collect()
    }

    pub(crate) fn resolve_genres_tx(
        ids: &[GenreId],
        genres_table: &impl genres::ReadableTable,
    ) -> StoreResult<Vec<Genre>> {
        let mut ret = vec![];
        for id in ids {
            if let Some(record) = genres_table.get(id)?.map(|g| g.value()) {
                ret.push(Genre {
                    id: id.clone(),
                    name: record.name,
                });
            }
        }
        Ok(ret)
    }
}
