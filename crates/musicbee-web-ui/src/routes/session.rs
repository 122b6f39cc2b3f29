use std::str::FromStr as _;

use axum::Form;
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request;
use axum::response::{IntoResponse, Redirect};
use maud::html;
use musicbee_core::entity::SignInRequest;
use musicbee_core::id::Username;
use serde::Deserialize;
use tower_sessions::Session;

use super::Maud;
use crate::SharedState;
use crate::error::{InternalServerSnafu, LoginRequiredSnafu, RequestError, RequestResult};

pub const SESSION_KEY: &str = "musicbee_username";

/// The viewer's session context, threaded explicitly into every render
/// that needs identity; nothing reads it as ambient state.
#[derive(Clone, Debug, Default)]
pub struct MaybeSession(Option<Username>);

impl MaybeSession {
    pub fn username(&self) -> Option<&Username> {
        self.0.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.0.is_some()
    }
}

/// Like [`MaybeSession`], but extraction fails with a sign-in redirect when
/// nobody is signed in.
#[derive(Clone, Debug)]
pub struct UserSession {
    username: Username,
}

impl UserSession {
    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn as_maybe(&self) -> MaybeSession {
        MaybeSession(Some(self.username.clone()))
    }
}

async fn session_username<S>(
    req: &mut request::Parts,
    state: &S,
) -> Result<Option<Username>, RequestError>
where
    S: Send + Sync,
{
    let session = Session::from_request_parts(req, state)
        .await
        .map_err(|(_, msg)| InternalServerSnafu { msg }.build())?;

    session.get(SESSION_KEY).await.map_err(|_| {
        InternalServerSnafu {
            msg: "session store error",
        }
        .build()
    })
}

impl<S> FromRequestParts<S> for MaybeSession
where
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeSession(session_username(req, state).await?))
    }
}

impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
{
    type Rejection = RequestError;

    async fn from_request_parts(
        req: &mut request::Parts,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let redirect = Some(req.uri.path().to_owned());
        let username = session_username(req, state).await?.ok_or_else(|| {
            LoginRequiredSnafu { redirect }.build()
        })?;

        Ok(UserSession { username })
    }
}

#[derive(Deserialize, Default)]
pub struct SignInQuery {
    pub redirect: Option<String>,
}

#[derive(Deserialize)]
pub struct SignInForm {
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub redirect: Option<String>,
}

pub async fn get_sign_in(
    state: State<SharedState>,
    session: MaybeSession,
    Query(query): Query<SignInQuery>,
) -> RequestResult<impl IntoResponse> {
    let content = html! {
        div ."o-signIn" {
            h1 { "Sign in to Musicbee" }
            p ."o-signIn__hint" {
                "Your identity provider has vouched for you; pick the username it assigned."
            }
            form ."o-signIn__form" action="/signin" method="post" {
                @if let Some(redirect) = &query.redirect {
                    input type="hidden" name="redirect" value=(redirect);
                }
                label { "Username"
                    input type="text" name="username" required placeholder="lowercase_name" {}
                }
                label { "Display name"
                    input type="text" name="display_name" required {}
                }
                label { "Email"
                    input type="email" name="email" required {}
                }
                button ."u-button" type="submit" { "Sign in" }
            }
        }
    };
    Ok(Maud(state.render_page("Sign in - Musicbee", &session, content)))
}

pub async fn post_sign_in(
    state: State<SharedState>,
    session: Session,
    Form(form): Form<SignInForm>,
) -> RequestResult<impl IntoResponse> {
    let Ok(username) = Username::from_str(&form.username) else {
        let maybe = MaybeSession::default();
        let content = html! {
            div ."o-signIn" {
                div ."o-notice -error" {
                    p { "Usernames are 3-32 lowercase letters, digits or underscores" }
                }
                a href="/signin" { "Try again" }
            }
        };
        return Ok(Maud(state.render_page("Sign in - Musicbee", &maybe, content)).into_response());
    };

    let client = state.client_for(&username).await?;
    client
        .sign_in(&SignInRequest {
            username: username.clone(),
            display_name: if form.display_name.is_empty() {
                username.to_string()
            } else {
                form.display_name
            },
            email: form.email,
        })
        .await?;

    session
        .insert(SESSION_KEY, username)
        .await
        .map_err(|_| {
            InternalServerSnafu {
                msg: "session store error",
            }
            .build()
        })?;

    let target = form.redirect.filter(|r| r.starts_with('/'));
    Ok(Redirect::to(target.as_deref().unwrap_or("/")).into_response())
}

pub async fn post_sign_out(
    state: State<SharedState>,
    session: Session,
    maybe: MaybeSession,
) -> RequestResult<impl IntoResponse> {
    if let Some(username) = maybe.username() {
        // Best-effort: the viewer session ends either way.
        let _ = state.client_for(username).await?.sign_out().await;
    }

    session.flush().await.map_err(|_| {
        InternalServerSnafu {
            msg: "session store error",
        }
        .build()
    })?;

    Ok(Redirect::to("/"))
}
