use maud::{DOCTYPE, Markup, html};

use crate::UiState;
use crate::routes::session::MaybeSession;

impl UiState {
    /// Html page header
    pub(crate) fn render_html_head(&self, page_title: &str) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en";
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                meta name="color-scheme" content="light dark";
                link rel="stylesheet" type="text/css" href="/assets/style.css";
                link rel="icon" type="image/svg+xml" href="/assets/favicon.svg";
                title { (page_title) }
                script defer src="/assets/relay.js" {}
            }
        }
    }

    pub(crate) fn render_html_page(&self, title: &str, content: Markup) -> Markup {
        html! {
            (self.render_html_head(title))
            body ."o-body" {
                div ."o-pageLayout" { (content) }
            }
        }
    }

    /// Standard page: navbar on top, main content under it.
    pub(crate) fn render_page(
        &self,
        title: &str,
        session: &MaybeSession,
        main_content: Markup,
    ) -> Markup {
        let content = html! {
            (self.render_nav_bar(session))
            main ."o-mainBar" {
                (main_content)
            }
        };
        self.render_html_page(title, content)
    }

    pub(crate) fn render_nav_bar(&self, session: &MaybeSession) -> Markup {
        html! {
            nav ."o-navBar" {
                a ."o-navBar__brand" href="/" { "Musicbee" }
                div ."o-navBar__list" {
                    a ."o-navBar__item" href="/" { "Events" }
                    a ."o-navBar__item" href="/genres" { "Genres" }
                    @if let Some(username) = session.username() {
                        a ."o-navBar__item" href="/feed" { "Feed" }
                        a ."o-navBar__item" href=(format!("/profile/{username}")) { (username) }
                        form ."o-navBar__signOut" action="/signout" method="post" {
                            button ."u-button" type="submit" { "Sign out" }
                        }
                    } @else {
                        a ."o-navBar__item" href="/signin" { "Sign in" }
                    }
                }
            }
        }
    }
}
