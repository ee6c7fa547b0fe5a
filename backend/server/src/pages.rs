//! # Pages
//!
//! Server-rendered HTML. Every page sits inside [`Document`] and
//! [`ErrorHandlerProvider`], so the browser half of the error observer (see
//! [`crate::observer`]) is registered once for the whole tree.
use axum::response::{Html, Redirect};
use leptos::prelude::*;

use crate::components::{BannerForm, Document, ErrorHandlerProvider};

pub const APP_TITLE: &str = "AutoYouBanner - YouTube Banner Generator";

#[component]
pub fn CreatePage() -> impl IntoView {
    view! {
        <div class="container">
            <div style="margin-bottom:2rem">
                <h1>"Create a YouTube Banner"</h1>
                <p class="hint">
                    "Fill in the details below to generate a professional YouTube channel banner"
                </p>
            </div>
            <BannerForm/>
        </div>
    }
}

pub fn render_create_page() -> String {
    let owner = Owner::new_root(None);
    owner.with(|| {
        view! {
            <Document title=APP_TITLE>
                <ErrorHandlerProvider>
                    <CreatePage/>
                </ErrorHandlerProvider>
            </Document>
        }
        .to_html()
    })
}

pub async fn create_handler() -> Html<String> {
    Html(render_create_page())
}

pub async fn index_handler() -> Redirect {
    Redirect::to("/create")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_page_composes_heading_and_form() {
        let page = render_create_page();

        assert!(page.contains("<!DOCTYPE html>"));
        assert!(page.contains(APP_TITLE));
        assert!(page.contains("Create a YouTube Banner"));
        assert!(page.contains(r#"id="banner-form""#));
        assert!(page.contains(r#"name="channelName""#));
    }

    #[test]
    fn error_listeners_are_registered_once() {
        let page = render_create_page();

        assert_eq!(page.matches("window.__bannerErrorObserver = true").count(), 1);
        assert!(page.contains(r#"addEventListener("unhandledrejection""#));
        assert!(page.contains("/api/logs"));
    }
}
