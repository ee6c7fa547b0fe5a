//! # Components
//!
//! Leptos components rendered on the server only, there is no hydration.
//! Client behaviour ships as plain scripts next to the markup.
use leptos::prelude::*;

const STYLES: &str = include_str!("../assets/styles.css");
const ERROR_OBSERVER_SCRIPT: &str = include_str!("../assets/error_observer.js");
const BANNER_FORM_SCRIPT: &str = include_str!("../assets/banner_form.js");

#[component]
pub fn Document(#[prop(into)] title: String, children: Children) -> impl IntoView {
    view! {
        <!DOCTYPE html>
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <meta
                    name="description"
                    content="Generate a YouTube channel banner in one click, in the style you want"
                />
                <title>{title}</title>
                <style inner_html=STYLES></style>
            </head>
            <body>{children()}</body>
        </html>
    }
}

/// Wraps the whole tree once and registers the browser error listeners.
///
/// The script sets a window flag on first run, so mounting this twice on a
/// page still leaves one pair of listeners.
#[component]
pub fn ErrorHandlerProvider(children: Children) -> impl IntoView {
    view! {
        <script inner_html=ERROR_OBSERVER_SCRIPT></script>
        {children()}
    }
}

#[component]
pub fn BannerForm() -> impl IntoView {
    let styles = [
        ("gaming", "Gaming"),
        ("vlog", "Vlog"),
        ("technology", "Technology"),
        ("education", "Education"),
        ("art", "Art"),
        ("music", "Music"),
    ];

    view! {
        <form id="banner-form" class="panel">
            <div class="field">
                <label for="channelName">
                    "Channel name " <span style="color:#ef4444">"*"</span>
                </label>
                <input type="text" id="channelName" name="channelName" required=true/>
            </div>

            <div class="field">
                <label for="slogan">"Channel slogan / description"</label>
                <textarea id="slogan" name="slogan" rows="2"></textarea>
            </div>

            <div class="row field">
                <div>
                    <label for="style">"Banner style"</label>
                    <select id="style" name="style">
                        {styles
                            .into_iter()
                            .map(|(value, label)| view! { <option value=value>{label}</option> })
                            .collect_view()}
                    </select>
                </div>
                <div>
                    <label for="color">"Theme color"</label>
                    <input type="color" id="color" name="color" value="#3b82f6"/>
                </div>
            </div>

            <div id="banner-error" class="error" hidden=true></div>

            <button type="submit" id="banner-submit">"Generate banner"</button>

            <p id="banner-status" class="hint" hidden=true></p>
            <img
                id="banner-result"
                alt="Generated banner"
                style="width:100%;margin-top:1rem"
                hidden=true
            />
        </form>
        <script inner_html=BANNER_FORM_SCRIPT></script>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render<F, V>(view: F) -> String
    where
        F: FnOnce() -> V,
        V: RenderHtml,
    {
        let owner = Owner::new_root(None);
        owner.with(|| view().to_html())
    }

    #[test]
    fn banner_form_lists_every_style() {
        let html = render(|| view! { <BannerForm/> });

        for style in ["gaming", "vlog", "technology", "education", "art", "music"] {
            assert!(html.contains(&format!(r#"value="{style}""#)), "{style}");
        }
        assert!(html.contains(r#"name="channelName""#));
        assert!(html.contains("POLL_INTERVAL_MS"));
    }

    #[test]
    fn scripts_are_not_escaped() {
        let html = render(|| view! { <ErrorHandlerProvider>"x"</ErrorHandlerProvider> });

        assert!(html.contains("event.error && event.error.name"));
        assert!(!html.contains("&amp;&amp;"));
    }
}
