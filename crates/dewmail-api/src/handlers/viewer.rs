//! Demo viewer page.
//!
//! Renders a single HTML page embedding the most recently received
//! message verbatim from the demo log file. The page is the public face
//! of the demo deployment, so the markup stays deliberately plain.

use axum::{extract::State, response::Html};
use tracing::{debug, instrument};

use crate::server::AppState;

/// Serves the demo landing page with the last received message inlined.
///
/// A missing or unreadable log file renders as an empty `<pre>` block
/// rather than an error; the page must always load.
#[instrument(name = "demo_viewer", skip(state))]
pub async fn viewer_page(State(state): State<AppState>) -> Html<String> {
    let last_message = tokio::fs::read_to_string(&state.demo_log_path).await.unwrap_or_default();

    debug!(bytes = last_message.len(), "rendering demo viewer");

    Html(render_page(&last_message))
}

fn render_page(last_message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <title>Dewmail Demo</title>\n\
         </head>\n\
         <body>\n\
         <h1>Dewmail Demo</h1>\n\
         <p>Send an email to <a href=\"mailto:test@demo.dewmail.io\">test@demo.dewmail.io</a> \
         and refresh this page to see the message it relayed.</p>\n\
         <h2>Last message received</h2>\n\
         <pre style=\"padding: 2em; background-color: #eee;\">{last_message}</pre>\n\
         </body>\n\
         </html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_message_verbatim() {
        let page = render_page("{\"from\":\"t*****@demo.example\"}");
        assert!(page.contains("<pre style=\"padding: 2em; background-color: #eee;\">{\"from\":\"t*****@demo.example\"}</pre>"));
    }

    #[test]
    fn empty_message_renders_empty_pre() {
        let page = render_page("");
        assert!(page.contains("<pre style=\"padding: 2em; background-color: #eee;\"></pre>"));
        assert!(page.contains("mailto:test@demo.dewmail.io"));
    }
}
