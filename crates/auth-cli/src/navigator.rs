//! Navigation for a terminal: open URLs in the system browser.

use auth_session::Navigator;
use tracing::{debug, warn};

/// Opens every navigation target in the default browser.
///
/// When no browser can be launched the URL is printed so the user can open it
/// by hand.
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn navigate(&self, url: &str) {
        debug!(url = %redact_query(url), "Opening browser");
        if let Err(e) = open::that(url) {
            warn!(error = %e, "Could not launch browser");
            eprintln!("Open this URL in your browser:\n  {}", url);
        }
    }
}

/// URL without its query string; provider URLs carry the state token.
fn redact_query(url: &str) -> &str {
    url.split_once('?').map_or(url, |(base, _)| base)
}
