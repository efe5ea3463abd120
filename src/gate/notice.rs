//! Diagnostic page served to blocked browsers.

/// Issue report describing the Chrome 129 module-loading breakage.
pub const ISSUE_URL: &str =
    "https://github.com/stackblitz/bolt.new/issues/86#issuecomment-2395519258";

/// Fixed HTML body returned when the gate short-circuits a request.
pub const NOTICE_HTML: &str = concat!(
    "<body>",
    "<h1>Please use Chrome Canary for testing.</h1>",
    "<p>Chrome 129 has an issue with JavaScript modules &amp; local development ",
    "servers, see <a href=\"",
    "https://github.com/stackblitz/bolt.new/issues/86#issuecomment-2395519258",
    "\">for more information.</a></p>",
    "<p><b>Note:</b> This only impacts <u>local development</u>. ",
    "Production <code>build</code> and <code>start</code> commands will work fine ",
    "in this browser.</p>",
    "</body>",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_content() {
        assert!(NOTICE_HTML.contains("<h1>"));
        assert!(NOTICE_HTML.contains("<p>"));
        assert!(NOTICE_HTML.contains(&format!("<a href=\"{ISSUE_URL}\">")));
        assert!(NOTICE_HTML.contains("local development"));
    }
}
