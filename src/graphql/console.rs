//! Interactive query console (GraphiQL) served to browsers.

use http::header::ACCEPT;

use crate::graphql::transport::RequestHead;

const TEMPLATE: &str = include_str!("../../templates/graphiql.html");

/// Accept header fragments that mean the client can render the console.
const HTML_ACCEPTS: [&str; 2] = ["text/html", "*/*"];

/// Whether any `Accept` header of the request is browser-like.
pub fn accepts_html(request: &dyn RequestHead) -> bool {
    request
        .headers()
        .get_all(ACCEPT)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|accept| HTML_ACCEPTS.iter().any(|fragment| accept.contains(fragment)))
}

/// The static console page.
pub fn render() -> String {
    TEMPLATE.replace("{{VERSION}}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphql::transport::MemoryRequest;

    #[test]
    fn test_accepts_html() {
        let browser = MemoryRequest::get().header("accept", "text/html,application/xhtml+xml");
        let curl = MemoryRequest::get().header("accept", "*/*");
        let api = MemoryRequest::get().header("accept", "application/json");
        let none = MemoryRequest::get();

        assert!(accepts_html(&browser));
        assert!(accepts_html(&curl));
        assert!(!accepts_html(&api));
        assert!(!accepts_html(&none));
    }

    #[test]
    fn test_accepts_html_in_later_header() {
        let request = MemoryRequest::get()
            .header("accept", "application/json")
            .append_header("accept", "text/html");
        assert!(accepts_html(&request));

        let api = MemoryRequest::get()
            .header("accept", "application/json")
            .append_header("accept", "application/graphql-response+json");
        assert!(!accepts_html(&api));
    }

    #[test]
    fn test_render_fills_template() {
        let page = render();
        assert!(page.contains("<title>GraphiQL</title>"));
        assert!(!page.contains("{{VERSION}}"));
    }
}
