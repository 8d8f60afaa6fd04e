//! Markdown rendering for bot replies.
//!
//! GitHub-flavoured extensions (tables, strikethrough, task lists, bare URL
//! autolinks) are enabled. Every link opens in a new browsing context. Link
//! and image destinations are limited to relative, http(s) and mailto URLs.
//! Raw HTML in the source is escaped rather than passed through.

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};

const URL_PREFIXES: [&str; 3] = ["https://", "http://", "www."];

/// Schemes a rendered link or image may point at. Anything else is blanked.
const SAFE_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

fn options() -> Options {
    let mut opts = Options::empty();
    opts.insert(Options::ENABLE_TABLES);
    opts.insert(Options::ENABLE_STRIKETHROUGH);
    opts.insert(Options::ENABLE_TASKLISTS);
    opts
}

/// Render a bot message to HTML.
pub fn render_bot_markdown(source: &str) -> String {
    let mut events: Vec<Event> = Vec::new();
    let mut link_depth = 0usize;
    let mut in_code_block = false;

    for event in coalesce_text(Parser::new_ext(source, options())) {
        match event {
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                link_depth += 1;
                let href = safe_destination(&dest_url);
                events.push(Event::InlineHtml(anchor_open(href, &title).into()));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = CowStr::from(safe_destination(&dest_url).to_string());
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::End(TagEnd::Link) => {
                link_depth = link_depth.saturating_sub(1);
                events.push(Event::InlineHtml("</a>".into()));
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                in_code_block = true;
                events.push(Event::Start(Tag::CodeBlock(kind)));
            }
            Event::End(TagEnd::CodeBlock) => {
                in_code_block = false;
                events.push(Event::End(TagEnd::CodeBlock));
            }
            Event::Html(raw) | Event::InlineHtml(raw) => events.push(Event::Text(raw)),
            Event::Text(text) if link_depth == 0 && !in_code_block => {
                linkify(&text, &mut events);
            }
            other => events.push(other),
        }
    }

    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

/// The parser may split one run of text into several events; join them so
/// URLs are seen whole.
fn coalesce_text<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out: Vec<Event<'a>> = Vec::new();
    for event in events {
        if let Event::Text(next) = &event {
            if let Some(Event::Text(prev)) = out.last_mut() {
                let joined = format!("{prev}{next}");
                *prev = CowStr::from(joined);
                continue;
            }
        }
        out.push(event);
    }
    out
}

fn linkify<'a>(text: &str, events: &mut Vec<Event<'a>>) {
    let mut rest = text;
    while let Some((start, len)) = find_url(rest) {
        if start > 0 {
            events.push(Event::Text(rest[..start].to_string().into()));
        }
        let url = &rest[start..start + len];
        let href = if url.starts_with("www.") {
            format!("http://{url}")
        } else {
            url.to_string()
        };
        events.push(Event::InlineHtml(anchor_open(&href, "").into()));
        events.push(Event::Text(url.to_string().into()));
        events.push(Event::InlineHtml("</a>".into()));
        rest = &rest[start + len..];
    }
    if !rest.is_empty() {
        events.push(Event::Text(rest.to_string().into()));
    }
}

/// Byte offset and length of the first bare URL in `text`.
fn find_url(text: &str) -> Option<(usize, usize)> {
    let mut search_from = 0;
    while search_from < text.len() {
        let hay = &text[search_from..];
        let (rel, prefix) = URL_PREFIXES
            .iter()
            .filter_map(|p| hay.find(p).map(|i| (i, *p)))
            .min_by_key(|(i, _)| *i)?;
        let start = search_from + rel;
        let at_boundary = text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace() || matches!(c, '(' | '*' | '_' | '~'));
        let end = text[start..]
            .find(|c: char| c.is_whitespace() || c == '<')
            .map_or(text.len(), |i| start + i);
        let len = trim_trailing(&text[start..end]).len();
        if at_boundary && len > prefix.len() {
            return Some((start, len));
        }
        search_from = start + prefix.len();
    }
    None
}

fn trim_trailing(url: &str) -> &str {
    let mut url = url.trim_end_matches(|c: char| {
        matches!(c, '.' | ',' | ':' | ';' | '!' | '?' | '\'' | '"' | '*' | '_' | '~')
    });
    while url.ends_with(')') && url.matches(')').count() > url.matches('(').count() {
        url = &url[..url.len() - 1];
    }
    url
}

/// `url` when it is relative or uses an allowed scheme, otherwise "".
fn safe_destination(url: &str) -> &str {
    let Some(colon) = url.find(':') else {
        return url;
    };
    // a path, query or fragment separator before the colon means no scheme
    if url[..colon].contains(|c: char| matches!(c, '/' | '?' | '#')) {
        return url;
    }
    let scheme = &url[..colon];
    if SAFE_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        url
    } else {
        ""
    }
}

fn anchor_open(href: &str, title: &str) -> String {
    let mut tag = format!("<a href=\"{}\"", escape_attr(href));
    if !title.is_empty() {
        tag.push_str(&format!(" title=\"{}\"", escape_attr(title)));
    }
    tag.push_str(" target=\"_blank\" rel=\"noopener noreferrer\">");
    tag
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_open_in_new_tab() {
        let html = render_bot_markdown("See [my repo](https://github.com/jake).");
        assert!(html.contains(
            r#"<a href="https://github.com/jake" target="_blank" rel="noopener noreferrer">my repo</a>"#
        ));
    }

    #[test]
    fn bare_urls_are_autolinked() {
        let html = render_bot_markdown("Visit https://example.com/a_b_c. or www.site.dev");
        assert!(html.contains(r#"<a href="https://example.com/a_b_c" target="_blank""#));
        assert!(html.contains(">https://example.com/a_b_c</a>."));
        assert!(html.contains(r#"<a href="http://www.site.dev""#));
    }

    #[test]
    fn tables_and_strikethrough_render() {
        let html = render_bot_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n~~old~~");
        assert!(html.contains("<table>"));
        assert!(html.contains("<del>old</del>"));
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_bot_markdown("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_urls_are_blanked() {
        let html = render_bot_markdown("[click me](javascript:alert(document.cookie))");
        assert!(!html.contains("javascript:"));
        assert!(html.contains(r#"<a href="" target="_blank" rel="noopener noreferrer">click me</a>"#));

        for src in [
            "[x](JavaScript:void(0))",
            "[x](vbscript:msgbox)",
            "![x](data:text/html;base64,PHNjcmlwdD4=)",
        ] {
            let html = render_bot_markdown(src);
            assert!(!html.to_ascii_lowercase().contains("script:"), "{html}");
            assert!(!html.contains("data:"), "{html}");
        }
    }

    #[test]
    fn safe_and_relative_destinations_are_kept() {
        assert_eq!(safe_destination("mailto:jake@example.com"), "mailto:jake@example.com");
        assert_eq!(safe_destination("HTTPS://example.com"), "HTTPS://example.com");
        assert_eq!(safe_destination("/projects"), "/projects");
        assert_eq!(safe_destination("#contact"), "#contact");
        assert_eq!(safe_destination("./a?q=b:c"), "./a?q=b:c");
        assert_eq!(safe_destination("javascript:alert(1)"), "");

        let html = render_bot_markdown("![me](/avatar.png)");
        assert!(html.contains(r#"src="/avatar.png""#));
    }

    #[test]
    fn urls_in_code_blocks_stay_plain() {
        let html = render_bot_markdown("```\nhttps://example.com\n```");
        assert!(!html.contains("<a "));
    }
}
