//! Small scanners for the HTML and Atom pages some upstreams return.
//!
//! These look for literal markers rather than building a DOM; they only need
//! to understand the handful of page shapes the catalog tools consume.

/// Every `<tag ...>...</tag>` element body in `text`, in order.
pub fn elements<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let close = format!("</{tag}>");
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some((start, tag_end)) = find_open_tag(text, tag, pos) {
        let body_start = tag_end + 1;
        if text[start..=tag_end].ends_with("/>") {
            found.push("");
            pos = body_start;
            continue;
        }
        let Some(len) = text[body_start..].find(&close) else {
            break;
        };
        found.push(&text[body_start..body_start + len]);
        pos = body_start + len + close.len();
    }
    found
}

/// Opening tag text (`<tag a="b" ...>`) of every `tag` element, for attribute lookups.
pub fn open_tags<'a>(text: &'a str, tag: &str) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some((start, tag_end)) = find_open_tag(text, tag, pos) {
        found.push(&text[start..=tag_end]);
        pos = tag_end + 1;
    }
    found
}

/// Plain text of the first `tag` element.
pub fn element_text(text: &str, tag: &str) -> Option<String> {
    elements(text, tag).first().map(|body| strip_tags(body))
}

/// Plain text of the first element carrying exactly `class="<class>"`.
pub fn class_text(html: &str, class: &str) -> Option<String> {
    let (_, body) = class_element(html, class)?;
    Some(strip_tags(body))
}

/// Opening tag and body of the first element carrying exactly `class="<class>"`.
pub fn class_element<'a>(html: &'a str, class: &str) -> Option<(&'a str, &'a str)> {
    let marker = format!("class=\"{class}\"");
    let marker_pos = html.find(&marker)?;
    let start = html[..marker_pos].rfind('<')?;
    let tag_end = marker_pos + html[marker_pos..].find('>')?;
    let name: String = html[start + 1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    let close = format!("</{name}>");
    let body_start = tag_end + 1;
    let len = html[body_start..].find(&close)?;
    Some((&html[start..=tag_end], &html[body_start..body_start + len]))
}

/// Value of an attribute inside an opening tag.
pub fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    let pattern = format!(" {attr}=\"");
    let start = tag.find(&pattern)? + pattern.len();
    let end = tag[start..].find('"')? + start;
    Some(decode_entities(&tag[start..end]))
}

/// Drop tags, decode entities and collapse runs of whitespace.
pub fn strip_tags(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    decode_entities(&out.split_whitespace().collect::<Vec<_>>().join(" "))
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Start and `>` position of the next `<tag` opening tag at or after `from`.
fn find_open_tag(text: &str, tag: &str, from: usize) -> Option<(usize, usize)> {
    let open = format!("<{tag}");
    let mut pos = from;
    loop {
        let start = pos + text[pos..].find(&open)?;
        let after = start + open.len();
        match text[after..].chars().next() {
            Some(c) if c == '>' || c == '/' || c.is_whitespace() => {
                let tag_end = after + text[after..].find('>')?;
                return Some((start, tag_end));
            }
            _ => pos = after,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elements_skip_prefixed_names() {
        let text = "<titles>no</titles><title>One</title><title lang=\"en\">Two</title>";
        assert_eq!(elements(text, "title"), vec!["One", "Two"]);
    }

    #[test]
    fn test_self_closing_tags() {
        let text = r#"<link href="a" rel="alternate"/><link title="pdf" href="b"/>"#;
        let tags = open_tags(text, "link");
        assert_eq!(tags.len(), 2);
        assert_eq!(extract_attr(tags[1], "href").as_deref(), Some("b"));
        assert_eq!(extract_attr(tags[1], "title").as_deref(), Some("pdf"));
    }

    #[test]
    fn test_class_text() {
        let html = r#"<li><a class="title" href="x">Tokio &amp; <b>friends</b></a><p class="s">snip</p></li>"#;
        assert_eq!(class_text(html, "title").as_deref(), Some("Tokio & friends"));
        assert_eq!(class_text(html, "s").as_deref(), Some("snip"));
        assert_eq!(class_text(html, "url"), None);
    }

    #[test]
    fn test_strip_tags_collapses_whitespace() {
        assert_eq!(strip_tags("\n   Attention   Is\n All <i>You</i> Need  "), "Attention Is All You Need");
    }
}
