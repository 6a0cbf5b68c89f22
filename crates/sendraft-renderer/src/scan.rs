//! Finding image markers in note text.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{ImageReference, MarkerSyntax};

/// `![alt](path)`
pub static MARKDOWN_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").unwrap());

/// `![[path]]`
pub static WIKILINK_IMAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[\[([^\]]+)\]\]").unwrap());

/// Collect every image marker in `text`.
///
/// Markdown-style markers come first in text order, followed by wikilink embeds in text
/// order. The two syntaxes are scanned independently over the same unmodified text.
pub fn scan(text: &str) -> Vec<ImageReference> {
    let markdown = MARKDOWN_IMAGE_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(ImageReference {
            raw: whole.as_str().to_owned(),
            alt: caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_owned(),
            path: caps.get(2)?.as_str().to_owned(),
            syntax: MarkerSyntax::Markdown,
            span: whole.range(),
        })
    });

    let wikilinks = WIKILINK_IMAGE_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        Some(ImageReference {
            raw: whole.as_str().to_owned(),
            alt: String::new(),
            path: caps.get(1)?.as_str().to_owned(),
            syntax: MarkerSyntax::Wikilink,
            span: whole.range(),
        })
    });

    markdown.chain(wikilinks).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_markers() {
        assert!(scan("").is_empty());
        assert!(scan("Plain text with [a link](https://example.com) and ! marks").is_empty());
    }

    #[test]
    fn test_markdown_marker() {
        let refs = scan("Hello ![a cat](img/cat.png) world");
        assert_eq!(refs.len(), 1);
        let r = &refs[0];
        assert_eq!(r.raw, "![a cat](img/cat.png)");
        assert_eq!(r.alt, "a cat");
        assert_eq!(r.path, "img/cat.png");
        assert_eq!(r.syntax, MarkerSyntax::Markdown);
        assert_eq!(r.span, 6..27);
    }

    #[test]
    fn test_empty_alt() {
        let refs = scan("![](x.png)");
        assert_eq!(refs[0].alt, "");
        assert_eq!(refs[0].path, "x.png");
    }

    #[test]
    fn test_wikilink_marker() {
        let refs = scan("before ![[Pasted image 2024.png]] after");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].raw, "![[Pasted image 2024.png]]");
        assert_eq!(refs[0].path, "Pasted image 2024.png");
        assert_eq!(refs[0].alt, "");
        assert_eq!(refs[0].syntax, MarkerSyntax::Wikilink);
    }

    #[test]
    fn test_markdown_before_wikilink_regardless_of_position() {
        let refs = scan("![[first.png]] then ![second](second.png) then ![[third.png]]");
        let paths: Vec<_> = refs.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["second.png", "first.png", "third.png"]);
    }

    #[test]
    fn test_stops_at_first_closing_delimiter() {
        let refs = scan("![a](one.png) and (two).png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "one.png");
    }

    #[test]
    fn test_duplicates_reported_twice() {
        let refs = scan("![a](x.png) ![a](x.png)");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].raw, refs[1].raw);
        assert_ne!(refs[0].span, refs[1].span);
    }

    #[test]
    fn test_remote_urls_are_still_markers() {
        let refs = scan("![logo](https://cdn.example/logo.png)");
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].path, "https://cdn.example/logo.png");
    }
}
