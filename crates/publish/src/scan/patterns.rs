use regex::Regex;
use std::sync::LazyLock;

// Every pattern captures (1) the first path segment, which must equal the
// media marker, and (2) the media-library-relative path after it.

/// Optional markdown link title: `"title"` or `'title'`.
const TITLE: &str = r#"(?:\s+(?:"[^"]*"|'[^']*'))?"#;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// ![alt](/media/path) and ![alt](/media/path "title")
regex!(MARKDOWN_IMAGE, format!(r"!\[[^\]]*\]\(\s*/([^/\s)]+)/([^\s)]+){TITLE}\s*\)").as_str());
// ![alt](../media/path), ![alt](../../media/path), ...
regex!(RELATIVE_IMAGE, format!(r"!\[[^\]]*\]\(\s*(?:\.\./)+([^/\s)]+)/([^\s)]+){TITLE}\s*\)").as_str());
// image: /media/path (frontmatter only; optionally quoted)
regex!(FRONTMATTER_IMAGE, r#"(?m)^image:[ \t]*["']?/([^/\s"']+)/([^\s"']+?)["']?[ \t]*\r?$"#);
// src="/media/path" or src='/media/path' on any tag
regex!(HTML_SRC, r#"(?:^|\s)src\s*=\s*["']/([^/\s"']+)/([^\s"']+)["']"#);

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn captures(regex: &Regex, text: &str) -> Vec<(String, String)> {
        regex.captures_iter(text).map(|c| (c[1].to_string(), c[2].to_string())).collect()
    }

    #[rstest]
    #[case("![cover](/media/trip/beach.jpg)", Some(("media", "trip/beach.jpg")))]
    #[case("![](/media/a.png \"A title\")", Some(("media", "a.png")))]
    #[case("![x]( /media/a.png 'single' )", Some(("media", "a.png")))]
    #[case("![x](/static/a.png)", Some(("static", "a.png")))]
    #[case("[not an image](/media/a.png)", None)]
    #[case("![x](https://cdn/media/a.png)", None)]
    #[case("![x](../media/a.png)", None)]
    fn test_markdown_image(#[case] text: &str, #[case] expected: Option<(&str, &str)>) {
        let expected: Vec<_> = expected.into_iter().map(|(m, p)| (m.to_string(), p.to_string())).collect();
        assert_eq!(captures(&MARKDOWN_IMAGE, text), expected);
    }

    #[rstest]
    #[case("![x](../media/a.png)", Some(("media", "a.png")))]
    #[case("![x](../../../media/deep/a.png \"t\")", Some(("media", "deep/a.png")))]
    #[case("![x](/media/a.png)", None)]
    #[case("![x](./media/a.png)", None)]
    fn test_relative_image(#[case] text: &str, #[case] expected: Option<(&str, &str)>) {
        let expected: Vec<_> = expected.into_iter().map(|(m, p)| (m.to_string(), p.to_string())).collect();
        assert_eq!(captures(&RELATIVE_IMAGE, text), expected);
    }

    #[rstest]
    #[case("image: /media/a.jpg", Some(("media", "a.jpg")))]
    #[case("image: \"/media/a b/c.jpg\"", None)]
    #[case("image: '/media/covers/c.jpg'", Some(("media", "covers/c.jpg")))]
    #[case("image:\t\"/media/c.jpg\"\r", Some(("media", "c.jpg")))]
    #[case("cover_image: /media/c.jpg", None)]
    #[case("  image: /media/c.jpg", None)]
    fn test_frontmatter_image(#[case] text: &str, #[case] expected: Option<(&str, &str)>) {
        let expected: Vec<_> = expected.into_iter().map(|(m, p)| (m.to_string(), p.to_string())).collect();
        assert_eq!(captures(&FRONTMATTER_IMAGE, text), expected);
    }

    #[test]
    fn test_html_src() {
        let text = r#"<video controls><source src="/media/clips/intro.mp4" type="video/mp4"></video>
            <img alt="x" src='/media/a.png'/> <img src="https://cdn/x.png"> <img data-src="/media/lazy.png">"#;
        assert_eq!(
            captures(&HTML_SRC, text),
            vec![
                ("media".to_string(), "clips/intro.mp4".to_string()),
                ("media".to_string(), "a.png".to_string()),
            ]
        );
    }
}
