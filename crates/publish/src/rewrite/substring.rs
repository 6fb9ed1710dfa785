use super::{Replacement, Rewriter, Rewritten};

/// Verbatim substring replacement over the whole document.
///
/// All replacements are applied in a single left-to-right pass: at each
/// position the earliest occurrence of any local form wins, the longest one
/// when several start at the same offset. Inserted URLs are never searched
/// again, so a URL that happens to contain another local form is left alone.
///
/// A run of `../` segments directly in front of an occurrence belongs to the
/// relative form of the reference and is replaced along with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubstringRewriter;

impl Rewriter for SubstringRewriter {
    fn rewrite(&self, text: &str, replacements: &[Replacement]) -> Rewritten {
        let mut next: Vec<Option<usize>> = replacements.iter().map(|r| find(text, &r.local, 0)).collect();
        let mut output = String::with_capacity(text.len());
        let mut cursor = 0;
        let mut replaced = 0;

        while let Some((start, index)) = earliest(&next, replacements) {
            let replacement = &replacements[index];
            let before = &text[cursor..start];
            output.push_str(&before[..traversal_start(before)]);
            output.push_str(&replacement.url);
            replaced += 1;
            cursor = start + replacement.local.len();
            for (position, r) in next.iter_mut().zip(replacements) {
                if position.is_some_and(|p| p < cursor) {
                    *position = find(text, &r.local, cursor);
                }
            }
        }

        if replaced == 0 {
            return Rewritten { text: text.to_string(), replaced };
        }
        output.push_str(&text[cursor..]);
        Rewritten { text: output, replaced }
    }
}

fn find(text: &str, needle: &str, from: usize) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    text[from..].find(needle).map(|offset| from + offset)
}

/// Position and index of the next occurrence to replace.
fn earliest(next: &[Option<usize>], replacements: &[Replacement]) -> Option<(usize, usize)> {
    next.iter()
        .enumerate()
        .filter_map(|(index, position)| position.map(|p| (p, index)))
        .min_by(|(a, i), (b, j)| a.cmp(b).then(replacements[*j].local.len().cmp(&replacements[*i].local.len())))
}

/// Where a trailing `../../..` run starts in `before`, or `before.len()` if
/// there is none.
///
/// The run only counts when it is not glued to a preceding path or word, so
/// `see.../media/a.jpg` keeps its dots.
fn traversal_start(before: &str) -> usize {
    let Some(mut rest) = before.strip_suffix("..") else {
        return before.len();
    };
    while let Some(shorter) = rest.strip_suffix("../") {
        rest = shorter;
    }
    match rest.chars().next_back() {
        Some(c) if c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/') => before.len(),
        _ => rest.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn replacements(pairs: &[(&str, &str)]) -> Vec<Replacement> {
        pairs.iter().map(|(local, url)| Replacement::new(*local, *url)).collect()
    }

    fn rewrite(text: &str, pairs: &[(&str, &str)]) -> Rewritten {
        SubstringRewriter.rewrite(text, &replacements(pairs))
    }

    #[test]
    fn test_every_occurrence_is_replaced() {
        let result = rewrite(
            "![a](/media/foo/bar.jpg)\n<img src=\"/media/foo/bar.jpg\">",
            &[("/media/foo/bar.jpg", "https://cdn/x.jpg")],
        );
        assert_eq!(result.replaced, 2);
        assert_eq!(result.text, "![a](https://cdn/x.jpg)\n<img src=\"https://cdn/x.jpg\">");
    }

    #[test]
    fn test_no_match_is_untouched() {
        let result = rewrite("Nothing here.", &[("/media/a.jpg", "https://cdn/a.jpg")]);
        assert_eq!(result, Rewritten { text: "Nothing here.".to_string(), replaced: 0 });
    }

    #[rstest]
    #[case("![x](../media/a.jpg)", "![x](https://cdn/a.jpg)")]
    #[case("![x](../../../media/a.jpg)", "![x](https://cdn/a.jpg)")]
    #[case("see.../media/a.jpg", "see...https://cdn/a.jpg")]
    #[case("dir/../media/a.jpg", "dir/..https://cdn/a.jpg")]
    #[case("../media/a.jpg", "https://cdn/a.jpg")]
    #[case("x/media/a.jpg", "xhttps://cdn/a.jpg")]
    fn test_traversal_run(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(rewrite(text, &[("/media/a.jpg", "https://cdn/a.jpg")]).text, expected);
    }

    #[test]
    fn test_longest_local_form_wins() {
        let result = rewrite(
            "/media/a.jpg.webp and /media/a.jpg",
            &[("/media/a.jpg", "https://cdn/a"), ("/media/a.jpg.webp", "https://cdn/webp")],
        );
        assert_eq!(result.text, "https://cdn/webp and https://cdn/a");
        assert_eq!(result.replaced, 2);
    }

    #[test]
    fn test_urls_are_not_rewritten_again() {
        let result = rewrite(
            "/media/a.jpg /media/b.jpg",
            &[("/media/a.jpg", "https://cdn/media/b.jpg"), ("/media/b.jpg", "https://cdn/b")],
        );
        assert_eq!(result.text, "https://cdn/media/b.jpg https://cdn/b");
        assert_eq!(result.replaced, 2);
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let pairs = [("/media/a.jpg", "https://cdn/a.jpg")];
        let once = rewrite("![x](../media/a.jpg)", &pairs);
        let twice = rewrite(&once.text, &pairs);
        assert_eq!(twice.replaced, 0);
        assert_eq!(twice.text, once.text);
    }

    #[test]
    fn test_multibyte_text() {
        let result = rewrite("Café ☕ ![x](/media/ü.jpg) fin", &[("/media/ü.jpg", "https://cdn/u")]);
        assert_eq!(result.text, "Café ☕ ![x](https://cdn/u) fin");
    }
}
