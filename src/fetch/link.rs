use std::collections::HashMap;

use super::FetchError;

/// Relation name to target URI, as carried by a `Link` response header.
pub type LinkRelations = HashMap<String, String>;

/// Parse a web-linking header value into relation -> URI pairs.
///
/// The value is a comma-separated list of `<uri>; rel="name"` entries.
/// A `rel` may hold several space-separated names; each one maps to the
/// entry's URI. When a relation appears twice the first entry wins.
/// Entries without a `rel` parameter are skipped.
pub fn parse_link_header(value: &str) -> Result<LinkRelations, FetchError> {
    let mut relations = LinkRelations::new();
    if value.trim().is_empty() {
        return Ok(relations);
    }

    for entry in split_unquoted(value, ',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let rest = entry
            .strip_prefix('<')
            .ok_or_else(|| FetchError::MalformedLink(format!("missing '<' in {entry:?}")))?;
        let (uri, params) = rest
            .split_once('>')
            .ok_or_else(|| FetchError::MalformedLink(format!("missing '>' in {entry:?}")))?;
        if uri.trim().is_empty() {
            return Err(FetchError::MalformedLink(format!("empty target in {entry:?}")));
        }

        let Some(rel) = rel_param(params)? else {
            continue;
        };
        for name in rel.split_whitespace() {
            relations
                .entry(name.to_ascii_lowercase())
                .or_insert_with(|| uri.trim().to_string());
        }
    }

    Ok(relations)
}

/// Convenience: the `next` relation of a header value, if any.
pub fn next_link(value: &str) -> Result<Option<String>, FetchError> {
    Ok(parse_link_header(value)?.remove("next"))
}

// Splits on `sep` outside `<...>` and outside quoted strings. A quote inside
// `<...>` is part of the URI and does not open a string.
fn split_unquoted(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '<' if !quoted => depth += 1,
            '>' if !quoted => depth = depth.saturating_sub(1),
            '\\' if quoted => escaped = true,
            '"' if depth == 0 => quoted = !quoted,
            c if c == sep && depth == 0 && !quoted => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn rel_param(params: &str) -> Result<Option<String>, FetchError> {
    for param in split_unquoted(params, ';') {
        let param = param.trim();
        if param.is_empty() {
            continue;
        }
        // Valueless parameters such as `crossorigin` carry no relation.
        let Some((name, raw)) = param.split_once('=') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("rel") {
            let value = raw.trim().trim_matches('"').trim();
            if value.is_empty() {
                return Err(FetchError::MalformedLink("empty rel parameter".to_string()));
            }
            return Ok(Some(value.to_string()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_next_and_prev() {
        let links = parse_link_header(
            r#"<https://x/y?page=2>; rel="next", <https://x/y?page=1>; rel="prev""#,
        )
        .unwrap();
        assert_eq!(links.get("next").unwrap(), "https://x/y?page=2");
        assert_eq!(links.get("prev").unwrap(), "https://x/y?page=1");
        assert_eq!(
            next_link(r#"<https://x/y?page=2>; rel="next", <https://x/y?page=1>; rel="prev""#)
                .unwrap()
                .as_deref(),
            Some("https://x/y?page=2")
        );
    }

    #[test]
    fn test_parse_github_style_header() {
        let header = "<https://api.github.com/repositories/1/issues/7901/comments?page=2>; rel=\"next\", \
                      <https://api.github.com/repositories/1/issues/7901/comments?page=5>; rel=\"last\"";
        let links = parse_link_header(header).unwrap();
        assert_eq!(links.len(), 2);
        assert!(links["next"].ends_with("page=2"));
        assert!(links["last"].ends_with("page=5"));
    }

    #[test]
    fn test_parse_multiple_rel_names() {
        let links = parse_link_header(r#"<https://x/last>; rel="next last""#).unwrap();
        assert_eq!(links["next"], "https://x/last");
        assert_eq!(links["last"], "https://x/last");
    }

    #[test]
    fn test_comma_inside_uri() {
        let links = parse_link_header(r#"<https://x/y?ids=1,2>; rel="next""#).unwrap();
        assert_eq!(links["next"], "https://x/y?ids=1,2");
    }

    #[test]
    fn test_unquoted_rel_and_extra_params() {
        let links = parse_link_header("<https://x/2>; title=\"a, b\"; rel=next").unwrap();
        assert_eq!(links["next"], "https://x/2");
    }

    #[test]
    fn test_entry_without_rel_is_skipped() {
        let links = parse_link_header("<https://x/2>; type=\"text/html\"").unwrap();
        assert!(links.is_empty());
    }

    #[test]
    fn test_empty_header() {
        assert!(parse_link_header("").unwrap().is_empty());
        assert_eq!(next_link("  ").unwrap(), None);
    }

    #[test]
    fn test_malformed_headers() {
        assert!(parse_link_header("https://x/2; rel=\"next\"").is_err());
        assert!(parse_link_header("<https://x/2; rel=\"next\"").is_err());
        assert!(parse_link_header("<>; rel=\"next\"").is_err());
        assert!(parse_link_header("<https://x/2>; rel=\"\"").is_err());
    }

    #[test]
    fn test_quoted_semicolon_in_param() {
        let links = parse_link_header(r#"<https://x/2>; title="a; b"; rel="next""#).unwrap();
        assert_eq!(links["next"], "https://x/2");
    }

    #[test]
    fn test_valueless_param_before_rel() {
        let links = parse_link_header(r#"<https://x/2>; crossorigin; rel="next""#).unwrap();
        assert_eq!(links["next"], "https://x/2");
        assert!(parse_link_header("<https://x/2>; rel").unwrap().is_empty());
    }

    #[test]
    fn test_quote_inside_uri() {
        let links = parse_link_header(
            r#"<https://x/"q",y>; rel="next", <https://x/1>; rel="prev""#,
        )
        .unwrap();
        assert_eq!(links["next"], r#"https://x/"q",y"#);
        assert_eq!(links["prev"], "https://x/1");
    }

    #[test]
    fn test_escaped_quote_in_param() {
        let links = parse_link_header(r#"<https://x/2>; title="say \"hi; there\""; rel="next""#).unwrap();
        assert_eq!(links["next"], "https://x/2");
    }
}
