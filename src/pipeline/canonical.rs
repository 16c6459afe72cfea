// canonical.rs
use url::Url;

// Search-context and tracking parameters. Two links to the same listing that
// differ only in these must map to one key.
const DROPPED_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "source_impression_id",
    "federated_search_id",
    "search_mode",
    "previous_page_section_name",
    "check_in",
    "check_out",
    "adults",
    "children",
    "infants",
    "pets",
    "guests",
    "photo_id",
    "translate",
    "c",
];

fn is_dropped(name: &str) -> bool {
    name.starts_with("utm_") || DROPPED_PARAMS.contains(&name)
}

/// Normalized identity of a listing URL, used to dedupe and to join bulk
/// listings with their detail results.
pub fn canonical_key(raw: &str) -> String {
    let trimmed = raw.trim();

    let mut url = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => {
            let no_fragment = trimmed.split('#').next().unwrap_or("");
            return no_fragment.to_string();
        }
    };

    url.set_fragment(None);

    let mut kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_dropped(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    kept.sort();

    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_and_tracking_are_ignored() {
        let a = canonical_key("  https://www.airbnb.com/rooms/42?adults=2&check_in=2024-05-01&source_impression_id=p3_x ");
        let b = canonical_key("https://www.airbnb.com/rooms/42");
        assert_eq!(a, b);
    }

    #[test]
    fn host_case_and_fragment_do_not_matter() {
        assert_eq!(
            canonical_key("HTTPS://WWW.Airbnb.com/rooms/42#photos"),
            "https://www.airbnb.com/rooms/42"
        );
    }

    #[test]
    fn meaningful_params_survive_in_stable_order() {
        let a = canonical_key("https://x.test/rooms/1?z=1&utm_source=mail&a=2");
        let b = canonical_key("https://x.test/rooms/1?a=2&z=1");
        assert_eq!(a, b);
        assert_eq!(a, "https://x.test/rooms/1?a=2&z=1");
    }

    #[test]
    fn trailing_slash_is_dropped() {
        assert_eq!(canonical_key("https://x.test/rooms/7/"), "https://x.test/rooms/7");
        assert_eq!(canonical_key("https://x.test/"), "https://x.test/");
    }

    #[test]
    fn relative_input_falls_back_to_trimmed_text() {
        assert_eq!(canonical_key("  /rooms/9#reviews "), "/rooms/9");
    }

    #[test]
    fn key_is_idempotent() {
        let once = canonical_key("https://x.test/rooms/3/?utm_medium=x&b=1#top");
        assert_eq!(canonical_key(&once), once);
    }
}
