use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

use crate::models::{Page, Timestamp};

/// Rows per page on the user management screen.
pub const USERS_PER_PAGE: usize = 10;

/// slugify
///
/// Turns free text into an SEO slug: lowercase ASCII letters, digits and single
/// hyphens. Accents are stripped (`Bài viết mới` becomes `bai-viet-moi`) and
/// anything else that is not a letter, digit, hyphen or whitespace is dropped.
pub fn slugify(input: &str) -> String {
    let folded: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'đ' || c == 'Đ' { 'd' } else { c })
        .filter(|c| c.is_ascii_digit() || c.is_ascii_lowercase() || *c == '-' || c.is_whitespace())
        .collect();

    let mut slug = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches('-').to_string()
}

/// format_date
///
/// Renders a backend timestamp as `dd/mm/yyyy`. Unparsable input yields
/// `"Invalid date"` rather than an error.
pub fn format_date(ts: &Timestamp) -> String {
    match ts.to_datetime() {
        Some(dt) => dt.format("%d/%m/%Y").to_string(),
        None => "Invalid date".to_string(),
    }
}

/// Case-insensitive substring match against any of `fields`. An empty query matches everything.
pub fn matches_search(query: &str, fields: &[&str]) -> bool {
    let needle = query.trim().to_lowercase();
    needle.is_empty() || fields.iter().any(|f| f.to_lowercase().contains(&needle))
}

/// paginate
///
/// Slices `items` into the requested 1-based page. Pages past the end come back
/// empty; page 0 is treated as page 1.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page);

    let items = items
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}

/// Fallback avatar generated from a display name.
pub fn generated_avatar(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random",
        urlencoding::encode(name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_vietnamese_accents() {
        assert_eq!(slugify("Bài viết mới!"), "bai-viet-moi");
        assert_eq!(slugify("Đường đi"), "duong-di");
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Hello   --  World  "), "hello-world");
        assert_eq!(slugify("--Rust 2024--"), "rust-2024");
        assert_eq!(slugify("???"), "");
    }

    #[test]
    fn format_date_accepts_unix_and_text() {
        assert_eq!(format_date(&Timestamp::Unix(1_769_040_000)), "22/01/2026");
        assert_eq!(format_date(&Timestamp::Text("2026-01-22".into())), "22/01/2026");
        assert_eq!(
            format_date(&Timestamp::Text("2026-01-22T10:00:00.000Z".into())),
            "22/01/2026"
        );
        assert_eq!(format_date(&Timestamp::Text("soon".into())), "Invalid date");
    }

    #[test]
    fn search_is_case_insensitive() {
        assert!(matches_search("ADMIN", &["Site Admin", "a@b.c"]));
        assert!(matches_search("", &["anything"]));
        assert!(!matches_search("zzz", &["Site Admin", "a@b.c"]));
    }

    #[test]
    fn paginate_splits_into_pages() {
        let items: Vec<u32> = (0..23).collect();
        let last = paginate(items.clone(), 3, 10);
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.items, vec![20, 21, 22]);

        let beyond = paginate(items.clone(), 9, 10);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_items, 23);

        let zero = paginate(items, 0, 10);
        assert_eq!(zero.page, 1);
        assert_eq!(zero.items.len(), 10);
    }

    #[test]
    fn paginate_empty_has_no_pages() {
        let page = paginate(Vec::<u8>::new(), 1, 10);
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());
    }

    #[test]
    fn generated_avatar_encodes_name() {
        assert_eq!(
            generated_avatar("Lan Anh"),
            "https://ui-avatars.com/api/?name=Lan%20Anh&background=random"
        );
    }
}
