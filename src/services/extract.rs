// src/services/extract.rs

//! Best-effort field extraction from unstructured competition pages.
//!
//! Each strategy is a pure `document -> Option<value>` function. Strategies are
//! tried in order and the first hit wins; a page where every strategy misses
//! simply yields nothing.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::utils::{has_scheme, resolve};

/// One extraction attempt over a parsed page.
pub type Strategy = fn(&Html) -> Option<String>;

/// Thumbnail strategies, most reliable first.
pub const THUMBNAIL_STRATEGIES: &[Strategy] = &[og_image, logo_image, header_image, lazy_image];

/// Returned when a schedule page has no period line at all.
pub const PERIOD_NOT_FOUND: &str = "기간 정보를 찾을 수 없습니다.";

static CLOCK_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,2}:\d{2}").expect("clock-time pattern is valid"));

/// Run strategies in order and return the first value found.
pub fn first_match(document: &Html, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(document))
}

/// Find a competition thumbnail and make it absolute against `site_base`.
pub fn extract_thumbnail(document: &Html, site_base: &str) -> Option<String> {
    let found = first_match(document, THUMBNAIL_STRATEGIES)?;
    if has_scheme(&found) {
        Some(found)
    } else {
        resolve(site_base, &found)
    }
}

/// `<meta property="og:image" content="...">`
pub fn og_image(document: &Html) -> Option<String> {
    first_attr(document, r#"meta[property="og:image"]"#, "content")
}

/// `<img class="competition-logo" src="...">`
pub fn logo_image(document: &Html) -> Option<String> {
    first_attr(document, "img.competition-logo", "src")
}

/// `<img class="competition-header" src="...">`
pub fn header_image(document: &Html) -> Option<String> {
    first_attr(document, "img.competition-header", "src")
}

/// Any `<img data-src="...">` left for lazy loading.
pub fn lazy_image(document: &Html) -> Option<String> {
    first_attr(document, "img[data-src]", "data-src")
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|element| element.value().attr(attr))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

/// Pull the competition period out of a schedule page.
///
/// Looks for the first text node containing `label` and cleans what follows it
/// with [`clean_period`]. When the label sits in its own element (`<b>label</b>
/// dates`), the text of the nearest enclosing element that has something after
/// the label is used instead. Pages without a period yield [`PERIOD_NOT_FOUND`].
pub fn extract_period(document: &Html, label: &str) -> String {
    document
        .root_element()
        .descendants()
        .filter(|node| node.value().as_text().is_some_and(|text| text.contains(label)))
        .find_map(|node| {
            node.ancestors()
                .filter_map(ElementRef::wrap)
                .find_map(|element| period_after_label(&element.text().collect::<String>(), label))
        })
        .unwrap_or_else(|| PERIOD_NOT_FOUND.to_string())
}

fn period_after_label(text: &str, label: &str) -> Option<String> {
    let idx = text.find(label)?;
    let period = clean_period(&text[idx + label.len()..]);
    (!period.is_empty()).then_some(period)
}

/// Drop clock times and normalize `start ~ end` spacing.
pub fn clean_period(raw: &str) -> String {
    let without_times = CLOCK_TIME.replace_all(raw.trim(), "");
    let parts: Vec<&str> = without_times.split('~').collect();

    match parts.as_slice() {
        [start, end] => format!("{} ~ {}", start.trim(), end.trim()),
        _ => without_times.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LABEL: &str = "대회 기간 :";

    fn page(body: &str) -> Html {
        Html::parse_document(&format!("<html><head></head><body>{body}</body></html>"))
    }

    #[test]
    fn test_period_strips_times_and_spacing() {
        let doc = page("<ul><li>- 대회 기간 : 2024.01.01 10:00 ~ 2024.01.31 18:00</li></ul>");
        assert_eq!(extract_period(&doc, LABEL), "2024.01.01 ~ 2024.01.31");
    }

    #[test]
    fn test_period_irregular_spacing() {
        assert_eq!(clean_period("  2024.02.01~   2024.03.15 9:00 "), "2024.02.01 ~ 2024.03.15");
    }

    #[test]
    fn test_period_without_tilde_is_kept_whole() {
        assert_eq!(clean_period("상시 진행 10:00"), "상시 진행");
    }

    #[test]
    fn test_period_label_in_own_element() {
        let doc = page("<li><b>- 대회 기간 :</b> 2024.03.04 10:00 ~ 2024.04.05 17:00</li>");
        assert_eq!(extract_period(&doc, LABEL), "2024.03.04 ~ 2024.04.05");
    }

    #[test]
    fn test_period_label_without_dates_is_sentinel() {
        let doc = page("<li><b>- 대회 기간 :</b></li>");
        assert_eq!(extract_period(&doc, LABEL), PERIOD_NOT_FOUND);
    }

    #[test]
    fn test_period_not_found_sentinel() {
        let doc = page("<p>대회 일정은 추후 공지됩니다.</p>");
        assert_eq!(extract_period(&doc, LABEL), PERIOD_NOT_FOUND);
    }

    #[test]
    fn test_thumbnail_prefers_og_image() {
        let doc = Html::parse_document(
            r#"<html><head><meta property="og:image" content="https://img.example/og.png"></head>
            <body><img class="competition-logo" src="/logo.png"></body></html>"#,
        );
        assert_eq!(
            extract_thumbnail(&doc, "https://www.kaggle.com").as_deref(),
            Some("https://img.example/og.png")
        );
    }

    #[test]
    fn test_thumbnail_falls_through_to_lazy_image() {
        let doc = page(r#"<img class="competition-header"><img data-src="/static/lazy.jpg">"#);
        assert_eq!(og_image(&doc), None);
        assert_eq!(logo_image(&doc), None);
        assert_eq!(header_image(&doc), None);
        assert_eq!(
            extract_thumbnail(&doc, "https://www.kaggle.com").as_deref(),
            Some("https://www.kaggle.com/static/lazy.jpg")
        );
    }

    #[test]
    fn test_thumbnail_header_before_lazy() {
        let doc = page(
            r#"<img data-src="/lazy.jpg"><img class="competition-header" src="/header.jpg">"#,
        );
        assert_eq!(first_match(&doc, THUMBNAIL_STRATEGIES).as_deref(), Some("/header.jpg"));
    }

    #[test]
    fn test_thumbnail_absent() {
        let doc = page("<p>no images here</p>");
        assert_eq!(extract_thumbnail(&doc, "https://www.kaggle.com"), None);
    }
}
