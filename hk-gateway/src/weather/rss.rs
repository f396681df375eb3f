//! RSS feed text extraction.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

/// The three HKO feeds making up a weather summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feed {
    WarningSummary,
    LocalForecast,
    SeveralDaysForecast,
}

impl Feed {
    pub const ALL: [Feed; 3] = [
        Feed::WarningSummary,
        Feed::LocalForecast,
        Feed::SeveralDaysForecast,
    ];

    /// Traditional-Chinese feed file name.
    pub fn file_name(&self) -> &'static str {
        match self {
            Feed::WarningSummary => "WeatherWarningSummaryv2_uc.xml",
            Feed::LocalForecast => "LocalWeatherForecast_uc.xml",
            Feed::SeveralDaysForecast => "SeveralDaysWeatherForecast_uc.xml",
        }
    }
}

static ITEM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item\b[^>]*>(.*?)</item>").expect("valid regex"));
static DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<description\b[^>]*>(.*?)</description>").expect("valid regex")
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid regex"));
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));
static HAN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\p{Han})\s+(\p{Han})").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Cleaned text of a feed: every item description, or every item title
/// when the descriptions are empty.
pub fn extract_summary(xml: &str) -> String {
    let from = |tag: &Regex| -> String {
        ITEM.captures_iter(xml)
            .filter_map(|item| item.get(1))
            .flat_map(|body| tag.captures_iter(body.as_str()))
            .filter_map(|c| c.get(1))
            .map(|m| element_html(m.as_str()))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut text = from(&DESCRIPTION);
    if text.trim().is_empty() {
        text = from(&TITLE);
    }
    clean_text(&text)
}

/// The HTML carried by an RSS element: CDATA sections unwrapped, otherwise
/// XML entities decoded.
fn element_html(raw: &str) -> String {
    if CDATA.is_match(raw) {
        CDATA
            .captures_iter(raw)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str())
            .collect()
    } else {
        html_text(raw)
    }
}

/// Text content of an HTML fragment.
pub fn html_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

/// Strip tags, join Han characters split by whitespace, and collapse the
/// remaining whitespace.
pub fn clean_text(html: &str) -> String {
    let text = html_text(html);
    let text = join_han(&text);
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Remove whitespace between two Han characters.
fn join_han(text: &str) -> String {
    // Matches overlap on the shared character, so repeat until stable.
    let mut current = text.to_string();
    loop {
        let next = HAN_GAP.replace_all(&current, "$1$2").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}
