//! Pure classification of network resource observations.
//!
//! One [`Observation`] is produced per network response surfaced by the
//! browser collaborator. [`classify`] maps it to a [`Category`] using a fixed
//! rule order; [`is_excluded_url`] filters out non-fetchable and tracking
//! URLs before classification, and [`passes_size_filter`] drops small media
//! files after it. Both filters are applied by the caller (see
//! [`crate::session::Session::ingest`]), never by `classify` itself.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum declared size for media-like resources (10 KiB).
///
/// Only enforced when the response carries a parsable `content-length`
/// header; absence of the header is not treated as "small".
pub const MIN_RESOURCE_SIZE: u64 = 10 * 1024;

/// URL prefixes that can never be fetched over plain HTTP (extension
/// internals, devtools, inline documents, opaque blobs).
const EXCLUDED_SCHEMES: &[&str] = &[
    "chrome-extension://",
    "devtools://",
    "about:",
    "data:text/html",
    "blob:http",
];

/// Case-insensitive URL keywords identifying analytics/tracking requests.
const EXCLUDED_KEYWORDS: &[&str] = &["analytics", "tracking", "beacon", "pixel"];

/// Engine/container formats specific to Cocos Creator builds.
const COCOS_EXTENSIONS: &[&str] = &[
    "plist", "atlas", "bin", "proto", "prefab", "fire", "scene", "anim", "animclip", "effect",
    "material", "meta", "dbbin", "cconb",
];

/// Skeletal animation formats. `atlas` is listed for completeness but is
/// unreachable: the cocos rule runs first and claims it. Preserved as-is.
const SPINE_EXTENSIONS: &[&str] = &["skel", "atlas"];

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "ico", "pvr", "pkm", "astc", "ktx",
];

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "aac", "flac", "caf"];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "avi", "mov", "flv", "mkv"];

const SCRIPT_EXTENSIONS: &[&str] = &["js", "jsc", "ts", "json"];

const FONT_EXTENSIONS: &[&str] = &["woff", "woff2", "ttf", "eot", "otf", "fnt", "bmfont"];

/// Resource kind declared by the browser collaborator for a request.
///
/// Unknown kinds are represented as an absent value on the observation,
/// never as a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredKind {
    Image,
    Media,
    Script,
    Stylesheet,
    Font,
}

impl DeclaredKind {
    /// Parses a collaborator resource-type string, case-insensitively.
    /// Returns `None` for unrecognized kinds.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "media" => Some(Self::Media),
            "script" => Some(Self::Script),
            "stylesheet" => Some(Self::Stylesheet),
            "font" => Some(Self::Font),
            _ => None,
        }
    }
}

/// One raw network response event, as surfaced by the browser collaborator.
///
/// Header names are expected lowercased; only `content-type` and
/// `content-length` are read. Observations are ephemeral: they are consumed
/// by classification and never retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Response URL, exact string as observed.
    pub url: String,
    /// Resource kind declared by the collaborator, when recognized.
    pub declared_kind: Option<DeclaredKind>,
    /// HTTP status code of the response.
    pub status_code: u16,
    /// Response headers: lowercased name to raw values.
    pub headers: HashMap<String, Vec<String>>,
}

impl Observation {
    /// Returns the first value of a (lowercased) header, if present.
    #[must_use]
    pub fn header_first(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Returns the response content type, or an empty string when absent.
    #[must_use]
    pub fn content_type(&self) -> &str {
        self.header_first("content-type").unwrap_or("")
    }

    /// Parses the declared `content-length`, if present and numeric.
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.header_first("content-length")
            .and_then(|value| value.trim().parse().ok())
    }
}

/// Closed classification assigned to a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Cocos,
    Spine,
    Image,
    Audio,
    Video,
    Script,
    Stylesheet,
    Font,
    Json,
    Other,
}

impl Category {
    /// Categories subject to the minimum-size filter.
    const SIZE_FILTERED: &[Category] = &[
        Category::Image,
        Category::Audio,
        Category::Video,
        Category::Font,
        Category::Cocos,
        Category::Spine,
    ];
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Cocos => "cocos",
            Self::Spine => "spine",
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Font => "font",
            Self::Json => "json",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// Returns true when the URL must be discarded before classification:
/// non-fetchable scheme, or analytics/tracking keyword anywhere in the URL.
#[must_use]
pub fn is_excluded_url(url: &str) -> bool {
    if EXCLUDED_SCHEMES
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        return true;
    }
    let lower = url.to_lowercase();
    EXCLUDED_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// Returns false when the observation must be discarded as a too-small media
/// file: category in the filtered set and a declared length in `(0, 10 KiB)`.
/// No header (or an unparsable one) always passes.
#[must_use]
pub fn passes_size_filter(category: Category, content_length: Option<u64>) -> bool {
    match content_length {
        Some(size) if size > 0 && size < MIN_RESOURCE_SIZE => {
            !Category::SIZE_FILTERED.contains(&category)
        }
        _ => true,
    }
}

/// Classifies one observation into a [`Category`].
///
/// Pure, total, and deterministic: the URL is lowercased for matching only,
/// rules are evaluated in a fixed order with first-match-wins, and anything
/// unmatched falls through to [`Category::Other`].
#[must_use]
pub fn classify(observation: &Observation) -> Category {
    let url_lower = observation.url.to_lowercase();
    let content_type = observation.content_type().to_lowercase();
    let kind = observation.declared_kind;

    // Cocos engine/container formats take precedence over everything,
    // including the spine rule's `.atlas` case.
    if has_extension(&url_lower, COCOS_EXTENSIONS) {
        return Category::Cocos;
    }

    if has_extension(&url_lower, SPINE_EXTENSIONS) || url_lower.contains("spine") {
        return Category::Spine;
    }

    if kind == Some(DeclaredKind::Image)
        || content_type.contains("image")
        || has_extension(&url_lower, IMAGE_EXTENSIONS)
    {
        return Category::Image;
    }

    if kind == Some(DeclaredKind::Media)
        || content_type.contains("audio")
        || has_extension(&url_lower, AUDIO_EXTENSIONS)
    {
        return Category::Audio;
    }

    if content_type.contains("video") || has_extension(&url_lower, VIDEO_EXTENSIONS) {
        return Category::Video;
    }

    if kind == Some(DeclaredKind::Script)
        || content_type.contains("javascript")
        || has_extension(&url_lower, SCRIPT_EXTENSIONS)
    {
        return Category::Script;
    }

    if kind == Some(DeclaredKind::Stylesheet)
        || content_type.contains("css")
        || has_extension(&url_lower, &["css"])
    {
        return Category::Stylesheet;
    }

    if kind == Some(DeclaredKind::Font) || has_extension(&url_lower, FONT_EXTENSIONS) {
        return Category::Font;
    }

    if content_type.contains("json") || has_extension(&url_lower, &["json"]) {
        return Category::Json;
    }

    Category::Other
}

/// Checks whether the URL, with its query string and fragment stripped, ends
/// in `.<ext>` for any extension in the set.
fn has_extension(url_lower: &str, extensions: &[&str]) -> bool {
    let trimmed = url_lower
        .split(['?', '#'])
        .next()
        .unwrap_or(url_lower)
        .as_bytes();
    extensions.iter().any(|ext| {
        let ext = ext.as_bytes();
        trimmed.len() > ext.len()
            && trimmed.ends_with(ext)
            && trimmed[trimmed.len() - ext.len() - 1] == b'.'
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn observation(url: &str) -> Observation {
        Observation {
            url: url.to_string(),
            declared_kind: None,
            status_code: 200,
            headers: HashMap::new(),
        }
    }

    fn observation_with(
        url: &str,
        kind: Option<DeclaredKind>,
        content_type: Option<&str>,
    ) -> Observation {
        let mut headers = HashMap::new();
        if let Some(ct) = content_type {
            headers.insert("content-type".to_string(), vec![ct.to_string()]);
        }
        Observation {
            url: url.to_string(),
            declared_kind: kind,
            status_code: 200,
            headers,
        }
    }

    #[test]
    fn test_classify_cocos_extensions() {
        for ext in ["plist", "prefab", "cconb", "dbbin", "material"] {
            let obs = observation(&format!("https://game.test/assets/hero.{ext}"));
            assert_eq!(classify(&obs), Category::Cocos, "extension {ext}");
        }
    }

    #[test]
    fn test_classify_cocos_with_query_string() {
        let obs = observation("https://game.test/scenes/main.prefab?v=3");
        assert_eq!(classify(&obs), Category::Cocos);
    }

    #[test]
    fn test_classify_cocos_wins_over_spine_substring() {
        // Container formats outrank the spine substring rule.
        let obs = observation("https://game.test/spine/dragon.prefab");
        assert_eq!(classify(&obs), Category::Cocos);
    }

    #[test]
    fn test_classify_atlas_is_cocos_not_spine() {
        // .atlas is in both rule sets; the cocos rule runs first.
        let obs = observation("https://game.test/spine/dragon.atlas");
        assert_eq!(classify(&obs), Category::Cocos);
    }

    #[test]
    fn test_classify_spine_skel() {
        let obs = observation("https://game.test/anim/dragon.skel");
        assert_eq!(classify(&obs), Category::Spine);
    }

    #[test]
    fn test_classify_spine_substring() {
        let obs = observation("https://game.test/Spine/dragon.bytes");
        assert_eq!(classify(&obs), Category::Spine);
    }

    #[test]
    fn test_classify_image_by_declared_kind_without_extension() {
        let obs = observation_with("https://cdn.test/img/12345", Some(DeclaredKind::Image), None);
        assert_eq!(classify(&obs), Category::Image);
    }

    #[test]
    fn test_classify_image_by_content_type() {
        let obs = observation_with("https://cdn.test/asset", None, Some("image/png"));
        assert_eq!(classify(&obs), Category::Image);
    }

    #[test]
    fn test_classify_image_by_extension() {
        for ext in ["png", "webp", "ktx", "pvr"] {
            let obs = observation(&format!("https://cdn.test/tex/a.{ext}"));
            assert_eq!(classify(&obs), Category::Image, "extension {ext}");
        }
    }

    #[test]
    fn test_classify_audio_by_declared_media_kind() {
        let obs = observation_with("https://cdn.test/bgm", Some(DeclaredKind::Media), None);
        assert_eq!(classify(&obs), Category::Audio);
    }

    #[test]
    fn test_classify_video_by_content_type() {
        let obs = observation_with("https://cdn.test/clip", None, Some("video/mp4"));
        assert_eq!(classify(&obs), Category::Video);
    }

    #[test]
    fn test_classify_script_beats_json_for_json_extension() {
        // .json appears in both the script and json extension sets; the
        // script rule runs first.
        let obs = observation("https://game.test/config/items.json");
        assert_eq!(classify(&obs), Category::Script);
    }

    #[test]
    fn test_classify_json_by_content_type_only() {
        let obs = observation_with("https://api.test/v1/state", None, Some("application/json"));
        assert_eq!(classify(&obs), Category::Json);
    }

    #[test]
    fn test_classify_stylesheet_and_font() {
        assert_eq!(
            classify(&observation("https://cdn.test/app.css")),
            Category::Stylesheet
        );
        assert_eq!(
            classify(&observation("https://cdn.test/fonts/main.woff2")),
            Category::Font
        );
    }

    #[test]
    fn test_classify_unmatched_is_other() {
        let obs = observation("https://cdn.test/page.html");
        assert_eq!(classify(&obs), Category::Other);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let obs = observation_with(
            "https://cdn.test/tex/a.png?v=2",
            Some(DeclaredKind::Image),
            Some("image/png"),
        );
        let first = classify(&obs);
        for _ in 0..10 {
            assert_eq!(classify(&obs), first);
        }
    }

    #[test]
    fn test_extension_must_be_anchored_at_end() {
        // "mp3" appearing mid-path must not match.
        let obs = observation("https://cdn.test/mp3.player/list");
        assert_eq!(classify(&obs), Category::Other);
    }

    #[test]
    fn test_declared_kind_parse() {
        assert_eq!(DeclaredKind::parse("Image"), Some(DeclaredKind::Image));
        assert_eq!(DeclaredKind::parse("MEDIA"), Some(DeclaredKind::Media));
        assert_eq!(DeclaredKind::parse("xhr"), None);
        assert_eq!(DeclaredKind::parse(""), None);
    }

    #[test]
    fn test_excluded_schemes() {
        assert!(is_excluded_url("chrome-extension://abc/script.js"));
        assert!(is_excluded_url("devtools://devtools/bundled/root.js"));
        assert!(is_excluded_url("about:blank"));
        assert!(is_excluded_url("data:text/html,<p>hi</p>"));
        assert!(is_excluded_url("blob:https://game.test/uuid"));
        assert!(!is_excluded_url("https://game.test/a.png"));
    }

    #[test]
    fn test_excluded_keywords_case_insensitive() {
        assert!(is_excluded_url("https://cdn.test/Analytics/collect"));
        assert!(is_excluded_url("https://cdn.test/js/TRACKING.js"));
        assert!(is_excluded_url("https://cdn.test/img/pixel.gif"));
        assert!(!is_excluded_url("https://cdn.test/img/sprite.gif"));
    }

    #[test]
    fn test_size_filter_drops_small_media() {
        assert!(!passes_size_filter(Category::Image, Some(5000)));
        assert!(!passes_size_filter(Category::Cocos, Some(1)));
        assert!(!passes_size_filter(Category::Spine, Some(10239)));
    }

    #[test]
    fn test_size_filter_keeps_at_threshold_and_above() {
        assert!(passes_size_filter(Category::Image, Some(MIN_RESOURCE_SIZE)));
        assert!(passes_size_filter(Category::Audio, Some(1024 * 1024)));
    }

    #[test]
    fn test_size_filter_absent_header_is_not_small() {
        assert!(passes_size_filter(Category::Image, None));
        assert!(passes_size_filter(Category::Video, Some(0)));
    }

    #[test]
    fn test_size_filter_never_applies_to_scripts() {
        assert!(passes_size_filter(Category::Script, Some(12)));
        assert!(passes_size_filter(Category::Json, Some(12)));
        assert!(passes_size_filter(Category::Other, Some(12)));
    }

    #[test]
    fn test_content_length_parsing() {
        let mut headers = HashMap::new();
        headers.insert("content-length".to_string(), vec!["5000".to_string()]);
        let obs = Observation {
            url: "https://cdn.test/a.png".to_string(),
            declared_kind: None,
            status_code: 200,
            headers,
        };
        assert_eq!(obs.content_length(), Some(5000));

        let obs = observation("https://cdn.test/a.png");
        assert_eq!(obs.content_length(), None);
    }
}
