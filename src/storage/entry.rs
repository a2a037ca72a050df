//! Naming, ordering and metadata helpers shared by both backends.

use std::cmp::Ordering;
use std::path::{Component, Path};

/// Separates the journal text from the appended image metadata.
pub const METADATA_SEPARATOR: &str = "\n\n---\n";

const IMAGE_URL_LABEL: &str = "Image URL:";
const SERVE_PATH: &str = "/api/images/serve";
const LEGACY_IMAGES_PATH: &str = "/images/";

pub fn entry_filename(id: &str) -> String {
    if id.ends_with(".txt") {
        id.to_string()
    } else {
        format!("{}.txt", id)
    }
}

/// Appends the image metadata block when both parts are present.
pub fn compose_entry_content(content: &str, image_prompt: Option<&str>, image_url: Option<&str>) -> String {
    match (non_empty(image_prompt), non_empty(image_url)) {
        (Some(prompt), Some(url)) => format!(
            "{}{}Image Prompt: {}\n{} {}",
            content, METADATA_SEPARATOR, prompt, IMAGE_URL_LABEL, url
        ),
        _ => content.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Reads the `Image URL:` line out of an entry's metadata block.
pub fn extract_image_url(content: &str) -> Option<String> {
    let metadata = content.split(METADATA_SEPARATOR).nth(1)?;
    let start = metadata.find(IMAGE_URL_LABEL)? + IMAGE_URL_LABEL.len();
    let line = metadata[start..].lines().next().unwrap_or("");
    let url = line.trim();
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Resolves the stored image file name from either URL form
/// (`/api/images/serve?filename=<f>` or legacy `/images/<f>`).
pub fn image_filename_from_url(image_url: &str) -> Option<String> {
    let base = url::Url::parse("http://localhost").ok()?;
    match base.join(image_url) {
        Ok(parsed) => {
            if parsed.path() == SERVE_PATH {
                return parsed
                    .query_pairs()
                    .find(|(k, _)| k == "filename")
                    .map(|(_, v)| v.into_owned())
                    .filter(|v| !v.is_empty());
            }
            let path = parsed.path();
            let idx = path.find(LEGACY_IMAGES_PATH)?;
            let encoded = &path[idx + LEGACY_IMAGES_PATH.len()..];
            url::form_urlencoded::parse(format!("f={}", encoded).as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())
                .filter(|v| !v.is_empty())
        }
        Err(_) => {
            let idx = image_url.find(LEGACY_IMAGES_PATH)?;
            Some(image_url[idx + LEGACY_IMAGES_PATH.len()..].to_string()).filter(|v| !v.is_empty())
        }
    }
}

/// URL under which a locally stored image is served.
pub fn serve_url(filename: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes()).collect();
    format!("{}?filename={}", SERVE_PATH, encoded)
}

/// Leading digits of `s` without leading zeros; empty reads as 0.
fn leading_digits(s: &str) -> &str {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].trim_start_matches('0')
}

/// Orders names by their leading integer of any length; names without one count as 0.
pub fn compare_leading_numbers(a: &str, b: &str) -> Ordering {
    let (a, b) = (leading_digits(a), leading_digits(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Sorts entry file names newest first.
pub fn sort_entry_names<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        compare_leading_numbers(
            name(b).trim_end_matches(".txt"),
            name(a).trim_end_matches(".txt"),
        )
    });
}

/// Sorts image file names newest first by the stem before the first `.`.
pub fn sort_image_names<T>(items: &mut [T], name: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| {
        let a = name(a).split('.').next().unwrap_or("");
        let b = name(b).split('.').next().unwrap_or("");
        compare_leading_numbers(b, a)
    });
}

pub fn extension_from_content_type(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/png" => Some("png"),
        "image/jpeg" => Some("jpg"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

pub fn content_type_for_filename(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Image file name for `id`, choosing the extension from the explicit value,
/// then the content type, then `png`.
pub fn image_filename(id: &str, content_type: Option<&str>, extension: Option<&str>) -> String {
    let ext = extension
        .map(|e| e.trim_start_matches('.'))
        .filter(|e| !e.is_empty())
        .or_else(|| content_type.and_then(extension_from_content_type))
        .unwrap_or("png");
    format!("{}.{}", id, ext)
}

/// True when `name` stays inside the directory it is joined to.
pub fn is_contained_name(name: &str) -> bool {
    let path = Path::new(name);
    !name.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_filename_adds_suffix_once() {
        assert_eq!(entry_filename("1700000000000"), "1700000000000.txt");
        assert_eq!(entry_filename("1700000000000.txt"), "1700000000000.txt");
    }

    #[test]
    fn test_metadata_block_needs_both_fields() {
        assert_eq!(compose_entry_content("Today", Some("a fox"), None), "Today");
        assert_eq!(compose_entry_content("Today", Some(""), Some("/x.png")), "Today");
        assert_eq!(
            compose_entry_content("Today", Some("a fox"), Some("/api/images/serve?filename=1.png")),
            "Today\n\n---\nImage Prompt: a fox\nImage URL: /api/images/serve?filename=1.png"
        );
    }

    #[test]
    fn test_image_url_extracted_from_metadata() {
        let content = compose_entry_content("Walked home.", Some("rain"), Some("https://blob/x/1.png"));
        assert_eq!(extract_image_url(&content).as_deref(), Some("https://blob/x/1.png"));
        assert_eq!(extract_image_url("no metadata here"), None);
        assert_eq!(extract_image_url("text\n\n---\nImage Prompt: only"), None);
    }

    #[test]
    fn test_image_filename_from_both_url_forms() {
        assert_eq!(
            image_filename_from_url("/api/images/serve?filename=17.png").as_deref(),
            Some("17.png")
        );
        assert_eq!(
            image_filename_from_url("/api/images/serve?filename=my%20pic.png").as_deref(),
            Some("my pic.png")
        );
        assert_eq!(image_filename_from_url("/images/17.webp").as_deref(), Some("17.webp"));
        assert_eq!(
            image_filename_from_url("https://host/prod/images/17.png").as_deref(),
            Some("17.png")
        );
        assert_eq!(image_filename_from_url("/elsewhere/17.png"), None);
    }

    #[test]
    fn test_serve_url_encodes_filename() {
        assert_eq!(serve_url("a b.png"), "/api/images/serve?filename=a+b.png");
        assert_eq!(
            image_filename_from_url(&serve_url("a b.png")).as_deref(),
            Some("a b.png")
        );
    }

    #[test]
    fn test_entries_sorted_newest_first_with_non_numeric_last() {
        let mut names = vec!["100.txt", "notes.txt", "300.txt", "200.txt"];
        sort_entry_names(&mut names, |n| n);
        assert_eq!(names, vec!["300.txt", "200.txt", "100.txt", "notes.txt"]);
    }

    #[test]
    fn test_long_numeric_names_keep_their_magnitude() {
        let mut names = vec!["99999999999999999999.txt", "123456789012345678901.txt", "1700000000000.txt"];
        sort_entry_names(&mut names, |n| n);
        assert_eq!(
            names,
            vec!["123456789012345678901.txt", "99999999999999999999.txt", "1700000000000.txt"]
        );
        assert_eq!(compare_leading_numbers("007", "7"), Ordering::Equal);
        assert_eq!(compare_leading_numbers("abc", "0"), Ordering::Equal);
    }

    #[test]
    fn test_images_sorted_by_stem() {
        let mut names = vec!["5.png", "20.jpg", "7.gif"];
        sort_image_names(&mut names, |n| n);
        assert_eq!(names, vec!["20.jpg", "7.gif", "5.png"]);
    }

    #[test]
    fn test_image_filename_extension_precedence() {
        assert_eq!(image_filename("1", Some("image/jpeg"), Some(".webp")), "1.webp");
        assert_eq!(image_filename("1", Some("image/jpeg"), None), "1.jpg");
        assert_eq!(image_filename("1", Some("image/bmp"), None), "1.png");
        assert_eq!(image_filename("1", None, None), "1.png");
    }

    #[test]
    fn test_contained_names() {
        assert!(is_contained_name("17.png"));
        assert!(is_contained_name("sub/17.png"));
        assert!(!is_contained_name("../secret.txt"));
        assert!(!is_contained_name("/etc/passwd"));
        assert!(!is_contained_name(""));
    }

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type_for_filename("a.PNG"), "image/png");
        assert_eq!(content_type_for_filename("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for_filename("a.bin"), "application/octet-stream");
    }
}
