/// YouTube video ids are always 11 characters
const VIDEO_ID_LEN: usize = 11;

/// URL fragments that directly precede a video id
const ID_MARKERS: [&str; 4] = ["youtu.be/", "v/", "embed/", "watch?v="];

/// Extract the video id from a YouTube URL.
///
/// Recognises `youtu.be/<id>`, `/v/<id>`, `/u/<x>/<id>`, `/embed/<id>`,
/// `watch?v=<id>` and `&v=<id>`. When several markers appear the rightmost
/// one wins. The id runs until `#`, `&` or `?` and must be 11 characters.
pub fn youtube_video_id(url: &str) -> Option<&str> {
    for start in (0..url.len()).rev() {
        if !url.is_char_boundary(start) {
            continue;
        }
        if let Some(rest) = strip_marker(&url[start..]) {
            let end = rest.find(['#', '&', '?']).unwrap_or(rest.len());
            let id = &rest[..end];
            return (id.chars().count() == VIDEO_ID_LEN).then_some(id);
        }
    }
    None
}

fn strip_marker(s: &str) -> Option<&str> {
    for marker in &ID_MARKERS[..2] {
        if let Some(rest) = s.strip_prefix(marker) {
            return Some(rest);
        }
    }
    // u/<word char>/
    if let Some(rest) = s.strip_prefix("u/") {
        let mut chars = rest.chars();
        if let (Some(c), Some('/')) = (chars.next(), chars.next()) {
            if c.is_ascii_alphanumeric() || c == '_' {
                return Some(&rest[2..]);
            }
        }
    }
    for marker in &ID_MARKERS[2..] {
        if let Some(rest) = s.strip_prefix(marker) {
            return Some(rest);
        }
    }
    s.strip_prefix("&v=")
}

pub fn embed_url(video_id: &str) -> String {
    format!("https://www.youtube.com/embed/{}", video_id)
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
