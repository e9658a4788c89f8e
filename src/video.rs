/// A recognized video reference: the bare id plus the canonical watch URL
/// that providers are given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
    pub url: String,
}

impl VideoRef {
    fn from_id(id: &str) -> Self {
        Self {
            id: id.to_string(),
            url: format!("https://www.youtube.com/watch?v={}", id),
        }
    }
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Take the id portion of a path segment, cutting query or fragment noise.
fn id_from_segment(segment: &str) -> Option<&str> {
    let id = segment
        .split(|c| c == '?' || c == '&' || c == '#' || c == '/')
        .next()?;
    is_video_id(id).then_some(id)
}

/// Canonicalize a pasted video reference.
///
/// Accepts the usual YouTube forms (`watch?v=`, `youtu.be/`, `shorts/`,
/// `embed/`, `live/`) as well as a bare 11-character id, and rejects
/// anything it cannot identify.
pub fn canonicalize(input: &str) -> Result<VideoRef, String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err("No video link given".to_string());
    }

    if is_video_id(trimmed) {
        return Ok(VideoRef::from_id(trimmed));
    }

    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);

    // watch URLs carry the id in the query string
    if let Some((_, query)) = without_scheme.split_once("watch?") {
        for pair in query.split('&') {
            if let Some(id) = pair.strip_prefix("v=") {
                if let Some(id) = id_from_segment(id) {
                    return Ok(VideoRef::from_id(id));
                }
            }
        }
        return Err(format!("Could not find a video id in '{}'", trimmed));
    }

    for marker in ["youtu.be/", "shorts/", "embed/", "live/"] {
        if let Some((_, rest)) = without_scheme.split_once(marker) {
            if let Some(id) = id_from_segment(rest) {
                return Ok(VideoRef::from_id(id));
            }
        }
    }

    Err(format!("'{}' does not look like a video link", trimmed))
}
