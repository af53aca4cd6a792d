//! Meta description embedded as an HTML comment.
//!
//! Documents carry their meta description as `<!-- Meta: ... -->`, which keeps
//! it out of the rendered body and out of word counts.

/// Marker that opens a meta description comment body.
pub const META_PREFIX: &str = "Meta:";

/// Extracts the first meta description comment.
pub fn meta_description(text: &str) -> Option<String> {
    find_meta(text).map(|(_, _, body)| body.to_owned())
}

/// Replaces the meta description, or inserts one directly below the title.
pub fn with_meta_description(text: &str, description: &str) -> String {
    let comment = format!("<!-- {META_PREFIX} {} -->", description.trim());

    if let Some((start, end, _)) = find_meta(text) {
        return format!("{}{}{}", &text[..start], comment, &text[end..]);
    }

    let mut lines: Vec<&str> = text.lines().collect();
    let insert_at = lines
        .iter()
        .position(|line| line.trim_start().starts_with("# "))
        .map_or(0, |title| title + 1);
    lines.insert(insert_at, &comment);

    let mut output = lines.join("\n");
    if text.ends_with('\n') {
        output.push('\n');
    }
    output
}

/// Returns `(start, end, body)` byte offsets of the first meta comment.
fn find_meta(text: &str) -> Option<(usize, usize, &str)> {
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find("<!--") {
        let start = cursor + offset;
        let inner_start = start + 4;
        let close = text[inner_start..].find("-->")?;
        let inner = &text[inner_start..inner_start + close];
        let end = inner_start + close + 3;

        if let Some(body) = inner.trim_start().strip_prefix(META_PREFIX) {
            return Some((start, end, body.trim()));
        }
        cursor = end;
    }

    None
}
