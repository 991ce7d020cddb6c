/// Wraps `text` into display lines of at most `width` characters.
///
/// Explicit line breaks are honored first and blank lines survive as empty
/// output lines. Overlong segments break at the rightmost space within the
/// window (the wrap-point space is dropped); a segment with no space in the
/// window is hard-split at exactly `width` characters so nothing is lost.
pub(crate) fn wrap_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::with_capacity(text.len() / width + 1);

    for line in text.lines() {
        if line.is_empty() {
            out.push(String::new());
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let mut start = 0usize;
        while start < chars.len() {
            let remaining = chars.len() - start;
            if remaining <= width {
                out.push(chars[start..].iter().collect());
                break;
            }

            let window_end = start + width;
            match (start + 1..=window_end).rev().find(|&i| chars[i] == ' ') {
                Some(space_at) => {
                    out.push(chars[start..space_at].iter().collect());
                    start = space_at + 1;
                }
                None => {
                    out.push(chars[start..window_end].iter().collect());
                    start = window_end;
                }
            }
        }
    }

    out
}
