//! Size-bounded greedy text splitting.
//!
//! Prefers the largest natural boundary that fits: paragraphs, then
//! sentences, then words, then hard character cuts for pathological
//! unbroken runs. Sizes are measured in characters; ranges are byte
//! offsets into the input, so cuts never land inside a code point.

/// Split `text` into passages of at most `max_size` characters.
///
/// Returns each passage with its trimmed byte range in `text`. Passages
/// are contiguous: every non-whitespace byte of the input lands in
/// exactly one passage, in order.
pub(crate) fn split_section(text: &str, max_size: usize) -> Vec<(String, (usize, usize))> {
    let mut units: Vec<(usize, usize)> = Vec::new();
    for range in paragraph_ranges(text) {
        refine(text, range, max_size, &mut units);
    }

    // Greedy pack: extend the current passage while the combined slice,
    // gap whitespace included, still fits.
    let mut out: Vec<(usize, usize)> = Vec::new();
    for unit in units {
        match out.last_mut() {
            Some(current) if char_len(text, (current.0, unit.1)) <= max_size => {
                current.1 = unit.1;
            }
            _ => out.push(unit),
        }
    }

    out.into_iter()
        .map(|range| {
            let trimmed = trim_range(text, range);
            (text[trimmed.0..trimmed.1].to_string(), trimmed)
        })
        .filter(|(s, _)| !s.is_empty())
        .collect()
}

/// Break a range into units no larger than `max_size` characters,
/// descending through boundary kinds until each piece fits.
fn refine(text: &str, range: (usize, usize), max_size: usize, out: &mut Vec<(usize, usize)>) {
    if char_len(text, range) <= max_size {
        out.push(range);
        return;
    }

    let sentences = sentence_ranges(text, range);
    if sentences.len() > 1 {
        for s in sentences {
            refine(text, s, max_size, out);
        }
        return;
    }

    let words = word_ranges(text, range);
    if words.len() > 1 {
        for w in words {
            refine(text, w, max_size, out);
        }
        return;
    }

    hard_cut(text, range, max_size, out);
}

fn char_len(text: &str, range: (usize, usize)) -> usize {
    text[range.0..range.1].trim().chars().count()
}

fn trim_range(text: &str, (start, end): (usize, usize)) -> (usize, usize) {
    let slice = &text[start..end];
    let lead = slice.len() - slice.trim_start().len();
    let trail = slice.len() - slice.trim_end().len();
    (start + lead, end - trail)
}

/// Ranges between blank-line separators. A separator is two or more
/// newlines with nothing but carriage returns between them, so CRLF
/// documents break at the same places as LF ones.
fn paragraph_ranges(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            let mut newlines = 1;
            while j < bytes.len() && matches!(bytes[j], b'\n' | b'\r') {
                if bytes[j] == b'\n' {
                    newlines += 1;
                }
                j += 1;
            }
            if newlines >= 2 {
                if text[start..i].trim().len() > 0 {
                    out.push((start, i));
                }
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if text[start..].trim().len() > 0 {
        out.push((start, text.len()));
    }
    out
}

/// Split after terminal punctuation followed by whitespace.
fn sentence_ranges(text: &str, (start, end): (usize, usize)) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut out = Vec::new();
    let mut sentence_start = 0;
    let mut chars = slice.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let boundary = match chars.peek() {
                Some((_, next)) => next.is_whitespace(),
                None => true,
            };
            if boundary {
                let sentence_end = i + c.len_utf8();
                if slice[sentence_start..sentence_end].trim().len() > 0 {
                    out.push((start + sentence_start, start + sentence_end));
                }
                sentence_start = sentence_end;
            }
        }
    }
    if slice[sentence_start..].trim().len() > 0 {
        out.push((start + sentence_start, end));
    }
    out
}

fn word_ranges(text: &str, (start, end): (usize, usize)) -> Vec<(usize, usize)> {
    let slice = &text[start..end];
    let mut out = Vec::new();
    let mut word_start: Option<usize> = None;

    for (i, c) in slice.char_indices() {
        if c.is_whitespace() {
            if let Some(ws) = word_start.take() {
                out.push((start + ws, start + i));
            }
        } else if word_start.is_none() {
            word_start = Some(i);
        }
    }
    if let Some(ws) = word_start {
        out.push((start + ws, end));
    }
    out
}

/// Last resort for a single token longer than `max_size`.
fn hard_cut(text: &str, (start, end): (usize, usize), max_size: usize, out: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let mut piece_start = 0;
    let mut count = 0;

    for (i, _) in slice.char_indices() {
        if count == max_size {
            out.push((start + piece_start, start + i));
            piece_start = i;
            count = 0;
        }
        count += 1;
    }
    if piece_start < slice.len() {
        out.push((start + piece_start, end));
    }
}
