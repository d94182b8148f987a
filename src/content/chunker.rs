pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 100;

/// Split text into chunks for embedding, preferring paragraph then line then
/// word boundaries, with a trailing-overlap carry between adjacent chunks.
pub fn split_text(text: &str) -> Vec<String> {
    split_text_with(text, CHUNK_SIZE, CHUNK_OVERLAP)
}

pub fn split_text_with(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.chars().count() <= chunk_size {
        return vec![trimmed.to_string()];
    }

    let units = split_units(trimmed, &["\n\n", "\n", " "], chunk_size);

    let mut chunks = Vec::new();
    let mut current = String::new();
    for unit in units {
        let unit = unit.trim();
        if unit.is_empty() {
            continue;
        }
        let current_len = current.chars().count();
        if current_len > 0 && current_len + 1 + unit.chars().count() > chunk_size {
            chunks.push(current.clone());
            // Carry the tail of the finished chunk into the next one.
            let tail_start = current_len.saturating_sub(overlap);
            let tail: String = current.chars().skip(tail_start).collect();
            current = tail.trim_start().to_string();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(unit);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
}

// Break text into units no longer than chunk_size, trying each separator in
// turn and falling back to a hard character split.
fn split_units(text: &str, separators: &[&str], chunk_size: usize) -> Vec<String> {
    if text.chars().count() <= chunk_size {
        return vec![text.to_string()];
    }
    match separators.first() {
        Some(sep) => text
            .split(sep)
            .flat_map(|piece| split_units(piece, &separators[1..], chunk_size))
            .collect(),
        None => text
            .chars()
            .collect::<Vec<_>>()
            .chunks(chunk_size)
            .map(|window| window.iter().collect())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = split_text_with("hello world", 100, 10);
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(split_text_with("   \n", 100, 10).is_empty());
    }

    #[test]
    fn chunks_are_bounded() {
        let paragraph = "word ".repeat(40);
        let text = vec![paragraph; 10].join("\n\n");
        let chunks = split_text_with(&text, 200, 20);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            // A chunk may exceed the target by at most the carried overlap.
            assert!(chunk.chars().count() <= 200 + 20 + 1, "chunk too long");
        }
    }

    #[test]
    fn adjacent_chunks_share_overlap() {
        let text = "word ".repeat(200);
        let chunks = split_text_with(&text, 100, 20);

        assert!(chunks.len() > 1);
        let first_tail: String = chunks[0]
            .chars()
            .skip(chunks[0].chars().count().saturating_sub(20))
            .collect();
        assert!(chunks[1].starts_with(first_tail.trim_start()));
    }

    #[test]
    fn unbreakable_text_is_hard_split() {
        let text = "x".repeat(500);
        let chunks = split_text_with(&text, 100, 0);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.chars().count() <= 100));
    }
}
