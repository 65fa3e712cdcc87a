//! Length-bounded message splitting.

/// Default per-message character limit for the chat transport.
pub const DEFAULT_MAX_CHUNK_LEN: usize = 4000;

/// Cut preference, strongest first.
const BOUNDARIES: [&str; 3] = ["\n\n", "\n", " "];

/// One transport-sized slice of a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChunk {
    pub text: String,
    pub index: usize,
}

/// Splits `text` into chunks of at most `max_len` characters.
///
/// Each cut prefers the last paragraph break before the limit, then the last
/// line break, then the last space; only a run with none of these is cut
/// mid-token at exactly `max_len`. The boundary whitespace is dropped and each
/// chunk is trimmed, so no chunk is empty. Whitespace-only input yields no
/// chunks. A `max_len` of zero is treated as one.
#[must_use]
pub fn chunk_text(text: &str, max_len: usize) -> Vec<MessageChunk> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        let Some((limit, _)) = rest.char_indices().nth(max_len) else {
            push_chunk(&mut chunks, rest);
            break;
        };

        let window = &rest[..limit];
        let cut = BOUNDARIES
            .iter()
            .find_map(|boundary| window.rfind(boundary))
            .filter(|&index| index > 0)
            .unwrap_or(limit);

        push_chunk(&mut chunks, rest[..cut].trim());
        rest = rest[cut..].trim();
    }

    chunks
}

fn push_chunk(chunks: &mut Vec<MessageChunk>, text: &str) {
    if text.is_empty() {
        return;
    }
    let index = chunks.len();
    chunks.push(MessageChunk {
        text: text.to_owned(),
        index,
    });
}
