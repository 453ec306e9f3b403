use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Parses a raw SSE line (OpenAI-compatible format) into zero or more chunks.
/// Keep-alives, comments and non-data lines yield an empty vec.
pub fn parse_sse_line(line: &str) -> IdeaSwipeResult<Vec<StreamChunk>> {
    if line.is_empty() || line.starts_with(':') {
        return Ok(Vec::new());
    }

    let Some(data) = line.strip_prefix("data:") else {
        return Ok(Vec::new());
    };
    let data = data.trim();

    if data == "[DONE]" {
        return Ok(vec![StreamChunk::done()]);
    }

    let json: serde_json::Value =
        serde_json::from_str(data).map_err(|e| IdeaSwipeError::SseParsing(e.to_string()))?;

    if let Some(message) = json["error"]["message"].as_str() {
        return Ok(vec![StreamChunk::error(message)]);
    }

    let mut chunks = Vec::new();
    let Some(first) = json["choices"].as_array().and_then(|c| c.first()) else {
        return Ok(chunks);
    };
    let delta = &first["delta"];

    // Some routers use `reasoning`, DeepSeek-style models use `reasoning_content`.
    let reasoning = delta["reasoning_content"]
        .as_str()
        .or_else(|| delta["reasoning"].as_str());
    if let Some(reasoning) = reasoning.filter(|r| !r.is_empty()) {
        chunks.push(StreamChunk {
            kind: StreamChunkKind::Reasoning,
            content: reasoning.to_string(),
        });
    }

    if let Some(content) = delta["content"].as_str().filter(|c| !c.is_empty()) {
        chunks.push(StreamChunk {
            kind: StreamChunkKind::Content,
            content: content.to_string(),
        });
    }

    if let Some(annotations) = delta["annotations"].as_array() {
        for annotation in annotations {
            if let Some(url) = annotation["url_citation"]["url"].as_str() {
                chunks.push(StreamChunk {
                    kind: StreamChunkKind::Source,
                    content: url.to_string(),
                });
            }
        }
    }

    if first["finish_reason"].as_str().is_some() {
        chunks.push(StreamChunk::done());
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_and_comments_are_ignored() {
        assert!(parse_sse_line("").unwrap().is_empty());
        assert!(parse_sse_line(": ping").unwrap().is_empty());
        assert!(parse_sse_line("event: message").unwrap().is_empty());
    }

    #[test]
    fn done_marker() {
        let chunks = parse_sse_line("data: [DONE]").unwrap();
        assert_eq!(chunks, vec![StreamChunk::done()]);
    }

    #[test]
    fn content_delta() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;
        let chunks = parse_sse_line(line).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].kind, StreamChunkKind::Content);
        assert_eq!(chunks[0].content, "Hello");
    }

    #[test]
    fn reasoning_and_content_in_one_delta() {
        let line = r#"data: {"choices":[{"delta":{"reasoning_content":"hmm","content":"ok"}}]}"#;
        let kinds: Vec<_> = parse_sse_line(line).unwrap().into_iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![StreamChunkKind::Reasoning, StreamChunkKind::Content]);
    }

    #[test]
    fn url_citations_become_sources() {
        let line = r#"data: {"choices":[{"delta":{"annotations":[{"type":"url_citation","url_citation":{"url":"https://example.com"}}]}}]}"#;
        let chunks = parse_sse_line(line).unwrap();
        assert_eq!(chunks[0].kind, StreamChunkKind::Source);
        assert_eq!(chunks[0].content, "https://example.com");
    }

    #[test]
    fn finish_reason_ends_stream() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), vec![StreamChunk::done()]);
    }

    #[test]
    fn upstream_error_payload() {
        let line = r#"data: {"error":{"message":"insufficient balance"}}"#;
        let chunks = parse_sse_line(line).unwrap();
        assert_eq!(chunks[0].kind, StreamChunkKind::Error);
        assert_eq!(chunks[0].content, "insufficient balance");
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(IdeaSwipeError::SseParsing(_))
        ));
    }
}
