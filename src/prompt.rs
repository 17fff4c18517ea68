//! Prompt assembly with a context budget and source attribution.
//!
//! A prompt is assembled in a fixed order: instruction/persona preamble,
//! context section (retrieved chunks annotated with their title and
//! source), trailing conversation history, current question.
//!
//! Context chunks are included greedily in rank order until the next
//! chunk's formatted text would push the context section past
//! `max_context_chars`. An overflowing chunk is dropped whole, never
//! truncated mid-chunk, and inclusion stops there, so the included set is
//! always a contiguous best-ranked prefix of the retrieved list. Chunks
//! sharing a document are all kept (ranking already reflects relevance;
//! merging risks losing distinct passages).

use crate::config::PromptConfig;
use crate::models::{ConversationTurn, ScoredChunk, SourceRef};

/// Prompt text plus the attribution list for a "Sources:" display.
#[derive(Debug, Clone)]
pub struct PromptOutput {
    pub prompt: String,
    /// Distinct `(title, source)` pairs over included chunks, first-seen
    /// rank order, no duplicates.
    pub sources: Vec<SourceRef>,
}

pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    /// Assemble the completion prompt for one question.
    ///
    /// `chunks` must already be in rank order (best first), as returned
    /// by the retriever. `history` is ordered oldest to newest; only the
    /// trailing `max_history_turns` entries are kept.
    pub fn build(
        &self,
        question: &str,
        history: &[ConversationTurn],
        chunks: &[ScoredChunk],
    ) -> PromptOutput {
        let (context, sources) = self.render_context(chunks);

        let mut prompt = String::new();
        prompt.push_str(&self.config.system);
        prompt.push_str("\n\n");
        prompt.push_str(&context);

        let trailing = self.trailing_history(history);
        if !trailing.is_empty() {
            prompt.push_str("\n\nConversation:\n");
            for turn in trailing {
                prompt.push_str(turn.role.as_str());
                prompt.push_str(": ");
                prompt.push_str(&turn.content);
                prompt.push('\n');
            }
        }

        prompt.push_str("\n\nQuestion: ");
        prompt.push_str(question);

        PromptOutput { prompt, sources }
    }

    /// Render the budgeted context section and collect attribution.
    fn render_context(&self, chunks: &[ScoredChunk]) -> (String, Vec<SourceRef>) {
        let mut entries: Vec<String> = Vec::new();
        let mut sources: Vec<SourceRef> = Vec::new();
        let mut used = 0usize;

        for (i, scored) in chunks.iter().enumerate() {
            let entry = format!(
                "{}. {} ({})\n{}",
                i + 1,
                scored.chunk.title,
                scored.chunk.source,
                scored.chunk.text
            );
            // +2 for the blank-line separator between entries.
            let cost = entry.chars().count() + if entries.is_empty() { 0 } else { 2 };
            if used + cost > self.config.max_context_chars {
                break;
            }
            used += cost;
            entries.push(entry);

            let source_ref = SourceRef {
                title: scored.chunk.title.clone(),
                source: scored.chunk.source.clone(),
            };
            if !sources.contains(&source_ref) {
                sources.push(source_ref);
            }
        }

        let body = if entries.is_empty() {
            "No relevant information found.".to_string()
        } else {
            entries.join("\n\n")
        };

        (format!("Context:\n{body}"), sources)
    }

    fn trailing_history<'a>(&self, history: &'a [ConversationTurn]) -> &'a [ConversationTurn] {
        let max = self.config.max_history_turns;
        if history.len() <= max {
            history
        } else {
            &history[history.len() - max..]
        }
    }
}
