//! Summarization prompt.
//!
//! The system instruction asks for a summary followed by a blank line and a
//! `Keywords:` paragraph, which is the layout keyword extraction expects.

use crate::openai::{ChatCompletionRequest, Message, OpenAiClientConfig};

pub const INSTRUCTION_TEXT: &str = "You are a professional summarizer and your task is to \
create a summary of the provided text. Your task involves a three-step process, outlined as follows:
1. Summarize the Provided Text: create a concise summary that captures the main points, themes, \
or arguments after carefully reading the text.
2. Identify Keywords or Important Concepts: review either the summary or the original text to \
extract key terms, concepts, or keywords.
3. Present these keywords in a separate paragraph at the conclusion of your response. Start the \
paragraph with the word \"Keywords:\" followed by a list of the identified terms. Each term should \
be separated by a comma and a space. Here's a sample structure for your response:

```
Summary: [Your Summary Here]

Keywords: keyword1, keyword2, keyword3, ...
```

Ensure that your summary is clear and directly reflective of the text's content, and that your \
list of keywords is relevant and concise.
";

/// Prepended to the user's text in the user message.
pub const PROMPT_PREFIX: &str = "Here's the text you need to summarize:\n";

pub fn summary_messages(query: &str) -> Vec<Message> {
    vec![
        Message::system(INSTRUCTION_TEXT),
        Message::user(format!("{PROMPT_PREFIX}{query}")),
    ]
}

/// Chat request for summarizing `query` with the configured model settings.
pub fn summary_request(config: &OpenAiClientConfig, query: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: summary_messages(query),
        temperature: Some(config.temperature),
        top_p: Some(1.0),
        max_tokens: None,
        stream: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_carries_prefix_and_query() {
        let messages = summary_messages("Cats are great pets.");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(
            messages[1].content,
            "Here's the text you need to summarize:\nCats are great pets."
        );
    }

    #[test]
    fn instruction_describes_keyword_paragraph() {
        assert!(INSTRUCTION_TEXT.contains("Summary: [Your Summary Here]\n\nKeywords: keyword1"));
    }

    #[test]
    fn request_uses_configured_model() {
        let config = OpenAiClientConfig {
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            ..OpenAiClientConfig::default()
        };
        let req = summary_request(&config, "text");
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.temperature, Some(0.2));
        assert_eq!(req.stream, None);
    }
}
