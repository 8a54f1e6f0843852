use ah_domain::tool::{Message, Role};

/// Rough token estimate for a block of text. One token is approximated as
/// 4 characters, which is close enough for budget tracking without pulling
/// in a model-specific tokenizer.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimate the total token footprint of a message, including its
/// tool-call arguments serialized as JSON.
pub fn estimate_message_tokens(message: &Message) -> usize {
    let mut total = 0;
    if let Some(content) = &message.content {
        total += estimate_tokens(content);
    }
    if let Some(calls) = &message.tool_calls {
        for call in calls {
            total += estimate_tokens(&call.tool_name);
            total += estimate_tokens(&call.arguments.to_string());
        }
    }
    // Small fixed overhead per message for role/formatting tokens.
    total + 4
}

pub fn estimate_total_tokens(messages: &[Message]) -> usize {
    messages.iter().map(estimate_message_tokens).sum()
}

pub fn is_tool_result(message: &Message) -> bool {
    message.role == Role::Tool
}

#[cfg(test)]
mod tests {
    use super::*;
    use ah_domain::tool::ToolCall;

    #[test]
    fn estimate_tokens_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn message_tokens_include_tool_calls() {
        let msg = Message::assistant_tool_calls(vec![ToolCall {
            call_id: "c1".into(),
            tool_name: "exec".into(),
            arguments: serde_json::json!({"cmd": "ls -la"}),
        }]);
        assert!(estimate_message_tokens(&msg) > 4);
    }

    #[test]
    fn total_tokens_sums_messages() {
        let messages = vec![Message::user("hi"), Message::assistant("hello there")];
        let total = estimate_total_tokens(&messages);
        assert_eq!(total, estimate_message_tokens(&messages[0]) + estimate_message_tokens(&messages[1]));
    }
}
