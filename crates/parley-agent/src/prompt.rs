// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompts for the interview and summary passes.

use std::fmt::Write;

use parley_core::types::{ChatMessage, MemoryRecord, Role, ScoredMemory};

/// User turn sent with the summary pass, whose instructions live in the
/// system prompt.
pub const SUMMARY_REQUEST: &str = "Generate the structured interview summary.";

const INTERVIEWER_GUIDELINES: &str = "\
Your goal is to simulate a realistic job interview, ask relevant questions, and remember details from the candidate's previous responses.

Guidelines:
1. Maintain a professional yet approachable tone.
2. Ask one clear, concise question at a time.
3. Use the candidate's past answers to ask natural follow-up questions.
4. Avoid repeating questions unless asking for clarification.
5. Cover both technical and behavioral aspects of the role.
6. Keep questions under three sentences unless a deeper explanation is needed.
7. Always respond in the language the candidate is using.
8. Probe deeper by asking why or how when reasoning is unclear.
9. Cover every part of the candidate's background.

Stay in character as the interviewer at all times.";

const SUMMARY_GUIDELINES: &str = "\
Produce an objective, concise and actionable assessment in a professional, supportive tone. \
Every point must relate to specific answers or behaviors from the conversation. \
Strengths must reflect performance actually observed, and recommended practice must address the areas of improvement. \
Scores range from 0 to 10. \
If the conversation contains no interview content, give a poor review.";

/// Renders retrieved memories, one per line.
pub fn format_relevant_memories(memories: &[ScoredMemory]) -> String {
    let mut out = String::new();
    for memory in memories {
        let _ = writeln!(out, "Memory: {}, createdAt: {}", memory.text, memory.created_at);
    }
    out
}

/// System prompt of an interview turn.
pub fn interviewer_prompt(agent_name: &str, memories: &[ScoredMemory]) -> String {
    let mut prompt = format!("You are {agent_name}, an interview AI assistant.\n{INTERVIEWER_GUIDELINES}\n");
    prompt.push_str("\nRelevant memory of the candidate:\n");
    if memories.is_empty() {
        prompt.push_str("(none yet)\n");
    } else {
        prompt.push_str(&format_relevant_memories(memories));
    }
    prompt
}

/// System prompt of the summary pass: every memory plus the full transcript.
pub fn summary_prompt(memories: &[MemoryRecord], conversation: &[ChatMessage]) -> String {
    let mut prompt = String::from(
        "You are an AI interviewer assistant generating a detailed, structured interview feedback summary for a candidate.\n\
         Use the conversation memories and the whole conversation below.\n\n",
    );
    prompt.push_str(SUMMARY_GUIDELINES);

    prompt.push_str("\n\nConversation memory:\n");
    for memory in memories {
        let _ = writeln!(prompt, "Memory: {}", memory.text);
    }

    prompt.push_str("\nWhole conversation:\n");
    if conversation.is_empty() {
        prompt.push_str("(no conversation took place)\n");
    }
    for message in conversation.iter().filter(|m| m.role != Role::System) {
        let _ = writeln!(prompt, "{}: {}", message.role, message.content);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::types::MemoryCategory;

    fn scored(text: &str, at: &str) -> ScoredMemory {
        ScoredMemory {
            id: "id".into(),
            text: text.into(),
            created_at: at.into(),
            score: 0.9,
        }
    }

    #[test]
    fn relevant_memories_include_timestamps() {
        let rendered = format_relevant_memories(&[
            scored("Knows Rust", "2026-01-01T00:00:00.000Z"),
            scored("Lives in Lisbon", "2026-01-02T00:00:00.000Z"),
        ]);
        assert_eq!(
            rendered,
            "Memory: Knows Rust, createdAt: 2026-01-01T00:00:00.000Z\n\
             Memory: Lives in Lisbon, createdAt: 2026-01-02T00:00:00.000Z\n"
        );
    }

    #[test]
    fn interviewer_prompt_embeds_memory_context() {
        let prompt = interviewer_prompt("Parley", &[scored("Knows Rust", "t")]);
        assert!(prompt.starts_with("You are Parley"));
        assert!(prompt.contains("Memory: Knows Rust, createdAt: t"));

        let empty = interviewer_prompt("Parley", &[]);
        assert!(empty.contains("(none yet)"));
    }

    #[test]
    fn summary_prompt_lists_memories_and_transcript() {
        let memories = vec![MemoryRecord {
            id: "a".into(),
            user_id: "u1".into(),
            text: "Knows Rust".into(),
            embedding: Vec::new(),
            created_at: "t".into(),
            category: MemoryCategory::Memory,
        }];
        let log = vec![
            ChatMessage::user("I know Rust"),
            ChatMessage::assistant("Tell me more"),
        ];
        let prompt = summary_prompt(&memories, &log);
        assert!(prompt.contains("Memory: Knows Rust\n"));
        assert!(prompt.contains("user: I know Rust\nassistant: Tell me more\n"));
        assert!(summary_prompt(&[], &[]).contains("(no conversation took place)"));
    }
}
