//! Answer formatting for retrieved mark-scheme passages.
//!
//! The formatter is local and deterministic: the exact answer is a bullet
//! list of the most frequent keywords in the retrieved text, and the short
//! explanation is the retrieved text itself, collapsed and truncated. How
//! many bullets to emit comes from the question's marks, or failing that
//! from its command word.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

const SHORT_EXPLANATION_CHARS: usize = 240;

const NO_MATCH_EXACT: &str =
    "- Insufficient mark-scheme match found. Please refine the question text.";
const NO_MATCH_SHORT: &str = "I could not find a close match in the mark scheme.";

/// Words dropped before counting keywords.
const KEYWORD_STOPWORDS: &[&str] = &[
    "the", "and", "or", "to", "of", "a", "an", "in", "on", "for", "with", "by", "is", "are",
    "was", "were", "be", "been", "being", "that", "this", "these", "those", "as", "at", "from",
    "it", "its", "into", "over", "under", "between", "within", "without", "use", "used", "using",
    "can", "may", "will", "would", "should", "could", "do", "does", "did", "done", "what", "which",
    "how", "why",
];

/// Exam command words, in detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandWord {
    Identify,
    State,
    Give,
    Define,
    Describe,
    Explain,
    Outline,
    Compare,
    Contrast,
    Discuss,
    Evaluate,
    Justify,
    Unspecified,
}

impl CommandWord {
    const DETECTABLE: [CommandWord; 12] = [
        CommandWord::Identify,
        CommandWord::State,
        CommandWord::Give,
        CommandWord::Define,
        CommandWord::Describe,
        CommandWord::Explain,
        CommandWord::Outline,
        CommandWord::Compare,
        CommandWord::Contrast,
        CommandWord::Discuss,
        CommandWord::Evaluate,
        CommandWord::Justify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandWord::Identify => "identify",
            CommandWord::State => "state",
            CommandWord::Give => "give",
            CommandWord::Define => "define",
            CommandWord::Describe => "describe",
            CommandWord::Explain => "explain",
            CommandWord::Outline => "outline",
            CommandWord::Compare => "compare",
            CommandWord::Contrast => "contrast",
            CommandWord::Discuss => "discuss",
            CommandWord::Evaluate => "evaluate",
            CommandWord::Justify => "justify",
            CommandWord::Unspecified => "unspecified",
        }
    }

    /// Bullet count when the question carries no marks.
    pub fn depth(&self) -> usize {
        match self {
            CommandWord::Identify | CommandWord::State | CommandWord::Give | CommandWord::Define => 2,
            CommandWord::Explain
            | CommandWord::Discuss
            | CommandWord::Evaluate
            | CommandWord::Justify => 4,
            _ => 3,
        }
    }
}

impl fmt::Display for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedAnswer {
    pub exact_answer: String,
    pub short_explanation: String,
}

fn words(lower: &str) -> impl Iterator<Item = &str> {
    lower
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
}

/// Detect the command word of a question.
///
/// Explicit command words win in priority order. Then `how`/`why` map to
/// explain, `what` to describe, `list`/`name` to identify, and follow-ups
/// such as "give me 2 more points" to give.
pub fn detect_command_word(question: &str) -> CommandWord {
    let lower = question.to_lowercase();
    let present: Vec<&str> = words(&lower).collect();
    let has = |w: &str| present.contains(&w);

    if let Some(word) = CommandWord::DETECTABLE.iter().find(|cw| has(cw.as_str())) {
        return *word;
    }

    if has("how") || has("why") {
        return CommandWord::Explain;
    }
    if has("what") {
        return CommandWord::Describe;
    }
    if has("list") || has("name") {
        return CommandWord::Identify;
    }

    static MORE_POINTS: OnceLock<Regex> = OnceLock::new();
    let more_points = MORE_POINTS
        .get_or_init(|| Regex::new(r"\bmore\s+points?\b").expect("more-points pattern is valid"));
    if more_points.is_match(&lower) {
        return CommandWord::Give;
    }

    CommandWord::Unspecified
}

/// Marks stated in the question: `(4)`, `(4 marks)` or `4 marks`.
pub fn detect_marks(question: &str) -> Option<u32> {
    static BRACKETED: OnceLock<Regex> = OnceLock::new();
    static TRAILING: OnceLock<Regex> = OnceLock::new();
    let bracketed = BRACKETED.get_or_init(|| {
        Regex::new(r"\((\d+)\s*(?:marks?)?\)").expect("bracketed marks pattern is valid")
    });
    let trailing = TRAILING
        .get_or_init(|| Regex::new(r"\b(\d+)\s*marks?\b").expect("marks pattern is valid"));

    let lower = question.to_lowercase();
    bracketed
        .captures(&lower)
        .or_else(|| trailing.captures(&lower))
        .and_then(|caps| caps[1].parse().ok())
}

/// Format retrieved passages as an exact answer and a short explanation.
pub fn format_answer(
    command_word: CommandWord,
    marks: Option<u32>,
    passages: &[&str],
) -> FormattedAnswer {
    let combined = passages.join("\n\n");
    let combined = combined.trim();
    if combined.is_empty() {
        return FormattedAnswer {
            exact_answer: NO_MATCH_EXACT.to_string(),
            short_explanation: NO_MATCH_SHORT.to_string(),
        };
    }

    let depth = match marks {
        Some(m) => (m as usize).clamp(2, 6),
        None => command_word.depth(),
    };

    let exact_answer = top_keywords(combined, depth)
        .iter()
        .map(|kw| format!("- {}", kw))
        .collect::<Vec<_>>()
        .join("\n");

    let summary = combined.split_whitespace().collect::<Vec<_>>().join(" ");
    let short_explanation = if summary.chars().count() > SHORT_EXPLANATION_CHARS {
        let cut: String = summary.chars().take(SHORT_EXPLANATION_CHARS).collect();
        format!("{}...", cut)
    } else {
        summary
    };

    FormattedAnswer {
        exact_answer,
        short_explanation,
    }
}

/// Most frequent non-stopword terms; ties keep first-occurrence order.
fn top_keywords(text: &str, max_terms: usize) -> Vec<String> {
    let lower = text.to_lowercase();
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();

    for token in lower.split(|c: char| !c.is_ascii_alphanumeric()) {
        if token.is_empty() || KEYWORD_STOPWORDS.contains(&token) {
            continue;
        }
        let count = counts.entry(token).or_insert(0);
        if *count == 0 {
            order.push(token);
        }
        *count += 1;
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(max_terms)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_explicit_command_word() {
        assert_eq!(
            detect_command_word("Describe the purpose of the ALU."),
            CommandWord::Describe
        );
        assert_eq!(detect_command_word("STATE two features"), CommandWord::State);
    }

    #[test]
    fn test_command_word_priority_follows_list_order() {
        // "identify" precedes "explain" in priority.
        assert_eq!(
            detect_command_word("Explain and identify the registers"),
            CommandWord::Identify
        );
    }

    #[test]
    fn test_detect_aliases() {
        assert_eq!(detect_command_word("Why is RAM volatile?"), CommandWord::Explain);
        assert_eq!(detect_command_word("What is a register?"), CommandWord::Describe);
        assert_eq!(detect_command_word("Name three buses"), CommandWord::Identify);
        assert_eq!(detect_command_word("2 more points please"), CommandWord::Give);
        assert_eq!(detect_command_word("the alu"), CommandWord::Unspecified);
    }

    #[test]
    fn test_detect_marks() {
        assert_eq!(detect_marks("Explain the role of the ALU (4)"), Some(4));
        assert_eq!(detect_marks("Explain the role of the ALU (3 marks)"), Some(3));
        assert_eq!(detect_marks("For 2 marks, state a use"), Some(2));
        assert_eq!(detect_marks("Explain the ALU"), None);
    }

    #[test]
    fn test_format_answer_no_passages() {
        let ans = format_answer(CommandWord::Explain, None, &[]);
        assert_eq!(ans.exact_answer, NO_MATCH_EXACT);
        assert_eq!(ans.short_explanation, NO_MATCH_SHORT);

        let blank = format_answer(CommandWord::Explain, None, &["  \n "]);
        assert_eq!(blank.exact_answer, NO_MATCH_EXACT);
    }

    #[test]
    fn test_format_answer_depth_from_command_word() {
        let text = "alu alu alu arithmetic arithmetic logic unit";
        let ans = format_answer(CommandWord::State, None, &[text]);
        assert_eq!(ans.exact_answer, "- alu\n- arithmetic");

        let ans = format_answer(CommandWord::Explain, None, &[text]);
        assert_eq!(ans.exact_answer, "- alu\n- arithmetic\n- logic\n- unit");
    }

    #[test]
    fn test_format_answer_marks_are_clamped() {
        let text = "a1 b2 c3 d4 e5 f6 g7 h8";
        let one = format_answer(CommandWord::Unspecified, Some(1), &[text]);
        assert_eq!(one.exact_answer.lines().count(), 2);
        let many = format_answer(CommandWord::Unspecified, Some(20), &[text]);
        assert_eq!(many.exact_answer.lines().count(), 6);
    }

    #[test]
    fn test_short_explanation_is_collapsed_and_truncated() {
        let ans = format_answer(CommandWord::Describe, None, &["the alu\n\n  performs   arithmetic"]);
        assert_eq!(ans.short_explanation, "the alu performs arithmetic");

        let long = "word ".repeat(100);
        let ans = format_answer(CommandWord::Describe, None, &[long.as_str()]);
        assert!(ans.short_explanation.ends_with("..."));
        assert_eq!(ans.short_explanation.chars().count(), SHORT_EXPLANATION_CHARS + 3);
    }
}
