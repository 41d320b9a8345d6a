//! Prompt construction for trend commentary
//!
//! Prompts are plain text and fully determined by the request and row limit,
//! so the same table and question always produce the same prompt.

use crate::types::AiSummaryRequest;

/// Build the prompt for `request`, including at most `max_rows` table rows
///
/// A question switches to the question-answering shape; otherwise the model
/// is asked for a trend analysis.
pub fn build_prompt(request: &AiSummaryRequest, max_rows: usize) -> String {
    let table = request.summary.head(max_rows).render();
    let omitted = request.summary.len().saturating_sub(max_rows);
    let note = if omitted > 0 {
        format!("\n({} more rows not shown)", omitted)
    } else {
        String::new()
    };

    match request.question() {
        Some(question) => format!(
            "Based on the following data about {label}:\n\n\
             {table}{note}\n\n\
             Answer the following question in 5-7 sentences, focusing on \
             data-driven insights and potential implications:\n\
             {question}",
            label = request.domain_label,
        ),
        None => format!(
            "Analyze the following data about {label}:\n\n\
             {table}{note}\n\n\
             Provide a comprehensive analysis in 5-7 sentences, focusing on:\n\
             1. Key trends and patterns\n\
             2. Notable findings\n\
             3. Potential implications\n\
             4. Recommendations\n\
             5. Areas for further investigation",
            label = request.domain_label,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TabularSummary, TermCount};

    fn summary() -> TabularSummary {
        let counts = vec![
            TermCount::new("NAUSEA", 120),
            TermCount::new("HEADACHE", 80),
            TermCount::new("FATIGUE", 40),
        ];
        TabularSummary::from_term_counts("Reaction", "Count", &counts, false)
    }

    #[test]
    fn test_trend_prompt() {
        let request = AiSummaryRequest::new("adverse drug reactions", summary());
        let prompt = build_prompt(&request, 10);

        assert!(prompt.starts_with("Analyze the following data about adverse drug reactions:"));
        assert!(prompt.contains("NAUSEA    120"));
        assert!(prompt.contains("1. Key trends and patterns"));
        assert!(!prompt.contains("more rows"));
    }

    #[test]
    fn test_question_prompt_trims_question() {
        let request = AiSummaryRequest::new("adverse drug reactions", summary())
            .with_question("  Which reaction dominates?  ");
        let prompt = build_prompt(&request, 10);

        assert!(prompt.starts_with("Based on the following data about adverse drug reactions:"));
        assert!(prompt.ends_with("\nWhich reaction dominates?"));
    }

    #[test]
    fn test_blank_question_uses_trend_shape() {
        let request = AiSummaryRequest::new("food recalls", summary()).with_question("   ");
        assert!(build_prompt(&request, 10).starts_with("Analyze"));
    }

    #[test]
    fn test_row_limit() {
        let request = AiSummaryRequest::new("device events", summary());
        let prompt = build_prompt(&request, 2);

        assert!(prompt.contains("HEADACHE"));
        assert!(!prompt.contains("FATIGUE"));
        assert!(prompt.contains("(1 more rows not shown)"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let request = AiSummaryRequest::new("tobacco problems", summary()).with_question("Why?");
        assert_eq!(build_prompt(&request, 5), build_prompt(&request, 5));
    }
}
