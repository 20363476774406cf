//! Prompt assembly for grounded answers.

use crate::document::SearchResult;
use crate::error::{RagError, Result};

/// What the model is told to say when the context does not contain the answer.
pub const FALLBACK_ANSWER: &str = "I don't have that info.";

const CONTEXT_PLACEHOLDER: &str = "{context}";
const QUESTION_PLACEHOLDER: &str = "{question}";

/// The sales-engineer instructions every question is wrapped in.
pub const SALES_ENGINEER_TEMPLATE: &str = "\
You are an elite Sales Engineer for VelocityAI.
Use the provided context to answer the user's question.

Rules:
1. If the answer is not in the context, say \"I don't have that info.\"
2. Be concise and professional.
3. If mentioning a competitor, explain how we win.

Context:
{context}

Question:
{question}
";

/// A prompt with `{context}` and `{question}` slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Wrap a template string.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PromptError`] unless both `{context}` and
    /// `{question}` appear in the template.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT_PLACEHOLDER, QUESTION_PLACEHOLDER] {
            if !template.contains(placeholder) {
                return Err(RagError::PromptError(format!(
                    "template is missing the {placeholder} placeholder"
                )));
            }
        }
        Ok(Self { template })
    }

    /// The built-in sales-engineer template.
    pub fn sales_engineer() -> Self {
        Self { template: SALES_ENGINEER_TEMPLATE.to_string() }
    }

    /// Fill both slots.
    ///
    /// The context is substituted first, so a question that itself contains
    /// `{context}` is left untouched.
    pub fn render(&self, context: &str, question: &str) -> String {
        match self.template.split_once(QUESTION_PLACEHOLDER) {
            Some((before, after)) => format!(
                "{}{question}{}",
                before.replace(CONTEXT_PLACEHOLDER, context),
                after.replace(CONTEXT_PLACEHOLDER, context)
            ),
            None => self.template.replace(CONTEXT_PLACEHOLDER, context),
        }
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::sales_engineer()
    }
}

/// Join retrieved chunk texts, most relevant first, separated by blank lines.
pub fn format_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sales_template_renders_both_slots() {
        let prompt = PromptTemplate::sales_engineer()
            .render("Pro tier is $49.", "How much is Pro?");
        assert!(prompt.starts_with("You are an elite Sales Engineer for VelocityAI."));
        assert!(prompt.contains("Context:\nPro tier is $49.\n\nQuestion:\nHow much is Pro?\n"));
        assert!(prompt.contains(FALLBACK_ANSWER));
    }

    #[test]
    fn placeholders_in_the_question_are_not_expanded() {
        let template = PromptTemplate::new("C: {context} Q: {question}").unwrap();
        assert_eq!(template.render("ctx", "what is {context}?"), "C: ctx Q: what is {context}?");
    }

    #[test]
    fn templates_without_slots_are_rejected() {
        assert!(matches!(PromptTemplate::new("{context} only"), Err(RagError::PromptError(_))));
        assert!(PromptTemplate::new("{question} only").is_err());
    }

    #[test]
    fn empty_results_give_empty_context() {
        assert_eq!(format_context(&[]), "");
    }
}
