//! Console transcript printed by the query binary.

use std::io::{self, Write};

use velocity_rag::Answer;

const RULE: &str = "----------------------------------------";

/// Banner printed before retrieval starts.
pub fn write_banner(out: &mut impl Write, question: &str) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Querying: '{question}'")?;
    writeln!(out, "{RULE}")
}

/// The answer followed by the distinct sources it was grounded on.
pub fn write_answer(out: &mut impl Write, answer: &Answer) -> io::Result<()> {
    writeln!(out, "AI Response:")?;
    writeln!(out, "{}", answer.text)?;
    writeln!(out, "{RULE}")?;
    writeln!(out, "Sources Used:")?;
    for source in &answer.sources {
        writeln!(out, " - {source}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_lists_each_source_once_per_line() {
        let answer = Answer {
            text: "VelocityAI deploys in an afternoon.".into(),
            sources: vec!["battlecard.txt".into(), "Unknown".into()],
            results: Vec::new(),
        };
        let mut out = Vec::new();
        write_banner(&mut out, "Why switch?").unwrap();
        write_answer(&mut out, &answer).unwrap();

        let text = String::from_utf8(out).unwrap();
        let expected = format!(
            "\nQuerying: 'Why switch?'\n{RULE}\nAI Response:\nVelocityAI deploys in an \
             afternoon.\n{RULE}\nSources Used:\n - battlecard.txt\n - Unknown\n"
        );
        assert_eq!(text, expected);
        assert_eq!(RULE.len(), 40);
    }
}
