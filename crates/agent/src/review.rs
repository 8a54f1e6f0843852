//! Review flow (§4.9): a doer/reviewer pair iterating until the reviewer's
//! output grades PASS, or `max_iterations` is exhausted.

use ah_domain::error::Result;
use regex::Regex;

use crate::base::BaseAgent;
use crate::tool_calling::ToolCallingAgent;

const DEFAULT_MAX_ITERATIONS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    Pass,
    Fail,
}

/// Scan for `GRADE: PASS` or `GRADE: FAIL` (case-insensitive). Defaults to
/// `Pass` on ambiguity (both present, or neither), with a warning logged.
pub fn extract_grade(review_text: &str) -> Grade {
    let pattern = Regex::new(r"(?i)grade:\s*(pass|fail)").expect("static pattern");
    let matches: Vec<Grade> = pattern
        .captures_iter(review_text)
        .filter_map(|c| c.get(1))
        .map(|m| if m.as_str().eq_ignore_ascii_case("pass") { Grade::Pass } else { Grade::Fail })
        .collect();

    match matches.first() {
        Some(grade) if matches.iter().all(|g| g == grade) => *grade,
        Some(_) => {
            tracing::warn!("review output contains conflicting GRADE markers, defaulting to PASS");
            Grade::Pass
        }
        None => {
            tracing::warn!("review output has no GRADE marker, defaulting to PASS");
            Grade::Pass
        }
    }
}

pub struct ReviewFlow {
    pub doer: BaseAgent,
    pub reviewer: BaseAgent,
    pub max_iterations: u32,
}

impl ReviewFlow {
    pub fn new(doer: BaseAgent, reviewer: BaseAgent) -> Self {
        Self { doer, reviewer, max_iterations: DEFAULT_MAX_ITERATIONS }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub async fn run(&mut self, request: &str) -> Result<String> {
        let mut last_output = String::new();
        let mut feedback = String::new();

        for iteration in 1..=self.max_iterations {
            let doer_prompt = if iteration == 1 {
                request.to_string()
            } else {
                format!(
                    "PREVIOUS ATTEMPT:\n{}\n\nREVIEWER FEEDBACK:\n{feedback}\n\n\
                    Please address the reviewer's concerns and improve your solution.",
                    truncate(&last_output, 500),
                )
            };

            let mut doer_exec = ToolCallingAgent::new();
            last_output = self.doer.run(&mut doer_exec, Some(doer_prompt)).await?;
            self.doer.reset_for_rerun();

            let review_prompt = format!(
                "Please review the following output.\n\nTASK: {}\n\nOUTPUT TO REVIEW:\n{}\n\n\
                Provide your assessment, ending with a line \"GRADE: PASS\" or \"GRADE: FAIL\".",
                truncate(request, 200),
                truncate(&last_output, 1000),
            );

            let mut reviewer_exec = ToolCallingAgent::new();
            let review_result = self.reviewer.run(&mut reviewer_exec, Some(review_prompt)).await?;
            self.reviewer.reset_for_rerun();

            let grade = extract_grade(&review_result);
            match grade {
                Grade::Pass => {
                    return Ok(format!(
                        "FINAL OUTPUT (passed review after {iteration} iteration(s)):\n\n{last_output}\n\n---\nREVIEWER'S ASSESSMENT:\n{review_result}"
                    ));
                }
                Grade::Fail => {
                    feedback = review_result.clone();
                    if iteration == self.max_iterations {
                        return Ok(format!(
                            "FINAL OUTPUT (max iterations reached, did not pass review):\n\n{last_output}\n\n---\nLAST REVIEW:\n{review_result}"
                        ));
                    }
                }
            }
        }

        Ok(last_output)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_grade_reads_pass() {
        assert_eq!(extract_grade("Looks solid.\nGRADE: PASS\n"), Grade::Pass);
    }

    #[test]
    fn extract_grade_reads_fail_case_insensitive() {
        assert_eq!(extract_grade("issues found\ngrade: fail"), Grade::Fail);
    }

    #[test]
    fn extract_grade_defaults_to_pass_when_absent() {
        assert_eq!(extract_grade("no explicit marker here"), Grade::Pass);
    }

    #[test]
    fn extract_grade_defaults_to_pass_on_conflicting_markers() {
        assert_eq!(extract_grade("GRADE: PASS\n...\nGRADE: FAIL"), Grade::Pass);
    }
}
