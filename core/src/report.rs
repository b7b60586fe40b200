use crate::{CaseOutcome, Failure, InvocationResult, SuiteSummary, TestCase, SKIP_MARKER};
use owo_colors::{AnsiColors, OwoColorize};
use std::io::{Result, Write};

/// Follows a diff line that wasn't terminated by a newline in the program's output
const NO_NEWLINE: &str = "\\ No newline at end of output";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Colored,
    Plain,
}

/// Renders progress and summaries. Purely observational, outcomes are decided elsewhere.
pub struct Reporter<W> {
    out: W,
    style: Style,
    ci_annotations: bool,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W, style: Style, ci_annotations: bool) -> Self {
        Self {
            out,
            style,
            ci_annotations,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn paint(&self, text: &str, color: AnsiColors) -> String {
        match self.style {
            Style::Colored => text.color(color).to_string(),
            Style::Plain => text.to_string(),
        }
    }

    fn paint_red(&self, text: &str) -> String {
        self.paint(text, AnsiColors::Red)
    }

    fn paint_green(&self, text: &str) -> String {
        self.paint(text, AnsiColors::Green)
    }

    fn paint_yellow(&self, text: &str) -> String {
        self.paint(text, AnsiColors::Yellow)
    }

    pub fn arch_header(&mut self, arch: &str) -> Result<()> {
        writeln!(self.out, "\n=== Architecture: {arch} ===")
    }

    /// One case, written in a single piece so parallel runs never interleave lines
    pub fn case(&mut self, case: &TestCase, outcome: &CaseOutcome) -> Result<()> {
        let mut text = format!("Testing {}... ", case.path.display());
        match outcome {
            CaseOutcome::Passed => text += &self.paint_green("PASS"),
            CaseOutcome::Matched => text += &self.paint_green("PASS (+ MATCH)"),
            CaseOutcome::Skipped => {
                text += &self.paint_yellow(&format!("SKIPPED ({SKIP_MARKER})"));
            }
            CaseOutcome::Failed(failure) => self.describe_failure(&mut text, failure),
        }
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn describe_failure(&self, text: &mut String, failure: &Failure) {
        match failure {
            Failure::ShouldFail => *text += &self.paint_red("ERROR: should fail"),
            Failure::ShouldSucceed { stdout, stderr } => {
                *text += &self.paint_red("ERROR: should succeed");
                push_block(text, &String::from_utf8_lossy(stdout));
                push_block(text, &String::from_utf8_lossy(stderr));
            }
            Failure::MissingFiles { source, artifact } => {
                *text += &self.paint_red(&format!(
                    "Missing file(s): {}, {}",
                    source.display(),
                    artifact.display()
                ));
            }
            Failure::BuildFailed { command, stderr } => {
                *text += &self.paint_red("Compilation failed:");
                push_block(text, &format!("Command: {command}"));
                push_block(text, "stderr:");
                push_block(text, &String::from_utf8_lossy(stderr));
            }
            Failure::Mismatch {
                verdict,
                reference,
                candidate,
            } => {
                *text += &self.paint_red("MISMATCH DETECTED");
                if !verdict.exit_codes_match {
                    push_block(
                        text,
                        &format!(
                            "Return codes differ: C={}, ASM={}",
                            reference.exit_code, candidate.exit_code
                        ),
                    );
                }
                if !verdict.outputs_match {
                    self.push_output_diff(text, reference, candidate);
                }
            }
            Failure::TimedOut { program, after } => {
                *text += &self.paint_red(&format!(
                    "TIMEOUT: `{program}` did not finish within {}s",
                    after.as_secs_f64()
                ));
            }
        }
    }

    fn push_output_diff(
        &self,
        text: &mut String,
        reference: &InvocationResult,
        candidate: &InvocationResult,
    ) {
        let reference = reference.stdout_lossy();
        let candidate = candidate.stdout_lossy();

        push_block(text, "--- C output ---");
        push_block(text, &reference);
        push_block(text, "--- S output ---");
        push_block(text, &candidate);
        push_block(text, "--- Diff ---");

        let reference: Vec<&str> = reference.split_inclusive('\n').collect();
        let candidate: Vec<&str> = candidate.split_inclusive('\n').collect();
        for line in diff::slice(&reference, &candidate) {
            let (prefix, raw) = match line {
                diff::Result::Left(left) => ('-', *left),
                diff::Result::Both(both, _) => (' ', *both),
                diff::Result::Right(right) => ('+', *right),
            };
            let mut rendered = format!("{prefix}{}", raw.strip_suffix('\n').unwrap_or(raw));
            if !raw.ends_with('\n') {
                rendered.push('\n');
                rendered.push_str(NO_NEWLINE);
            }
            let rendered = match prefix {
                '-' => self.paint_red(&rendered),
                '+' => self.paint_green(&rendered),
                _ => rendered,
            };
            text.push('\n');
            text.push_str(&rendered);
        }
    }

    pub fn empty_corpus(&mut self) -> Result<()> {
        writeln!(self.out, "\nSummary:")?;
        writeln!(self.out, "{}", self.paint_red("ERROR: No test files found."))
    }

    pub fn summary(&mut self, summary: &SuiteSummary) -> Result<()> {
        writeln!(self.out, "\nSummary:")?;
        writeln!(
            self.out,
            "Total: {}, Passed: {}, Failed: {}",
            summary.total, summary.passed, summary.failed
        )?;
        if summary.skipped > 0 {
            writeln!(
                self.out,
                "{}",
                self.paint_yellow(&format!("Skipped (counted as passed): {}", summary.skipped))
            )?;
        }

        if summary.is_clean() {
            writeln!(self.out, "{}", self.paint_green("All tests passed."))?;
            if self.ci_annotations {
                writeln!(self.out, "::notice ::All tests passed successfully.")?;
            }
        } else {
            writeln!(self.out, "{}", self.paint_red("Some tests failed."))?;
            if self.ci_annotations {
                writeln!(
                    self.out,
                    "::error ::{} of {} tests failed.",
                    summary.failed, summary.total
                )?;
            }
        }

        self.out.flush()
    }
}

fn push_block(text: &mut String, block: &str) {
    let block = block.trim_end();
    if !block.is_empty() {
        text.push('\n');
        text.push_str(block);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{ComparisonVerdict, Expectation, Invocation};
    use std::path::PathBuf;

    fn render(ci: bool, f: impl FnOnce(&mut Reporter<Vec<u8>>) -> Result<()>) -> String {
        let mut reporter = Reporter::new(Vec::new(), Style::Plain, ci);
        f(&mut reporter).unwrap();
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    fn case() -> TestCase {
        TestCase::new("stage_1/valid/good.c", Some(1), Expectation::Succeed, "aarch64")
    }

    fn ran(stdout: &str, exit_code: i32) -> InvocationResult {
        InvocationResult {
            stdout: stdout.as_bytes().to_vec(),
            stderr: vec![],
            exit_code,
        }
    }

    #[test]
    fn passing_cases() {
        let out = render(false, |r| {
            r.case(&case(), &CaseOutcome::Passed)?;
            r.case(&case(), &CaseOutcome::Matched)?;
            r.case(&case(), &CaseOutcome::Skipped)
        });

        assert_eq!(
            out,
            concat!(
                "Testing stage_1/valid/good.c... PASS\n",
                "Testing stage_1/valid/good.c... PASS (+ MATCH)\n",
                "Testing stage_1/valid/good.c... SKIPPED (skip_on_failure)\n",
            )
        );
    }

    #[test]
    fn stdout_mismatch_shows_both_outputs_and_a_diff() {
        let failure = Failure::Mismatch {
            verdict: ComparisonVerdict {
                outputs_match: false,
                exit_codes_match: true,
            },
            reference: ran("42\n", 0),
            candidate: ran("43\n", 0),
        };

        let out = render(false, |r| r.case(&case(), &CaseOutcome::Failed(failure)));

        assert_eq!(
            out,
            concat!(
                "Testing stage_1/valid/good.c... MISMATCH DETECTED\n",
                "--- C output ---\n",
                "42\n",
                "--- S output ---\n",
                "43\n",
                "--- Diff ---\n",
                "-42\n",
                "+43\n",
            )
        );
    }

    #[test]
    fn missing_final_newline_shows_up_in_the_diff() {
        let failure = Failure::Mismatch {
            verdict: ComparisonVerdict {
                outputs_match: false,
                exit_codes_match: true,
            },
            reference: ran("1\n42\n", 0),
            candidate: ran("1\n42", 0),
        };

        let out = render(false, |r| r.case(&case(), &CaseOutcome::Failed(failure)));

        assert_eq!(
            out,
            concat!(
                "Testing stage_1/valid/good.c... MISMATCH DETECTED\n",
                "--- C output ---\n",
                "1\n42\n",
                "--- S output ---\n",
                "1\n42\n",
                "--- Diff ---\n",
                " 1\n",
                "-42\n",
                "+42\n",
                "\\ No newline at end of output\n",
            )
        );
    }

    #[test]
    fn trailing_whitespace_difference_is_diffed() {
        let failure = Failure::Mismatch {
            verdict: ComparisonVerdict {
                outputs_match: false,
                exit_codes_match: true,
            },
            reference: ran("42\n", 0),
            candidate: ran("42 \n", 0),
        };

        let out = render(false, |r| r.case(&case(), &CaseOutcome::Failed(failure)));

        assert!(out.ends_with("--- Diff ---\n-42\n+42 \n"), "{out:?}");
    }

    #[test]
    fn exit_code_mismatch_is_stated() {
        let failure = Failure::Mismatch {
            verdict: ComparisonVerdict {
                outputs_match: true,
                exit_codes_match: false,
            },
            reference: ran("same\n", 0),
            candidate: ran("same\n", 3),
        };

        let out = render(false, |r| r.case(&case(), &CaseOutcome::Failed(failure)));

        assert_eq!(
            out,
            "Testing stage_1/valid/good.c... MISMATCH DETECTED\nReturn codes differ: C=0, ASM=3\n"
        );
    }

    #[test]
    fn other_failures() {
        let out = render(false, |r| {
            r.case(&case(), &CaseOutcome::Failed(Failure::ShouldFail))?;
            r.case(
                &case(),
                &CaseOutcome::Failed(Failure::ShouldSucceed {
                    stdout: b"tokens\n".to_vec(),
                    stderr: b"error: nope\n".to_vec(),
                }),
            )?;
            r.case(
                &case(),
                &CaseOutcome::Failed(Failure::MissingFiles {
                    source: PathBuf::from("a.c"),
                    artifact: PathBuf::from("a.s"),
                }),
            )?;
            r.case(
                &case(),
                &CaseOutcome::Failed(Failure::BuildFailed {
                    command: Invocation::new("clang").arg("a.s"),
                    stderr: b"bad asm\n".to_vec(),
                }),
            )
        });

        assert_eq!(
            out,
            concat!(
                "Testing stage_1/valid/good.c... ERROR: should fail\n",
                "Testing stage_1/valid/good.c... ERROR: should succeed\n",
                "tokens\n",
                "error: nope\n",
                "Testing stage_1/valid/good.c... Missing file(s): a.c, a.s\n",
                "Testing stage_1/valid/good.c... Compilation failed:\n",
                "Command: clang a.s\n",
                "stderr:\n",
                "bad asm\n",
            )
        );
    }

    #[test]
    fn clean_summary_with_annotations() {
        let summary = SuiteSummary {
            arch: "aarch64".into(),
            total: 3,
            passed: 3,
            failed: 0,
            skipped: 0,
        };

        let out = render(true, |r| r.summary(&summary));

        assert_eq!(
            out,
            concat!(
                "\nSummary:\n",
                "Total: 3, Passed: 3, Failed: 0\n",
                "All tests passed.\n",
                "::notice ::All tests passed successfully.\n",
            )
        );
    }

    #[test]
    fn failing_summary_with_annotations() {
        let summary = SuiteSummary {
            arch: "aarch64".into(),
            total: 4,
            passed: 2,
            failed: 2,
            skipped: 1,
        };

        let out = render(true, |r| r.summary(&summary));

        assert_eq!(
            out,
            concat!(
                "\nSummary:\n",
                "Total: 4, Passed: 2, Failed: 2\n",
                "Skipped (counted as passed): 1\n",
                "Some tests failed.\n",
                "::error ::2 of 4 tests failed.\n",
            )
        );
    }

    #[test]
    fn annotations_are_opt_in() {
        let summary = SuiteSummary {
            arch: "aarch64".into(),
            total: 1,
            passed: 0,
            failed: 1,
            skipped: 0,
        };

        let out = render(false, |r| r.summary(&summary));

        assert!(!out.contains("::error"), "{out}");
    }

    #[test]
    fn colored_output_wraps_status_in_escape_codes() {
        let mut reporter = Reporter::new(Vec::new(), Style::Colored, false);
        reporter.case(&case(), &CaseOutcome::Passed).unwrap();
        let out = String::from_utf8(reporter.into_inner()).unwrap();

        assert!(out.contains("\u{1b}["), "{out:?}");
        assert!(out.contains("PASS"), "{out:?}");
    }
}
