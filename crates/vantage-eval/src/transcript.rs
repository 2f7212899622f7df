//! Parse test-runner transcripts into ordered execution records.
//!
//! The default pattern reads pytest `-v` output:
//!
//! ```text
//! tests/test_calc.py::TestCalculator::test_add[v1] PASSED     [ 25%]
//! tests/test_calc.py::TestCalculator::test_gcd[v1] FAILED     [ 50%]
//! ```
//!
//! A record's output is the text after its result line up to the next result
//! line or `===` banner. Bodies of the `____ TestCalculator.test_gcd[v1] ____`
//! sections printed under `FAILURES` are appended to the matching record.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_RESULT_PATTERN: &str =
    r"(?m)^(?P<id>[^\s\[]+::[^\s\[]+)(?:\[(?P<param>[^\]]*)\])?\s+(?P<status>PASSED|FAILED|ERROR)\b";

const BANNER_PATTERN: &str = r"(?m)^={3,}";
const SECTION_PATTERN: &str = r"(?m)^_{3,} (?P<name>.+?) _{3,}[ \t]*\r?$";

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("invalid result-line pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("result-line pattern has no named group '{0}'")]
    MissingGroup(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
}

impl Outcome {
    fn from_status(status: &str) -> Option<Self> {
        match status {
            "PASSED" | "passed" | "ok" => Some(Outcome::Passed),
            "FAILED" | "failed" | "ERROR" | "error" => Some(Outcome::Failed),
            _ => None,
        }
    }
}

/// One executed test, in transcript order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// 1-based execution position.
    pub position: usize,
    pub test_id: String,
    pub param: Option<String>,
    pub outcome: Outcome,
    pub output: String,
}

impl ExecutionRecord {
    pub fn failed(&self) -> bool {
        self.outcome == Outcome::Failed
    }

    pub fn method_name(&self) -> &str {
        self.test_id.rsplit("::").next().unwrap_or(&self.test_id)
    }
}

#[derive(Debug, Clone)]
pub struct TranscriptParser {
    result_line: Regex,
    banner: Regex,
    section: Regex,
    keep_segments: Option<usize>,
}

impl TranscriptParser {
    pub fn new() -> Self {
        Self::compile(DEFAULT_RESULT_PATTERN).expect("default result pattern is valid")
    }

    /// Use a custom result-line pattern with `id` and `status` named groups
    /// (and optionally `param`).
    pub fn with_pattern(pattern: &str) -> Result<Self, TranscriptError> {
        Self::compile(pattern)
    }

    fn compile(pattern: &str) -> Result<Self, TranscriptError> {
        let result_line = Regex::new(pattern)?;
        for group in ["id", "status"] {
            if !result_line.capture_names().flatten().any(|n| n == group) {
                return Err(TranscriptError::MissingGroup(group));
            }
        }
        Ok(Self {
            result_line,
            banner: Regex::new(BANNER_PATTERN)?,
            section: Regex::new(SECTION_PATTERN)?,
            keep_segments: None,
        })
    }

    /// Keep only the last `n` `::` segments of each test id, so that
    /// `tests/test_calc.py::TestCalculator::test_add` becomes
    /// `TestCalculator::test_add` for `n = 2`.
    pub fn keep_segments(mut self, n: usize) -> Self {
        self.keep_segments = Some(n.max(1));
        self
    }

    fn normalize_id(&self, id: &str) -> String {
        match self.keep_segments {
            Some(n) => {
                let segments: Vec<&str> = id.split("::").collect();
                let skip = segments.len().saturating_sub(n);
                segments[skip..].join("::")
            }
            None => id.to_string(),
        }
    }

    pub fn parse(&self, text: &str) -> Vec<ExecutionRecord> {
        let matches: Vec<_> = self.result_line.captures_iter(text).collect();
        let mut records = Vec::with_capacity(matches.len());

        for (i, caps) in matches.iter().enumerate() {
            let (Some(whole), Some(id), Some(status)) =
                (caps.get(0), caps.name("id"), caps.name("status"))
            else {
                continue;
            };
            let Some(outcome) = Outcome::from_status(status.as_str()) else {
                warn!(status = status.as_str(), "unrecognized test status, skipping");
                continue;
            };

            let region_end = matches
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map_or(text.len(), |m| m.start());
            let region = &text[whole.end()..region_end];
            let region = match self.banner.find(region) {
                Some(banner) => &region[..banner.start()],
                None => region,
            };
            // Drop the remainder of the result line, e.g. `[ 25%]`.
            let output = region.split_once('\n').map_or("", |(_, rest)| rest);

            records.push(ExecutionRecord {
                position: records.len() + 1,
                test_id: self.normalize_id(id.as_str()),
                param: caps.name("param").map(|p| p.as_str().to_string()),
                outcome,
                output: output.trim().to_string(),
            });
        }

        let attached = self.attach_failure_sections(text, &mut records);
        let failed = records.iter().filter(|r| r.failed()).count();
        info!(
            records = records.len(),
            failed,
            failure_sections = attached,
            "transcript parsed"
        );
        records
    }

    /// Append failure-section bodies to their records; returns how many
    /// sections found a home.
    fn attach_failure_sections(&self, text: &str, records: &mut [ExecutionRecord]) -> usize {
        let headers: Vec<_> = self.section.captures_iter(text).collect();
        let mut attached = 0;

        for (i, caps) in headers.iter().enumerate() {
            let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
                continue;
            };
            let next_header = headers
                .get(i + 1)
                .and_then(|h| h.get(0))
                .map_or(text.len(), |m| m.start());
            let body = &text[whole.end()..next_header];
            let body = match self.banner.find(body) {
                Some(banner) => &body[..banner.start()],
                None => body,
            };
            let body = body.trim();
            if body.is_empty() {
                continue;
            }

            let (method, param) = split_section_name(name.as_str());
            let target = records
                .iter()
                .position(|r| r.failed() && r.method_name() == method && r.param.as_deref() == param)
                .or_else(|| {
                    records
                        .iter()
                        .position(|r| r.method_name() == method && r.param.as_deref() == param)
                });
            match target {
                Some(idx) => {
                    let record = &mut records[idx];
                    if !record.output.is_empty() {
                        record.output.push('\n');
                    }
                    record.output.push_str(body);
                    attached += 1;
                }
                None => debug!(section = name.as_str(), "failure section without a result line"),
            }
        }
        attached
    }
}

impl Default for TranscriptParser {
    fn default() -> Self {
        Self::new()
    }
}

/// `TestCalculator.test_gcd[v1]` -> (`test_gcd`, Some(`v1`)).
fn split_section_name(name: &str) -> (&str, Option<&str>) {
    let (base, param) = match name.strip_suffix(']').and_then(|n| n.split_once('[')) {
        Some((base, param)) => (base, Some(param)),
        None => (name, None),
    };
    let method = base
        .rsplit(|c: char| c == '.' || c == ':')
        .next()
        .unwrap_or(base);
    (method, param)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "\
============================= test session starts ==============================
collected 3 items

tests/test_v1.py::TestCalculator::test_add[v1] PASSED                    [ 33%]
tests/test_v1.py::TestCalculator::test_gcd[v1] FAILED                    [ 66%]
tests/test_v1.py::TestCalculator::test_divide[v1] FAILED                 [100%]

=================================== FAILURES ===================================
_________________________ TestCalculator.test_gcd[v1] __________________________

    def test_gcd(self, calc):
>       assert calc.gcd(-12, 18) == 6
E       assert -6 == 6

tests/test_v1.py:40: AssertionError
_______________________ TestCalculator.test_divide[v1] _________________________

E       ZeroDivisionError: division by zero
=========================== short test summary info ============================
FAILED tests/test_v1.py::TestCalculator::test_gcd[v1] - assert -6 == 6
";

    #[test]
    fn test_parses_result_lines_in_order() {
        let records = TranscriptParser::new().parse(TRANSCRIPT);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].position, 1);
        assert_eq!(records[0].test_id, "tests/test_v1.py::TestCalculator::test_add");
        assert_eq!(records[0].param.as_deref(), Some("v1"));
        assert_eq!(records[0].outcome, Outcome::Passed);
        assert_eq!(records[2].method_name(), "test_divide");
        assert!(records[1].failed());
    }

    #[test]
    fn test_failure_sections_attach_to_matching_record() {
        let records = TranscriptParser::new().parse(TRANSCRIPT);
        assert!(records[1].output.contains("assert -6 == 6"));
        assert!(!records[1].output.contains("ZeroDivisionError"));
        assert!(records[2].output.contains("ZeroDivisionError"));
        assert!(!records[2].output.contains("short test summary"));
        assert!(records[0].output.is_empty());
    }

    #[test]
    fn test_inline_output_stops_at_banner() {
        let text = "\
a.py::T::test_x FAILED
Traceback: boom
=== summary ===
trailing noise
";
        let records = TranscriptParser::new().parse(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].param, None);
        assert_eq!(records[0].output, "Traceback: boom");
    }

    #[test]
    fn test_keep_segments_shortens_ids() {
        let records = TranscriptParser::new().keep_segments(2).parse(TRANSCRIPT);
        assert_eq!(records[0].test_id, "TestCalculator::test_add");
    }

    #[test]
    fn test_custom_pattern() {
        let parser =
            TranscriptParser::with_pattern(r"(?m)^test (?P<id>\S+) \.\.\. (?P<status>ok|FAILED)$")
                .unwrap();
        let records = parser.parse("test suite::alpha ... ok\ntest suite::beta ... FAILED\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].test_id, "suite::beta");
        assert_eq!(records[1].outcome, Outcome::Failed);
    }

    #[test]
    fn test_pattern_without_status_group_rejected() {
        let err = TranscriptParser::with_pattern(r"(?P<id>\S+)").unwrap_err();
        assert!(matches!(err, TranscriptError::MissingGroup("status")));
        assert!(matches!(
            TranscriptParser::with_pattern("(").unwrap_err(),
            TranscriptError::Pattern(_)
        ));
    }

    #[test]
    fn test_empty_transcript() {
        assert!(TranscriptParser::new().parse("").is_empty());
    }

    #[test]
    fn test_split_section_name() {
        assert_eq!(split_section_name("TestCalculator.test_gcd[v1]"), ("test_gcd", Some("v1")));
        assert_eq!(split_section_name("test_plain"), ("test_plain", None));
        assert_eq!(split_section_name("T.test_f[1.5]"), ("test_f", Some("1.5")));
    }
}
