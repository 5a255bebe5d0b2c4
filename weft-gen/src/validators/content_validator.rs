//! Content validator for generated pattern code
//!
//! Pure rule engine over the artifact text. Ten independent rule
//! groups run unconditionally on every call and every failing check
//! appends a human-readable issue string; the validator never
//! short-circuits, so a single retry prompt can address everything the
//! model got wrong at once.
//!
//! Detection is regex-based static analysis, not a real parser of the
//! pattern mini-language. That is deliberate: the rules are textual
//! heuristics over a language the runtime itself parses, and the false
//! positive/negative rate has been acceptable in practice. The one
//! structurally-aware piece is the angle-bracket scanner, which tracks
//! quoted-literal boundaries by hand because `<...>` cyclic groups are
//! scoped to a single literal.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::policy::{ValidationPolicy, MAX_GAIN, MAX_SPEED_FACTOR, MIN_MEANINGFUL_LINES};

/// Voice declaration marker in the pattern language
const VOICE_MARKER: &str = "$:";

/// Outcome of one validation call
///
/// `valid` is true exactly when `issues` is empty. Issues preserve
/// rule-check order for reproducibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether the artifact passed every rule
    pub valid: bool,
    /// Every failing check, in rule order
    pub issues: Vec<String>,
}

impl ValidationResult {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

// Stochastic constructs counted against the randomness budget.
// Longest alternatives first so `sometimesBy` is not double-counted
// as `sometimes`.
static RANDOMNESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(?:sometimesBy|sometimes|someCyclesBy|someCycles|often|rarely|degradeBy|degrade|irand|rand|perlin)\b",
    )
    .unwrap()
});

static REMOTE_SAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bsamples?\s*\(\s*["']https?://"#).unwrap());

static AWAITED_SAMPLES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bawait\s+samples?\s*\(").unwrap());

static DELAY_FEEDBACK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.delayfeedback\s*\(\s*(-?\d+(?:\.\d+)?)").unwrap());

static ROOM_SIZE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.room\s*\(\s*(-?\d+(?:\.\d+)?)").unwrap());

static GAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.gain\s*\(\s*(-?\d+(?:\.\d+)?)").unwrap());

// Method invoked directly on a quoted string literal. Always wrong:
// transforms compose over pattern objects, never raw strings.
static STRING_METHOD_CALL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:"[^"\n]*"|'[^'\n]*')\s*\.\s*[A-Za-z_]\w*\s*\("#).unwrap()
});

static EFFECT_CALLS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\.(?:lpf|hpf|room|delayfeedback|delay|crush|distort|vowel|pan|gain|shape|coarse)\s*\(",
    )
    .unwrap()
});

static SPEED_FACTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.(?:fast|hurry)\s*\(\s*(\d+(?:\.\d+)?)").unwrap());

// Note literals at octave >= 9 or any negative octave, e.g. "c9",
// "a#12", "f-1". Only applied inside quoted literals.
static EXTREME_OCTAVE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[a-gA-G][#bs]?(?:-\d+|9|\d{2,})\b").unwrap());

static SETCPM: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsetcpm\s*\(").unwrap());

/// Validate an artifact against a policy
///
/// Pure and deterministic: same code + same policy always yields the
/// same result. All ten rule groups run on every call.
pub fn validate(code: &str, policy: &ValidationPolicy) -> ValidationResult {
    let mut issues = Vec::new();

    check_voice_count(code, policy, &mut issues);
    check_line_budget(code, policy, &mut issues);
    check_tempo(code, policy, &mut issues);
    check_sample_sources(code, policy, &mut issues);
    check_randomness_budget(code, policy, &mut issues);
    check_effect_magnitudes(code, policy, &mut issues);
    check_syntax_balance(code, &mut issues);
    check_invalid_methods(code, &mut issues);
    check_effect_density(code, policy, &mut issues);
    check_dangerous_shapes(code, &mut issues);

    ValidationResult::from_issues(issues)
}

/// Lightweight structural check used during extraction
///
/// Runs the structural subset only: voice-marker presence, the
/// minimum line floor, the tempo call, and syntax balance. A failure
/// here surfaces to the caller as a parse failure, not a validation
/// failure; the policy-tunable rules run later in the orchestrator.
pub fn structural_check(code: &str) -> ValidationResult {
    let mut issues = Vec::new();
    check_voice_presence(code, &mut issues);
    check_line_floor(code, &mut issues);
    check_tempo_presence(code, &mut issues);
    check_syntax_balance(code, &mut issues);
    ValidationResult::from_issues(issues)
}

/// Rule 1: voice presence and count
fn check_voice_count(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    check_voice_presence(code, issues);
    let voices = code.matches(VOICE_MARKER).count();
    if voices > policy.max_voices {
        issues.push(format!(
            "Too many voices: {} (max {})",
            voices, policy.max_voices
        ));
    }
}

/// An accepted artifact declares at least one concurrent voice.
fn check_voice_presence(code: &str, issues: &mut Vec<String>) {
    if !code.contains(VOICE_MARKER) {
        issues.push("No voice declarations: at least one `$:` voice is required".to_string());
    }
}

/// Rule 2: line budget (policy max, plus a fixed minimum floor)
fn check_line_budget(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    let meaningful = meaningful_line_count(code);
    if meaningful > policy.max_lines {
        issues.push(format!(
            "Too many lines: {} (max {})",
            meaningful, policy.max_lines
        ));
    }
    check_line_floor(code, issues);
}

fn meaningful_line_count(code: &str) -> usize {
    code.lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with("//")
        })
        .count()
}

fn check_line_floor(code: &str, issues: &mut Vec<String>) {
    let meaningful = meaningful_line_count(code);
    if meaningful < MIN_MEANINGFUL_LINES {
        issues.push(format!(
            "Pattern too short: {} meaningful line(s), need at least {}",
            meaningful, MIN_MEANINGFUL_LINES
        ));
    }
}

/// Rule 3: tempo requirement
fn check_tempo(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    if policy.require_setcpm {
        check_tempo_presence(code, issues);
    }
}

fn check_tempo_presence(code: &str, issues: &mut Vec<String>) {
    if !SETCPM.is_match(code) {
        issues.push("Missing setcpm() tempo call".to_string());
    }
}

/// Rule 4: forbidden sample sources
fn check_sample_sources(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    if !policy.reject_localhost {
        return;
    }
    if REMOTE_SAMPLES.is_match(code) {
        issues.push(
            "External sample URL referenced; remote/localhost samples are unavailable to the runtime"
                .to_string(),
        );
    }
    if AWAITED_SAMPLES.is_match(code) {
        issues.push("Awaited sample loading is not supported".to_string());
    }
}

/// Rule 5: randomness budget
fn check_randomness_budget(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    let count = RANDOMNESS.find_iter(code).count();
    if count > policy.max_random_usage {
        issues.push(format!(
            "Too much randomness: {}/{} stochastic operations",
            count, policy.max_random_usage
        ));
    }
}

/// Rule 6: extreme effect magnitudes
fn check_effect_magnitudes(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    for caps in DELAY_FEEDBACK.captures_iter(code) {
        if let Ok(value) = caps[1].parse::<f64>() {
            if value > policy.max_delay_feedback {
                issues.push(format!(
                    "Delay feedback {} exceeds maximum {}",
                    &caps[1], policy.max_delay_feedback
                ));
            }
        }
    }
    for caps in ROOM_SIZE.captures_iter(code) {
        if let Ok(value) = caps[1].parse::<f64>() {
            if value > policy.max_room_size {
                issues.push(format!(
                    "Room size {} exceeds maximum {}",
                    &caps[1], policy.max_room_size
                ));
            }
        }
    }
    // Gain ceiling is fixed: clipping protection is not configurable.
    for caps in GAIN.captures_iter(code) {
        if let Ok(value) = caps[1].parse::<f64>() {
            if value > MAX_GAIN {
                issues.push(format!("Gain {} exceeds maximum {}", &caps[1], MAX_GAIN));
            }
        }
    }
}

/// Rule 7: syntax balance
///
/// Parentheses, square brackets, and curly braces must balance across
/// the whole text. Angle brackets must balance within each quoted
/// literal; they may legitimately appear unbalanced outside literals,
/// since `<...>` cyclic groups only exist in mini-notation strings.
fn check_syntax_balance(code: &str, issues: &mut Vec<String>) {
    for (open, close, name) in [('(', ')', "parentheses"), ('[', ']', "square brackets"), ('{', '}', "curly braces")] {
        let opens = code.matches(open).count();
        let closes = code.matches(close).count();
        if opens != closes {
            issues.push(format!(
                "Unbalanced {}: {} open vs {} close",
                name, opens, closes
            ));
        }
    }

    check_angle_balance(code, issues);
}

/// Angle-bracket balance scoped to individual quoted literals
fn check_angle_balance(code: &str, issues: &mut Vec<String>) {
    for literal in quoted_literals(code) {
        let mut opens = 0usize;
        let mut closes = 0usize;
        let mut chars = literal.chars();
        while let Some(c) = chars.next() {
            match c {
                // Escaped character; skip delimiter handling for it.
                '\\' => {
                    chars.next();
                }
                '<' => opens += 1,
                '>' => closes += 1,
                _ => {}
            }
        }
        if opens != closes {
            issues.push(format!(
                "Unbalanced angle brackets in pattern literal \"{}\"",
                literal
            ));
        }
    }
}

/// Rule 8: invalid or unsupported method usage
fn check_invalid_methods(code: &str, issues: &mut Vec<String>) {
    if code.contains(".cutoff(") {
        issues.push("Unsupported method .cutoff(); renamed, use .lpf()".to_string());
    }
    if code.contains(".spread(") {
        issues.push("Unsupported method .spread(); no longer available".to_string());
    }
    for m in STRING_METHOD_CALL.find_iter(code) {
        issues.push(format!(
            "Method call on a string literal: {}; transforms apply to patterns, not strings",
            m.as_str()
        ));
    }
}

/// Rule 9: effect density per voice line
fn check_effect_density(code: &str, policy: &ValidationPolicy, issues: &mut Vec<String>) {
    for (index, line) in code.lines().enumerate() {
        if !line.contains(VOICE_MARKER) {
            continue;
        }
        let effects = EFFECT_CALLS.find_iter(line).count();
        if effects > policy.max_effects_per_voice {
            issues.push(format!(
                "Line {}: {} effect calls (max {} per voice)",
                index + 1,
                effects,
                policy.max_effects_per_voice
            ));
        }
    }
}

/// Rule 10: dangerous pattern shapes
fn check_dangerous_shapes(code: &str, issues: &mut Vec<String>) {
    for caps in SPEED_FACTOR.captures_iter(code) {
        if let Ok(value) = caps[1].parse::<f64>() {
            if value > MAX_SPEED_FACTOR {
                issues.push(format!(
                    "Speed multiplier {} exceeds safe maximum {}",
                    &caps[1], MAX_SPEED_FACTOR
                ));
            }
        }
    }

    // Extreme octaves only matter inside quoted mini-notation.
    for literal in quoted_literals(code) {
        for m in EXTREME_OCTAVE.find_iter(&literal) {
            issues.push(format!(
                "Extreme octave in note literal: \"{}\"",
                m.as_str()
            ));
        }
    }
}

/// Strip `//` line comments, quote-aware so a `//` inside a literal
/// (e.g. a URL) survives
fn strip_comments(code: &str) -> String {
    let mut out = String::new();
    for line in code.lines() {
        let mut quote: Option<char> = None;
        let mut cut = line.len();
        let mut chars = line.char_indices().peekable();
        while let Some((index, c)) = chars.next() {
            match quote {
                None => {
                    if c == '"' || c == '\'' {
                        quote = Some(c);
                    } else if c == '/' && chars.peek().map_or(false, |&(_, next)| next == '/') {
                        cut = index;
                        break;
                    }
                }
                Some(q) => {
                    if c == '\\' {
                        chars.next();
                    } else if c == q {
                        quote = None;
                    }
                }
            }
        }
        out.push_str(&line[..cut]);
        out.push('\n');
    }
    out
}

/// Extract the contents of every quoted literal in the text
///
/// Line comments are stripped first: an apostrophe in comment prose
/// must not open a phantom literal.
fn quoted_literals(code: &str) -> Vec<String> {
    let code = strip_comments(code);
    let mut literals = Vec::new();
    let mut chars = code.chars().peekable();
    let mut quote: Option<char> = None;
    let mut current = String::new();

    while let Some(c) = chars.next() {
        match quote {
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    current.clear();
                }
            }
            Some(q) => {
                if c == '\\' {
                    current.push(c);
                    if let Some(&next) = chars.peek() {
                        current.push(next);
                        chars.next();
                    }
                } else if c == q {
                    literals.push(std::mem::take(&mut current));
                    quote = None;
                } else {
                    current.push(c);
                }
            }
        }
    }

    literals
}
