//! The five validators named by the pipeline contract, run in this
//! file's declaration order by convention (callers register them in
//! whatever order they like; [`SyntaxValidator`] first is recommended
//! since a source that doesn't parse makes every later check moot).

use crate::{outcome, StaticValidator, ValidatorCategory, ValidatorOutcome};
use async_trait::async_trait;

/// Rejects source with unbalanced brackets, parens, braces, or an
/// unterminated string literal. This is a best-effort, grammar-agnostic
/// stand-in for a real parser — it catches the failure mode that
/// matters for generated code (a truncated or malformed completion)
/// without depending on a parser for the target language.
pub struct SyntaxValidator;

#[async_trait]
impl StaticValidator for SyntaxValidator {
    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::Syntax
    }

    async fn validate(&self, source: &str) -> ValidatorOutcome {
        match check_balanced(source) {
            Ok(()) => outcome(self.category(), true, "delimiters balanced", None),
            Err(message) => outcome(self.category(), false, message, None),
        }
    }
}

fn check_balanced(source: &str) -> Result<(), String> {
    let mut stack = Vec::new();
    let mut in_string: Option<char> = None;
    let mut escaped = false;

    for (i, ch) in source.chars().enumerate() {
        if let Some(quote) = in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => in_string = Some(ch),
            '(' | '[' | '{' => stack.push(ch),
            ')' | ']' | '}' => {
                let expected = match ch {
                    ')' => '(',
                    ']' => '[',
                    '}' => '{',
                    _ => unreachable!(),
                };
                match stack.pop() {
                    Some(open) if open == expected => {}
                    Some(open) => {
                        return Err(format!("mismatched delimiter at byte {i}: '{open}' closed by '{ch}'"));
                    }
                    None => return Err(format!("unmatched closing delimiter '{ch}' at byte {i}")),
                }
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed delimiter '{open}'"));
    }
    if in_string.is_some() {
        return Err("unterminated string literal".to_string());
    }
    Ok(())
}

/// Flags imports whose symbol never appears again in the source.
/// Approximates the fuller undefined-name check with something that's
/// sound to compute without a real symbol table: an import pulled in
/// and never referenced again is always dead, regardless of language.
pub struct UnusedImportValidator;

#[async_trait]
impl StaticValidator for UnusedImportValidator {
    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::UndefinedNameOrUnusedImport
    }

    async fn validate(&self, source: &str) -> ValidatorOutcome {
        let mut unused = Vec::new();
        for (lineno, line) in source.lines().enumerate() {
            let Some(symbol) = imported_symbol(line) else { continue };
            if source.matches(symbol.as_str()).count() <= 1 {
                unused.push(format!("{symbol} (line {})", lineno + 1));
            }
        }

        if unused.is_empty() {
            outcome(self.category(), true, "no unused imports", None)
        } else {
            outcome(self.category(), false, format!("unused imports: {}", unused.join(", ")), None)
        }
    }
}

fn imported_symbol(line: &str) -> Option<String> {
    let trimmed = line.trim();
    let rest = if let Some(r) = trimmed.strip_prefix("use ") {
        r
    } else if let Some(r) = trimmed.strip_prefix("import ") {
        r
    } else if let Some(r) = trimmed.strip_prefix("from ") {
        r.split_once(" import ")?.1
    } else {
        return None;
    };

    let symbol = rest.trim_end_matches(';').rsplit(['.', ':', '/']).next()?.trim();
    (!symbol.is_empty() && symbol != "*").then(|| symbol.to_string())
}

/// Checks that each contiguous block of import lines is lexically
/// sorted, sorting it in place when it isn't.
pub struct ImportOrderValidator;

#[async_trait]
impl StaticValidator for ImportOrderValidator {
    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::ImportOrder
    }

    async fn validate(&self, source: &str) -> ValidatorOutcome {
        let mut lines: Vec<&str> = source.lines().collect();
        let mut changed = false;
        let mut block_start = None;

        for i in 0..=lines.len() {
            let is_import = i < lines.len() && is_import_line(lines[i]);
            match (is_import, block_start) {
                (true, None) => block_start = Some(i),
                (false, Some(start)) => {
                    changed |= sort_block(&mut lines, start, i);
                    block_start = None;
                }
                _ => {}
            }
        }

        if changed {
            outcome(self.category(), true, "imports were not sorted; auto-fixed", Some(lines.join("\n")))
        } else {
            outcome(self.category(), true, "imports already sorted", None)
        }
    }
}

fn is_import_line(line: &str) -> bool {
    let t = line.trim();
    t.starts_with("use ") || t.starts_with("import ") || t.starts_with("from ")
}

fn sort_block(lines: &mut [&str], start: usize, end: usize) -> bool {
    let block = &mut lines[start..end];
    let original = block.to_vec();
    block.sort_unstable();
    block != original.as_slice()
}

/// Local-helper imports are conventionally paths containing this
/// marker; a path-setup statement is conventionally a call to
/// `setup_import_path(...)`. Generated code that imports an in-repo
/// helper must run its path setup first.
/// Substring marking an in-repo helper import. Exported so the
/// Generation/Repair Controller's GENERATE step can recognize and
/// insert the matching path-setup statement using the same
/// convention this validator checks.
pub const LOCAL_HELPER_MARKER: &str = "local_helpers";
/// Substring marking the path-setup statement that must precede any
/// [`LOCAL_HELPER_MARKER`] import.
pub const PATH_SETUP_MARKER: &str = "setup_import_path";

/// Checks that a path-setup statement textually precedes any in-repo
/// helper import, reordering (or inserting one) when it doesn't.
pub struct ProjectLocalImportPathValidator;

#[async_trait]
impl StaticValidator for ProjectLocalImportPathValidator {
    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::ProjectLocalImportPath
    }

    async fn validate(&self, source: &str) -> ValidatorOutcome {
        let lines: Vec<&str> = source.lines().collect();
        let Some(helper_line) = lines.iter().position(|l| l.contains(LOCAL_HELPER_MARKER)) else {
            return outcome(self.category(), true, "no in-repo helper imports", None);
        };

        match lines.iter().position(|l| l.contains(PATH_SETUP_MARKER)) {
            Some(setup) if setup < helper_line => {
                outcome(self.category(), true, "path setup precedes helper import", None)
            }
            Some(setup) => {
                let mut fixed = lines.clone();
                let setup_stmt = fixed.remove(setup);
                fixed.insert(helper_line, setup_stmt);
                outcome(self.category(), true, "path setup moved ahead of helper import", Some(fixed.join("\n")))
            }
            None => {
                let mut fixed = lines.clone();
                fixed.insert(helper_line, "setup_import_path()");
                outcome(self.category(), true, "path setup statement inserted before helper import", Some(fixed.join("\n")))
            }
        }
    }
}

const STDOUT_JSON_MARKERS: &[&str] = &[
    "json.dumps",
    "JSON.stringify",
    "serde_json::to_string",
    "print_json(",
    "json_encode(",
];

/// Checks the entry point shows evidence of serializing its result to
/// stdout as JSON, recognizing the common emission calls across the
/// languages the system generates code in.
pub struct OutputContractValidator;

#[async_trait]
impl StaticValidator for OutputContractValidator {
    fn category(&self) -> ValidatorCategory {
        ValidatorCategory::OutputContract
    }

    async fn validate(&self, source: &str) -> ValidatorOutcome {
        if STDOUT_JSON_MARKERS.iter().any(|marker| source.contains(marker)) {
            outcome(self.category(), true, "entry point serializes to stdout", None)
        } else {
            outcome(self.category(), false, "no recognized stdout JSON serialization call found", None)
        }
    }
}
