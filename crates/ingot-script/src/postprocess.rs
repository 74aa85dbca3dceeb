//! Cleanup pass over the emitted Lua.
//!
//! Some source forms are cheaper to fix in the flat text than during
//! emission: compound assignment, increment/decrement, and the 0-based to
//! 1-based shift of literal subscripts. The pass finishes with whitespace
//! normalization, which is idempotent on its own.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::trace;

/// Assignable left-hand side: identifier with optional dotted path and
/// bracket subscripts (`x`, `a.b`, `x[k]`, `a.b[k]`).
const LVALUE: &str = r"[A-Za-z_][A-Za-z0-9_.]*(?:\[[^\]\n]+\])*";

static COMPOUND_ASSIGN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^(\s*)({})\s*([+-])=\s*(.+)$", LVALUE)).expect("compound assign regex")
});

static POSTFIX_UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^(\s*)({})(\+\+|--)\s*$", LVALUE)).expect("postfix update regex")
});

static PREFIX_UPDATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?m)^(\s*)(\+\+|--)({})\s*$", LVALUE)).expect("prefix update regex")
});

static LITERAL_INDEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[(\d+)\]").expect("literal index regex"));

static TRAILING_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)[ \t]+$").expect("trailing whitespace regex"));

static BLANK_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank run regex"));

/// Run the full cleanup pass.
pub(crate) fn run(text: &str) -> String {
    let text = desugar_compound_assign(text);
    let text = desugar_updates(&text);
    let text = shift_literal_indices(&text);
    let out = normalize_whitespace(&text);
    trace!(bytes = out.len(), "cleanup pass done");
    out
}

/// `x += y` → `x = x + (y)`, `x -= y` → `x = x - (y)`. Only statement
/// lines are rewritten; the right-hand side is parenthesized so compound
/// expressions keep their grouping.
fn desugar_compound_assign(text: &str) -> String {
    COMPOUND_ASSIGN_RE
        .replace_all(text, "$1$2 = $2 $3 ($4)")
        .into_owned()
}

/// Postfix and prefix `++`/`--` statements become explicit assignments.
fn desugar_updates(text: &str) -> String {
    let text = POSTFIX_UPDATE_RE.replace_all(text, |caps: &regex::Captures| {
        let op = if &caps[3] == "++" { "+" } else { "-" };
        format!("{}{} = {} {} 1", &caps[1], &caps[2], &caps[2], op)
    });
    PREFIX_UPDATE_RE
        .replace_all(&text, |caps: &regex::Captures| {
            let op = if &caps[2] == "++" { "+" } else { "-" };
            format!("{}{} = {} {} 1", &caps[1], &caps[3], &caps[3], op)
        })
        .into_owned()
}

/// Shift bare integer subscripts from the source's 0-based indexing to
/// the target's 1-based tables. Computed indices cannot be rewritten
/// safely and are left alone.
fn shift_literal_indices(text: &str) -> String {
    LITERAL_INDEX_RE
        .replace_all(text, |caps: &regex::Captures| {
            match caps[1].parse::<u64>() {
                Ok(n) => format!("[{}]", n + 1),
                // Out-of-range literals stay as they were
                Err(_) => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Strip trailing whitespace, collapse blank-line runs, and end with a
/// single newline. Idempotent: a second run is a no-op.
pub fn normalize_whitespace(text: &str) -> String {
    let text = TRAILING_WS_RE.replace_all(text, "");
    let text = BLANK_RUN_RE.replace_all(&text, "\n\n");
    let trimmed = text.trim_start_matches('\n').trim_end_matches('\n');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{}\n", trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Compound assignment
    // =========================================================================

    #[test]
    fn test_add_assign() {
        assert_eq!(run("total += n\n"), "total = total + (n)\n");
    }

    #[test]
    fn test_sub_assign_with_expression() {
        assert_eq!(run("n -= a + b\n"), "n = n - (a + b)\n");
    }

    #[test]
    fn test_compound_assign_on_member_and_index() {
        assert_eq!(run("counts.total += 1\n"), "counts.total = counts.total + (1)\n");
        assert_eq!(run("xs[i] += 1\n"), "xs[i] = xs[i] + (1)\n");
    }

    #[test]
    fn test_compound_assign_keeps_indent() {
        assert_eq!(run("    total += n\n"), "    total = total + (n)\n");
    }

    // =========================================================================
    // Increment / decrement
    // =========================================================================

    #[test]
    fn test_postfix_increment() {
        assert_eq!(run("i++\n"), "i = i + 1\n");
    }

    #[test]
    fn test_postfix_decrement() {
        assert_eq!(run("i--\n"), "i = i - 1\n");
    }

    #[test]
    fn test_prefix_forms() {
        assert_eq!(run("++i\n"), "i = i + 1\n");
        assert_eq!(run("--i\n"), "i = i - 1\n");
    }

    #[test]
    fn test_update_on_member() {
        assert_eq!(run("stats.count++\n"), "stats.count = stats.count + 1\n");
    }

    #[test]
    fn test_comment_lines_untouched() {
        assert_eq!(run("-- a comment\n"), "-- a comment\n");
        assert_eq!(
            run("-- unsupported: C-style for loop\n"),
            "-- unsupported: C-style for loop\n"
        );
    }

    // =========================================================================
    // Index shift
    // =========================================================================

    #[test]
    fn test_zero_based_shift() {
        assert_eq!(run("local f = items[0]\n"), "local f = items[1]\n");
        assert_eq!(run("local s = items[9]\n"), "local s = items[10]\n");
    }

    #[test]
    fn test_computed_index_untouched() {
        assert_eq!(run("local x = items[i]\n"), "local x = items[i]\n");
        assert_eq!(run("local x = items[i + 1]\n"), "local x = items[i + 1]\n");
    }

    #[test]
    fn test_shift_multiple_on_line() {
        assert_eq!(run("local p = grid[0][2]\n"), "local p = grid[1][3]\n");
    }

    // =========================================================================
    // Whitespace normalization
    // =========================================================================

    #[test]
    fn test_trailing_whitespace_stripped() {
        assert_eq!(normalize_whitespace("local a = 1   \n"), "local a = 1\n");
    }

    #[test]
    fn test_blank_runs_collapse() {
        assert_eq!(
            normalize_whitespace("a\n\n\n\nb\n"),
            "a\n\nb\n"
        );
    }

    #[test]
    fn test_single_trailing_newline() {
        assert_eq!(normalize_whitespace("a"), "a\n");
        assert_eq!(normalize_whitespace("a\n\n\n"), "a\n");
    }

    #[test]
    fn test_normalize_whitespace_idempotent() {
        let inputs = [
            "local a = 1   \n\n\n\nlocal b = 2\n",
            "",
            "\n\n\n",
            "x\n",
        ];
        for input in inputs {
            let once = normalize_whitespace(input);
            let twice = normalize_whitespace(&once);
            assert_eq!(once, twice, "normalization must be idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(run(""), "");
        assert_eq!(normalize_whitespace("\n\n"), "");
    }
}
