//! Ingot query-script transpiler
//!
//! Note query blocks are written in a constrained C-family scripting
//! dialect; this crate compiles them to Lua 5.4 for the host's sandboxed
//! plugin runtime. The pipeline is tokenize → parse → emit → cleanup, and
//! every stage reduces failure to values: unsupported constructs degrade
//! to inline `--` diagnostics, malformed input comes back as a single
//! readable error string, and nothing panics across the crate boundary.
//!
//! ```
//! use ingot_script::{transpile, TranspileOptions};
//!
//! let lua = transpile("const open = notes.filter(n => n.open)", &TranspileOptions::default())
//!     .unwrap();
//! assert_eq!(lua, "local open = notes:where(function(n) return n.open end)\n");
//! ```
//!
//! ## Runtime contract
//!
//! Generated code targets the sandbox's fixed query API:
//! - a chainable note collection with `where`, `map`, `each`, `flat_map`,
//!   `group_by`, `limit`, `slice`, `first`, `last`, `count`, `values`,
//!   `array` as colon methods;
//! - a helper table (default `util`, see [`TranspileOptions`]) with
//!   `keys`, `sorted_keys`, `values`, `split` (pattern separator), and
//!   `is_array`;
//! - `json.encode` / `json.parse`;
//! - `print`, captured by the host.
//!
//! The transpiler guarantees syntactic validity for the supported subset
//! only; unsupported constructs are marked inline and left inert.

pub mod ast;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod options;
pub mod parser;
pub mod pattern;
pub mod postprocess;
pub mod token;

pub use error::{TranspileError, TranspileResult};
pub use options::TranspileOptions;
pub use pattern::PatternConversion;
pub use token::{TemplatePart, Token, TokenKind};

use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::debug;

/// Transpile a query script to Lua.
///
/// Pure and synchronous: no I/O, no shared state, safe to call
/// concurrently. Internal panics are caught here and surface as
/// [`TranspileError::Internal`]; callers never see an unwind.
pub fn transpile(source: &str, options: &TranspileOptions) -> TranspileResult<String> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let program = parser::parse(source)?;
        let lua = emit::emit(&program, options);
        Ok(postprocess::run(&lua))
    }));
    match outcome {
        Ok(result) => {
            if result.is_ok() {
                debug!(source_len = source.len(), "transpile ok");
            }
            result
        }
        Err(payload) => {
            let detail = panic_message(payload.as_ref());
            Err(TranspileError::Internal(detail))
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
