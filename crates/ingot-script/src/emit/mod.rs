//! Lua code generation.
//!
//! The emitter walks the statement tree and renders Lua 5.4 targeting the
//! host's sandboxed query API. All rewrite decisions live here: the method
//! table (`methods.rs`), the global-object table, ternary-to-closure
//! desugaring, and the `continue`-to-`goto` lowering with per-loop landing
//! labels.

mod lua;
mod methods;

pub use lua::emit;
