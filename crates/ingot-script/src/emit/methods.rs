//! The fixed method rewrite table.
//!
//! Method names are resolved to a closed enum so the emitter's dispatch is
//! an exhaustive match; adding a method means adding a variant, and the
//! compiler points at every site that must handle it.

/// How a `recv.name(...)` call is rewritten into Lua.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MethodRewrite {
    /// `push(x)` → `table.insert(recv, x)`
    Push,
    /// `has(k)` → `(recv[k] ~= nil)`
    Has,
    /// `get(k)` → `recv[k]`
    Get,
    /// `set(k, v)` → `recv[k] = v`
    Set,
    /// `keys()` → `util.keys(recv)`, `keys().sort()` pairs into
    /// `util.sorted_keys(recv)`
    Keys,
    /// `values()` → `util.values(recv)` on map variables, chain call
    /// otherwise
    Values,
    /// `trim()` → `(recv):match("^%s*(.-)%s*$")`
    Trim,
    /// `replace(pat, repl)` → `((recv):gsub(...))`
    Replace,
    /// `split(sep)` → `util.split(recv, sep)`
    Split,
    /// `join(sep)` → `table.concat(recv, sep)`
    Join,
    /// `includes(x)` → `((recv):find(x, 1, true) ~= nil)`
    Includes,
    /// `startsWith(p)` → `((recv):sub(1, #(p)) == (p))`
    StartsWith,
    /// `endsWith(p)` → `((recv):sub(-#(p)) == (p))`
    EndsWith,
    /// `toLowerCase()` → `(recv):lower()`
    Lower,
    /// `toUpperCase()` → `(recv):upper()`
    Upper,
    /// `toString()` → `tostring(recv)`
    ToString,
    /// `sort()` / `sort(cmp)` → `table.sort(...)` with comparator
    /// adaptation
    Sort,
    /// Collection chain methods become colon calls on the query API
    Chain(&'static str),
}

impl MethodRewrite {
    /// Resolve a source method name. `None` means the method is not in
    /// the table and degrades to a plain colon call.
    pub(crate) fn lookup(name: &str) -> Option<Self> {
        Some(match name {
            "push" => Self::Push,
            "has" => Self::Has,
            "get" => Self::Get,
            "set" => Self::Set,
            "keys" => Self::Keys,
            "values" => Self::Values,
            "trim" => Self::Trim,
            "replace" => Self::Replace,
            "split" => Self::Split,
            "join" => Self::Join,
            "includes" => Self::Includes,
            "startsWith" => Self::StartsWith,
            "endsWith" => Self::EndsWith,
            "toLowerCase" => Self::Lower,
            "toUpperCase" => Self::Upper,
            "toString" => Self::ToString,
            "sort" => Self::Sort,
            "filter" => Self::Chain("where"),
            "map" => Self::Chain("map"),
            "forEach" => Self::Chain("each"),
            "flatMap" => Self::Chain("flat_map"),
            "groupBy" => Self::Chain("group_by"),
            "limit" => Self::Chain("limit"),
            "slice" => Self::Chain("slice"),
            "first" => Self::Chain("first"),
            "last" => Self::Chain("last"),
            "count" => Self::Chain("count"),
            "array" => Self::Chain("array"),
            _ => return None,
        })
    }
}
