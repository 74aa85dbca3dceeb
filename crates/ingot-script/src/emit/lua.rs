//! The Lua renderer.
//!
//! Conventions the generated code relies on (the host sandbox provides
//! them, see the crate docs): a chainable collection API addressed with
//! colon calls (`:where`, `:map`, ...), a helper table (default `util`)
//! with `keys`/`sorted_keys`/`values`/`split`/`is_array`, a `json` table
//! with `encode`/`parse`, and `print` captured by the host.
//!
//! Compound assignment, `++`/`--`, and 0-based literal subscripts are
//! emitted in source form on purpose; the cleanup pass desugars them.

use super::methods::MethodRewrite;
use crate::ast::{
    ArrowBody, AssignOp, BinaryOp, Expr, PropKey, Stmt, TemplateSegment, UnaryOp, UpdateOp,
};
use crate::options::TranspileOptions;
use crate::pattern;
use std::collections::HashSet;
use tracing::debug;

/// Render a parsed program to Lua source.
pub fn emit(program: &[Stmt], options: &TranspileOptions) -> String {
    let mut emitter = LuaEmitter::new(options);
    for stmt in program {
        emitter.emit_stmt(stmt);
    }
    debug!(bytes = emitter.out.len(), "emitted lua");
    emitter.out
}

/// Scope frames for `continue` resolution. Function bodies are a barrier:
/// a `continue` inside a callback does not bind to the loop outside it.
enum Frame {
    Loop(Option<usize>),
    Function,
}

struct LuaEmitter<'a> {
    opts: &'a TranspileOptions,
    out: String,
    indent: usize,
    /// Variables declared as `new Map()`; later access through `get`,
    /// `set`, `has`, `values` is rewritten to plain table indexing
    map_vars: HashSet<String>,
    frames: Vec<Frame>,
    label_counter: usize,
}

impl<'a> LuaEmitter<'a> {
    fn new(opts: &'a TranspileOptions) -> Self {
        Self {
            opts,
            out: String::new(),
            indent: 0,
            map_vars: HashSet::new(),
            frames: Vec::new(),
            label_counter: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn indent_str(&self) -> String {
        "    ".repeat(self.indent)
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Local { name, init } => self.emit_local(name, init.as_ref()),
            Stmt::Function { name, params, body } => {
                self.line(&format!("local function {}({})", name, params.join(", ")));
                self.emit_function_body(body);
                self.line("end");
            }
            Stmt::If { arms, otherwise } => self.emit_if(arms, otherwise.as_deref()),
            Stmt::ForOf { var, iter, body } => {
                let iter_s = self.expr(iter);
                self.emit_loop(format!("for _, {} in ipairs({}) do", var, iter_s), body);
            }
            Stmt::ForIn { var, iter, body } => {
                let iter_s = self.expr(iter);
                self.emit_loop(format!("for {} in pairs({}) do", var, iter_s), body);
            }
            Stmt::While { cond, body } => {
                let cond_s = self.expr(cond);
                self.emit_loop(format!("while {} do", cond_s), body);
            }
            Stmt::Return(value) => match value {
                Some(e) => {
                    let s = self.expr(e);
                    self.line(&format!("return {}", s));
                }
                None => self.line("return"),
            },
            Stmt::Break => self.line("break"),
            Stmt::Continue => self.emit_continue(),
            Stmt::Expr(e) => {
                let s = self.expr(e);
                self.line(&s);
            }
            Stmt::Comment { text, block } => self.emit_comment(text, *block),
            Stmt::Unsupported { reason } => self.line(&format!("-- unsupported: {}", reason)),
            Stmt::Blank => self.out.push('\n'),
        }
    }

    fn emit_local(&mut self, name: &str, init: Option<&Expr>) {
        match init {
            // `new Map()` initializers become empty tables and mark the
            // variable for map-style access rewrites
            Some(Expr::New { callee, args }) if callee == "Map" && args.is_empty() => {
                self.map_vars.insert(name.to_string());
                self.line(&format!("local {} = {{}}", name));
            }
            Some(e) => {
                let s = self.expr(e);
                self.line(&format!("local {} = {}", name, s));
            }
            None => self.line(&format!("local {}", name)),
        }
    }

    fn emit_if(&mut self, arms: &[(Expr, Vec<Stmt>)], otherwise: Option<&[Stmt]>) {
        for (i, (cond, body)) in arms.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "elseif" };
            let cond_s = self.expr(cond);
            self.line(&format!("{} {} then", keyword, cond_s));
            self.indent += 1;
            for stmt in body {
                self.emit_stmt(stmt);
            }
            self.indent -= 1;
        }
        if let Some(body) = otherwise {
            self.line("else");
            self.indent += 1;
            for stmt in body {
                self.emit_stmt(stmt);
            }
            self.indent -= 1;
        }
        self.line("end");
    }

    /// Shared loop emission. When the body uses `continue`, the loop gets
    /// a unique landing label as its final statement, so every emitted
    /// `goto` has a verified target.
    fn emit_loop(&mut self, header: String, body: &[Stmt]) {
        let label = if body_uses_continue(body) {
            self.label_counter += 1;
            Some(self.label_counter)
        } else {
            None
        };
        self.line(&header);
        self.indent += 1;
        self.frames.push(Frame::Loop(label));
        for stmt in body {
            self.emit_stmt(stmt);
        }
        if let Some(id) = label {
            self.line(&format!("::__continue_{}::", id));
        }
        self.frames.pop();
        self.indent -= 1;
        self.line("end");
    }

    fn emit_continue(&mut self) {
        let label = match self.frames.last() {
            Some(Frame::Loop(Some(id))) => Some(*id),
            _ => None,
        };
        match label {
            Some(id) => self.line(&format!("goto __continue_{}", id)),
            None => self.line("-- unsupported: continue outside of a loop"),
        }
    }

    fn emit_function_body(&mut self, body: &[Stmt]) {
        self.indent += 1;
        self.frames.push(Frame::Function);
        for stmt in body {
            self.emit_stmt(stmt);
        }
        self.frames.pop();
        self.indent -= 1;
    }

    fn emit_comment(&mut self, text: &str, block: bool) {
        if !self.opts.preserve_comments {
            return;
        }
        if block {
            // Raise the bracket level if the comment body would close it
            if text.contains("]]") {
                self.line(&format!("--[=[{}]=]", text));
            } else {
                self.line(&format!("--[[{}]]", text));
            }
        } else if text.starts_with(' ') || text.starts_with('\t') || text.is_empty() {
            self.line(&format!("--{}", text));
        } else {
            // A space keeps `--x` from reading as a decrement in the
            // cleanup pass
            self.line(&format!("-- {}", text));
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn expr(&mut self, e: &Expr) -> String {
        match e {
            Expr::Ident(name) => name.clone(),
            Expr::Number(raw) => raw.clone(),
            Expr::Str(raw) => lua_string(raw),
            Expr::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Expr::Nil => "nil".to_string(),
            Expr::Regex(raw) => {
                let conv = pattern::convert(raw);
                match conv.pattern {
                    Some(p) => lua_quote(&p),
                    None => format!("nil --[[ unsupported pattern: {} ]]", raw),
                }
            }
            Expr::Template(segments) => self.template(segments),
            Expr::Array(elems) => {
                let inner: Vec<String> = elems.iter().map(|e| self.expr(e)).collect();
                format!("{{{}}}", inner.join(", "))
            }
            Expr::Object(props) => self.object_literal(props),
            Expr::Paren(inner) => {
                let s = self.expr(inner);
                format!("({})", s)
            }
            Expr::Unary { op, expr } => {
                let inner = self.expr(expr);
                match op {
                    UnaryOp::Not => format!("not {}", inner),
                    UnaryOp::Neg => format!("-{}", inner),
                    UnaryOp::TypeOf => format!("type({})", inner),
                }
            }
            Expr::Update { op, prefix, target } => {
                // Left in source form for the cleanup pass
                let t = self.expr(target);
                let op_s = match op {
                    UpdateOp::Increment => "++",
                    UpdateOp::Decrement => "--",
                };
                if *prefix {
                    format!("{}{}", op_s, t)
                } else {
                    format!("{}{}", t, op_s)
                }
            }
            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),
            Expr::Assign { op, target, value } => {
                let t = self.expr(target);
                let v = self.expr(value);
                match op {
                    AssignOp::Assign => format!("{} = {}", t, v),
                    // Left in source form for the cleanup pass
                    AssignOp::AddAssign => format!("{} += {}", t, v),
                    AssignOp::SubAssign => format!("{} -= {}", t, v),
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                // The target has no expression-level conditional; an
                // immediately-invoked closure keeps this usable in
                // expression position
                let c = self.expr(cond);
                let a = self.expr(then);
                let b = self.expr(otherwise);
                format!(
                    "(function() if {} then return {} else return {} end end)()",
                    c, a, b
                )
            }
            Expr::Arrow { params, body } => self.arrow(params, body),
            Expr::Member { obj, prop } => self.member(obj, prop),
            Expr::Index { obj, index } => {
                let o = self.recv(obj);
                let i = self.expr(index);
                format!("{}[{}]", o, i)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::New { callee, args } => {
                if callee == "Map" && args.is_empty() {
                    "{}".to_string()
                } else {
                    format!("nil --[[ unsupported: new {} ]]", callee)
                }
            }
        }
    }

    fn template(&mut self, segments: &[TemplateSegment]) -> String {
        if segments.is_empty() {
            return "\"\"".to_string();
        }
        let parts: Vec<String> = segments
            .iter()
            .map(|seg| match seg {
                TemplateSegment::Text(text) => lua_quote(&js_unescape(text)),
                TemplateSegment::Expr(e) => {
                    let s = self.expr(e);
                    format!("tostring({})", s)
                }
            })
            .collect();
        parts.join(" .. ")
    }

    fn object_literal(&mut self, props: &[(PropKey, Expr)]) -> String {
        let inner: Vec<String> = props
            .iter()
            .map(|(key, value)| {
                let v = self.expr(value);
                match key {
                    PropKey::Ident(name) => format!("{} = {}", name, v),
                    PropKey::Str(raw) => format!("[{}] = {}", lua_string(raw), v),
                }
            })
            .collect();
        format!("{{{}}}", inner.join(", "))
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> String {
        let l = self.expr(lhs);
        let r = self.expr(rhs);
        let op_s = match op {
            // `+` is concatenation when either side is literally a string
            BinaryOp::Add => {
                if lhs.is_stringish() || rhs.is_stringish() {
                    ".."
                } else {
                    "+"
                }
            }
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "~=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        format!("{} {} {}", l, op_s, r)
    }

    fn arrow(&mut self, params: &[String], body: &ArrowBody) -> String {
        match body {
            ArrowBody::Expr(e) => {
                let s = self.expr(e);
                format!("function({}) return {} end", params.join(", "), s)
            }
            ArrowBody::Block(stmts) => {
                let inner = self.block_to_string(stmts);
                format!(
                    "function({})\n{}{}end",
                    params.join(", "),
                    inner,
                    self.indent_str()
                )
            }
        }
    }

    /// Emit a nested block into its own buffer (for function literals in
    /// expression position).
    fn block_to_string(&mut self, stmts: &[Stmt]) -> String {
        let saved = std::mem::take(&mut self.out);
        self.emit_function_body(stmts);
        std::mem::replace(&mut self.out, saved)
    }

    fn member(&mut self, obj: &Expr, prop: &str) -> String {
        // `.length` is the length operator
        if prop == "length" {
            let o = self.recv(obj);
            return format!("#{}", o);
        }
        if let Some(target) = self.global_member(obj, prop) {
            return target;
        }
        let o = self.recv(obj);
        format!("{}.{}", o, prop)
    }

    /// Fixed global-object table: `Math`, `console`, `JSON`, `Object`,
    /// `Array`.
    fn global_member(&self, obj: &Expr, prop: &str) -> Option<String> {
        let Expr::Ident(name) = obj else {
            return None;
        };
        let util = &self.opts.helper_table;
        Some(match (name.as_str(), prop) {
            ("Math", "PI") => "math.pi".to_string(),
            ("Math", _) => format!("math.{}", prop),
            ("console", _) => "print".to_string(),
            ("JSON", "stringify") => "json.encode".to_string(),
            ("JSON", "parse") => "json.parse".to_string(),
            ("Object", "keys") => format!("{}.keys", util),
            ("Object", "values") => format!("{}.values", util),
            ("Array", "isArray") => format!("{}.is_array", util),
            _ => return None,
        })
    }

    // =========================================================================
    // Calls
    // =========================================================================

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> String {
        if let Expr::Member { obj, prop } = callee {
            // `keys().sort()` pairs into a single sorted-keys expression
            if prop == "sort" && args.is_empty() {
                if let Some(base) = keys_call_receiver(obj) {
                    let base_s = self.expr(base);
                    return format!("{}.sorted_keys({})", self.opts.helper_table, base_s);
                }
            }
            if let Expr::Ident(global) = obj.as_ref() {
                if global == "Math" && prop == "round" && args.len() == 1 {
                    // No native rounding builtin in the target
                    let x = self.expr(&args[0]);
                    return format!("math.floor(({}) + 0.5)", x);
                }
                if global == "Math" && prop == "pow" && args.len() == 2 {
                    let a = self.expr(&args[0]);
                    let b = self.expr(&args[1]);
                    return format!("(({}) ^ ({}))", a, b);
                }
            }
            if let Some(target) = self.global_member(obj, prop) {
                let args_s = self.args(args);
                return format!("{}({})", target, args_s);
            }
            if let Some(rewrite) = MethodRewrite::lookup(prop) {
                return self.method_call(obj, prop, rewrite, args);
            }
            // Unknown method: a colon call carries the receiver the way
            // the source's method call did
            let o = self.recv(obj);
            let args_s = self.args(args);
            return format!("{}:{}({})", o, prop, args_s);
        }
        if let Expr::Ident(name) = callee {
            match name.as_str() {
                "parseInt" | "parseFloat" | "Number" => {
                    return format!("tonumber({})", self.args(args));
                }
                "String" => return format!("tostring({})", self.args(args)),
                _ => {}
            }
        }
        let callee_s = match callee {
            Expr::Arrow { .. } => {
                let s = self.expr(callee);
                format!("({})", s)
            }
            _ => self.expr(callee),
        };
        format!("{}({})", callee_s, self.args(args))
    }

    fn method_call(
        &mut self,
        obj: &Expr,
        prop: &str,
        rewrite: MethodRewrite,
        args: &[Expr],
    ) -> String {
        use MethodRewrite::*;

        let arity_ok = match rewrite {
            Has | Get | Split | Includes | StartsWith | EndsWith => args.len() == 1,
            Set | Replace => args.len() == 2,
            Trim | Keys | Values | Lower | Upper | ToString => args.is_empty(),
            Join | Sort => args.len() <= 1,
            Push => !args.is_empty(),
            Chain(_) => true,
        };
        if !arity_ok {
            let o = self.recv(obj);
            let args_s = self.args(args);
            return format!("{}:{}({})", o, prop, args_s);
        }

        let util = self.opts.helper_table.clone();
        match rewrite {
            Push => {
                let o = self.expr(obj);
                format!("table.insert({}, {})", o, self.args(args))
            }
            Has => {
                let o = self.expr(obj);
                let k = self.expr(&args[0]);
                format!("({}[{}] ~= nil)", o, k)
            }
            Get => {
                let o = self.expr(obj);
                let k = self.expr(&args[0]);
                format!("{}[{}]", o, k)
            }
            Set => {
                let o = self.expr(obj);
                let k = self.expr(&args[0]);
                let v = self.expr(&args[1]);
                format!("{}[{}] = {}", o, k, v)
            }
            Keys => {
                let o = self.expr(obj);
                format!("{}.keys({})", util, o)
            }
            Values => {
                if let Expr::Ident(name) = obj {
                    if self.map_vars.contains(name) {
                        return format!("{}.values({})", util, name);
                    }
                }
                let o = self.recv(obj);
                format!("{}:values()", o)
            }
            Trim => {
                let o = self.expr(obj);
                format!("({}):match(\"^%s*(.-)%s*$\")", o)
            }
            Replace => self.replace_call(obj, args),
            Split => {
                let o = self.expr(obj);
                match &args[0] {
                    Expr::Regex(raw) => {
                        let conv = pattern::convert(raw);
                        match conv.pattern {
                            Some(p) => format!("{}.split({}, {})", util, o, lua_quote(&p)),
                            None => format!("({}) --[[ unsupported pattern: {} ]]", o, raw),
                        }
                    }
                    Expr::Str(raw) => {
                        let sep = pattern::escape_plain(&js_unescape(string_content(raw)));
                        format!("{}.split({}, {})", util, o, lua_quote(&sep))
                    }
                    other => {
                        let sep = self.expr(other);
                        format!("{}.split({}, {})", util, o, sep)
                    }
                }
            }
            Join => {
                let o = self.expr(obj);
                if args.is_empty() {
                    format!("table.concat({})", o)
                } else {
                    let sep = self.expr(&args[0]);
                    format!("table.concat({}, {})", o, sep)
                }
            }
            Includes => {
                let o = self.recv(obj);
                let needle = self.expr(&args[0]);
                format!("({}:find({}, 1, true) ~= nil)", o, needle)
            }
            StartsWith => {
                let o = self.recv(obj);
                let p = self.expr(&args[0]);
                format!("({}:sub(1, #({})) == ({}))", o, p, p)
            }
            EndsWith => {
                let o = self.recv(obj);
                let p = self.expr(&args[0]);
                format!("({}:sub(-#({})) == ({}))", o, p, p)
            }
            Lower => {
                let o = self.recv(obj);
                format!("{}:lower()", o)
            }
            Upper => {
                let o = self.recv(obj);
                format!("{}:upper()", o)
            }
            ToString => {
                let o = self.expr(obj);
                format!("tostring({})", o)
            }
            Sort => self.sort_call(obj, args),
            Chain(name) => {
                let o = self.recv(obj);
                let args_s = self.args(args);
                format!("{}:{}({})", o, name, args_s)
            }
        }
    }

    /// `sort()` and `sort(cmp)`. A tri-state comparator from the source
    /// is adapted into the boolean comparator the target expects.
    fn sort_call(&mut self, obj: &Expr, args: &[Expr]) -> String {
        let o = self.expr(obj);
        let Some(cmp) = args.first() else {
            return format!("table.sort({})", o);
        };
        match cmp {
            Expr::Arrow {
                params,
                body: ArrowBody::Expr(e),
            } if params.len() == 2 => {
                let body = self.expr(e);
                format!(
                    "table.sort({}, function({}, {}) return ({}) < 0 end)",
                    o, params[0], params[1], body
                )
            }
            Expr::Arrow { params, .. } if params.len() != 2 => {
                // A comparator that does not take two values cannot be
                // adapted
                format!("table.sort({}) --[[ unsupported comparator ]]", o)
            }
            _ => {
                let cmp_s = self.expr(cmp);
                format!(
                    "table.sort({}, function(a, b) return ({})(a, b) < 0 end)",
                    o, cmp_s
                )
            }
        }
    }

    fn replace_call(&mut self, obj: &Expr, args: &[Expr]) -> String {
        let o = self.expr(obj);
        let repl = match &args[1] {
            Expr::Str(raw) => lua_quote(&escape_replacement(&js_unescape(string_content(raw)))),
            other => self.expr(other),
        };
        match &args[0] {
            Expr::Regex(raw) => {
                let conv = pattern::convert(raw);
                match conv.pattern {
                    Some(p) => {
                        // The source replaces the first occurrence unless
                        // the pattern was global
                        let count = if conv.is_global { "" } else { ", 1" };
                        format!("(({}):gsub({}, {}{}))", o, lua_quote(&p), repl, count)
                    }
                    None => format!("({}) --[[ unsupported pattern: {} ]]", o, raw),
                }
            }
            Expr::Str(raw) => {
                let pat = pattern::escape_plain(&js_unescape(string_content(raw)));
                format!("(({}):gsub({}, {}, 1))", o, lua_quote(&pat), repl)
            }
            other => {
                let pat = self.expr(other);
                format!("(({}):gsub({}, {}, 1))", o, pat, repl)
            }
        }
    }

    fn args(&mut self, args: &[Expr]) -> String {
        let rendered: Vec<String> = args.iter().map(|a| self.expr(a)).collect();
        rendered.join(", ")
    }

    /// Receiver text for colon calls and the `#` operator; literal
    /// receivers need parens (`("x"):lower()`).
    fn recv(&mut self, obj: &Expr) -> String {
        let s = self.expr(obj);
        match obj {
            Expr::Ident(_)
            | Expr::Member { .. }
            | Expr::Index { .. }
            | Expr::Call { .. }
            | Expr::Paren(_) => s,
            _ => format!("({})", s),
        }
    }
}

/// The inner receiver of a no-arg `keys()` call, if `e` is one.
fn keys_call_receiver(e: &Expr) -> Option<&Expr> {
    let Expr::Call { callee, args } = e else {
        return None;
    };
    if !args.is_empty() {
        return None;
    }
    let Expr::Member { obj, prop } = callee.as_ref() else {
        return None;
    };
    (prop == "keys").then_some(obj.as_ref())
}

fn body_uses_continue(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match stmt {
        Stmt::Continue => true,
        Stmt::If { arms, otherwise } => {
            arms.iter().any(|(_, body)| body_uses_continue(body))
                || otherwise.as_ref().is_some_and(|body| body_uses_continue(body))
        }
        // Nested loops own their continues; function bodies are a
        // different scope entirely
        _ => false,
    })
}

// =============================================================================
// String helpers
// =============================================================================

/// Resolve the escape sequences of a source string's content to raw
/// characters. Unknown escapes drop the backslash.
fn js_unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Quote raw text as a double-quoted Lua string literal.
fn lua_quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Re-emit a source string literal as Lua, resolving escapes on the way.
fn lua_string(raw: &str) -> String {
    lua_quote(&js_unescape(string_content(raw)))
}

/// Strip the quotes off a string literal's raw text.
fn string_content(raw: &str) -> &str {
    if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Escape a gsub replacement: `%` is magic, and `$1` backreferences
/// become `%1`.
fn escape_replacement(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '%' => out.push_str("%%"),
            '$' if chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) => {
                out.push('%');
            }
            c => out.push(c),
        }
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn lua(src: &str) -> String {
        let program = parse(src).unwrap();
        emit(&program, &TranspileOptions::default())
    }

    // =========================================================================
    // Declarations and simple statements
    // =========================================================================

    #[test]
    fn test_const_declaration() {
        assert_eq!(lua("const x = 1 + 2;"), "local x = 1 + 2\n");
    }

    #[test]
    fn test_declaration_without_init() {
        assert_eq!(lua("let x;"), "local x\n");
    }

    #[test]
    fn test_new_map_declaration() {
        assert_eq!(lua("const m = new Map()"), "local m = {}\n");
    }

    #[test]
    fn test_map_access_rewrites() {
        let out = lua("const m = new Map()\nm.set('a', 1)\nconst v = m.get('a')\nconst ok = m.has('a')");
        assert!(out.contains("m[\"a\"] = 1"));
        assert!(out.contains("local v = m[\"a\"]"));
        assert!(out.contains("local ok = (m[\"a\"] ~= nil)"));
    }

    #[test]
    fn test_function_declaration() {
        assert_eq!(
            lua("function add(a, b) { return a + b }"),
            "local function add(a, b)\n    return a + b\nend\n"
        );
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    #[test]
    fn test_if_elseif_else() {
        assert_eq!(
            lua("if (a) { f() } else if (b) { g() } else { h() }"),
            "if a then\n    f()\nelseif b then\n    g()\nelse\n    h()\nend\n"
        );
    }

    #[test]
    fn test_for_of() {
        assert_eq!(
            lua("for (const n of notes) { visit(n) }"),
            "for _, n in ipairs(notes) do\n    visit(n)\nend\n"
        );
    }

    #[test]
    fn test_for_in() {
        assert_eq!(
            lua("for (k in counts) { f(k) }"),
            "for k in pairs(counts) do\n    f(k)\nend\n"
        );
    }

    #[test]
    fn test_while() {
        assert_eq!(lua("while (a) { f() }"), "while a do\n    f()\nend\n");
    }

    #[test]
    fn test_continue_gets_landing_label() {
        let out = lua("for (const n of notes) { if (n.draft) { continue }\nvisit(n) }");
        assert!(out.contains("goto __continue_1"));
        assert!(out.contains("::__continue_1::"));
        // Label must be the last statement of the loop body
        let label_pos = out.find("::__continue_1::").unwrap();
        let end_pos = out.rfind("end").unwrap();
        assert!(label_pos < end_pos);
    }

    #[test]
    fn test_nested_loops_get_distinct_labels() {
        let out = lua(
            "for (const a of xs) { continue }\nfor (const b of ys) { continue }",
        );
        assert!(out.contains("::__continue_1::"));
        assert!(out.contains("::__continue_2::"));
    }

    #[test]
    fn test_continue_outside_loop_degrades() {
        let out = lua("continue");
        assert_eq!(out, "-- unsupported: continue outside of a loop\n");
    }

    #[test]
    fn test_continue_in_callback_does_not_bind_outer_loop() {
        let out = lua("for (const x of xs) { ys.forEach(y => { continue }) }");
        assert!(out.contains("-- unsupported: continue outside of a loop"));
        assert!(!out.contains("goto"));
    }

    #[test]
    fn test_unsupported_c_style_for() {
        let out = lua("for (let i = 0; i < 3; i++) { f(i) }");
        assert_eq!(out, "-- unsupported: C-style for loop\n");
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn test_template_literal() {
        assert_eq!(
            lua("const s = `Hello ${name}!`"),
            "local s = \"Hello \" .. tostring(name) .. \"!\"\n"
        );
    }

    #[test]
    fn test_ternary_is_iife() {
        assert_eq!(
            lua("const r = a ? b : c"),
            "local r = (function() if a then return b else return c end end)()\n"
        );
    }

    #[test]
    fn test_arrow_expression_body() {
        assert_eq!(
            lua("const f = x => x + 1"),
            "local f = function(x) return x + 1 end\n"
        );
    }

    #[test]
    fn test_arrow_block_body() {
        assert_eq!(
            lua("const f = (a, b) => { return a - b }"),
            "local f = function(a, b)\n    return a - b\nend\n"
        );
    }

    #[test]
    fn test_logical_and_equality_operators() {
        assert_eq!(
            lua("const ok = a === 1 && b !== 2 || !c"),
            "local ok = a == 1 and b ~= 2 or not c\n"
        );
    }

    #[test]
    fn test_length_operator() {
        assert_eq!(lua("const n = items.length"), "local n = #items\n");
        assert_eq!(lua("const n = a.b.length"), "local n = #a.b\n");
    }

    #[test]
    fn test_string_concat_heuristic() {
        assert_eq!(
            lua("const s = 'a' + x"),
            "local s = \"a\" .. x\n"
        );
        assert_eq!(lua("const n = x + y"), "local n = x + y\n");
    }

    #[test]
    fn test_typeof() {
        assert_eq!(lua("const t = typeof x"), "local t = type(x)\n");
    }

    #[test]
    fn test_null_and_undefined() {
        assert_eq!(lua("const a = null"), "local a = nil\n");
        assert_eq!(lua("const b = undefined"), "local b = nil\n");
    }

    #[test]
    fn test_array_and_object_literals() {
        assert_eq!(lua("const a = [1, 2, 3]"), "local a = {1, 2, 3}\n");
        assert_eq!(
            lua("const o = {a: 1, \"b c\": 2}"),
            "local o = {a = 1, [\"b c\"] = 2}\n"
        );
    }

    #[test]
    fn test_unsupported_new_degrades() {
        let out = lua("const d = new Date()");
        assert_eq!(out, "local d = nil --[[ unsupported: new Date ]]\n");
    }

    // =========================================================================
    // Method rewrites
    // =========================================================================

    #[test]
    fn test_push() {
        assert_eq!(lua("out.push(x)"), "table.insert(out, x)\n");
    }

    #[test]
    fn test_chain_methods() {
        assert_eq!(
            lua("notes.filter(n => n.open).limit(5)"),
            "notes:where(function(n) return n.open end):limit(5)\n"
        );
    }

    #[test]
    fn test_foreach_and_groupby() {
        let out = lua("notes.groupBy(n => n.folder).forEach(g => render(g))");
        assert!(out.contains(":group_by(function(n) return n.folder end)"));
        assert!(out.contains(":each(function(g) return render(g) end)"));
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(lua("const t = s.trim()"), "local t = (s):match(\"^%s*(.-)%s*$\")\n");
        assert_eq!(lua("const l = s.toLowerCase()"), "local l = s:lower()\n");
        assert_eq!(
            lua("const ok = s.startsWith('a')"),
            "local ok = (s:sub(1, #(\"a\")) == (\"a\"))\n"
        );
        assert_eq!(
            lua("const ok = s.endsWith('md')"),
            "local ok = (s:sub(-#(\"md\")) == (\"md\"))\n"
        );
        assert_eq!(
            lua("const ok = s.includes('x')"),
            "local ok = (s:find(\"x\", 1, true) ~= nil)\n"
        );
    }

    #[test]
    fn test_join_and_split() {
        assert_eq!(
            lua("const s = parts.join(', ')"),
            "local s = table.concat(parts, \", \")\n"
        );
        assert_eq!(
            lua("const parts = s.split(',')"),
            "local parts = util.split(s, \",\")\n"
        );
        // Plain separators are escaped for pattern matching
        assert_eq!(
            lua("const parts = s.split('.')"),
            "local parts = util.split(s, \"%.\")\n"
        );
    }

    #[test]
    fn test_split_with_regex() {
        assert_eq!(
            lua("const parts = s.split(/\\s+/)"),
            "local parts = util.split(s, \"%s+\")\n"
        );
    }

    #[test]
    fn test_replace_with_string() {
        assert_eq!(
            lua("const t = s.replace('a', 'b')"),
            "local t = ((s):gsub(\"a\", \"b\", 1))\n"
        );
    }

    #[test]
    fn test_replace_with_global_regex() {
        assert_eq!(
            lua("const t = s.replace(/\\d+/g, '#')"),
            "local t = ((s):gsub(\"%d+\", \"#\"))\n"
        );
    }

    #[test]
    fn test_replace_with_nonglobal_regex_limits_count() {
        assert_eq!(
            lua("const t = s.replace(/\\d+/, '#')"),
            "local t = ((s):gsub(\"%d+\", \"#\", 1))\n"
        );
    }

    #[test]
    fn test_replace_backreference() {
        assert_eq!(
            lua("const t = s.replace(/(\\w+)/g, '<$1>')"),
            "local t = ((s):gsub(\"(%w+)\", \"<%1>\"))\n"
        );
    }

    #[test]
    fn test_replace_unsupported_pattern_is_inert() {
        let out = lua("const t = s.replace(/a|b/g, 'x')");
        assert_eq!(out, "local t = (s) --[[ unsupported pattern: /a|b/g ]]\n");
    }

    #[test]
    fn test_keys_and_sorted_keys() {
        assert_eq!(lua("const ks = m.keys()"), "local ks = util.keys(m)\n");
        assert_eq!(
            lua("const ks = m.keys().sort()"),
            "local ks = util.sorted_keys(m)\n"
        );
    }

    #[test]
    fn test_values_on_map_var_vs_chain() {
        let out = lua("const m = new Map()\nconst vs = m.values()");
        assert!(out.contains("local vs = util.values(m)"));
        let out = lua("const vs = notes.values()");
        assert!(out.contains("local vs = notes:values()"));
    }

    #[test]
    fn test_sort_plain_and_comparator() {
        assert_eq!(lua("items.sort()"), "table.sort(items)\n");
        assert_eq!(
            lua("items.sort((a, b) => a.n - b.n)"),
            "table.sort(items, function(a, b) return (a.n - b.n) < 0 end)\n"
        );
    }

    #[test]
    fn test_sort_with_named_comparator() {
        assert_eq!(
            lua("items.sort(byName)"),
            "table.sort(items, function(a, b) return (byName)(a, b) < 0 end)\n"
        );
    }

    #[test]
    fn test_sort_with_bad_comparator_degrades() {
        let out = lua("items.sort(x => x)");
        assert_eq!(out, "table.sort(items) --[[ unsupported comparator ]]\n");
    }

    #[test]
    fn test_unknown_method_becomes_colon_call() {
        assert_eq!(lua("note.resolve(x)"), "note:resolve(x)\n");
    }

    #[test]
    fn test_tostring() {
        assert_eq!(lua("const s = n.toString()"), "local s = tostring(n)\n");
    }

    // =========================================================================
    // Globals
    // =========================================================================

    #[test]
    fn test_math_round_desugars() {
        assert_eq!(
            lua("const r = Math.round(x / 3)"),
            "local r = math.floor((x / 3) + 0.5)\n"
        );
    }

    #[test]
    fn test_math_passthrough() {
        assert_eq!(lua("const f = Math.floor(x)"), "local f = math.floor(x)\n");
        assert_eq!(lua("const m = Math.max(a, b)"), "local m = math.max(a, b)\n");
        assert_eq!(lua("const p = Math.PI"), "local p = math.pi\n");
        assert_eq!(lua("const p = Math.pow(2, 8)"), "local p = ((2) ^ (8))\n");
    }

    #[test]
    fn test_console_log() {
        assert_eq!(lua("console.log('hi', x)"), "print(\"hi\", x)\n");
        assert_eq!(lua("console.warn(x)"), "print(x)\n");
    }

    #[test]
    fn test_json() {
        assert_eq!(
            lua("const s = JSON.stringify(obj)"),
            "local s = json.encode(obj)\n"
        );
        assert_eq!(lua("const o = JSON.parse(s)"), "local o = json.parse(s)\n");
    }

    #[test]
    fn test_object_and_array_globals() {
        assert_eq!(lua("const ks = Object.keys(o)"), "local ks = util.keys(o)\n");
        assert_eq!(
            lua("const ok = Array.isArray(x)"),
            "local ok = util.is_array(x)\n"
        );
    }

    #[test]
    fn test_number_conversions() {
        assert_eq!(lua("const n = parseInt(s)"), "local n = tonumber(s)\n");
        assert_eq!(lua("const n = Number(s)"), "local n = tonumber(s)\n");
        assert_eq!(lua("const s = String(n)"), "local s = tostring(n)\n");
    }

    #[test]
    fn test_custom_helper_table_name() {
        let program = parse("const ks = Object.keys(o)").unwrap();
        let opts = TranspileOptions {
            helper_table: "qs".to_string(),
            ..Default::default()
        };
        assert_eq!(emit(&program, &opts), "local ks = qs.keys(o)\n");
    }

    // =========================================================================
    // Deferred source forms (the cleanup pass resolves these)
    // =========================================================================

    #[test]
    fn test_compound_assignment_left_for_cleanup() {
        assert_eq!(lua("x += 2"), "x += 2\n");
        assert_eq!(lua("x -= 2"), "x -= 2\n");
    }

    #[test]
    fn test_updates_left_for_cleanup() {
        assert_eq!(lua("i++"), "i++\n");
        assert_eq!(lua("--i"), "--i\n");
    }

    #[test]
    fn test_literal_index_left_for_cleanup() {
        assert_eq!(lua("const f = items[0]"), "local f = items[0]\n");
    }

    // =========================================================================
    // Comments and layout
    // =========================================================================

    #[test]
    fn test_comments_carried_through() {
        assert_eq!(
            lua("// note query\nconst x = 1"),
            "-- note query\nlocal x = 1\n"
        );
        assert_eq!(lua("/* multi */"), "--[[ multi ]]\n");
    }

    #[test]
    fn test_comments_dropped_when_disabled() {
        let program = parse("// gone\nconst x = 1").unwrap();
        let opts = TranspileOptions {
            preserve_comments: false,
            ..Default::default()
        };
        assert_eq!(emit(&program, &opts), "local x = 1\n");
    }

    #[test]
    fn test_blank_lines_preserved() {
        assert_eq!(
            lua("const a = 1\n\n\nconst b = 2"),
            "local a = 1\n\nlocal b = 2\n"
        );
    }

    #[test]
    fn test_regex_literal_in_expression_position() {
        assert_eq!(lua("const p = /\\w+/"), "local p = \"%w+\"\n");
        assert_eq!(
            lua("const p = /a|b/"),
            "local p = nil --[[ unsupported pattern: /a|b/ ]]\n"
        );
    }
}
