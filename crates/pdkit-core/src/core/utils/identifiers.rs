use phf::{Set, phf_set};
use std::borrow::Cow;

static VERILOG_KEYWORDS: Set<&'static str> = phf_set! {
    "always", "and", "assign", "begin", "buf", "case", "casex", "casez", "default", "defparam",
    "else", "end", "endcase", "endfunction", "endmodule", "endtask", "for", "function", "if",
    "initial", "inout", "input", "integer", "localparam", "module", "nand", "nor", "not", "or",
    "output", "parameter", "reg", "signed", "supply0", "supply1", "task", "tri", "wand", "wire",
    "wor", "xnor", "xor",
};

/// Separator between the levels of a flattened hierarchical name.
pub const HIERARCHY_SEPARATOR: char = '/';

pub fn is_verilog_keyword(name: &str) -> bool {
    VERILOG_KEYWORDS.contains(name)
}

/// Whether `name` can be written as a plain Verilog identifier.
pub fn is_simple_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !is_verilog_keyword(name)
}

/// Renders `name` as a Verilog identifier, escaping it when needed.
pub fn escape_identifier(name: &str) -> Cow<'_, str> {
    if is_simple_identifier(name) {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("\\{} ", name))
    }
}

/// Name of one bit of a bus, as used for flattened nets and ports.
pub fn bit_name(base: &str, index: i64) -> String {
    format!("{}[{}]", base, index)
}

pub fn hierarchical_name(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", prefix, HIERARCHY_SEPARATOR, name)
    }
}
