//! Structural Verilog reader and writer.
//!
//! The reader accepts gate-level netlists: modules with scalar or bus ports and wires, and cell
//! or module instances connected by name. Behavioral constructs are rejected.

use super::DesignView;
use super::traits::{FormatReader, FormatWriter};
use crate::core::models::ids::NetId;
use crate::core::models::library::PinDirection;
use crate::core::utils::identifiers::{bit_name, escape_identifier, is_verilog_keyword};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum VerilogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("Unsupported construct at line {line}: {construct}")]
    Unsupported { line: usize, construct: String },
    #[error("Module '{0}' is defined twice")]
    DuplicateModule(String),
    #[error("Port '{port}' of module '{module}' has no direction declaration")]
    MissingDirection { module: String, port: String },
    #[error("Inconsistent design: {0}")]
    Inconsistency(String),
}

/// Widest bus or sized constant the reader accepts.
pub const MAX_BUS_WIDTH: usize = 1 << 16;

/// A `[msb:lsb]` bus range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitRange {
    pub msb: i64,
    pub lsb: i64,
}

impl BitRange {
    pub fn width(&self) -> usize {
        usize::try_from(self.msb.abs_diff(self.lsb))
            .map_or(usize::MAX, |span| span.saturating_add(1))
    }

    /// Bit indices from `msb` to `lsb`.
    pub fn indices(&self) -> Vec<i64> {
        if self.msb >= self.lsb {
            (self.lsb..=self.msb).rev().collect()
        } else {
            (self.msb..=self.lsb).collect()
        }
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= self.msb.min(self.lsb) && index <= self.msb.max(self.lsb)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePort {
    pub name: String,
    pub direction: PinDirection,
    pub range: Option<BitRange>,
}

/// The actual side of a named connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetExpr {
    /// A whole scalar or bus signal.
    Whole(String),
    Bit(String, i64),
    Slice(String, BitRange),
    Constant { width: Option<usize>, value: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerilogInstance {
    pub cell: String,
    pub name: String,
    /// Formal pin name and actual expression; `None` marks an explicitly open pin.
    pub connections: Vec<(String, Option<NetExpr>)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerilogModule {
    pub name: String,
    pub ports: Vec<ModulePort>,
    pub wires: IndexMap<String, Option<BitRange>>,
    pub instances: Vec<VerilogInstance>,
}

impl VerilogModule {
    pub fn port(&self, name: &str) -> Option<&ModulePort> {
        self.ports.iter().find(|p| p.name == name)
    }

    /// Range of a declared port or wire. The outer `None` means the signal is not declared.
    pub fn declared_range(&self, name: &str) -> Option<Option<BitRange>> {
        self.port(name)
            .map(|p| p.range)
            .or_else(|| self.wires.get(name).copied())
    }

    /// Ports expanded to individual bits, in declaration order.
    pub fn port_bits(&self) -> Vec<(String, PinDirection)> {
        let mut bits = Vec::new();
        for port in &self.ports {
            match port.range {
                None => bits.push((port.name.clone(), port.direction)),
                Some(range) => bits.extend(
                    range
                        .indices()
                        .into_iter()
                        .map(|i| (bit_name(&port.name, i), port.direction)),
                ),
            }
        }
        bits
    }
}

/// Modules of one file in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerilogDocument {
    pub modules: Vec<VerilogModule>,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Ident(String),
    Escaped(String),
    Number(String),
    Punct(char),
}

#[derive(Debug, Clone)]
struct Lexed {
    tok: Tok,
    line: usize,
}

fn lex(input: &str) -> Result<Vec<Lexed>, VerilogError> {
    let mut out = Vec::new();
    let mut chars = input.chars().peekable();
    let mut line = 1;

    while let Some(c) = chars.next() {
        match c {
            '\n' => line += 1,
            c if c.is_whitespace() => {}
            '/' => match chars.peek() {
                Some('/') => {
                    for c in chars.by_ref() {
                        if c == '\n' {
                            line += 1;
                            break;
                        }
                    }
                }
                Some('*') => {
                    chars.next();
                    let mut prev = ' ';
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '\n' {
                            line += 1;
                        }
                        if prev == '*' && c == '/' {
                            closed = true;
                            break;
                        }
                        prev = c;
                    }
                    if !closed {
                        return Err(VerilogError::Syntax {
                            line,
                            message: "unterminated block comment".into(),
                        });
                    }
                }
                _ => {
                    return Err(VerilogError::Syntax {
                        line,
                        message: "unexpected '/'".into(),
                    });
                }
            },
            '\\' => {
                let mut name = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                out.push(Lexed {
                    tok: Tok::Escaped(name),
                    line,
                });
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = c.to_string();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push(Lexed {
                    tok: Tok::Ident(name),
                    line,
                });
            }
            c if c.is_ascii_digit() || c == '\'' => {
                let mut text = c.to_string();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '\'' || c == '_' {
                        text.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push(Lexed {
                    tok: Tok::Number(text),
                    line,
                });
            }
            '(' | ')' | ',' | ';' | '.' | '[' | ']' | ':' | '{' | '}' | '=' | '#' => {
                out.push(Lexed {
                    tok: Tok::Punct(c),
                    line,
                });
            }
            other => {
                return Err(VerilogError::Syntax {
                    line,
                    message: format!("unexpected character '{}'", other),
                });
            }
        }
    }
    Ok(out)
}

/// Parses a decimal or sized (`4'b1010`, `8'hff`) literal. A zero size is not a literal.
fn parse_constant(text: &str) -> Option<(Option<usize>, u64)> {
    let clean: String = text.chars().filter(|c| *c != '_').collect();
    let Some((size, rest)) = clean.split_once('\'') else {
        return clean.parse().ok().map(|v| (None, v));
    };
    let width = if size.is_empty() {
        None
    } else {
        Some(size.parse().ok().filter(|w| *w > 0)?)
    };
    let mut rest = rest.chars();
    let radix = match rest.next()?.to_ascii_lowercase() {
        'b' => 2,
        'o' => 8,
        'd' => 10,
        'h' => 16,
        _ => return None,
    };
    let digits: String = rest.collect();
    u64::from_str_radix(&digits, radix)
        .ok()
        .map(|value| (width, value))
}

struct Parser {
    toks: Vec<Lexed>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos).map(|l| &l.tok)
    }

    fn line(&self) -> usize {
        self.toks
            .get(self.pos)
            .or_else(|| self.toks.last())
            .map_or(0, |l| l.line)
    }

    fn next(&mut self) -> Option<Tok> {
        let tok = self.toks.get(self.pos).map(|l| l.tok.clone());
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn syntax(&self, message: impl Into<String>) -> VerilogError {
        VerilogError::Syntax {
            line: self.line(),
            message: message.into(),
        }
    }

    fn unsupported(&self, construct: impl Into<String>) -> VerilogError {
        VerilogError::Unsupported {
            line: self.line(),
            construct: construct.into(),
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Tok::Ident(s)) if s == keyword)
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if self.peek() == Some(&Tok::Punct(c)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<(), VerilogError> {
        if self.eat_punct(c) {
            Ok(())
        } else {
            Err(self.syntax(format!("expected '{}'", c)))
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String, VerilogError> {
        match self.peek() {
            Some(Tok::Ident(s)) | Some(Tok::Escaped(s)) => {
                let s = s.clone();
                self.pos += 1;
                Ok(s)
            }
            _ => Err(self.syntax(format!("expected {}", what))),
        }
    }

    fn integer(&mut self) -> Result<i64, VerilogError> {
        match self.peek() {
            Some(Tok::Number(text)) => {
                let value = text
                    .parse()
                    .map_err(|_| self.syntax(format!("invalid index '{}'", text)))?;
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.syntax("expected an integer")),
        }
    }

    fn range(&mut self) -> Result<Option<BitRange>, VerilogError> {
        if !self.eat_punct('[') {
            return Ok(None);
        }
        let msb = self.integer()?;
        self.expect_punct(':')?;
        let lsb = self.integer()?;
        self.expect_punct(']')?;
        let range = BitRange { msb, lsb };
        self.check_width(range.width())?;
        Ok(Some(range))
    }

    fn check_width(&self, width: usize) -> Result<(), VerilogError> {
        if width > MAX_BUS_WIDTH {
            return Err(self.unsupported(format!(
                "{}-bit signal (at most {} bits are supported)",
                width, MAX_BUS_WIDTH
            )));
        }
        Ok(())
    }

    fn document(&mut self) -> Result<VerilogDocument, VerilogError> {
        let mut doc = VerilogDocument::default();
        while self.peek().is_some() {
            if !self.at_keyword("module") {
                return Err(self.syntax("expected 'module'"));
            }
            self.pos += 1;
            let module = self.module()?;
            if doc.modules.iter().any(|m| m.name == module.name) {
                return Err(VerilogError::DuplicateModule(module.name));
            }
            doc.modules.push(module);
        }
        Ok(doc)
    }

    fn module(&mut self) -> Result<VerilogModule, VerilogError> {
        let name = self.identifier("module name")?;
        if self.peek() == Some(&Tok::Punct('#')) {
            return Err(self.unsupported("module parameters"));
        }

        let mut order: Vec<String> = Vec::new();
        let mut declared: HashMap<String, (PinDirection, Option<BitRange>)> = HashMap::new();
        if self.eat_punct('(') && !self.eat_punct(')') {
            let mut current: Option<(PinDirection, Option<BitRange>)> = None;
            loop {
                if let Some(direction) = self.direction_keyword() {
                    self.pos += 1;
                    if self.at_keyword("wire") {
                        self.pos += 1;
                    }
                    current = Some((direction, self.range()?));
                }
                let port = self.identifier("port name")?;
                if let Some(decl) = current {
                    declared.insert(port.clone(), decl);
                }
                order.push(port);
                if self.eat_punct(')') {
                    break;
                }
                self.expect_punct(',')?;
            }
        }
        self.expect_punct(';')?;

        let mut wires = IndexMap::new();
        let mut instances = Vec::new();
        loop {
            match self.peek() {
                None => return Err(self.syntax(format!("module '{}' has no endmodule", name))),
                Some(Tok::Ident(kw)) if kw == "endmodule" => {
                    self.pos += 1;
                    break;
                }
                Some(Tok::Ident(kw)) if kw == "wire" || kw == "tri" => {
                    self.pos += 1;
                    let range = self.range()?;
                    for wire in self.name_list()? {
                        wires.insert(wire, range);
                    }
                }
                Some(Tok::Ident(kw)) if self.direction_keyword().is_some() => {
                    let kw = kw.clone();
                    let direction = self.direction_keyword().unwrap_or(PinDirection::Inout);
                    self.pos += 1;
                    if self.at_keyword("wire") {
                        self.pos += 1;
                    }
                    let range = self.range()?;
                    for port in self.name_list()? {
                        if !order.contains(&port) {
                            return Err(self.syntax(format!(
                                "'{}' declared {} but not in the port list of '{}'",
                                port, kw, name
                            )));
                        }
                        declared.insert(port, (direction, range));
                    }
                }
                Some(Tok::Ident(kw)) if is_verilog_keyword(kw) => {
                    return Err(self.unsupported(format!("'{}' statement", kw)));
                }
                Some(Tok::Ident(_)) | Some(Tok::Escaped(_)) => instances.push(self.instance()?),
                Some(_) => return Err(self.syntax("expected a declaration or an instance")),
            }
        }

        let mut ports = Vec::with_capacity(order.len());
        for port in order {
            let (direction, range) =
                declared
                    .remove(&port)
                    .ok_or_else(|| VerilogError::MissingDirection {
                        module: name.clone(),
                        port: port.clone(),
                    })?;
            wires.shift_remove(&port);
            ports.push(ModulePort {
                name: port,
                direction,
                range,
            });
        }

        Ok(VerilogModule {
            name,
            ports,
            wires,
            instances,
        })
    }

    fn direction_keyword(&self) -> Option<PinDirection> {
        match self.peek() {
            Some(Tok::Ident(s)) => match s.as_str() {
                "input" => Some(PinDirection::Input),
                "output" => Some(PinDirection::Output),
                "inout" => Some(PinDirection::Inout),
                _ => None,
            },
            _ => None,
        }
    }

    fn name_list(&mut self) -> Result<Vec<String>, VerilogError> {
        let mut names = vec![self.identifier("signal name")?];
        while self.eat_punct(',') {
            names.push(self.identifier("signal name")?);
        }
        self.expect_punct(';')?;
        Ok(names)
    }

    fn instance(&mut self) -> Result<VerilogInstance, VerilogError> {
        let cell = self.identifier("cell name")?;
        if self.peek() == Some(&Tok::Punct('#')) {
            return Err(self.unsupported("instance parameters"));
        }
        let name = self.identifier("instance name")?;
        if self.peek() == Some(&Tok::Punct('[')) {
            return Err(self.unsupported("instance arrays"));
        }
        self.expect_punct('(')?;

        let mut connections = Vec::new();
        if !self.eat_punct(')') {
            loop {
                if !self.eat_punct('.') {
                    return Err(self.unsupported("positional port connections"));
                }
                let formal = self.identifier("pin name")?;
                self.expect_punct('(')?;
                let actual = if self.eat_punct(')') {
                    None
                } else {
                    let expr = self.expression()?;
                    self.expect_punct(')')?;
                    Some(expr)
                };
                connections.push((formal, actual));
                if self.eat_punct(')') {
                    break;
                }
                self.expect_punct(',')?;
            }
        }
        self.expect_punct(';')?;
        Ok(VerilogInstance {
            cell,
            name,
            connections,
        })
    }

    fn expression(&mut self) -> Result<NetExpr, VerilogError> {
        match self.peek().cloned() {
            Some(Tok::Punct('{')) => Err(self.unsupported("concatenation")),
            Some(Tok::Number(text)) => {
                let (width, value) = parse_constant(&text)
                    .ok_or_else(|| self.syntax(format!("invalid constant '{}'", text)))?;
                if let Some(width) = width {
                    self.check_width(width)?;
                }
                self.pos += 1;
                Ok(NetExpr::Constant { width, value })
            }
            Some(Tok::Ident(_)) | Some(Tok::Escaped(_)) => {
                let name = self.identifier("net name")?;
                if !self.eat_punct('[') {
                    return Ok(NetExpr::Whole(name));
                }
                let first = self.integer()?;
                if self.eat_punct(':') {
                    let lsb = self.integer()?;
                    self.expect_punct(']')?;
                    let slice = BitRange { msb: first, lsb };
                    self.check_width(slice.width())?;
                    Ok(NetExpr::Slice(name, slice))
                } else {
                    self.expect_punct(']')?;
                    Ok(NetExpr::Bit(name, first))
                }
            }
            _ => Err(self.syntax("expected a net expression")),
        }
    }
}

pub struct VerilogFile;

impl FormatReader for VerilogFile {
    type Document = VerilogDocument;
    type Error = VerilogError;

    fn read_from(reader: &mut impl BufRead) -> Result<VerilogDocument, VerilogError> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        let mut parser = Parser {
            toks: lex(&text)?,
            pos: 0,
        };
        let doc = parser.document()?;
        debug!("Parsed {} Verilog module(s)", doc.modules.len());
        Ok(doc)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerilogWriteOptions {
    /// Order ports, nets, instances and pin connections by name.
    pub sort: bool,
}

/// Writes a block as one flat module.
///
/// Every net attached to a port takes the port's name. When several ports share a net, the
/// first one in write order names it and the others are written as `assign port = net;`.
/// That output is valid Verilog for downstream tools, but this reader rejects `assign`, so
/// such a block cannot be loaded back with [`FormatReader::read_from`]. Netlists linked from
/// staging never share a net between ports; designs read from DEF can.
///
/// # Errors
///
/// Returns [`VerilogError::Inconsistency`] if an instance refers to a missing master or an
/// unknown net, and [`VerilogError::Io`] if writing fails.
impl FormatWriter for VerilogFile {
    type Source<'a> = DesignView<'a>;
    type Options = VerilogWriteOptions;
    type Error = VerilogError;

    fn write_to(
        view: DesignView<'_>,
        options: &VerilogWriteOptions,
        writer: &mut impl Write,
    ) -> Result<(), VerilogError> {
        let DesignView { db, block } = view;

        let mut ports: Vec<_> = block.ports().collect();
        if options.sort {
            ports.sort_by(|a, b| a.name.cmp(&b.name));
        }

        // A net attached to a port is written under the port's name.
        let mut names: HashMap<NetId, String> = HashMap::new();
        let mut assigns = Vec::new();
        for port in &ports {
            let Some(net) = port.net else { continue };
            match names.get(&net) {
                Some(first) => assigns.push((port.name.clone(), first.clone())),
                None => {
                    names.insert(net, port.name.clone());
                }
            }
        }
        let mut wires: Vec<_> = block
            .nets()
            .filter(|(id, _)| !names.contains_key(id))
            .map(|(id, net)| (id, net.name.clone()))
            .collect();
        if options.sort {
            wires.sort_by(|a, b| a.1.cmp(&b.1));
        }
        for (id, name) in &wires {
            names.insert(*id, name.clone());
        }

        let header: Vec<_> = ports.iter().map(|p| escape_identifier(&p.name)).collect();
        writeln!(
            writer,
            "module {} ({});",
            escape_identifier(&block.name),
            header.join(", ")
        )?;
        for port in &ports {
            let keyword = match port.direction {
                PinDirection::Input => "input",
                PinDirection::Output => "output",
                PinDirection::Inout | PinDirection::Feedthru => "inout",
            };
            writeln!(writer, "  {} {};", keyword, escape_identifier(&port.name))?;
        }
        for (_, name) in &wires {
            writeln!(writer, "  wire {};", escape_identifier(name))?;
        }
        for (port, driver) in &assigns {
            writeln!(
                writer,
                "  assign {} = {};",
                escape_identifier(port),
                escape_identifier(driver)
            )?;
        }
        if block.instance_count() > 0 {
            writeln!(writer)?;
        }

        let mut instances: Vec<_> = block.instances().map(|(_, inst)| inst).collect();
        if options.sort {
            instances.sort_by(|a, b| a.name.cmp(&b.name));
        }
        for inst in instances {
            let master = db.master(inst.master).ok_or_else(|| {
                VerilogError::Inconsistency(format!("instance {} has no master", inst.name))
            })?;
            let mut pins: Vec<_> = inst.connections().collect();
            if options.sort {
                pins.sort_by(|a, b| a.0.cmp(b.0));
            }
            let mut rendered = Vec::with_capacity(pins.len());
            for (pin, net) in pins {
                let net_name = names.get(&net).ok_or_else(|| {
                    VerilogError::Inconsistency(format!(
                        "pin {}/{} is connected to an unknown net",
                        inst.name, pin
                    ))
                })?;
                rendered.push(format!(
                    ".{}({})",
                    escape_identifier(pin),
                    escape_identifier(net_name)
                ));
            }
            writeln!(
                writer,
                "  {} {} ({});",
                escape_identifier(&master.name),
                escape_identifier(&inst.name),
                rendered.join(", ")
            )?;
        }
        writeln!(writer, "endmodule")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::HIERARCHICAL_VERILOG;

    fn parse(text: &str) -> Result<VerilogDocument, VerilogError> {
        VerilogFile::read_from(&mut text.as_bytes())
    }

    #[test]
    fn parses_modules_ports_and_named_connections() {
        let doc = parse(HIERARCHICAL_VERILOG).unwrap();
        assert_eq!(doc.modules.len(), 2);
        let top = &doc.modules[1];
        assert_eq!(top.name, "top");
        assert_eq!(top.ports.len(), 4);
        assert_eq!(top.port("y").unwrap().direction, PinDirection::Output);
        assert_eq!(top.wires.len(), 2);
        assert_eq!(top.instances[1].cell, "inv_pair");
        assert_eq!(
            top.instances[0].connections[2],
            ("ZN".to_string(), Some(NetExpr::Whole("n1".into())))
        );
    }

    #[test]
    fn ansi_headers_buses_and_constants_are_understood() {
        let text = r"
            /* block comment
               spanning lines */
            module m (input [3:0] d, input clk, output q);
              wire [1:0] t;
              DFF_X1 r0 (.D(d[2]), .CK(clk), .Q(t[0]));
              BUF_X1 \b/0  (.A(1'b1), .Z(), .EN(d[1:0]));
            endmodule
        ";
        let doc = parse(text).unwrap();
        let m = &doc.modules[0];
        assert_eq!(m.ports[0].range, Some(BitRange { msb: 3, lsb: 0 }));
        assert_eq!(m.port_bits()[0].0, "d[3]");
        assert_eq!(m.port_bits().len(), 6);
        assert_eq!(m.declared_range("t"), Some(Some(BitRange { msb: 1, lsb: 0 })));
        assert_eq!(m.declared_range("nope"), None);
        let b = &m.instances[1];
        assert_eq!(b.name, "b/0");
        assert_eq!(
            b.connections[0].1,
            Some(NetExpr::Constant {
                width: Some(1),
                value: 1
            })
        );
        assert_eq!(b.connections[1].1, None);
        assert_eq!(
            b.connections[2].1,
            Some(NetExpr::Slice("d".into(), BitRange { msb: 1, lsb: 0 }))
        );
    }

    #[test]
    fn behavioral_constructs_are_rejected() {
        let assign = "module m (a, y);\n input a;\n output y;\n assign y = a;\nendmodule\n";
        assert!(matches!(
            parse(assign),
            Err(VerilogError::Unsupported { line: 4, .. })
        ));
        let positional = "module m (a);\n input a;\n INV_X1 u (a, b);\nendmodule\n";
        assert!(matches!(
            parse(positional),
            Err(VerilogError::Unsupported { .. })
        ));
    }

    #[test]
    fn port_without_direction_is_an_error() {
        let text = "module m (a, b);\n input a;\nendmodule\n";
        assert!(matches!(
            parse(text),
            Err(VerilogError::MissingDirection { ref port, .. }) if port == "b"
        ));
    }

    #[test]
    fn missing_endmodule_is_a_syntax_error() {
        assert!(matches!(
            parse("module m ();\n wire a;\n"),
            Err(VerilogError::Syntax { .. })
        ));
    }

    #[test]
    fn sized_constants_parse_in_every_radix() {
        assert_eq!(parse_constant("4'b1010"), Some((Some(4), 10)));
        assert_eq!(parse_constant("8'hFF"), Some((Some(8), 255)));
        assert_eq!(parse_constant("'d7"), Some((None, 7)));
        assert_eq!(parse_constant("12"), Some((None, 12)));
        assert_eq!(parse_constant("2'x1"), None);
        assert_eq!(parse_constant("0'b0"), None);
    }

    #[test]
    fn oversized_buses_and_constants_are_rejected() {
        let wide_port = "module m (a);\n input [9223372036854775807:0] a;\nendmodule\n";
        assert!(matches!(
            parse(wide_port),
            Err(VerilogError::Unsupported { line: 2, .. })
        ));
        let wide_constant = "module m (y);\n output y;\n INV_X1 u (.A(18446744073709551615'b0), .ZN(y));\nendmodule\n";
        assert!(matches!(
            parse(wide_constant),
            Err(VerilogError::Unsupported { line: 3, .. })
        ));
        let wide_slice = "module m (a);\n input a;\n INV_X1 u (.A(a[70000:0]));\nendmodule\n";
        assert!(matches!(
            parse(wide_slice),
            Err(VerilogError::Unsupported { .. })
        ));
        let widest = format!(
            "module m (a);\n input [{}:0] a;\nendmodule\n",
            MAX_BUS_WIDTH - 1
        );
        assert_eq!(parse(&widest).unwrap().modules[0].port_bits().len(), MAX_BUS_WIDTH);
    }

    #[test]
    fn ports_sharing_a_net_are_written_as_assigns() {
        use crate::core::io::def::{DefFile, build_block};
        use crate::core::io::lef::{LefFile, LefReader};
        use crate::test_support::TECH_AND_CELLS;

        let mut db = crate::core::models::database::Database::new();
        let lef = LefFile::read_from(&mut TECH_AND_CELLS.as_bytes()).unwrap();
        LefReader::new(&mut db)
            .create_technology_and_library("cells", &lef)
            .unwrap();
        let def = "DESIGN t ;\nCOMPONENTS 1 ;\n- u1 INV_X1 ;\nEND COMPONENTS\n\
                   PINS 2 ;\n- a + NET n + DIRECTION INPUT ;\n- b + NET n + DIRECTION OUTPUT ;\nEND PINS\n\
                   NETS 1 ;\n- n ( PIN a ) ( PIN b ) ( u1 A ) ;\nEND NETS\nEND DESIGN\n";
        let doc = DefFile::read_from(&mut def.as_bytes()).unwrap();
        let block = build_block(&db, &doc).unwrap();

        let mut out = Vec::new();
        VerilogFile::write_to(
            DesignView {
                db: &db,
                block: &block,
            },
            &VerilogWriteOptions { sort: true },
            &mut out,
        )
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("  assign b = a;\n"));
        assert!(text.contains("INV_X1 u1 (.A(a));"));
        assert!(matches!(
            parse(&text),
            Err(VerilogError::Unsupported { ref construct, .. }) if construct.contains("assign")
        ));
    }

    #[test]
    fn bit_range_indices_follow_declaration_order() {
        assert_eq!(BitRange { msb: 2, lsb: 0 }.indices(), vec![2, 1, 0]);
        assert_eq!(BitRange { msb: 0, lsb: 2 }.indices(), vec![0, 1, 2]);
        assert_eq!(BitRange { msb: 7, lsb: 4 }.width(), 4);
        assert!(!BitRange { msb: 7, lsb: 4 }.contains(3));
        assert_eq!(
            BitRange {
                msb: i64::MAX,
                lsb: i64::MIN
            }
            .width(),
            usize::MAX
        );
    }
}
