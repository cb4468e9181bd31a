//! Design-exchange (DEF) reader and writer.
//!
//! The reader understands the connectivity subset of DEF: `DESIGN`, `UNITS`, `DIEAREA`,
//! `COMPONENTS`, `PINS` and `NETS`. Routing, special nets and other sections are skipped.

use super::DesignView;
use super::lexer::{SyntaxError, Token, TokenStream};
use super::traits::{FormatReader, FormatWriter};
use crate::core::models::database::Database;
use crate::core::models::design::{
    Block, DesignError, NetTerm, Orientation, Placement, PlacementStatus, Rect,
};
use crate::core::models::library::PinDirection;
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::debug;

const SKIPPED_SECTIONS: &[&str] = &[
    "SPECIALNETS",
    "VIAS",
    "REGIONS",
    "GROUPS",
    "BLOCKAGES",
    "PROPERTYDEFINITIONS",
    "NONDEFAULTRULES",
    "SCANCHAINS",
    "FILLS",
    "STYLES",
    "SLOTS",
    "PINPROPERTIES",
];

#[derive(Debug, Error)]
pub enum DefError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Syntax error at {0}")]
    Syntax(#[from] SyntaxError),
    #[error("DEF file has no DESIGN statement")]
    MissingDesign,
    #[error("Component '{component}' uses master '{master}' which no loaded library defines")]
    UnresolvedMaster { component: String, master: String },
    #[error("Net '{net}' connects unknown component '{component}'")]
    UnknownComponent { net: String, component: String },
    #[error("Net '{net}' connects unknown pin '{pin}' of component '{component}'")]
    UnknownPin {
        net: String,
        component: String,
        pin: String,
    },
    #[error(transparent)]
    Design(#[from] DesignError),
    #[error("Inconsistent design: {0}")]
    Inconsistency(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefComponent {
    pub name: String,
    pub master: String,
    pub placement: Option<Placement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefPin {
    pub name: String,
    pub net: Option<String>,
    pub direction: Option<PinDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DefNet {
    pub name: String,
    /// `(component, pin)` pairs; a component of `PIN` denotes a block port.
    pub connections: Vec<(String, String)>,
}

/// Parsed content of one DEF file, coordinates in the file's own database units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DefDocument {
    pub design: Option<String>,
    pub dbu_per_micron: Option<u32>,
    pub die_area: Option<Rect>,
    pub components: Vec<DefComponent>,
    pub pins: Vec<DefPin>,
    pub nets: Vec<DefNet>,
}

pub struct DefFile;

impl FormatReader for DefFile {
    type Document = DefDocument;
    type Error = DefError;

    fn read_from(reader: &mut impl BufRead) -> Result<DefDocument, DefError> {
        let mut tokens = TokenStream::tokenize(reader)?;
        let mut doc = DefDocument::default();

        while let Some(token) = tokens.next_token() {
            let keyword = token.text.to_ascii_uppercase();
            match keyword.as_str() {
                "DESIGN" => {
                    doc.design = Some(tokens.word("design name")?);
                    tokens.expect(";")?;
                }
                "UNITS" => {
                    tokens.expect("DISTANCE")?;
                    tokens.expect("MICRONS")?;
                    let line = tokens.line();
                    let value = tokens.integer("distance units")?;
                    doc.dbu_per_micron =
                        Some(u32::try_from(value).ok().filter(|v| *v > 0).ok_or(
                            SyntaxError {
                                line,
                                message: format!("distance units must be positive, got {}", value),
                            },
                        )?);
                    tokens.expect(";")?;
                }
                "DIEAREA" => {
                    let line = tokens.line();
                    let stmt = tokens.statement()?;
                    let points = parse_points(&stmt, line)?;
                    if points.len() < 2 {
                        return Err(SyntaxError {
                            line,
                            message: "DIEAREA needs at least two points".into(),
                        }
                        .into());
                    }
                    let (xs, ys): (Vec<i64>, Vec<i64>) = points.into_iter().unzip();
                    doc.die_area = Some(Rect::new(
                        *xs.iter().min().unwrap_or(&0),
                        *ys.iter().min().unwrap_or(&0),
                        *xs.iter().max().unwrap_or(&0),
                        *ys.iter().max().unwrap_or(&0),
                    ));
                }
                "COMPONENTS" => {
                    for stmt in section(&mut tokens, "COMPONENTS")? {
                        doc.components.push(parse_component(&stmt)?);
                    }
                }
                "PINS" => {
                    for stmt in section(&mut tokens, "PINS")? {
                        doc.pins.push(parse_pin(&stmt)?);
                    }
                }
                "NETS" => {
                    for stmt in section(&mut tokens, "NETS")? {
                        doc.nets.push(parse_net(&stmt)?);
                    }
                }
                k if SKIPPED_SECTIONS.contains(&k) => tokens.skip_block(&token.text)?,
                "END" => {
                    if tokens.peek() == Some("DESIGN") {
                        break;
                    }
                    return Err(tokens.error("unexpected END").into());
                }
                _ => tokens.skip_statement()?,
            }
        }

        if doc.design.is_none() {
            return Err(DefError::MissingDesign);
        }
        debug!(
            "Parsed DEF: {} components, {} pins, {} nets",
            doc.components.len(),
            doc.pins.len(),
            doc.nets.len()
        );
        Ok(doc)
    }
}

/// Reads the `- ... ;` statements of a counted section up to `END <name>`.
fn section(tokens: &mut TokenStream, name: &str) -> Result<Vec<Vec<Token>>, SyntaxError> {
    tokens.skip_statement()?;
    let mut statements = Vec::new();
    loop {
        match tokens.peek() {
            Some("END") => {
                tokens.next_token();
                tokens.expect(name)?;
                return Ok(statements);
            }
            Some("-") => {
                tokens.next_token();
                statements.push(tokens.statement()?);
            }
            Some(other) => {
                return Err(tokens.error(format!("expected '-' in {}, found '{}'", name, other)));
            }
            None => return Err(tokens.error(format!("missing 'END {}'", name))),
        }
    }
}

fn parse_points(stmt: &[Token], line: usize) -> Result<Vec<(i64, i64)>, SyntaxError> {
    let mut points = Vec::new();
    let mut i = 0;
    while i < stmt.len() {
        if stmt[i].text == "(" {
            let coord = |idx: usize| -> Result<i64, SyntaxError> {
                let tok = stmt.get(idx).ok_or(SyntaxError {
                    line,
                    message: "truncated point".into(),
                })?;
                tok.text.parse().map_err(|_| SyntaxError {
                    line: tok.line,
                    message: format!("invalid coordinate '{}'", tok.text),
                })
            };
            points.push((coord(i + 1)?, coord(i + 2)?));
            i += 4;
        } else {
            i += 1;
        }
    }
    Ok(points)
}

fn parse_component(stmt: &[Token]) -> Result<DefComponent, SyntaxError> {
    let line = stmt.first().map_or(0, |t| t.line);
    let (Some(name), Some(master)) = (stmt.first(), stmt.get(1)) else {
        return Err(SyntaxError {
            line,
            message: "component needs a name and a master".into(),
        });
    };
    let mut placement = None;
    let mut i = 2;
    while i < stmt.len() {
        if stmt[i].text == "+" {
            let status = stmt.get(i + 1).map(|t| t.text.to_ascii_uppercase());
            let status = match status.as_deref() {
                Some("PLACED") => Some(PlacementStatus::Placed),
                Some("FIXED") => Some(PlacementStatus::Fixed),
                Some("COVER") => Some(PlacementStatus::Cover),
                _ => None,
            };
            if let Some(status) = status {
                let points = parse_points(&stmt[i + 2..], line)?;
                let (x, y) = points.first().copied().ok_or(SyntaxError {
                    line,
                    message: format!("component '{}' placement has no location", name.text),
                })?;
                let orient_token = stmt.get(i + 6).map(|t| t.text.as_str()).unwrap_or("N");
                let orient = orient_token.parse::<Orientation>().map_err(|_| SyntaxError {
                    line,
                    message: format!("invalid orientation '{}'", orient_token),
                })?;
                placement = Some(Placement {
                    status,
                    x,
                    y,
                    orient,
                });
            }
        }
        i += 1;
    }
    Ok(DefComponent {
        name: name.text.clone(),
        master: master.text.clone(),
        placement,
    })
}

fn parse_pin(stmt: &[Token]) -> Result<DefPin, SyntaxError> {
    let line = stmt.first().map_or(0, |t| t.line);
    let name = stmt.first().ok_or(SyntaxError {
        line,
        message: "pin needs a name".into(),
    })?;
    let mut pin = DefPin {
        name: name.text.clone(),
        net: None,
        direction: None,
    };
    for pair in stmt.windows(3) {
        if pair[0].text != "+" {
            continue;
        }
        match pair[1].text.to_ascii_uppercase().as_str() {
            "NET" => pin.net = Some(pair[2].text.clone()),
            "DIRECTION" => {
                pin.direction = Some(pair[2].text.parse().map_err(|_| SyntaxError {
                    line: pair[2].line,
                    message: format!("invalid pin direction '{}'", pair[2].text),
                })?);
            }
            _ => {}
        }
    }
    Ok(pin)
}

fn parse_net(stmt: &[Token]) -> Result<DefNet, SyntaxError> {
    let line = stmt.first().map_or(0, |t| t.line);
    let name = stmt.first().ok_or(SyntaxError {
        line,
        message: "net needs a name".into(),
    })?;
    let mut connections = Vec::new();
    let mut i = 1;
    while i < stmt.len() && stmt[i].text != "+" {
        if stmt[i].text == "(" {
            match (stmt.get(i + 1), stmt.get(i + 2), stmt.get(i + 3)) {
                (Some(comp), Some(pin), Some(close)) if close.text == ")" => {
                    connections.push((comp.text.clone(), pin.text.clone()));
                    i += 4;
                    continue;
                }
                _ => {
                    return Err(SyntaxError {
                        line: stmt[i].line,
                        message: format!("malformed connection in net '{}'", name.text),
                    });
                }
            }
        }
        i += 1;
    }
    Ok(DefNet {
        name: name.text.clone(),
        connections,
    })
}

/// Builds a block from `doc`, resolving every master and connection against `db`.
///
/// Nothing is written to the database; the caller commits the returned block.
///
/// # Arguments
///
/// * `db` - The database whose libraries define the component masters. When its technology
///   uses a different dbu than the DEF `UNITS`, coordinates are rescaled.
/// * `doc` - A parsed DEF document.
///
/// # Return
///
/// Returns the block with its ports, instances and nets.
///
/// # Errors
///
/// Returns [`DefError::MissingDesign`] without a `DESIGN` statement,
/// [`DefError::UnresolvedMaster`] for a component whose master no library defines, and
/// [`DefError::UnknownComponent`] or [`DefError::UnknownPin`] for a net that connects to
/// something that does not exist.
pub fn build_block(db: &Database, doc: &DefDocument) -> Result<Block, DefError> {
    let name = doc.design.as_ref().ok_or(DefError::MissingDesign)?;
    let scale = match (doc.dbu_per_micron, db.technology()) {
        (Some(def_dbu), Some(tech)) if def_dbu != tech.dbu_per_micron => {
            f64::from(tech.dbu_per_micron) / f64::from(def_dbu)
        }
        _ => 1.0,
    };
    let convert = |v: i64| (v as f64 * scale).round() as i64;

    let mut block = Block::new(name.clone());
    block.die_area = doc
        .die_area
        .map(|r| Rect::new(convert(r.x0), convert(r.y0), convert(r.x1), convert(r.y1)));

    for pin in &doc.pins {
        block.add_port(pin.name.clone(), pin.direction.unwrap_or(PinDirection::Input))?;
        if let Some(net_name) = &pin.net {
            let net = block.net_or_insert(net_name);
            block.connect_port(net, &pin.name)?;
        }
    }

    for comp in &doc.components {
        let master = db
            .find_master(&comp.master)
            .ok_or_else(|| DefError::UnresolvedMaster {
                component: comp.name.clone(),
                master: comp.master.clone(),
            })?;
        let placement = comp.placement.map(|p| Placement {
            x: convert(p.x),
            y: convert(p.y),
            ..p
        });
        block.add_instance(comp.name.clone(), master, placement)?;
    }

    for def_net in &doc.nets {
        let net = block.net_or_insert(&def_net.name);
        for (component, pin) in &def_net.connections {
            if component == "PIN" {
                block.connect_port(net, pin)?;
                continue;
            }
            let inst_id =
                block
                    .find_instance(component)
                    .ok_or_else(|| DefError::UnknownComponent {
                        net: def_net.name.clone(),
                        component: component.clone(),
                    })?;
            let master_id = block
                .instance(inst_id)
                .map(|i| i.master)
                .ok_or_else(|| DefError::Inconsistency(format!("instance {}", component)))?;
            let has_pin = db.master(master_id).is_some_and(|m| m.pin(pin).is_some());
            if !has_pin {
                return Err(DefError::UnknownPin {
                    net: def_net.name.clone(),
                    component: component.clone(),
                    pin: pin.clone(),
                });
            }
            block.connect_instance(net, inst_id, pin)?;
        }
    }

    Ok(block)
}

impl FormatWriter for DefFile {
    type Source<'a> = DesignView<'a>;
    type Options = ();
    type Error = DefError;

    fn write_to(
        view: DesignView<'_>,
        _options: &(),
        writer: &mut impl Write,
    ) -> Result<(), DefError> {
        let DesignView { db, block } = view;
        writeln!(writer, "VERSION 5.8 ;")?;
        writeln!(writer, "DIVIDERCHAR \"/\" ;")?;
        writeln!(writer, "BUSBITCHARS \"[]\" ;")?;
        writeln!(writer, "DESIGN {} ;", block.name)?;
        if let Some(tech) = db.technology() {
            writeln!(writer, "UNITS DISTANCE MICRONS {} ;", tech.dbu_per_micron)?;
        }
        if let Some(r) = block.die_area {
            writeln!(writer, "DIEAREA ( {} {} ) ( {} {} ) ;", r.x0, r.y0, r.x1, r.y1)?;
        }
        writeln!(writer)?;

        writeln!(writer, "COMPONENTS {} ;", block.instance_count())?;
        for (_, inst) in block.instances() {
            let master = db.master(inst.master).ok_or_else(|| {
                DefError::Inconsistency(format!("instance {} has no master", inst.name))
            })?;
            write!(writer, "  - {} {}", inst.name, master.name)?;
            match inst.placement {
                Some(p) => write!(writer, " + {} ( {} {} ) {}", p.status, p.x, p.y, p.orient)?,
                None => write!(writer, " + UNPLACED")?,
            }
            writeln!(writer, " ;")?;
        }
        writeln!(writer, "END COMPONENTS")?;
        writeln!(writer)?;

        writeln!(writer, "PINS {} ;", block.ports().count())?;
        for port in block.ports() {
            write!(writer, "  - {}", port.name)?;
            if let Some(net) = port.net.and_then(|n| block.net(n)) {
                write!(writer, " + NET {}", net.name)?;
            }
            writeln!(writer, " + DIRECTION {} ;", port.direction)?;
        }
        writeln!(writer, "END PINS")?;
        writeln!(writer)?;

        writeln!(writer, "NETS {} ;", block.net_count())?;
        for (_, net) in block.nets() {
            write!(writer, "  - {}", net.name)?;
            for term in net.terms() {
                match term {
                    NetTerm::Port(name) => write!(writer, " ( PIN {} )", name)?,
                    NetTerm::Instance { instance, pin } => {
                        let inst = block.instance(*instance).ok_or_else(|| {
                            DefError::Inconsistency(format!("net {} has a dangling term", net.name))
                        })?;
                        write!(writer, " ( {} {} )", inst.name, pin)?;
                    }
                }
            }
            writeln!(writer, " ;")?;
        }
        writeln!(writer, "END NETS")?;
        writeln!(writer)?;
        writeln!(writer, "END DESIGN")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::lef::{LefFile, LefReader};
    use crate::test_support::{SMALL_DESIGN_DEF, TECH_AND_CELLS, UNKNOWN_CELL_DEF};

    fn database_with_cells() -> Database {
        let mut db = Database::new();
        let doc = LefFile::read_from(&mut TECH_AND_CELLS.as_bytes()).unwrap();
        LefReader::new(&mut db)
            .create_technology_and_library("cells", &doc)
            .unwrap();
        db
    }

    #[test]
    fn parses_connectivity_sections() {
        let doc = DefFile::read_from(&mut SMALL_DESIGN_DEF.as_bytes()).unwrap();
        assert_eq!(doc.design.as_deref(), Some("top"));
        assert_eq!(doc.dbu_per_micron, Some(2000));
        assert_eq!(doc.die_area, Some(Rect::new(0, 0, 20000, 20000)));
        assert_eq!(doc.components.len(), 3);
        assert_eq!(
            doc.components[1].placement,
            Some(Placement {
                status: PlacementStatus::Placed,
                x: 2140,
                y: 0,
                orient: Orientation::FS,
            })
        );
        assert_eq!(doc.components[2].placement, None);
        assert_eq!(doc.pins[3].direction, Some(PinDirection::Output));
        assert_eq!(doc.nets.len(), 6);
        assert_eq!(
            doc.nets[2].connections,
            vec![("u1".to_string(), "ZN".to_string()), ("u2".into(), "A".into())]
        );
    }

    #[test]
    fn build_block_resolves_masters_and_ports() {
        let db = database_with_cells();
        let doc = DefFile::read_from(&mut SMALL_DESIGN_DEF.as_bytes()).unwrap();
        let block = build_block(&db, &doc).unwrap();

        assert_eq!(block.instance_count(), 3);
        assert_eq!(block.net_count(), 6);
        let a = block.find_net("a").unwrap();
        assert_eq!(block.port("a").unwrap().net, Some(a));
        assert_eq!(block.net(a).unwrap().terms().len(), 2);
    }

    #[test]
    fn build_block_fails_on_unknown_master() {
        let db = database_with_cells();
        let doc = DefFile::read_from(&mut UNKNOWN_CELL_DEF.as_bytes()).unwrap();
        let err = build_block(&db, &doc).unwrap_err();
        assert!(matches!(
            err,
            DefError::UnresolvedMaster { ref master, .. } if master == "XOR2_X9"
        ));
    }

    #[test]
    fn build_block_fails_on_unknown_pin() {
        let db = database_with_cells();
        let text = "DESIGN t ;\nCOMPONENTS 1 ;\n- u1 INV_X1 ;\nEND COMPONENTS\nNETS 1 ;\n- n ( u1 Q ) ;\nEND NETS\nEND DESIGN\n";
        let doc = DefFile::read_from(&mut text.as_bytes()).unwrap();
        assert!(matches!(
            build_block(&db, &doc),
            Err(DefError::UnknownPin { .. })
        ));
    }

    #[test]
    fn coordinates_are_scaled_to_technology_units() {
        let db = database_with_cells();
        let text = "DESIGN t ;\nUNITS DISTANCE MICRONS 1000 ;\nCOMPONENTS 1 ;\n- u1 INV_X1 + FIXED ( 100 50 ) N ;\nEND COMPONENTS\nEND DESIGN\n";
        let doc = DefFile::read_from(&mut text.as_bytes()).unwrap();
        let block = build_block(&db, &doc).unwrap();
        let inst = block.instance(block.find_instance("u1").unwrap()).unwrap();
        let p = inst.placement.unwrap();
        assert_eq!((p.x, p.y, p.status), (200, 100, PlacementStatus::Fixed));
    }

    #[test]
    fn missing_design_statement_is_rejected() {
        let result = DefFile::read_from(&mut "VERSION 5.8 ;\n".as_bytes());
        assert!(matches!(result, Err(DefError::MissingDesign)));
    }

    #[test]
    fn written_def_reads_back_to_the_same_connectivity() {
        let db = database_with_cells();
        let doc = DefFile::read_from(&mut SMALL_DESIGN_DEF.as_bytes()).unwrap();
        let block = build_block(&db, &doc).unwrap();

        let mut out = Vec::new();
        DefFile::write_to(DesignView { db: &db, block: &block }, &(), &mut out).unwrap();
        let reread = DefFile::read_from(&mut out.as_slice()).unwrap();
        let rebuilt = build_block(&db, &reread).unwrap();

        assert_eq!(rebuilt.instance_count(), block.instance_count());
        assert_eq!(rebuilt.net_count(), block.net_count());
        assert_eq!(rebuilt.die_area, block.die_area);
        let u2 = rebuilt.instance(rebuilt.find_instance("u2").unwrap()).unwrap();
        assert_eq!(u2.placement.unwrap().orient, Orientation::FS);
    }
}
