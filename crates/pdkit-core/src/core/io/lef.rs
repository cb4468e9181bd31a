//! Cell-library (LEF) reader.
//!
//! Parsing produces a [`LefDocument`] holding dimensions in microns. [`LefReader`] then
//! commits the technology and/or library part of a document into a [`Database`], converting
//! to database units.

use super::lexer::{SyntaxError, TokenStream};
use super::traits::FormatReader;
use crate::core::models::database::{Database, DatabaseError, MasterSpec};
use crate::core::models::ids::LibraryId;
use crate::core::models::library::{MasterPin, PinDirection, PinUse};
use crate::core::models::technology::{
    DEFAULT_DBU_PER_MICRON, Layer, LayerKind, RoutingDirection, Site, Technology,
};
use std::io::{self, BufRead};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum LefError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Syntax error at {0}")]
    Syntax(#[from] SyntaxError),
    #[error("Macro '{macro_name}' references unknown site '{site}'")]
    UnknownSite { macro_name: String, site: String },
    #[error("Pin '{pin}' of macro '{macro_name}' has no DIRECTION")]
    MissingPinDirection { macro_name: String, pin: String },
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LefLayer {
    pub name: String,
    pub kind: LayerKind,
    pub direction: Option<RoutingDirection>,
    pub pitch: Option<f64>,
    pub width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LefSite {
    pub name: String,
    pub class: Option<String>,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LefPin {
    pub name: String,
    pub direction: Option<PinDirection>,
    pub pin_use: PinUse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LefMacro {
    pub name: String,
    pub class: Option<String>,
    pub width: f64,
    pub height: f64,
    pub site: Option<String>,
    pub pins: Vec<LefPin>,
}

/// Parsed content of one LEF file, dimensions in microns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LefDocument {
    pub dbu_per_micron: Option<u32>,
    pub manufacturing_grid: Option<f64>,
    pub layers: Vec<LefLayer>,
    pub sites: Vec<LefSite>,
    pub macros: Vec<LefMacro>,
}

impl LefDocument {
    pub fn has_technology(&self) -> bool {
        self.dbu_per_micron.is_some()
            || self.manufacturing_grid.is_some()
            || !self.layers.is_empty()
            || !self.sites.is_empty()
    }
}

pub struct LefFile;

impl FormatReader for LefFile {
    type Document = LefDocument;
    type Error = LefError;

    fn read_from(reader: &mut impl BufRead) -> Result<LefDocument, LefError> {
        let mut tokens = TokenStream::tokenize(reader)?;
        let mut doc = LefDocument::default();

        while let Some(token) = tokens.next_token() {
            match token.text.to_ascii_uppercase().as_str() {
                "UNITS" => parse_units(&mut tokens, &mut doc)?,
                "MANUFACTURINGGRID" => {
                    doc.manufacturing_grid = Some(tokens.number("manufacturing grid")?);
                    tokens.expect(";")?;
                }
                "LAYER" => doc.layers.push(parse_layer(&mut tokens)?),
                "SITE" => doc.sites.push(parse_site(&mut tokens)?),
                "MACRO" => doc.macros.push(parse_macro(&mut tokens)?),
                "VIA" | "VIARULE" | "NONDEFAULTRULE" => {
                    let name = tokens.word("block name")?;
                    tokens.skip_block(&name)?;
                }
                "SPACING" | "PROPERTYDEFINITIONS" => tokens.skip_block(&token.text)?,
                "END" => {
                    // END LIBRARY closes the file; anything after it is ignored.
                    if tokens.peek() == Some("LIBRARY") {
                        break;
                    }
                    return Err(tokens.error("unexpected END").into());
                }
                _ => tokens.skip_statement()?,
            }
        }

        debug!(
            "Parsed LEF: {} layers, {} sites, {} macros",
            doc.layers.len(),
            doc.sites.len(),
            doc.macros.len()
        );
        Ok(doc)
    }
}

fn parse_units(tokens: &mut TokenStream, doc: &mut LefDocument) -> Result<(), LefError> {
    loop {
        match tokens.peek() {
            Some("END") => {
                tokens.next_token();
                tokens.expect("UNITS")?;
                return Ok(());
            }
            Some("DATABASE") => {
                tokens.next_token();
                tokens.expect("MICRONS")?;
                let line = tokens.line();
                let value = tokens.integer("database units")?;
                let dbu = u32::try_from(value).ok().filter(|v| *v > 0).ok_or_else(|| {
                    SyntaxError {
                        line,
                        message: format!("database units must be positive, got {}", value),
                    }
                })?;
                doc.dbu_per_micron = Some(dbu);
                tokens.expect(";")?;
            }
            Some(_) => tokens.skip_statement()?,
            None => return Err(tokens.error("missing 'END UNITS'").into()),
        }
    }
}

fn parse_layer(tokens: &mut TokenStream) -> Result<LefLayer, LefError> {
    let name = tokens.word("layer name")?;
    let mut layer = LefLayer {
        name: name.clone(),
        kind: LayerKind::Other,
        direction: None,
        pitch: None,
        width: None,
    };
    loop {
        let Some(keyword) = tokens.peek().map(str::to_ascii_uppercase) else {
            return Err(tokens.error(format!("missing 'END {}'", name)).into());
        };
        match keyword.as_str() {
            "END" => {
                tokens.next_token();
                tokens.expect(&name)?;
                return Ok(layer);
            }
            "TYPE" => {
                tokens.next_token();
                layer.kind = tokens.word("layer type")?.parse().unwrap_or(LayerKind::Other);
                tokens.expect(";")?;
            }
            "DIRECTION" => {
                tokens.next_token();
                let line = tokens.line();
                let word = tokens.word("routing direction")?;
                layer.direction = Some(word.parse().map_err(|_| SyntaxError {
                    line,
                    message: format!("invalid routing direction '{}'", word),
                })?);
                tokens.expect(";")?;
            }
            "PITCH" => {
                tokens.next_token();
                layer.pitch = Some(tokens.number("pitch")?);
                tokens.skip_statement()?;
            }
            "WIDTH" => {
                tokens.next_token();
                layer.width = Some(tokens.number("width")?);
                tokens.expect(";")?;
            }
            _ => tokens.skip_statement()?,
        }
    }
}

fn parse_site(tokens: &mut TokenStream) -> Result<LefSite, LefError> {
    let name = tokens.word("site name")?;
    let mut class = None;
    let mut size = None;
    loop {
        let Some(keyword) = tokens.peek().map(str::to_ascii_uppercase) else {
            return Err(tokens.error(format!("missing 'END {}'", name)).into());
        };
        match keyword.as_str() {
            "END" => {
                tokens.next_token();
                tokens.expect(&name)?;
                break;
            }
            "CLASS" => {
                tokens.next_token();
                class = Some(tokens.word("site class")?);
                tokens.expect(";")?;
            }
            "SIZE" => {
                tokens.next_token();
                size = Some(parse_size(tokens)?);
            }
            _ => tokens.skip_statement()?,
        }
    }
    let (width, height) =
        size.ok_or_else(|| tokens.error(format!("site '{}' has no SIZE", name)))?;
    Ok(LefSite {
        name,
        class,
        width,
        height,
    })
}

fn parse_size(tokens: &mut TokenStream) -> Result<(f64, f64), LefError> {
    let width = tokens.number("width")?;
    tokens.expect("BY")?;
    let height = tokens.number("height")?;
    tokens.expect(";")?;
    Ok((width, height))
}

fn parse_macro(tokens: &mut TokenStream) -> Result<LefMacro, LefError> {
    let name = tokens.word("macro name")?;
    let mut lef_macro = LefMacro {
        name: name.clone(),
        class: None,
        width: 0.0,
        height: 0.0,
        site: None,
        pins: Vec::new(),
    };
    loop {
        let Some(keyword) = tokens.peek().map(str::to_ascii_uppercase) else {
            return Err(tokens.error(format!("missing 'END {}'", name)).into());
        };
        match keyword.as_str() {
            "END" => {
                tokens.next_token();
                tokens.expect(&name)?;
                return Ok(lef_macro);
            }
            "CLASS" => {
                tokens.next_token();
                let words = tokens.statement()?;
                lef_macro.class = words.first().map(|t| t.text.clone());
            }
            "SIZE" => {
                tokens.next_token();
                (lef_macro.width, lef_macro.height) = parse_size(tokens)?;
            }
            "SITE" => {
                tokens.next_token();
                let words = tokens.statement()?;
                lef_macro.site = words.first().map(|t| t.text.clone());
            }
            "PIN" => {
                tokens.next_token();
                lef_macro.pins.push(parse_pin(tokens)?);
            }
            "OBS" => {
                tokens.next_token();
                skip_anonymous_block(tokens)?;
            }
            _ => tokens.skip_statement()?,
        }
    }
}

fn parse_pin(tokens: &mut TokenStream) -> Result<LefPin, LefError> {
    let name = tokens.word("pin name")?;
    let mut pin = LefPin {
        name: name.clone(),
        direction: None,
        pin_use: PinUse::Signal,
    };
    loop {
        let Some(keyword) = tokens.peek().map(str::to_ascii_uppercase) else {
            return Err(tokens.error(format!("missing 'END {}'", name)).into());
        };
        match keyword.as_str() {
            "END" => {
                tokens.next_token();
                tokens.expect(&name)?;
                return Ok(pin);
            }
            "DIRECTION" => {
                tokens.next_token();
                let line = tokens.line();
                let words = tokens.statement()?;
                let word = words.first().map(|t| t.text.as_str()).unwrap_or("");
                pin.direction = Some(word.parse().map_err(|_| SyntaxError {
                    line,
                    message: format!("invalid pin direction '{}'", word),
                })?);
            }
            "USE" => {
                tokens.next_token();
                let word = tokens.word("pin use")?;
                pin.pin_use = word.parse().unwrap_or_default();
                tokens.expect(";")?;
            }
            "PORT" => {
                tokens.next_token();
                skip_anonymous_block(tokens)?;
            }
            _ => tokens.skip_statement()?,
        }
    }
}

/// Skips a `PORT`/`OBS` body made of `;`-terminated statements closed by a bare `END`.
fn skip_anonymous_block(tokens: &mut TokenStream) -> Result<(), LefError> {
    loop {
        match tokens.peek() {
            Some(t) if t.eq_ignore_ascii_case("END") => {
                tokens.next_token();
                return Ok(());
            }
            Some(_) => tokens.skip_statement()?,
            None => return Err(tokens.error("missing 'END'").into()),
        }
    }
}

/// Commits LEF documents into a database.
///
/// Parsing and committing are separate: a [`LefDocument`] can be inspected first, then
/// committed as a technology, a library, or both.
pub struct LefReader<'db> {
    db: &'db mut Database,
}

impl<'db> LefReader<'db> {
    pub fn new(db: &'db mut Database) -> Self {
        Self { db }
    }

    /// Creates the technology described by `doc`.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the technology.
    /// * `doc` - A parsed LEF document. Without `UNITS`, [`DEFAULT_DBU_PER_MICRON`] applies.
    ///
    /// # Errors
    ///
    /// Returns [`LefError::Database`] if the database already holds a technology.
    pub fn create_technology(&mut self, name: &str, doc: &LefDocument) -> Result<(), LefError> {
        let dbu = doc.dbu_per_micron.unwrap_or(DEFAULT_DBU_PER_MICRON);
        let mut tech = Technology::new(name, dbu);
        tech.manufacturing_grid = doc.manufacturing_grid.map(|g| tech.to_dbu(g));
        for layer in &doc.layers {
            let converted = Layer {
                name: layer.name.clone(),
                kind: layer.kind,
                direction: layer.direction,
                pitch: layer.pitch.map(|p| tech.to_dbu(p)),
                width: layer.width.map(|w| tech.to_dbu(w)),
            };
            tech.add_layer(converted);
        }
        for site in &doc.sites {
            let converted = Site {
                name: site.name.clone(),
                class: site.class.clone(),
                width: tech.to_dbu(site.width),
                height: tech.to_dbu(site.height),
            };
            tech.add_site(converted);
        }
        self.db.create_technology(tech)?;
        info!(
            "Created technology '{}' ({} layers, {} sites)",
            name,
            doc.layers.len(),
            doc.sites.len()
        );
        Ok(())
    }

    /// Creates a library from the macros of `doc` against the already loaded technology.
    ///
    /// Macro dimensions are converted to database units with the technology's dbu.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the library; must be unique in the database.
    /// * `doc` - A parsed LEF document whose macros become the library's masters.
    ///
    /// # Return
    ///
    /// Returns the handle of the new library.
    ///
    /// # Errors
    ///
    /// Returns [`LefError::Database`] if there is no technology or the name is taken,
    /// [`LefError::UnknownSite`] if a macro names a site the technology lacks, and
    /// [`LefError::MissingPinDirection`] for a pin without `DIRECTION`. Nothing is committed
    /// on error.
    pub fn create_library(&mut self, name: &str, doc: &LefDocument) -> Result<LibraryId, LefError> {
        let tech = self.db.technology().ok_or(DatabaseError::NoTechnology)?;
        let mut masters = Vec::with_capacity(doc.macros.len());
        for m in &doc.macros {
            if let Some(site) = &m.site {
                if tech.site(site).is_none() {
                    return Err(LefError::UnknownSite {
                        macro_name: m.name.clone(),
                        site: site.clone(),
                    });
                }
            }
            let mut pins = Vec::with_capacity(m.pins.len());
            for p in &m.pins {
                let direction = p.direction.ok_or_else(|| LefError::MissingPinDirection {
                    macro_name: m.name.clone(),
                    pin: p.name.clone(),
                })?;
                pins.push(MasterPin {
                    name: p.name.clone(),
                    direction,
                    pin_use: p.pin_use,
                });
            }
            masters.push(MasterSpec {
                name: m.name.clone(),
                class: m.class.clone(),
                width: tech.to_dbu(m.width),
                height: tech.to_dbu(m.height),
                site: m.site.clone(),
                pins,
            });
        }
        let count = masters.len();
        let id = self.db.create_library(name, masters)?;
        info!("Created library '{}' with {} masters", name, count);
        Ok(id)
    }

    /// Creates the technology, then the library. A library failure leaves the technology in place.
    ///
    /// # Errors
    ///
    /// Returns the first error of [`LefReader::create_technology`] or
    /// [`LefReader::create_library`].
    pub fn create_technology_and_library(
        &mut self,
        name: &str,
        doc: &LefDocument,
    ) -> Result<LibraryId, LefError> {
        self.create_technology(name, doc)?;
        self.create_library(name, doc)
    }
}
