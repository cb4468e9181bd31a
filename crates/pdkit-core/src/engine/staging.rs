//! Netlist staging and the hierarchical linker.
//!
//! Parsed modules wait here until a top module is linked. Linking flattens the hierarchy under
//! the top module into a single block whose leaf instances are library masters.

use super::error::LinkError;
use crate::core::io::verilog::{NetExpr, VerilogDocument, VerilogModule};
use crate::core::models::database::Database;
use crate::core::models::design::Block;
use crate::core::utils::identifiers::{bit_name, hierarchical_name};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct NetlistStaging {
    modules: IndexMap<String, VerilogModule>,
}

impl NetlistStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the modules of `doc`; a module with an already staged name replaces the earlier one.
    /// Returns the number of modules staged.
    pub fn stage(&mut self, doc: VerilogDocument) -> usize {
        let count = doc.modules.len();
        for module in doc.modules {
            if self.modules.contains_key(&module.name) {
                debug!("Module '{}' redefined; replacing staged copy", module.name);
            }
            self.modules.insert(module.name.clone(), module);
        }
        count
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn module(&self, name: &str) -> Option<&VerilogModule> {
        self.modules.get(name)
    }

    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Drops every staged module.
    pub fn clear(&mut self) {
        self.modules.clear();
    }

    /// Flattens `top` into a block. The staging area and the database are left untouched.
    ///
    /// Instances of staged modules are expanded recursively and named by their `/`-joined
    /// path; every other cell must be a library master. Pins tied to a constant stay open.
    ///
    /// # Arguments
    ///
    /// * `db` - The database whose libraries resolve leaf cells.
    /// * `top` - Name of the staged module at the top of the hierarchy.
    ///
    /// # Return
    ///
    /// Returns the flat block, with one port and one net per bit of `top`'s ports.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::UnknownTop`] if `top` is not staged, and another [`LinkError`]
    /// for an unresolved cell, an unknown pin, a recursive hierarchy, a width mismatch, an
    /// undeclared net or an out-of-range bit.
    pub fn link(&self, db: &Database, top: &str) -> Result<Block, LinkError> {
        let module = self
            .modules
            .get(top)
            .ok_or_else(|| LinkError::UnknownTop(top.to_string()))?;

        let mut block = Block::new(top);
        for (bit, direction) in module.port_bits() {
            block.add_port(bit.clone(), direction)?;
            let net = block.net_or_insert(&bit);
            block.connect_port(net, &bit)?;
        }

        let mut linker = Linker {
            staging: self,
            db,
            block,
            stack: vec![top.to_string()],
        };
        linker.expand(module, "", &HashMap::new())?;
        let block = linker.block;
        info!(
            "Linked '{}': {} instances, {} nets",
            top,
            block.instance_count(),
            block.net_count()
        );
        Ok(block)
    }
}

/// Where a local signal bit of a module instance lands in the flat block.
/// `None` marks a bit tied to a constant, which has no net.
type Bindings = HashMap<String, Option<String>>;

struct Linker<'a> {
    staging: &'a NetlistStaging,
    db: &'a Database,
    block: Block,
    stack: Vec<String>,
}

impl Linker<'_> {
    fn expand(
        &mut self,
        module: &VerilogModule,
        prefix: &str,
        bindings: &Bindings,
    ) -> Result<(), LinkError> {
        let staging = self.staging;
        let resolve = |bit: &str| -> Option<String> {
            match bindings.get(bit) {
                Some(bound) => bound.clone(),
                None => Some(hierarchical_name(prefix, bit)),
            }
        };

        for (wire, range) in &module.wires {
            let bits = match range {
                None => vec![wire.clone()],
                Some(r) => r.indices().into_iter().map(|i| bit_name(wire, i)).collect(),
            };
            for bit in bits {
                if let Some(net) = resolve(&bit) {
                    self.block.net_or_insert(&net);
                }
            }
        }

        for inst in &module.instances {
            let path = hierarchical_name(prefix, &inst.name);

            if let Some(child) = staging.modules.get(&inst.cell) {
                if self.stack.contains(&child.name) {
                    return Err(LinkError::RecursiveHierarchy(child.name.clone()));
                }
                let mut child_bindings = Bindings::new();
                for (formal, actual) in &inst.connections {
                    let port = child.port(formal).ok_or_else(|| LinkError::UnknownPin {
                        instance: path.clone(),
                        cell: inst.cell.clone(),
                        pin: formal.clone(),
                    })?;
                    let Some(expr) = actual else { continue };
                    let formal_bits = match port.range {
                        None => vec![port.name.clone()],
                        Some(r) => r.indices().into_iter().map(|i| bit_name(formal, i)).collect(),
                    };
                    let actual_bits = actual_bits(module, expr, formal_bits.len())
                        .map_err(|e| e.at(&path, formal))?;
                    for (f, a) in formal_bits.into_iter().zip(actual_bits) {
                        child_bindings.insert(f, a.and_then(|bit| resolve(&bit)));
                    }
                }
                self.stack.push(child.name.clone());
                self.expand(child, &path, &child_bindings)?;
                self.stack.pop();
                continue;
            }

            let master_id =
                self.db
                    .find_master(&inst.cell)
                    .ok_or_else(|| LinkError::UnresolvedCell {
                        instance: path.clone(),
                        cell: inst.cell.clone(),
                    })?;
            let master = self
                .db
                .master(master_id)
                .ok_or_else(|| LinkError::UnresolvedCell {
                    instance: path.clone(),
                    cell: inst.cell.clone(),
                })?;
            for (formal, _) in &inst.connections {
                if master.pin(formal).is_none() {
                    return Err(LinkError::UnknownPin {
                        instance: path.clone(),
                        cell: inst.cell.clone(),
                        pin: formal.clone(),
                    });
                }
            }

            let inst_id = self.block.add_instance(path.clone(), master_id, None)?;
            for (formal, actual) in &inst.connections {
                let Some(expr) = actual else { continue };
                let bits = actual_bits(module, expr, 1).map_err(|e| e.at(&path, formal))?;
                if let Some(net_name) = bits[0].as_deref().and_then(resolve) {
                    let net = self.block.net_or_insert(&net_name);
                    self.block.connect_instance(net, inst_id, formal)?;
                }
            }
        }
        Ok(())
    }
}

/// A failure while resolving one connection, before the instance and pin are known.
#[derive(Debug)]
enum BitsError {
    Width { expected: usize, found: usize },
    Link(LinkError),
}

impl BitsError {
    fn at(self, instance: &str, pin: &str) -> LinkError {
        match self {
            BitsError::Width { expected, found } => LinkError::WidthMismatch {
                instance: instance.to_string(),
                pin: pin.to_string(),
                expected,
                found,
            },
            BitsError::Link(e) => e,
        }
    }
}

impl From<LinkError> for BitsError {
    fn from(e: LinkError) -> Self {
        BitsError::Link(e)
    }
}

/// Local bit names an expression refers to, most significant first. Constant bits are `None`.
/// The result always has `formal_width` entries.
fn actual_bits(
    module: &VerilogModule,
    expr: &NetExpr,
    formal_width: usize,
) -> Result<Vec<Option<String>>, BitsError> {
    if let NetExpr::Constant { width, .. } = expr {
        let found = width.unwrap_or(formal_width);
        if found != formal_width {
            return Err(BitsError::Width {
                expected: formal_width,
                found,
            });
        }
        return Ok(vec![None; formal_width]);
    }
    let bits = signal_bits(module, expr)?;
    if bits.len() != formal_width {
        return Err(BitsError::Width {
            expected: formal_width,
            found: bits.len(),
        });
    }
    Ok(bits)
}

fn signal_bits(module: &VerilogModule, expr: &NetExpr) -> Result<Vec<Option<String>>, LinkError> {
    let undeclared = |net: &str| LinkError::UndeclaredNet {
        module: module.name.clone(),
        net: net.to_string(),
    };
    match expr {
        NetExpr::Whole(name) => match module.declared_range(name) {
            None => Err(undeclared(name)),
            Some(None) => Ok(vec![Some(name.clone())]),
            Some(Some(range)) => Ok(range
                .indices()
                .into_iter()
                .map(|i| Some(bit_name(name, i)))
                .collect()),
        },
        NetExpr::Bit(name, index) => match module.declared_range(name) {
            None => Err(undeclared(name)),
            Some(Some(range)) if range.contains(*index) => Ok(vec![Some(bit_name(name, *index))]),
            Some(_) => Err(LinkError::BitOutOfRange {
                module: module.name.clone(),
                net: name.clone(),
                index: *index,
            }),
        },
        NetExpr::Slice(name, slice) => match module.declared_range(name) {
            None => Err(undeclared(name)),
            Some(Some(range)) if range.contains(slice.msb) && range.contains(slice.lsb) => Ok(slice
                .indices()
                .into_iter()
                .map(|i| Some(bit_name(name, i)))
                .collect()),
            Some(_) => Err(LinkError::BitOutOfRange {
                module: module.name.clone(),
                net: name.clone(),
                index: slice.msb,
            }),
        },
        NetExpr::Constant { .. } => Ok(Vec::new()),
    }
}
