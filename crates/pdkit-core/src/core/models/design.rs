use super::ids::{InstanceId, MasterId, NetId};
use super::library::PinDirection;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DesignError {
    #[error("Duplicate instance name: {0}")]
    DuplicateInstance(String),
    #[error("Duplicate net name: {0}")]
    DuplicateNet(String),
    #[error("Duplicate port name: {0}")]
    DuplicatePort(String),
    #[error("Unknown port: {0}")]
    UnknownPort(String),
    #[error("Pin {pin} of instance {instance} is already connected to net {net}")]
    PinAlreadyConnected {
        instance: String,
        pin: String,
        net: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
}

impl Rect {
    pub fn new(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn area(&self) -> i64 {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    N,
    S,
    E,
    W,
    FN,
    FS,
    FE,
    FW,
}

impl FromStr for Orientation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "N" | "R0" => Orientation::N,
            "S" | "R180" => Orientation::S,
            "E" | "R270" => Orientation::E,
            "W" | "R90" => Orientation::W,
            "FN" | "MY" => Orientation::FN,
            "FS" | "MX" => Orientation::FS,
            "FE" | "MX90" => Orientation::FE,
            "FW" | "MY90" => Orientation::FW,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Orientation::N => "N",
            Orientation::S => "S",
            Orientation::E => "E",
            Orientation::W => "W",
            Orientation::FN => "FN",
            Orientation::FS => "FS",
            Orientation::FE => "FE",
            Orientation::FW => "FW",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlacementStatus {
    Placed,
    Fixed,
    Cover,
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementStatus::Placed => write!(f, "PLACED"),
            PlacementStatus::Fixed => write!(f, "FIXED"),
            PlacementStatus::Cover => write!(f, "COVER"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub status: PlacementStatus,
    pub x: i64,
    pub y: i64,
    pub orient: Orientation,
}

/// A top-level terminal of the block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub direction: PinDirection,
    pub net: Option<NetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: String,
    pub master: MasterId,
    pub placement: Option<Placement>,
    connections: IndexMap<String, NetId>,
}

impl Instance {
    /// Net attached to the named master pin, if any.
    pub fn net_of(&self, pin: &str) -> Option<NetId> {
        self.connections.get(pin).copied()
    }

    pub fn connections(&self) -> impl Iterator<Item = (&str, NetId)> {
        self.connections.iter().map(|(p, n)| (p.as_str(), *n))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetTerm {
    Instance { instance: InstanceId, pin: String },
    Port(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    terms: Vec<NetTerm>,
}

impl Net {
    pub fn terms(&self) -> &[NetTerm] {
        &self.terms
    }
}

/// The physical-design netlist of a chip: ports, placed instances and their nets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub name: String,
    pub die_area: Option<Rect>,
    ports: IndexMap<String, Port>,
    instances: SlotMap<InstanceId, Instance>,
    instance_names: IndexMap<String, InstanceId>,
    nets: SlotMap<NetId, Net>,
    net_names: IndexMap<String, NetId>,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            die_area: None,
            ports: IndexMap::new(),
            instances: SlotMap::with_key(),
            instance_names: IndexMap::new(),
            nets: SlotMap::with_key(),
            net_names: IndexMap::new(),
        }
    }

    pub fn add_port(
        &mut self,
        name: impl Into<String>,
        direction: PinDirection,
    ) -> Result<(), DesignError> {
        let name = name.into();
        if self.ports.contains_key(&name) {
            return Err(DesignError::DuplicatePort(name));
        }
        self.ports.insert(
            name.clone(),
            Port {
                name,
                direction,
                net: None,
            },
        );
        Ok(())
    }

    pub fn add_instance(
        &mut self,
        name: impl Into<String>,
        master: MasterId,
        placement: Option<Placement>,
    ) -> Result<InstanceId, DesignError> {
        let name = name.into();
        if self.instance_names.contains_key(&name) {
            return Err(DesignError::DuplicateInstance(name));
        }
        let id = self.instances.insert(Instance {
            name: name.clone(),
            master,
            placement,
            connections: IndexMap::new(),
        });
        self.instance_names.insert(name, id);
        Ok(id)
    }

    pub fn add_net(&mut self, name: impl Into<String>) -> Result<NetId, DesignError> {
        let name = name.into();
        if self.net_names.contains_key(&name) {
            return Err(DesignError::DuplicateNet(name));
        }
        let id = self.nets.insert(Net {
            name: name.clone(),
            terms: Vec::new(),
        });
        self.net_names.insert(name, id);
        Ok(id)
    }

    /// Returns the named net, creating it if it does not exist yet.
    pub fn net_or_insert(&mut self, name: &str) -> NetId {
        match self.net_names.get(name) {
            Some(id) => *id,
            None => {
                let id = self.nets.insert(Net {
                    name: name.to_string(),
                    terms: Vec::new(),
                });
                self.net_names.insert(name.to_string(), id);
                id
            }
        }
    }

    /// Attaches an instance pin to a net. A pin may be attached to at most one net.
    pub fn connect_instance(
        &mut self,
        net: NetId,
        instance: InstanceId,
        pin: &str,
    ) -> Result<(), DesignError> {
        let inst = &mut self.instances[instance];
        if let Some(existing) = inst.connections.get(pin) {
            if *existing == net {
                return Ok(());
            }
            return Err(DesignError::PinAlreadyConnected {
                instance: inst.name.clone(),
                pin: pin.to_string(),
                net: self.nets[*existing].name.clone(),
            });
        }
        inst.connections.insert(pin.to_string(), net);
        self.nets[net].terms.push(NetTerm::Instance {
            instance,
            pin: pin.to_string(),
        });
        Ok(())
    }

    pub fn connect_port(&mut self, net: NetId, port: &str) -> Result<(), DesignError> {
        let entry = self
            .ports
            .get_mut(port)
            .ok_or_else(|| DesignError::UnknownPort(port.to_string()))?;
        if entry.net == Some(net) {
            return Ok(());
        }
        entry.net = Some(net);
        self.nets[net].terms.push(NetTerm::Port(port.to_string()));
        Ok(())
    }

    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.get(name)
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.values()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id)
    }

    pub fn find_instance(&self, name: &str) -> Option<InstanceId> {
        self.instance_names.get(name).copied()
    }

    /// Instances in creation order.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceId, &Instance)> {
        self.instance_names
            .values()
            .map(move |id| (*id, &self.instances[*id]))
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(id)
    }

    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.net_names.get(name).copied()
    }

    /// Nets in creation order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.net_names
            .values()
            .map(move |id| (*id, &self.nets[*id]))
    }

    pub fn net_count(&self) -> usize {
        self.nets.len()
    }
}

/// The top of the physical design hierarchy. A database holds at most one chip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chip {
    pub block: Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connecting_a_pin_twice_to_different_nets_is_rejected() {
        let mut block = Block::new("top");
        let inst = block.add_instance("u1", MasterId::default(), None).unwrap();
        let a = block.add_net("a").unwrap();
        let b = block.add_net("b").unwrap();

        block.connect_instance(a, inst, "A").unwrap();
        block.connect_instance(a, inst, "A").unwrap();
        let err = block.connect_instance(b, inst, "A").unwrap_err();

        assert_eq!(
            err,
            DesignError::PinAlreadyConnected {
                instance: "u1".into(),
                pin: "A".into(),
                net: "a".into(),
            }
        );
        assert_eq!(block.net(a).unwrap().terms().len(), 1);
    }

    #[test]
    fn iteration_follows_creation_order() {
        let mut block = Block::new("top");
        for name in ["z", "a", "m"] {
            block.add_net(name).unwrap();
        }
        let names: Vec<_> = block.nets().map(|(_, n)| n.name.as_str()).collect();
        assert_eq!(names, ["z", "a", "m"]);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut block = Block::new("top");
        block.add_port("clk", PinDirection::Input).unwrap();
        assert_eq!(
            block.add_port("clk", PinDirection::Input),
            Err(DesignError::DuplicatePort("clk".into()))
        );
        block.add_net("n").unwrap();
        assert_eq!(block.add_net("n"), Err(DesignError::DuplicateNet("n".into())));
        assert_eq!(block.net_or_insert("n"), block.find_net("n").unwrap());
    }

    #[test]
    fn connecting_unknown_port_fails() {
        let mut block = Block::new("top");
        let n = block.add_net("n").unwrap();
        assert_eq!(
            block.connect_port(n, "missing"),
            Err(DesignError::UnknownPort("missing".into()))
        );
    }

    #[test]
    fn rect_normalizes_corners() {
        let r = Rect::new(10, 20, 0, 0);
        assert_eq!((r.x0, r.y0, r.x1, r.y1), (0, 0, 10, 20));
        assert_eq!(r.area(), 200);
    }
}
