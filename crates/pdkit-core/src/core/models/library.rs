use super::ids::{LibraryId, MasterId};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinDirection {
    Input,
    Output,
    Inout,
    Feedthru,
}

impl PinDirection {
    /// Whether a pin with this direction loads the net it is connected to.
    pub fn is_load(self) -> bool {
        matches!(self, PinDirection::Input | PinDirection::Inout)
    }

    /// Whether a pin with this direction can drive the net it is connected to.
    pub fn is_driver(self) -> bool {
        matches!(self, PinDirection::Output | PinDirection::Inout)
    }
}

impl FromStr for PinDirection {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "INPUT" => Ok(PinDirection::Input),
            "OUTPUT" => Ok(PinDirection::Output),
            "INOUT" => Ok(PinDirection::Inout),
            "FEEDTHRU" => Ok(PinDirection::Feedthru),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PinDirection::Input => "INPUT",
            PinDirection::Output => "OUTPUT",
            PinDirection::Inout => "INOUT",
            PinDirection::Feedthru => "FEEDTHRU",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinUse {
    #[default]
    Signal,
    Clock,
    Power,
    Ground,
    Analog,
    Scan,
    Tieoff,
    Reset,
}

impl FromStr for PinUse {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "SIGNAL" => Ok(PinUse::Signal),
            "CLOCK" => Ok(PinUse::Clock),
            "POWER" => Ok(PinUse::Power),
            "GROUND" => Ok(PinUse::Ground),
            "ANALOG" => Ok(PinUse::Analog),
            "SCAN" => Ok(PinUse::Scan),
            "TIEOFF" => Ok(PinUse::Tieoff),
            "RESET" => Ok(PinUse::Reset),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterPin {
    pub name: String,
    pub direction: PinDirection,
    pub pin_use: PinUse,
}

/// A reusable cell definition ("macro") owned by a library.
///
/// Dimensions are stored in database units of the technology the library was built against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Master {
    pub name: String,
    pub library: LibraryId,
    pub class: Option<String>,
    pub width: i64,
    pub height: i64,
    pub site: Option<String>,
    pub pins: Vec<MasterPin>,
}

impl Master {
    pub fn pin(&self, name: &str) -> Option<&MasterPin> {
        self.pins.iter().find(|p| p.name == name)
    }

    /// A master with a clock pin launches new timing paths instead of propagating them.
    pub fn is_sequential(&self) -> bool {
        self.pins.iter().any(|p| p.pin_use == PinUse::Clock)
    }

    /// Power and ground pins never carry signal connectivity.
    pub fn signal_pins(&self) -> impl Iterator<Item = &MasterPin> {
        self.pins
            .iter()
            .filter(|p| !matches!(p.pin_use, PinUse::Power | PinUse::Ground))
    }

    pub fn area(&self) -> i64 {
        self.width * self.height
    }
}

/// A named collection of masters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub name: String,
    pub dbu_per_micron: u32,
    masters: IndexMap<String, MasterId>,
}

impl Library {
    pub fn new(name: impl Into<String>, dbu_per_micron: u32) -> Self {
        Self {
            name: name.into(),
            dbu_per_micron,
            masters: IndexMap::new(),
        }
    }

    pub fn master_id(&self, name: &str) -> Option<MasterId> {
        self.masters.get(name).copied()
    }

    pub fn master_ids(&self) -> impl Iterator<Item = MasterId> + '_ {
        self.masters.values().copied()
    }

    pub fn master_count(&self) -> usize {
        self.masters.len()
    }

    pub(crate) fn register_master(&mut self, name: String, id: MasterId) {
        self.masters.insert(name, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(name: &str, direction: PinDirection, pin_use: PinUse) -> MasterPin {
        MasterPin {
            name: name.into(),
            direction,
            pin_use,
        }
    }

    #[test]
    fn master_with_clock_pin_is_sequential() {
        let dff = Master {
            name: "DFF_X1".into(),
            library: LibraryId::default(),
            class: Some("CORE".into()),
            width: 10,
            height: 20,
            site: None,
            pins: vec![
                pin("D", PinDirection::Input, PinUse::Signal),
                pin("CK", PinDirection::Input, PinUse::Clock),
                pin("Q", PinDirection::Output, PinUse::Signal),
                pin("VDD", PinDirection::Inout, PinUse::Power),
            ],
        };
        assert!(dff.is_sequential());
        assert_eq!(dff.area(), 200);
        assert_eq!(dff.signal_pins().count(), 3);
        assert_eq!(dff.pin("Q").map(|p| p.direction), Some(PinDirection::Output));
    }

    #[test]
    fn inout_pins_both_drive_and_load() {
        assert!(PinDirection::Inout.is_driver());
        assert!(PinDirection::Inout.is_load());
        assert!(!PinDirection::Output.is_load());
        assert_eq!("output".parse::<PinDirection>(), Ok(PinDirection::Output));
        assert!("sideways".parse::<PinDirection>().is_err());
    }
}
