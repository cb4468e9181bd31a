use super::design::{Block, Chip};
use super::ids::{ChipId, LibraryId, MasterId};
use super::library::{Library, Master};
use super::technology::Technology;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("A technology is already loaded ({0})")]
    TechnologyExists(String),
    #[error("No technology is loaded")]
    NoTechnology,
    #[error("A library named '{0}' is already loaded")]
    DuplicateLibrary(String),
    #[error("Master '{master}' is defined twice in library '{library}'")]
    DuplicateMaster { library: String, master: String },
    #[error("A chip is already loaded ({0})")]
    ChipExists(String),
}

/// A master definition waiting to be owned by a library.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterSpec {
    pub name: String,
    pub class: Option<String>,
    pub width: i64,
    pub height: i64,
    pub site: Option<String>,
    pub pins: Vec<super::library::MasterPin>,
}

/// The chip database: technology, cell libraries and the physical design.
///
/// Every structural mutation that is visible to the timing engine advances [`Database::revision`].
/// Creating the technology does not, since it carries no cells or connectivity.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Database {
    technology: Option<Technology>,
    libraries: SlotMap<LibraryId, Library>,
    masters: SlotMap<MasterId, Master>,
    chips: SlotMap<ChipId, Chip>,
    #[serde(skip)]
    revision: u64,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision += 1;
    }

    pub fn technology(&self) -> Option<&Technology> {
        self.technology.as_ref()
    }

    /// Installs the technology. Does not advance the revision.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::TechnologyExists`] if one is already installed.
    pub fn create_technology(&mut self, technology: Technology) -> Result<(), DatabaseError> {
        if let Some(existing) = &self.technology {
            return Err(DatabaseError::TechnologyExists(existing.name.clone()));
        }
        self.technology = Some(technology);
        Ok(())
    }

    /// Creates a library owning the given masters. Either every master is created or none is.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the library; must be unique.
    /// * `masters` - Master definitions with dimensions already in database units.
    ///
    /// # Return
    ///
    /// Returns the new library's handle. The revision advances.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::NoTechnology`] before a technology is installed,
    /// [`DatabaseError::DuplicateLibrary`] for a taken name, and
    /// [`DatabaseError::DuplicateMaster`] if two masters share a name.
    pub fn create_library(
        &mut self,
        name: &str,
        masters: Vec<MasterSpec>,
    ) -> Result<LibraryId, DatabaseError> {
        let dbu_per_micron = self
            .technology
            .as_ref()
            .map(|t| t.dbu_per_micron)
            .ok_or(DatabaseError::NoTechnology)?;
        if self.find_library(name).is_some() {
            return Err(DatabaseError::DuplicateLibrary(name.to_string()));
        }
        for (i, spec) in masters.iter().enumerate() {
            if masters[..i].iter().any(|m| m.name == spec.name) {
                return Err(DatabaseError::DuplicateMaster {
                    library: name.to_string(),
                    master: spec.name.clone(),
                });
            }
        }

        let lib_id = self
            .libraries
            .insert(Library::new(name.to_string(), dbu_per_micron));
        for spec in masters {
            let master_name = spec.name.clone();
            let id = self.masters.insert(Master {
                name: spec.name,
                library: lib_id,
                class: spec.class,
                width: spec.width,
                height: spec.height,
                site: spec.site,
                pins: spec.pins,
            });
            self.libraries[lib_id].register_master(master_name, id);
        }
        self.touch();
        Ok(lib_id)
    }

    pub fn library(&self, id: LibraryId) -> Option<&Library> {
        self.libraries.get(id)
    }

    pub fn find_library(&self, name: &str) -> Option<LibraryId> {
        self.libraries
            .iter()
            .find(|(_, lib)| lib.name == name)
            .map(|(id, _)| id)
    }

    pub fn libraries(&self) -> impl Iterator<Item = (LibraryId, &Library)> {
        self.libraries.iter()
    }

    pub fn master(&self, id: MasterId) -> Option<&Master> {
        self.masters.get(id)
    }

    /// Looks a master up by name across all libraries, in library load order.
    pub fn find_master(&self, name: &str) -> Option<MasterId> {
        self.libraries
            .values()
            .find_map(|lib| lib.master_id(name))
    }

    pub fn chip(&self) -> Option<(ChipId, &Chip)> {
        self.chips.iter().next()
    }

    pub fn block(&self) -> Option<&Block> {
        self.chip().map(|(_, chip)| &chip.block)
    }

    /// Makes `block` the design of the single chip. The revision advances.
    ///
    /// # Errors
    ///
    /// Returns [`DatabaseError::ChipExists`] if a chip is already loaded.
    pub fn create_chip(&mut self, block: Block) -> Result<ChipId, DatabaseError> {
        if let Some(existing) = self.block() {
            return Err(DatabaseError::ChipExists(existing.name.clone()));
        }
        let id = self.chips.insert(Chip { block });
        self.touch();
        Ok(id)
    }

    /// Replaces the whole content of the database with `image`.
    ///
    /// The revision keeps counting from its current value so that a restored image is never
    /// mistaken for the content a timing view was built from.
    pub fn replace_with(&mut self, image: Database) {
        let revision = self.revision;
        *self = image;
        self.revision = revision;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::library::{MasterPin, PinDirection, PinUse};

    fn inverter() -> MasterSpec {
        MasterSpec {
            name: "INV_X1".into(),
            class: Some("CORE".into()),
            width: 380,
            height: 2800,
            site: None,
            pins: vec![
                MasterPin {
                    name: "A".into(),
                    direction: PinDirection::Input,
                    pin_use: PinUse::Signal,
                },
                MasterPin {
                    name: "ZN".into(),
                    direction: PinDirection::Output,
                    pin_use: PinUse::Signal,
                },
            ],
        }
    }

    #[test]
    fn technology_creation_does_not_advance_revision() {
        let mut db = Database::new();
        db.create_technology(Technology::new("tech", 2000)).unwrap();
        assert_eq!(db.revision(), 0);
        assert_eq!(
            db.create_technology(Technology::new("other", 1000)),
            Err(DatabaseError::TechnologyExists("tech".into()))
        );
    }

    #[test]
    fn library_requires_technology() {
        let mut db = Database::new();
        assert_eq!(
            db.create_library("lib", vec![inverter()]),
            Err(DatabaseError::NoTechnology)
        );
        assert_eq!(db.revision(), 0);
    }

    #[test]
    fn library_creation_registers_masters_and_advances_revision() {
        let mut db = Database::new();
        db.create_technology(Technology::new("tech", 2000)).unwrap();
        let lib = db.create_library("lib", vec![inverter()]).unwrap();

        assert_eq!(db.revision(), 1);
        let master_id = db.find_master("INV_X1").unwrap();
        let master = db.master(master_id).unwrap();
        assert_eq!(master.library, lib);
        assert_eq!(db.library(lib).unwrap().dbu_per_micron, 2000);
    }

    #[test]
    fn duplicate_masters_reject_the_whole_library() {
        let mut db = Database::new();
        db.create_technology(Technology::new("tech", 2000)).unwrap();
        let result = db.create_library("lib", vec![inverter(), inverter()]);
        assert!(matches!(result, Err(DatabaseError::DuplicateMaster { .. })));
        assert!(db.find_library("lib").is_none());
        assert!(db.find_master("INV_X1").is_none());
        assert_eq!(db.revision(), 0);
    }

    #[test]
    fn find_master_prefers_earlier_libraries() {
        let mut db = Database::new();
        db.create_technology(Technology::new("tech", 2000)).unwrap();
        let first = db.create_library("a", vec![inverter()]).unwrap();
        db.create_library("b", vec![inverter()]).unwrap();
        let found = db.master(db.find_master("INV_X1").unwrap()).unwrap();
        assert_eq!(found.library, first);
    }

    #[test]
    fn only_one_chip_may_exist() {
        let mut db = Database::new();
        db.create_chip(Block::new("top")).unwrap();
        assert_eq!(
            db.create_chip(Block::new("other")),
            Err(DatabaseError::ChipExists("top".into()))
        );
        assert_eq!(db.revision(), 1);
    }

    #[test]
    fn replace_with_keeps_counting_revisions() {
        let mut db = Database::new();
        db.create_chip(Block::new("top")).unwrap();
        let before = db.revision();

        db.replace_with(Database::new());

        assert!(db.revision() > before);
        assert!(db.block().is_none());
    }
}
