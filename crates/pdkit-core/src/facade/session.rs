use super::bindings::EngineBindings;
use super::commands::{CommandHost, command_tables};
use super::config::FacadeConfig;
use super::error::{Failure, StartupError};
use crate::core::io::DesignView;
use crate::core::io::def::{DefError, DefFile, build_block};
use crate::core::io::lef::{LefError, LefFile, LefReader};
use crate::core::io::snapshot;
use crate::core::io::traits::{FormatReader, FormatWriter};
use crate::core::io::verilog::{VerilogFile, VerilogWriteOptions};
use crate::core::models::database::{Database, DatabaseError};
use crate::core::models::ids::{ChipId, LibraryId};
use crate::engine::error::{LinkError, OptimizeError, TimingError};
use crate::engine::lifecycle::{LifecycleEvent, LifecycleReporter};
use crate::engine::optimizer::{AreaReport, FanoutViolation, OptimizationEngine};
use crate::engine::staging::NetlistStaging;
use crate::engine::timing::{TimingEngine, TimingView};
use crate::resources::cwd;
use crate::resources::locator;
use crate::resources::lut::LookupTables;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info, instrument, warn};

static LIVE: AtomicBool = AtomicBool::new(false);

/// Proof that this facade is the only live one. Releasing it lets the next facade start.
#[derive(Debug)]
struct InstanceToken(());

impl InstanceToken {
    fn acquire() -> Result<Self, StartupError> {
        LIVE.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InstanceToken(()))
            .map_err(|_| StartupError::AlreadyInitialized)
    }
}

impl Drop for InstanceToken {
    fn drop(&mut self) {
        LIVE.store(false, Ordering::Release);
    }
}

/// Whether a facade is currently live in this process.
pub fn is_live() -> bool {
    LIVE.load(Ordering::Acquire)
}

/// Which parts of a LEF file to commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LefMode {
    TechOnly,
    LibraryOnly,
    #[default]
    TechAndLibrary,
}

pub struct FacadeBuilder {
    invocation_path: String,
    config: FacadeConfig,
    reporter: LifecycleReporter,
}

impl FacadeBuilder {
    pub fn config(mut self, config: FacadeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn reporter(mut self, reporter: LifecycleReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Starts the facade: engines first, then the command tables, then the lookup tables.
    ///
    /// # Arguments
    ///
    /// * `host` - The script host that receives the command tables.
    ///
    /// # Errors
    ///
    /// Fails if another facade is live, the configuration is unusable or the lookup tables
    /// cannot be found and read. Engines created before the failure are released again.
    #[instrument(skip_all, name = "facade_init", fields(invocation = %self.invocation_path))]
    pub fn try_init(self, host: &mut dyn CommandHost) -> Result<Facade, StartupError> {
        let token = InstanceToken::acquire()?;
        self.config.validate()?;
        let reporter = Arc::new(self.reporter);
        let engines = EngineBindings::new(self.config.max_fanout, &reporter);
        for table in command_tables() {
            host.register_table(table);
        }
        let resources = locator::locate_and_load(
            &self.invocation_path,
            &self.config.resource_folder,
            &self.config.lookup_tables,
        )?;
        info!("Facade ready");
        Ok(Facade {
            engines,
            config: self.config,
            resources,
            reporter,
            last_failure: None,
            _token: token,
        })
    }

    /// Like [`FacadeBuilder::try_init`], but a startup failure terminates the process.
    pub fn init(self, host: &mut dyn CommandHost) -> Facade {
        match self.try_init(host) {
            Ok(facade) => facade,
            Err(e) => {
                error!("Startup failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

/// The owner of the chip database and every engine bound to it.
///
/// At most one facade is live per process. Every operation that changes the structure of the
/// database marks the timing view stale and rebuilds it before returning, so timing queries
/// made between operations always see the current design. Load and save operations never
/// return errors: they report failure with an empty result and keep the reason in
/// [`Facade::last_failure`].
pub struct Facade {
    engines: EngineBindings,
    config: FacadeConfig,
    resources: LookupTables,
    reporter: Arc<LifecycleReporter>,
    last_failure: Option<Failure>,
    _token: InstanceToken,
}

impl Facade {
    /// Starts configuring a facade for a program invoked as `invocation_path`.
    ///
    /// The invocation path anchors the search for the resource folder, so it should be the
    /// path the program was started as rather than the working directory.
    pub fn builder(invocation_path: impl Into<String>) -> FacadeBuilder {
        FacadeBuilder {
            invocation_path: invocation_path.into(),
            config: FacadeConfig::default(),
            reporter: LifecycleReporter::default(),
        }
    }

    /// Shorthand for [`Facade::builder`] with `config`, then [`FacadeBuilder::try_init`].
    ///
    /// # Arguments
    ///
    /// * `invocation_path` - The path the program was started as, usually `argv[0]`.
    /// * `host` - The script host that receives the command tables.
    /// * `config` - Startup configuration.
    ///
    /// # Errors
    ///
    /// See [`FacadeBuilder::try_init`].
    pub fn try_init(
        invocation_path: impl Into<String>,
        host: &mut dyn CommandHost,
        config: FacadeConfig,
    ) -> Result<Facade, StartupError> {
        Self::builder(invocation_path).config(config).try_init(host)
    }

    pub fn init(
        invocation_path: impl Into<String>,
        host: &mut dyn CommandHost,
        config: FacadeConfig,
    ) -> Facade {
        Self::builder(invocation_path).config(config).init(host)
    }

    /// Releases the engines, staging first and the database last.
    pub fn shutdown(self) {
        info!("Shutting down");
        drop(self);
    }

    pub fn database(&self) -> &Database {
        &self.engines.database
    }

    pub fn timing(&self) -> &TimingEngine {
        &self.engines.timing
    }

    pub fn timing_view(&self) -> Result<&TimingView, TimingError> {
        self.engines.timing.view(&self.engines.database)
    }

    pub fn optimizer(&self) -> &OptimizationEngine {
        &self.engines.optimizer
    }

    pub fn fanout_violations(
        &self,
        limit: Option<usize>,
    ) -> Result<Vec<FanoutViolation>, OptimizeError> {
        let e = &self.engines;
        e.optimizer.fanout_violations(&e.timing, &e.database, limit)
    }

    pub fn design_area(&self) -> Result<AreaReport, OptimizeError> {
        let e = &self.engines;
        e.optimizer.design_area(&e.timing, &e.database)
    }

    pub fn staging(&self) -> &NetlistStaging {
        &self.engines.staging
    }

    pub fn lookup_tables(&self) -> &LookupTables {
        &self.resources
    }

    pub fn config(&self) -> &FacadeConfig {
        &self.config
    }

    /// Why the most recent load, save or link operation failed, if it did.
    pub fn last_failure(&self) -> Option<&Failure> {
        self.last_failure.as_ref()
    }

    /// Loads a LEF file.
    ///
    /// If the technology is committed but the library then fails, the technology stays and the
    /// timing view is not refreshed.
    ///
    /// # Arguments
    ///
    /// * `path` - The LEF file, resolved against the current working directory.
    /// * `lib_name` - Name given to the new library (and to the technology).
    /// * `mode` - Which parts of the file to commit.
    ///
    /// # Return
    ///
    /// Returns the library handle, or `None` on failure and always for [`LefMode::TechOnly`].
    /// A failure is recorded in [`Facade::last_failure`]: a second technology, a missing
    /// technology or an already loaded chip is [`FailureKind::InvalidState`], anything else
    /// is [`FailureKind::MalformedInput`].
    ///
    /// [`FailureKind::InvalidState`]: super::error::FailureKind::InvalidState
    /// [`FailureKind::MalformedInput`]: super::error::FailureKind::MalformedInput
    pub fn load_library_and_technology(
        &mut self,
        path: impl AsRef<Path>,
        lib_name: &str,
        mode: LefMode,
    ) -> Option<LibraryId> {
        let result = self.try_load_library_and_technology(path.as_ref(), lib_name, mode);
        self.settle(result).flatten()
    }

    fn try_load_library_and_technology(
        &mut self,
        path: &Path,
        lib_name: &str,
        mode: LefMode,
    ) -> Result<Option<LibraryId>, Failure> {
        let doc = {
            let _cwd = cwd::shared();
            LefFile::read_from_path(path).map_err(|e| lef_failure(path, e))?
        };
        let mut reader = LefReader::new(&mut self.engines.database);
        let library = match mode {
            LefMode::TechOnly => {
                reader
                    .create_technology(lib_name, &doc)
                    .map_err(|e| lef_failure(path, e))?;
                return Ok(None);
            }
            LefMode::LibraryOnly => reader.create_library(lib_name, &doc),
            LefMode::TechAndLibrary => reader.create_technology_and_library(lib_name, &doc),
        }
        .map_err(|e| lef_failure(path, e))?;
        self.commit_mutation();
        Ok(Some(library))
    }

    /// Loads a DEF file as the chip. Nothing is committed unless every reference resolves.
    ///
    /// # Arguments
    ///
    /// * `path` - The DEF file, resolved against the current working directory.
    ///
    /// # Return
    ///
    /// Returns the new chip, or `None` if a chip is already loaded ([`FailureKind::InvalidState`])
    /// or the file does not parse or names unknown masters ([`FailureKind::MalformedInput`]).
    ///
    /// [`FailureKind::InvalidState`]: super::error::FailureKind::InvalidState
    /// [`FailureKind::MalformedInput`]: super::error::FailureKind::MalformedInput
    pub fn load_physical_design(&mut self, path: impl AsRef<Path>) -> Option<ChipId> {
        let result = self.try_load_physical_design(path.as_ref());
        self.settle(result)
    }

    fn try_load_physical_design(&mut self, path: &Path) -> Result<ChipId, Failure> {
        let db = &mut *self.engines.database;
        if let Some(block) = db.block() {
            return Err(Failure::invalid_state(format!(
                "A chip is already loaded ({})",
                block.name
            )));
        }
        let doc = {
            let _cwd = cwd::shared();
            DefFile::read_from_path(path).map_err(|e| def_failure(path, e))?
        };
        let block = build_block(db, &doc).map_err(|e| def_failure(path, e))?;
        let chip = db
            .create_chip(block)
            .map_err(|e| Failure::invalid_state(e.to_string()))?;
        self.commit_mutation();
        Ok(chip)
    }

    /// Writes the block as DEF.
    ///
    /// # Arguments
    ///
    /// * `path` - The output file, created or truncated.
    ///
    /// # Return
    ///
    /// Returns `false` if there is no block or the file cannot be written.
    pub fn save_physical_design(&mut self, path: impl AsRef<Path>) -> bool {
        let result = self.try_save_physical_design(path.as_ref());
        self.settle(result).is_some()
    }

    fn try_save_physical_design(&self, path: &Path) -> Result<(), Failure> {
        let view = self.design_view()?;
        let _cwd = cwd::shared();
        DefFile::write_to_path(view, &(), path).map_err(|e| def_failure(path, e))?;
        info!("Wrote DEF {}", path.display());
        Ok(())
    }

    /// Writes a binary image of the whole database.
    ///
    /// # Arguments
    ///
    /// * `path` - The output file, created or truncated.
    ///
    /// # Return
    ///
    /// Returns `false` if the image cannot be encoded or written.
    pub fn save_snapshot(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let result = {
            let _cwd = cwd::shared();
            snapshot::save_snapshot(&self.engines.database, path)
                .map_err(|e| Failure::malformed(format!("{}: {}", path.display(), e)))
        };
        self.settle(result).is_some()
    }

    /// Replaces the whole database with a snapshot image and rebuilds the timing view.
    ///
    /// # Arguments
    ///
    /// * `path` - An image written by [`Facade::save_snapshot`].
    ///
    /// # Return
    ///
    /// Returns `false`, leaving the database untouched, if the file is not a valid image.
    pub fn restore_snapshot(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let image = {
            let _cwd = cwd::shared();
            snapshot::load_snapshot(path)
                .map_err(|e| Failure::malformed(format!("{}: {}", path.display(), e)))
        };
        let Some(image) = self.settle(image) else {
            return false;
        };
        self.engines.database.replace_with(image);
        self.commit_mutation();
        info!("Restored database from {}", path.display());
        true
    }

    /// Parses a structural Verilog file into staging. A redefined module replaces the old one.
    ///
    /// # Arguments
    ///
    /// * `path` - The Verilog file, resolved against the current working directory.
    ///
    /// # Return
    ///
    /// Returns `false`, staging nothing from the file, if it does not parse or uses an
    /// unsupported construct.
    pub fn load_netlist(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let doc = {
            let _cwd = cwd::shared();
            VerilogFile::read_from_path(path)
                .map_err(|e| Failure::malformed(format!("{}: {}", path.display(), e)))
        };
        let Some(doc) = self.settle(doc) else {
            return false;
        };
        let staged = self.engines.staging.stage(doc);
        info!("Staged {} module(s) from {}", staged, path.display());
        true
    }

    /// Flattens the staged module `top` into a new chip and empties staging.
    ///
    /// On failure staging and the database are left as they were.
    ///
    /// # Arguments
    ///
    /// * `top` - Name of a staged module to use as the top of the hierarchy.
    ///
    /// # Return
    ///
    /// Returns the new chip, or `None`. An unstaged `top` or an already loaded chip is
    /// [`FailureKind::InvalidState`]; unresolved cells, unknown pins, width mismatches and
    /// undeclared nets are [`FailureKind::MalformedInput`].
    ///
    /// [`FailureKind::InvalidState`]: super::error::FailureKind::InvalidState
    /// [`FailureKind::MalformedInput`]: super::error::FailureKind::MalformedInput
    pub fn link_netlist_into_design(&mut self, top: &str) -> Option<ChipId> {
        let result = self.try_link(top);
        self.settle(result)
    }

    fn try_link(&mut self, top: &str) -> Result<ChipId, Failure> {
        let e = &mut self.engines;
        if !e.staging.contains(top) {
            return Err(Failure::invalid_state(format!(
                "Module '{}' is not staged",
                top
            )));
        }
        if let Some(block) = e.database.block() {
            return Err(Failure::invalid_state(format!(
                "A chip is already loaded ({})",
                block.name
            )));
        }
        let block = e.staging.link(&e.database, top).map_err(link_failure)?;
        let chip = e
            .database
            .create_chip(block)
            .map_err(|err| Failure::invalid_state(err.to_string()))?;
        e.staging.clear();
        self.commit_mutation();
        Ok(chip)
    }

    /// Writes the block as structural Verilog.
    ///
    /// # Arguments
    ///
    /// * `path` - The output file, created or truncated.
    /// * `sort` - Order ports, nets, instances and pins by name so that repeated exports of the
    ///   same design are byte-identical.
    ///
    /// # Return
    ///
    /// Returns `false` if there is no design or the file cannot be written.
    pub fn export_netlist(&mut self, path: impl AsRef<Path>, sort: bool) -> bool {
        let result = self.try_export_netlist(path.as_ref(), sort);
        self.settle(result).is_some()
    }

    fn try_export_netlist(&self, path: &Path, sort: bool) -> Result<(), Failure> {
        let view = self.design_view()?;
        let _cwd = cwd::shared();
        VerilogFile::write_to_path(view, &VerilogWriteOptions { sort }, path)
            .map_err(|e| Failure::malformed(format!("{}: {}", path.display(), e)))?;
        info!("Wrote Verilog {}", path.display());
        Ok(())
    }

    fn design_view(&self) -> Result<DesignView<'_>, Failure> {
        let db = &*self.engines.database;
        let block = db
            .block()
            .ok_or_else(|| Failure::invalid_state("No design is loaded"))?;
        Ok(DesignView { db, block })
    }

    /// Marks the timing view stale and rebuilds it against the current database.
    fn commit_mutation(&mut self) {
        let e = &mut self.engines;
        if let Some(revision) = e.timing.state().revision() {
            e.timing.invalidate();
            self.reporter
                .report(LifecycleEvent::Invalidated { revision });
        }
        e.timing.refresh(&e.database);
        self.reporter.report(LifecycleEvent::Refreshed {
            revision: e.database.revision(),
        });
    }

    fn settle<T>(&mut self, result: Result<T, Failure>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_failure = None;
                Some(value)
            }
            Err(failure) => {
                warn!("{}", failure);
                self.last_failure = Some(failure);
                None
            }
        }
    }
}

impl Drop for Facade {
    fn drop(&mut self) {
        info!("Releasing engines");
    }
}

fn lef_failure(path: &Path, e: LefError) -> Failure {
    let message = format!("{}: {}", path.display(), e);
    match e {
        LefError::Database(
            DatabaseError::TechnologyExists(_)
            | DatabaseError::NoTechnology
            | DatabaseError::ChipExists(_),
        ) => Failure::invalid_state(message),
        _ => Failure::malformed(message),
    }
}

fn def_failure(path: &Path, e: DefError) -> Failure {
    Failure::malformed(format!("{}: {}", path.display(), e))
}

fn link_failure(e: LinkError) -> Failure {
    match e {
        LinkError::UnknownTop(_) => Failure::invalid_state(e.to_string()),
        _ => Failure::malformed(e.to_string()),
    }
}
