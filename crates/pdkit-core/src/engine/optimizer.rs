use super::error::OptimizeError;
use super::timing::TimingEngine;
use crate::core::models::database::Database;
use tracing::debug;

pub const DEFAULT_MAX_FANOUT: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FanoutViolation {
    pub net: String,
    pub fanout: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaReport {
    pub design: String,
    pub instance_count: usize,
    /// Sum of master areas, in square database units.
    pub cell_area: i64,
    pub cell_area_um2: f64,
    /// Fraction of the die covered by cells, if the die area is known.
    pub utilization: Option<f64>,
}

/// Gate-level optimization reports. The engine only reads a fresh timing view and the database.
#[derive(Debug, Clone)]
pub struct OptimizationEngine {
    max_fanout: usize,
}

impl Default for OptimizationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FANOUT)
    }
}

impl OptimizationEngine {
    pub fn new(max_fanout: usize) -> Self {
        Self { max_fanout }
    }

    pub fn max_fanout(&self) -> usize {
        self.max_fanout
    }

    pub fn set_max_fanout(&mut self, max_fanout: usize) {
        self.max_fanout = max_fanout;
    }

    /// Nets whose fanout exceeds `limit` (or the configured maximum), worst first.
    ///
    /// # Arguments
    ///
    /// * `timing` - The timing engine whose view supplies per-net fanout.
    /// * `db` - The database the view must be fresh against.
    /// * `limit` - Overrides the configured maximum fanout for this report.
    ///
    /// # Return
    ///
    /// Returns the violations ordered by descending fanout, ties broken by net name.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Timing`] if the view is stale or unbound, and
    /// [`OptimizeError::NoDesign`] if no chip is loaded.
    pub fn fanout_violations(
        &self,
        timing: &TimingEngine,
        db: &Database,
        limit: Option<usize>,
    ) -> Result<Vec<FanoutViolation>, OptimizeError> {
        let view = timing.view(db)?;
        if view.design().is_none() {
            return Err(OptimizeError::NoDesign);
        }
        let limit = limit.unwrap_or(self.max_fanout);
        let mut violations: Vec<_> = view
            .nets()
            .filter(|(_, t)| t.fanout > limit)
            .map(|(net, t)| FanoutViolation {
                net: net.to_string(),
                fanout: t.fanout,
                limit,
            })
            .collect();
        violations.sort_by(|a, b| b.fanout.cmp(&a.fanout).then_with(|| a.net.cmp(&b.net)));
        debug!("{} net(s) exceed fanout {}", violations.len(), limit);
        Ok(violations)
    }

    /// Total cell area of the loaded design and its utilization of the die area.
    ///
    /// # Errors
    ///
    /// Returns [`OptimizeError::Timing`] if the view is stale or unbound, and
    /// [`OptimizeError::NoDesign`] if no chip is loaded.
    pub fn design_area(
        &self,
        timing: &TimingEngine,
        db: &Database,
    ) -> Result<AreaReport, OptimizeError> {
        timing.view(db)?;
        let block = db.block().ok_or(OptimizeError::NoDesign)?;
        let cell_area: i64 = block
            .instances()
            .filter_map(|(_, inst)| db.master(inst.master))
            .map(|m| m.area())
            .sum();
        let dbu = db.technology().map_or(1.0, |t| f64::from(t.dbu_per_micron));
        let utilization = block
            .die_area
            .map(|r| r.area())
            .filter(|a| *a > 0)
            .map(|a| cell_area as f64 / a as f64);
        Ok(AreaReport {
            design: block.name.clone(),
            instance_count: block.instance_count(),
            cell_area,
            cell_area_um2: cell_area as f64 / (dbu * dbu),
            utilization,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::def::{DefFile, build_block};
    use crate::core::io::lef::{LefFile, LefReader};
    use crate::core::io::traits::FormatReader;
    use crate::engine::error::TimingError;
    use crate::test_support::{SMALL_DESIGN_DEF, TECH_AND_CELLS};

    fn bound_design() -> (Database, TimingEngine) {
        let mut db = Database::new();
        let lef = LefFile::read_from(&mut TECH_AND_CELLS.as_bytes()).unwrap();
        LefReader::new(&mut db)
            .create_technology_and_library("cells", &lef)
            .unwrap();
        let def = DefFile::read_from(&mut SMALL_DESIGN_DEF.as_bytes()).unwrap();
        let block = build_block(&db, &def).unwrap();
        db.create_chip(block).unwrap();
        let mut timing = TimingEngine::new();
        timing.bind(&db);
        (db, timing)
    }

    #[test]
    fn fanout_limit_selects_violating_nets() {
        let (db, timing) = bound_design();
        let optimizer = OptimizationEngine::default();
        assert!(optimizer.fanout_violations(&timing, &db, None).unwrap().is_empty());
        let violations = optimizer.fanout_violations(&timing, &db, Some(0)).unwrap();
        assert_eq!(violations.len(), 6);
        assert!(violations.iter().all(|v| v.fanout == 1 && v.limit == 0));
        assert_eq!(violations[0].net, "a");
    }

    #[test]
    fn design_area_sums_master_areas() {
        let (db, timing) = bound_design();
        let report = OptimizationEngine::default()
            .design_area(&timing, &db)
            .unwrap();
        // INV 760x2800, NAND 1140x2800, DFF 6460x2800 at 2000 dbu per micron.
        assert_eq!(report.cell_area, (760 + 1140 + 6460) * 2800);
        assert_eq!(report.instance_count, 3);
        assert!((report.cell_area_um2 - 5.852).abs() < 1e-9);
        let expected = report.cell_area as f64 / (20000.0 * 20000.0);
        assert_eq!(report.utilization, Some(expected));
    }

    #[test]
    fn reports_require_a_fresh_view() {
        let (db, mut timing) = bound_design();
        timing.invalidate();
        let err = OptimizationEngine::default()
            .design_area(&timing, &db)
            .unwrap_err();
        assert!(matches!(
            err,
            OptimizeError::Timing {
                source: TimingError::Stale { .. }
            }
        ));
    }

    #[test]
    fn reports_without_design_fail() {
        let db = Database::new();
        let mut timing = TimingEngine::new();
        timing.bind(&db);
        assert_eq!(
            OptimizationEngine::new(4).fanout_violations(&timing, &db, None),
            Err(OptimizeError::NoDesign)
        );
    }
}
