//! Shared fixtures for unit tests.

use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const TECH_AND_CELLS: &str = r#"
VERSION 5.8 ;
BUSBITCHARS "[]" ;
UNITS
  DATABASE MICRONS 2000 ;
END UNITS
MANUFACTURINGGRID 0.005 ;
LAYER metal1
  TYPE ROUTING ;
  DIRECTION HORIZONTAL ;
  PITCH 0.14 ;
  WIDTH 0.07 ;
  SPACINGTABLE PARALLELRUNLENGTH 0.0
    WIDTH 0.0 0.065 ;
END metal1
LAYER via1
  TYPE CUT ;
END via1
VIA v12 DEFAULT
  LAYER metal1 ;
    RECT -0.035 -0.035 0.035 0.035 ;
END v12
SITE core
  CLASS CORE ;
  SIZE 0.19 BY 1.4 ;
END core
MACRO INV_X1
  CLASS CORE ;
  SIZE 0.38 BY 1.4 ;
  SITE core ;
  PIN A
    DIRECTION INPUT ;
    USE SIGNAL ;
    PORT
      LAYER metal1 ;
      RECT 0.06 0.525 0.15 0.7 ;
    END
  END A
  PIN ZN
    DIRECTION OUTPUT ;
  END ZN
  OBS
    LAYER metal1 ;
    RECT 0 0 0.1 0.1 ;
  END
END INV_X1
MACRO NAND2_X1
  CLASS CORE ;
  SIZE 0.57 BY 1.4 ;
  SITE core ;
  PIN A1
    DIRECTION INPUT ;
  END A1
  PIN A2
    DIRECTION INPUT ;
  END A2
  PIN ZN
    DIRECTION OUTPUT ;
  END ZN
END NAND2_X1
MACRO DFF_X1
  CLASS CORE ;
  SIZE 3.23 BY 1.4 ;
  SITE core ;
  PIN D
    DIRECTION INPUT ;
  END D
  PIN CK
    DIRECTION INPUT ;
    USE CLOCK ;
  END CK
  PIN Q
    DIRECTION OUTPUT ;
  END Q
  PIN VDD
    DIRECTION INOUT ;
    USE POWER ;
  END VDD
END DFF_X1
END LIBRARY
"#;

/// `a`/`b` -> NAND -> INV -> flop -> `y`. The longest combinational path is two stages.
pub(crate) const SMALL_DESIGN_DEF: &str = r#"
VERSION 5.8 ;
DIVIDERCHAR "/" ;
BUSBITCHARS "[]" ;
DESIGN top ;
UNITS DISTANCE MICRONS 2000 ;
DIEAREA ( 0 0 ) ( 20000 20000 ) ;
ROW row0 core 0 0 N DO 50 BY 1 STEP 380 0 ;
COMPONENTS 3 ;
  - u1 NAND2_X1 + PLACED ( 1000 0 ) N ;
  - u2 INV_X1 + PLACED ( 2140 0 ) FS ;
  - r1 DFF_X1 + UNPLACED ;
END COMPONENTS
PINS 4 ;
  - a + NET a + DIRECTION INPUT + USE SIGNAL ;
  - b + NET b + DIRECTION INPUT ;
  - clk + NET clk + DIRECTION INPUT + USE CLOCK ;
  - y + NET y + DIRECTION OUTPUT ;
END PINS
SPECIALNETS 1 ;
  - VDD ( * VDD ) + USE POWER ;
END SPECIALNETS
NETS 6 ;
  - a ( PIN a ) ( u1 A1 ) ;
  - b ( PIN b ) ( u1 A2 ) ;
  - n1 ( u1 ZN ) ( u2 A ) + USE SIGNAL ;
  - n2 ( u2 ZN ) ( r1 D ) ;
  - clk ( PIN clk ) ( r1 CK ) ;
  - y ( r1 Q ) ( PIN y ) ;
END NETS
END DESIGN
"#;

pub(crate) const UNKNOWN_CELL_DEF: &str = r#"
DESIGN top ;
COMPONENTS 2 ;
  - u1 INV_X1 ;
  - u9 XOR2_X9 ;
END COMPONENTS
END DESIGN
"#;

/// A two-level hierarchy: `top` instantiates `inv_pair` between a NAND and a flop.
pub(crate) const HIERARCHICAL_VERILOG: &str = r#"
// two inverters in series
module inv_pair (in, out);
  input in;
  output out;
  wire mid;
  INV_X1 i0 (.A(in), .ZN(mid));
  INV_X1 i1 (.A(mid), .ZN(out));
endmodule

module top (a, b, clk, y);
  input a;
  input b;
  input clk;
  output y;
  wire n1;
  wire n2;
  NAND2_X1 u1 (.A1(a), .A2(b), .ZN(n1));
  inv_pair p (.in(n1), .out(n2));
  DFF_X1 r1 (.D(n2), .CK(clk), .Q(y));
endmodule
"#;

pub(crate) const LOOKUP_TABLE_FILES: [&str; 2] = ["POWV9.dat", "POST9.dat"];

/// Writes `content` to `dir/name`, creating `dir` if needed, and returns the file path.
pub(crate) fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Populates `dir` with both lookup-table files.
pub(crate) fn write_lookup_tables(dir: &Path) {
    write_file(dir, LOOKUP_TABLE_FILES[0], "d=2\n0 1\n1 0\n");
    write_file(dir, LOOKUP_TABLE_FILES[1], "d=2\n0 1 2\n");
}

/// Switches the working directory for a test and switches back on drop.
pub(crate) struct ScopedCwd {
    original: PathBuf,
}

impl ScopedCwd {
    pub(crate) fn enter(dir: &Path) -> Self {
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        Self { original }
    }
}

impl Drop for ScopedCwd {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// A temporary install tree: the program lives at `<root>/bin/app` and the lookup tables
/// under `<root>/resources`.
pub(crate) struct InstallTree {
    pub(crate) root: tempfile::TempDir,
}

impl InstallTree {
    pub(crate) fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        write_lookup_tables(&root.path().join("resources"));
        fs::create_dir_all(root.path().join("bin")).unwrap();
        Self { root }
    }

    pub(crate) fn invocation(&self) -> String {
        self.root.path().join("bin/app").to_string_lossy().into_owned()
    }

    /// Writes a data file into the tree root.
    pub(crate) fn write(&self, name: &str, content: &str) -> PathBuf {
        write_file(self.root.path(), name, content)
    }
}

#[derive(Default)]
pub(crate) struct RecordingHost {
    pub(crate) tables: Vec<crate::facade::commands::CommandTable>,
}

impl crate::facade::commands::CommandHost for RecordingHost {
    fn register_table(&mut self, table: crate::facade::commands::CommandTable) {
        self.tables.push(table);
    }
}
