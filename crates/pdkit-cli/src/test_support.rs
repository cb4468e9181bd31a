//! Fixtures shared by the CLI tests.

use std::fs;
use std::path::PathBuf;

pub(crate) const CELLS_LEF: &str = "\
UNITS
  DATABASE MICRONS 1000 ;
END UNITS
SITE core
  SIZE 0.2 BY 1.4 ;
END core
MACRO INV_X1
  SIZE 0.4 BY 1.4 ;
  SITE core ;
  PIN A
    DIRECTION INPUT ;
  END A
  PIN ZN
    DIRECTION OUTPUT ;
  END ZN
END INV_X1
END LIBRARY
";

pub(crate) const CHAIN_VERILOG: &str = "\
module chain (a, y);
  input a;
  output y;
  wire n1;
  INV_X1 u1 (.A(a), .ZN(n1));
  INV_X1 u2 (.A(n1), .ZN(y));
endmodule
";

/// `<root>/bin/pdkit` with both lookup tables under `<root>/resources`.
pub(crate) struct InstallTree {
    pub(crate) root: tempfile::TempDir,
}

impl InstallTree {
    pub(crate) fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let resources = root.path().join("resources");
        fs::create_dir_all(&resources).unwrap();
        fs::write(resources.join("POWV9.dat"), "d=2\n0 1\n").unwrap();
        fs::write(resources.join("POST9.dat"), "d=2\n0 1 2\n").unwrap();
        fs::create_dir_all(root.path().join("bin")).unwrap();
        Self { root }
    }

    pub(crate) fn invocation(&self) -> String {
        self.root
            .path()
            .join("bin/pdkit")
            .to_string_lossy()
            .into_owned()
    }

    pub(crate) fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }
}
