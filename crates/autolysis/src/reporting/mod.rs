//! Report assembly.
//!
//! Generated files are written to the work directory and then moved next to
//! the input dataset, so each dataset folder ends up holding its own
//! `README.md` and charts.
//!
//! # Example
//!
//! ```rust,ignore
//! use autolysis::reporting::ReportAssembler;
//!
//! let files = ReportAssembler::outputs(&artifacts);
//! let moved = ReportAssembler::relocate(&files, Path::new("data/sales"))?;
//! ```

mod assembler;

pub use assembler::ReportAssembler;
