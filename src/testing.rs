//! Testing utilities for enrichment batches.
//!
//! - **Fixtures**: a small reference dataset, stores built from it, and a
//!   [`TableBuilder`] for input tables
//! - **Assertions**: compare encoded tables row by row with readable failure messages
//! - **Mock I/O**: reference files written to temporary paths
//!
//! ```
//! use carrier_enrich::testing::*;
//! use carrier_enrich::{enrich_table, EnrichConfig};
//!
//! let input = TableBuilder::new(["phone", "note"])
//!     .row(["13000012222", "first"])
//!     .build();
//! let out = enrich_table(&input, &sample_store(), &EnrichConfig::default()).unwrap();
//! assert_table_eq(
//!     &out.bytes,
//!     "phone,province,city,carrier\n13000012222,Beijing,Beijing,China Mobile\n",
//! );
//! ```

pub mod assertions;
pub mod fixtures;
pub mod mock_io;

pub use assertions::*;
pub use fixtures::*;
pub use mock_io::*;
