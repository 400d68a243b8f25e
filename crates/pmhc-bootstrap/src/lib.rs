//! pmhc-bootstrap — provisions the pMHC modelling toolchain in a working directory.
//!
//! The bootstrap is an ordered list of named steps run against a shared
//! [`BootstrapContext`]:
//! 1. Collect the MODELLER license key
//! 2. Pick the package-manager front-end (mamba, else conda)
//! 3. Make sure conda is usable from this process
//! 4. Create the environment from its spec file unless it exists
//! 5. Activate it for every later install
//! 6. Clone PANDORA and install it editable
//! 7. Re-apply the spec file to catch drift
//! 8. Fetch PANDORA's template data
//! 9. Download and extract the AFfine archive
//! 10. Reconcile the local PANDORA overrides
//! 11. Clone ProteinMPNN
//! 12. Clone Pep2Vec, pull its LFS payload, verify the model asset
//! 13. Print usage guidance
//!
//! Every step that touches the filesystem is guarded, so a rerun only repeats
//! the installs. The first failing step stops the run; nothing is rolled back.

pub mod archive;
pub mod context;
pub mod digest;
pub mod download;
pub mod frontend;
pub mod git;
pub mod license;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod steps;

pub use context::BootstrapContext;
pub use download::{Downloader, HttpDownloader};
pub use license::{KeyPrompt, TerminalPrompt};
pub use pipeline::{Bootstrap, BootstrapReport, StepFailure, StepRecord};
pub use runner::{CommandOutput, CommandRunner, CommandSpec, SystemRunner};
pub use steps::{Step, StepOutcome};
