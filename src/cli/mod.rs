//! Admin CLI (SPEC_FULL.md §2, component 12): a `clap` surface exposing the
//! six logical RPCs from spec.md §6.1 as subcommands. This is a stand-in
//! transport for manual testing and administration, not the production RPC
//! server (out of scope per spec.md §1), mirroring how the teacher's binary
//! drives its repository layer directly rather than through a network API.

mod commands;

pub use commands::{is_verbose, run, Cli};
