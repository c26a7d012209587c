//! Fisherman CLI binary.
//!
//! Wires the chain RPC client (C1), event store (C2), Indexer (C3) and Fisherman scheduler (C5)
//! together behind a layered config and a `clap` CLI, following the same entrypoint shape as
//! the teacher's `sh-msp-backend` binary: parse CLI, load/merge config, initialize tracing,
//! build the long-running services, run until interrupted.

mod command;
mod config;
mod error;
mod logging;

fn main() -> anyhow::Result<()> {
    command::run()
}
