//! Main entry point for CLI command to run a query against the tutorial catalogue.

fn main() -> anyhow::Result<()> {
    tutorial_graph::main()
}
