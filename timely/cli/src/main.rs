use anyhow::Result;

fn main() -> Result<()> {
    timely_cli::cli_main(std::env::args().collect())
}
