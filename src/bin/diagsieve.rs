use anyhow::Result;

fn main() -> Result<()> {
    diagsieve::cli::run()
}
