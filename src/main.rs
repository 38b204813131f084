use anyhow::Context;

fn main() -> anyhow::Result<()> {
    backspec::run().context("backspec failed")?;
    Ok(())
}
