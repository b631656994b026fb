use anyhow::Result;

/// Print the effective configuration, defaults filled in.
pub fn show(path: Option<&str>) -> Result<()> {
    let config = super::load_config(path)?;
    print!("{}", config.resolved().to_toml_string()?);
    Ok(())
}
