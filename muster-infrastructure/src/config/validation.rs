use anyhow::{anyhow, Result};

pub fn validate_base_url(value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("remote_base_url is empty"));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(anyhow!("remote_base_url must start with http:// or https://"));
    }
    Ok(())
}

pub fn require_positive(field: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(anyhow!("{} must be greater than 0", field));
    }
    Ok(())
}
