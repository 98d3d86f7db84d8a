//! base64url encode/decode commands.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use passkey_core::encoding;

/// Encode text or a file's contents.
pub fn encode(text: Option<String>, file: Option<PathBuf>) -> Result<()> {
    let bytes = match file {
        Some(path) => std::fs::read(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?,
        None => text.unwrap_or_default().into_bytes(),
    };
    println!("{}", encoding::encode(&bytes));
    Ok(())
}

/// Decode a value to stdout or a file.
pub fn decode(value: &str, output: Option<PathBuf>) -> Result<()> {
    let bytes = encoding::decode(value.trim()).context("Invalid base64url input")?;

    match output {
        Some(path) => std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write to stdout")?;
            stdout.flush().context("Failed to write to stdout")?;
        }
    }
    Ok(())
}
