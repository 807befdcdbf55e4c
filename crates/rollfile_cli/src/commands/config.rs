//! Config command implementation.

use rollfile::{Config, RotationPolicy};

/// Runs the config command.
pub fn run(config: &Config, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", render(config, format)?);
    Ok(())
}

/// Renders `config` as text or JSON.
pub fn render(config: &Config, format: &str) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        "json" => Ok(serde_json::to_string_pretty(config)?),
        "text" => Ok(render_text(config)),
        other => Err(format!("Unknown format: {other}").into()),
    }
}

fn render_text(config: &Config) -> String {
    let rotation = match config.rotation_policy {
        RotationPolicy::Never => "never".to_string(),
        RotationPolicy::Time => format!("time ({:?})", config.rotation_period),
        RotationPolicy::Size => format!("size ({} bytes)", config.rotation_size),
    };
    let retention = if config.retention_enabled() {
        format!("{} files", config.max_remain)
    } else {
        "keep all".to_string()
    };

    let mut out = String::new();
    out.push_str("=== Writer Configuration ===\n");
    out.push_str(&format!("Active file:    {}\n", rollfile::naming::active_path(config).display()));
    out.push_str(&format!("Mode:           {}\n", config.writer_mode));
    out.push_str(&format!("Rotation:       {rotation}\n"));
    out.push_str(&format!("Time tag:       {}\n", config.time_tag_format));
    out.push_str(&format!("Compress:       {}\n", config.compress));
    out.push_str(&format!("Retention:      {retention}\n"));
    out.push_str(&format!("Buffer:         {} bytes", config.buffer_threshold));
    out
}
