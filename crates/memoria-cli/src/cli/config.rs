//! `memoria config`: show the effective configuration.

use std::path::Path;

use anyhow::Result;
use console::style;

use memoria_types::config::MemoriaConfig;

/// Render the effective config as TOML, ready to paste into `config.toml`.
pub fn render_toml(config: &MemoriaConfig) -> Result<String> {
    Ok(toml::to_string_pretty(config)?)
}

pub fn show_config(data_dir: &Path, config: &MemoriaConfig, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "data_dir": data_dir,
                "config": config,
            }))?
        );
        return Ok(());
    }

    println!(
        "# {} {}",
        style("data dir:").dim(),
        data_dir.join("config.toml").display()
    );
    println!();
    print!("{}", render_toml(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_toml_parses_back() {
        let config = MemoriaConfig::default();
        let rendered = render_toml(&config).unwrap();
        assert!(rendered.contains("[retrieval]"));
        let parsed: MemoriaConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
