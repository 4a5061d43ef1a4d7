//! Default configuration values

use super::types::Config;

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "meridian.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "meridian.yaml";

/// Get list of config file names to search for, in priority order
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".meridian.toml",
        ".meridian.yaml",
    ]
}

/// Generate default configuration TOML
pub fn default_config_toml() -> String {
    let config = Config::default();
    toml::to_string_pretty(&config).unwrap_or_else(|_| DEFAULT_CONFIG_TEMPLATE.to_string())
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Meridian Configuration

[build]
jobs = 4
keep_going = false
progress_report_interval_secs = 15

[logging]
level = "warn"
file = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.build.jobs, 4);
    }

    #[test]
    fn test_default_config_toml_round_trips_sections() {
        let rendered = default_config_toml();
        assert!(rendered.contains("[build]"));
        assert!(rendered.contains("[logging]"));
    }
}
