use agora_core::config::AppConfig;
use clap::Subcommand;
use std::path::Path;

use super::utils::{print_error, print_info, print_success, CliError, CliResult};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a configuration file
    Validate {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Show the effective configuration, including environment overrides
    Show {
        /// Path to config file
        #[arg(short, long, default_value = "config/config.toml")]
        file: String,
    },

    /// Generate a sample configuration file
    Generate {
        /// Output path for the config file
        #[arg(short, long, default_value = "config/config.toml")]
        output: String,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config_command(command: ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Validate { file } => validate_config(&file),
        ConfigCommands::Show { file } => show_config(&file),
        ConfigCommands::Generate { output, force } => generate_config(&output, force),
    }
}

fn load(file: &str) -> CliResult<AppConfig> {
    AppConfig::from_file(file).map_err(|e| CliError::Config(e.to_string()))
}

fn validate_config(file: &str) -> CliResult<()> {
    if !Path::new(file).exists() {
        print_error(&format!("Configuration file not found: {file}"));
        return Err(CliError::Config(format!("File not found: {file}")));
    }

    print_info(&format!("Loading configuration from {file}..."));
    let config = load(file)?;

    print_info("Validating configuration...");
    config.validate().map_err(CliError::Config)?;

    print_success("Configuration is valid!");
    println!("Configuration Summary:");
    println!("  API: {}", config.api.base_url);
    println!("  Proxy: {}", config.api.proxy_base_url);
    println!("  Eviction: {:?}", config.cache.eviction);

    Ok(())
}

fn show_config(file: &str) -> CliResult<()> {
    let config = load(file)?;

    println!("Configuration from {file}:");

    println!("\n[API]");
    println!("  Base URL: {}", config.api.base_url);
    println!("  Proxy Base URL: {}", config.api.proxy_base_url);
    println!("  Timeout: {}s", config.api.timeout_seconds);

    println!("\n[HTTP]");
    println!("  Concurrent Limit: {}", config.http.concurrent_limit);
    println!("  Connect Timeout: {}s", config.http.connect_timeout_seconds);

    println!("\n[Cache]");
    println!("  Eviction: {:?}", config.cache.eviction);
    println!("  Activities: {}", config.cache.activity_capacity);
    println!("  Articles: {}", config.cache.article_capacity);
    println!("  Events: {}", config.cache.event_capacity);
    println!("  Prompts: {}", config.cache.prompt_capacity);
    println!("  Users: {}", config.cache.user_capacity);
    println!("  Notifications: {}", config.cache.notification_capacity);

    println!("\n[Session]");
    println!("  Cookie: {}", config.session.cookie_name);
    println!("  SameSite: {}", config.session.same_site.as_str());

    println!("\n[Logging]");
    println!("  Level: {}", config.logging.level);
    println!("  Format: {}", config.logging.format);

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# Agora client configuration

[api]
base_url = "https://api.earth-app.com"
proxy_base_url = "http://127.0.0.1:3000"
timeout_seconds = 30

[http]
concurrent_limit = 64
permit_timeout_ms = 5000
connect_timeout_seconds = 5

[cache]
# "fifo" evicts the oldest insertion; "lru" the least recently used entry
eviction = "fifo"
activity_capacity = 200
article_capacity = 200
event_capacity = 200
prompt_capacity = 200
user_capacity = 100
notification_capacity = 200

[session]
cookie_name = "session_token"
max_age_seconds = 1209600
secure = true
same_site = "strict"

[logging]
level = "info"
format = "pretty"
"#;

fn generate_config(output: &str, force: bool) -> CliResult<()> {
    if Path::new(output).exists() && !force {
        return Err(CliError::Config(format!(
            "File {output} already exists. Use --force to overwrite."
        )));
    }

    if let Some(parent) = Path::new(output).parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, SAMPLE_CONFIG)?;

    print_success(&format!("Sample configuration generated: {output}"));
    print_info("Set AGORA_CONFIG to use it from another directory");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        generate_config(path, false).unwrap();
        let config = load(path).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.cache.user_capacity, 100);
    }

    #[test]
    fn test_generate_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();

        let result = generate_config(path.to_str().unwrap(), false);

        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config("/nonexistent/agora.toml");
        assert!(matches!(result, Err(CliError::Config(_))));
    }
}
