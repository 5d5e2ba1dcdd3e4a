//! Doctor command - verify configuration and external requirements.

use crate::cli::Output;
use crate::config::{Settings, ENV_API_KEY, ENV_API_VERSION, ENV_BASE_URL, ENV_DEPLOYMENT, ENV_SEARCH_API_KEY};
use crate::tools::SqlDatabase;
use console::style;
use std::path::Path;
use std::process::Command;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

fn print_section(title: &str, results: &[CheckResult]) {
    println!("{}", style(title).bold());
    for result in results {
        result.print();
    }
    println!();
}

/// Run all diagnostic checks.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("agentgraph doctor");
    println!();
    println!("Checking configuration and requirements...\n");

    let mut checks = Vec::new();

    let model_checks = check_model(settings);
    print_section("Model (Azure OpenAI)", &model_checks);
    checks.extend(model_checks);

    let search_checks = vec![check_search_key(settings)];
    print_section("Web Search", &search_checks);
    checks.extend(search_checks);

    let sandbox_checks = check_sandbox(settings);
    print_section("Python Sandbox", &sandbox_checks);
    checks.extend(sandbox_checks);

    let storage_checks = check_storage(settings);
    print_section("Storage", &storage_checks);
    checks.extend(storage_checks);

    let config_checks = vec![check_config_file(config_path)];
    print_section("Configuration", &config_checks);
    checks.extend(config_checks);

    // Summary
    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before running agents.",
            errors
        ));
        std::process::exit(1);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! agentgraph is ready to use.");
    }

    Ok(())
}

/// One line per required model value, plus the endpoint format.
fn check_model(settings: &Settings) -> Vec<CheckResult> {
    let model = &settings.model;
    let hint = |var: &str| format!("Set {} in the environment or in a .env file", var);

    let mut results = Vec::new();

    results.push(match model.api_key.as_deref() {
        Some(key) if key.chars().count() > 8 => {
            let chars: Vec<char> = key.chars().collect();
            let masked = format!(
                "{}...{}",
                chars[..4].iter().collect::<String>(),
                chars[chars.len() - 4..].iter().collect::<String>()
            );
            CheckResult::ok(ENV_API_KEY, &format!("configured ({})", masked))
        }
        Some(key) if !key.trim().is_empty() => CheckResult::ok(ENV_API_KEY, "configured"),
        _ => CheckResult::error(ENV_API_KEY, "not set", &hint(ENV_API_KEY)),
    });

    for (var, value) in [
        (ENV_DEPLOYMENT, &model.deployment),
        (ENV_API_VERSION, &model.api_version),
    ] {
        results.push(match value.as_deref() {
            Some(v) if !v.trim().is_empty() => CheckResult::ok(var, v),
            _ => CheckResult::error(var, "not set", &hint(var)),
        });
    }

    results.push(match model.endpoint.as_deref() {
        Some(endpoint) if url::Url::parse(endpoint).is_ok() => CheckResult::ok(ENV_BASE_URL, endpoint),
        Some(endpoint) if !endpoint.trim().is_empty() => CheckResult::error(
            ENV_BASE_URL,
            &format!("not a valid URL: {}", endpoint),
            "Expected something like https://<resource>.openai.azure.com",
        ),
        _ => CheckResult::error(ENV_BASE_URL, "not set", &hint(ENV_BASE_URL)),
    });

    results
}

fn check_search_key(settings: &Settings) -> CheckResult {
    match settings.search.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => CheckResult::ok(ENV_SEARCH_API_KEY, "configured"),
        _ => CheckResult::warning(
            ENV_SEARCH_API_KEY,
            "not set",
            "Needed by the research and collaborate commands",
        ),
    }
}

fn check_sandbox(settings: &Settings) -> Vec<CheckResult> {
    let interpreter = &settings.sandbox.interpreter;
    let mut results = vec![check_tool(interpreter, &["--version"], install_hint_python())];

    if results[0].status == CheckStatus::Ok {
        results.push(
            match Command::new(interpreter).args(["-c", "import matplotlib"]).output() {
                Ok(output) if output.status.success() => CheckResult::ok("matplotlib", "importable"),
                _ => CheckResult::warning(
                    "matplotlib",
                    "not importable",
                    "Charts need it: pip install matplotlib",
                ),
            },
        );
    }

    let dir = settings.sandbox_dir();
    results.push(if dir.exists() {
        CheckResult::ok("Working directory", &dir.display().to_string())
    } else {
        CheckResult::warning(
            "Working directory",
            &format!("{} (will be created)", dir.display()),
            "Directory will be created on first execution",
        )
    });

    results
}

/// Check if an external tool is available.
fn check_tool(name: &str, args: &[&str], hint: &str) -> CheckResult {
    match Command::new(name).args(args).output() {
        Ok(output) if output.status.success() => {
            // Python 2 printed its version on stderr
            let raw = if output.stdout.is_empty() { &output.stderr } else { &output.stdout };
            let version = String::from_utf8_lossy(raw)
                .lines()
                .next()
                .unwrap_or("installed")
                .trim()
                .to_string();

            let version_display = if version.chars().count() > 50 {
                format!("{}...", version.chars().take(50).collect::<String>())
            } else {
                version
            };

            CheckResult::ok(name, &version_display)
        }
        Ok(_) => CheckResult::error(name, "installed but not working", hint),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => CheckResult::error(name, "not found", hint),
        Err(e) => CheckResult::error(name, &format!("error: {}", e), hint),
    }
}

fn check_storage(settings: &Settings) -> Vec<CheckResult> {
    let mut results = Vec::new();

    let data_dir = settings.data_dir();
    if data_dir.exists() {
        results.push(CheckResult::ok("Data directory", &format!("{}", data_dir.display())));
    } else {
        results.push(CheckResult::warning(
            "Data directory",
            &format!("{} (will be created)", data_dir.display()),
            "Directory will be created on first use",
        ));
    }

    let db_path = settings.sql_path();
    if db_path.exists() {
        let size = std::fs::metadata(&db_path)
            .map(|m| format_size(m.len()))
            .unwrap_or_else(|_| "unknown size".to_string());
        let tables = SqlDatabase::open(&db_path, true, 0)
            .and_then(|db| db.list_tables())
            .map(|t| format!("{} tables", t.len()))
            .unwrap_or_else(|e| format!("unreadable: {}", e));
        results.push(CheckResult::ok(
            "SQL database",
            &format!("{} ({}, {})", db_path.display(), size, tables),
        ));
    } else {
        results.push(CheckResult::warning(
            "SQL database",
            &format!("{} (not found)", db_path.display()),
            "Point sql.database_path at a SQLite file for the sql command",
        ));
    }

    results
}

/// Check if config file exists.
fn check_config_file(config_path: &Path) -> CheckResult {
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            "Create with: agentgraph config edit",
        )
    }
}

/// Format file size in human-readable format.
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Platform-specific install hint for Python.
fn install_hint_python() -> &'static str {
    if cfg!(target_os = "macos") {
        "Install with: brew install python"
    } else if cfg!(target_os = "linux") {
        "Install with: sudo apt install python3 (or your package manager)"
    } else {
        "Install from: https://www.python.org/downloads/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_result_error() {
        let result = CheckResult::error("test", "failed", "fix it");
        assert_eq!(result.status, CheckStatus::Error);
        assert_eq!(result.hint, Some("fix it".to_string()));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(500), "500 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1024 * 1024), "1.0 MB");
    }

    #[test]
    fn test_model_checks_flag_each_missing_value() {
        let results = check_model(&Settings::default());
        assert_eq!(results.len(), 4);
        assert!(results.iter().all(|r| r.status == CheckStatus::Error));
    }

    #[test]
    fn test_model_checks_mask_key_and_reject_bad_url() {
        let mut settings = Settings::default();
        settings.model.api_key = Some("abcd1234efgh5678".to_string());
        settings.model.deployment = Some("gpt-4o".to_string());
        settings.model.api_version = Some("2024-10-21".to_string());
        settings.model.endpoint = Some("not a url".to_string());

        let results = check_model(&settings);
        assert_eq!(results[0].message, "configured (abcd...5678)");
        assert_eq!(results[1].status, CheckStatus::Ok);
        assert_eq!(results[3].status, CheckStatus::Error);
    }
}
