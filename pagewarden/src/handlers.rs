use clap::ArgMatches;
use colored::Colorize;
use pagewarden_core::report::{ReportFormat, SiteCrawlReport, load_report, render};
use pagewarden_core::{CrawlOptions, execute_crawl};
use pagewarden_scanner::filter::sanitize_cli_route;
use pagewarden_scanner::{AuthConfig, CrawlConfig, TestCategory};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use url::Url;

/// Read a JSON crawl config. `start_url` may be omitted from the file, in
/// which case the URL given on the command line fills it in.
pub fn load_config_file(path: &Path, start_url: &str) -> Result<CrawlConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

    let mut value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config file {}: {}", path.display(), e))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| format!("Config file {} must contain a JSON object", path.display()))?;
    object.insert(
        "start_url".to_string(),
        serde_json::Value::String(start_url.to_string()),
    );

    serde_json::from_value(value)
        .map_err(|e| format!("Invalid config file {}: {}", path.display(), e))
}

/// Turn `~/reports` into an absolute path.
pub fn expand_output_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

/// Build the crawl config from the `crawl` subcommand's arguments, starting
/// from `--config` when given.
pub fn build_crawl_config(matches: &ArgMatches) -> Result<CrawlConfig, String> {
    let url = matches
        .get_one::<Url>("URL")
        .ok_or_else(|| "A starting URL is required".to_string())?;

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => load_config_file(path, url.as_str())?,
        None => CrawlConfig::new(url.as_str()),
    };

    if let Some(depth) = matches.get_one::<usize>("depth") {
        config.max_depth = *depth;
    }
    if let Some(max_pages) = matches.get_one::<usize>("max-pages") {
        config.max_pages = *max_pages;
    }
    if let Some(output) = matches.get_one::<String>("output") {
        config.output_directory = expand_output_path(output);
    } else if let Some(output) = config.output_directory.to_str() {
        config.output_directory = expand_output_path(output);
    }
    if let Some(delay) = matches.get_one::<f64>("delay") {
        if !delay.is_finite() || *delay < 0.0 {
            return Err(format!("Invalid delay: {}", delay));
        }
        config.delay_between_requests = *delay;
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        if *timeout == 0 {
            return Err("Invalid timeout: must be at least 1 millisecond".to_string());
        }
        config.timeouts.navigation_ms = *timeout;
    }

    config.additional_routes.extend(
        strings(matches, "routes")
            .iter()
            .map(|route| sanitize_cli_route(route)),
    );
    config.include_patterns.extend(strings(matches, "include"));
    config.exclude_patterns.extend(strings(matches, "exclude"));

    let categories = strings(matches, "tests");
    if !categories.is_empty() {
        config.test_categories = categories
            .iter()
            .map(|name| {
                TestCategory::from_str(name).ok_or_else(|| format!("Unknown test category: {}", name))
            })
            .collect::<Result<_, _>>()?;
    }

    if matches.get_flag("no-screenshots") {
        config.capture_screenshots = false;
    }
    if matches.get_flag("no-discover-items") {
        config.discover_items = false;
    }
    if matches.get_flag("allow-cross-domain") {
        config.same_domain_only = false;
    }

    if let (Some(username), Some(password)) = (
        matches.get_one::<String>("username"),
        matches.get_one::<String>("password"),
    ) {
        let mut auth = config
            .auth_config
            .take()
            .unwrap_or_else(|| AuthConfig::new("", ""));
        auth.username = username.clone();
        auth.password = password.clone();
        config.auth_config = Some(auth);
    }
    if let Some(auth) = config.auth_config.as_mut() {
        if let Some(login_url) = matches.get_one::<String>("login-url") {
            auth.login_url = Some(login_url.clone());
        }
        if let Some(selector) = matches.get_one::<String>("username-selector") {
            auth.username_selector = selector.clone();
        }
        if let Some(selector) = matches.get_one::<String>("password-selector") {
            auth.password_selector = selector.clone();
        }
        if let Some(selector) = matches.get_one::<String>("submit-selector") {
            auth.submit_selector = selector.clone();
        }
        if let Some(target) = matches.get_one::<String>("wait-for-url") {
            auth.wait_for_url = Some(target.clone());
        }
        if let Some(selector) = matches.get_one::<String>("wait-for-selector") {
            auth.wait_for_selector = Some(selector.clone());
        }
    }

    Ok(config)
}

pub fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn print_divider() {
    println!("{}", "═".repeat(70).bright_blue().bold());
}

fn print_rule() {
    println!("{}", "─".repeat(70).blue());
}

fn score_label(score: f64) -> colored::ColoredString {
    let label = format!("{:.0}/100", score);
    if score >= 90.0 {
        label.green().bold()
    } else if score >= 70.0 {
        label.yellow().bold()
    } else {
        label.red().bold()
    }
}

pub fn print_summary(report: &SiteCrawlReport, report_path: &Path) {
    println!();
    print_divider();
    println!("{}", "  SITE CRAWL REPORT".bright_white().bold());
    print_divider();
    println!();
    println!("  Start URL:        {}", report.start_url.bright_white());
    println!(
        "  Duration:         {:.1}s",
        report.total_duration_ms as f64 / 1000.0
    );
    println!();
    println!("  Pages Discovered: {}", report.pages_discovered);
    println!("  Pages Tested:     {}", report.pages_tested);
    println!("  Pages Skipped:    {}", report.pages_skipped);
    println!("  Pages Errored:    {}", report.pages_errored);
    if report.pages_pending > 0 {
        println!("  Pages Pending:    {}", report.pages_pending);
    }
    println!();

    print_rule();
    println!("{}", "  SCORES (Average)".bright_blue().bold());
    print_rule();
    println!("  Overall:        {}", score_label(report.average_overall_score));
    println!(
        "  Accessibility:  {}",
        score_label(report.average_accessibility_score)
    );
    println!("  Visual:         {}", score_label(report.average_visual_score));
    println!(
        "  Responsive:     {}",
        score_label(report.average_responsive_score)
    );
    println!();

    let totals = &report.severity_totals;
    print_rule();
    println!("{}", "  ISSUES".bright_blue().bold());
    print_rule();
    println!("  Critical: {}", totals.critical.to_string().red().bold());
    println!("  Serious:  {}", totals.serious.to_string().red());
    println!("  Moderate: {}", totals.moderate.to_string().yellow());
    println!("  Minor:    {}", totals.minor.to_string().cyan());
    println!();

    if !report.worst_pages.is_empty() {
        print_rule();
        println!("{}", "  WORST PAGES".bright_blue().bold());
        print_rule();
        for url in &report.worst_pages {
            if let Some(result) = report.result_for(url) {
                println!("  {} - {}", score_label(result.overall_score), url);
            }
        }
        println!();
    }

    if !report.common_issues.is_empty() {
        print_rule();
        println!("{}", "  COMMON ISSUES".bright_blue().bold());
        print_rule();
        for issue in report.common_issues.iter().take(5) {
            println!(
                "  [{}x] {}: {}",
                issue.count.to_string().cyan(),
                issue.issue_type.bright_white(),
                issue.message
            );
        }
        println!();
    }

    print_divider();
    println!();
    println!(
        "{} Report saved to: {}",
        "✓".green().bold(),
        report_path.display().to_string().bright_white()
    );
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) {
    let config = match build_crawl_config(sub_matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet {
        println!(
            "{} Crawling and testing: {}",
            "→".blue(),
            config.start_url.bright_white()
        );
        println!(
            "{} Max depth: {}, Max pages: {}",
            "→".blue(),
            config.max_depth,
            config.max_pages
        );
        println!();
    }

    let options = CrawlOptions {
        config,
        show_progress_bars: !quiet,
    };

    let run = match execute_crawl(options).await {
        Ok(run) => run,
        Err(e) => {
            eprintln!("{} Crawl failed: {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    print_summary(&run.report, &run.report_path);

    if run.report.has_critical() {
        std::process::exit(1);
    }
}

/// Render a saved report in the requested format.
pub fn render_saved_report(path: &Path, format: &str) -> Result<String, String> {
    let format =
        ReportFormat::from_str(format).ok_or_else(|| format!("Unknown report format: {}", format))?;
    let report = load_report(path).map_err(|e| format!("{:#}", e))?;
    render(&report, format).map_err(|e| format!("{:#}", e))
}

pub fn handle_report(sub_matches: &ArgMatches) {
    let Some(path) = sub_matches.get_one::<PathBuf>("FILE") else {
        eprintln!("{} A report file is required", "✗".red().bold());
        std::process::exit(1);
    };
    let format = sub_matches
        .get_one::<String>("format")
        .map(String::as_str)
        .unwrap_or("text");

    let rendered = match render_saved_report(path, format) {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    match sub_matches.get_one::<PathBuf>("output") {
        Some(output) => {
            if let Err(e) = fs::write(output, rendered) {
                eprintln!(
                    "{} Failed to write {}: {}",
                    "✗".red().bold(),
                    output.display(),
                    e
                );
                std::process::exit(1);
            }
            println!(
                "{} Report written to: {}",
                "✓".green().bold(),
                output.display().to_string().bright_white()
            );
        }
        None => print!("{}", rendered),
    }
}
