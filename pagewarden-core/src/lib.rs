pub mod crawl;
pub mod report;

use colored::Colorize;

pub use crawl::{CrawlOptions, CrawlRun, crawl, execute_crawl};
pub use report::{CommonIssue, ReportFormat, SiteCrawlReport, aggregate, load_report, save_report};

pub fn print_banner() {
    let banner = r#"
                                              _
  _ __   __ _  __ _  _____      ____ _ _ __ __| | ___ _ __
 | '_ \ / _` |/ _` |/ _ \ \ /\ / / _` | '__/ _` |/ _ \ '_ \
 | |_) | (_| | (_| |  __/\ V  V / (_| | | | (_| |  __/ | | |
 | .__/ \__,_|\__, |\___| \_/\_/ \__,_|_|  \__,_|\___|_| |_|
 |_|          |___/
"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        "site crawl and page audit".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
