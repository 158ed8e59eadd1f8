use clap::{ArgAction, arg, command};
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("pagewarden")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("pagewarden")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl a site from a starting URL and test every page it reaches. Writes \
                crawl_report.json and crawl_report.md to the output directory.",
                )
                .arg(
                    arg!(<URL>)
                        .help("The starting URL")
                        .value_parser(clap::value_parser!(Url)),
                )
                .arg(
                    arg!(-c --"config" <FILE>)
                        .required(false)
                        .help("JSON file with crawl settings; command-line flags override it")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-d --"depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth from the start page (default: 3)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-m --"max-pages" <COUNT>)
                        .required(false)
                        .help("Maximum number of pages to visit (default: 100)")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Output directory for reports (default: ./pagewarden_output)"),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Delay between requests in seconds (default: 0.5)")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"timeout" <MILLIS>)
                        .required(false)
                        .help("Navigation timeout in milliseconds (default: 30000)")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    arg!(-r --"routes" <ROUTE>)
                        .required(false)
                        .help("Additional route to test, e.g. /notes (can be repeated)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(--"include" <REGEX>)
                        .required(false)
                        .help("Only crawl URLs matching this pattern (can be repeated)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(--"exclude" <REGEX>)
                        .required(false)
                        .help("Skip URLs matching this pattern, on top of the defaults (can be repeated)")
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(-t --"tests" <CATEGORY>)
                        .required(false)
                        .help("Test categories to run (can be repeated, default: all)")
                        .value_parser(["all", "accessibility", "visual", "responsive"])
                        .action(ArgAction::Append),
                )
                .arg(
                    arg!(--"no-screenshots")
                        .required(false)
                        .help("Skip capturing screenshots")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"no-discover-items")
                        .required(false)
                        .help("Disable clicking through list items to find client-side views")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"allow-cross-domain")
                        .required(false)
                        .help("Follow links to other hosts")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"login-url" <URL>)
                        .required(false)
                        .help("URL of the login page (default: the starting URL)"),
                )
                .arg(
                    arg!(--"username" <USERNAME>)
                        .required(false)
                        .help("Username for authentication")
                        .requires("password"),
                )
                .arg(
                    arg!(--"password" <PASSWORD>)
                        .required(false)
                        .help("Password for authentication")
                        .requires("username"),
                )
                .arg(
                    arg!(--"username-selector" <SELECTOR>)
                        .required(false)
                        .help("CSS selector for the username field"),
                )
                .arg(
                    arg!(--"password-selector" <SELECTOR>)
                        .required(false)
                        .help("CSS selector for the password field"),
                )
                .arg(
                    arg!(--"submit-selector" <SELECTOR>)
                        .required(false)
                        .help("CSS selector for the submit button"),
                )
                .arg(
                    arg!(--"wait-for-url" <URL>)
                        .required(false)
                        .help("URL (or fragment of one) that signals a successful login"),
                )
                .arg(
                    arg!(--"wait-for-selector" <SELECTOR>)
                        .required(false)
                        .help("Element that only appears once logged in"),
                ),
        )
        .subcommand(
            command!("report")
                .about("Render a saved crawl_report.json")
                .arg(
                    arg!(<FILE>)
                        .help("Path to crawl_report.json")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown")
                        .value_parser(["text", "json", "markdown", "md"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                ),
        )
}
