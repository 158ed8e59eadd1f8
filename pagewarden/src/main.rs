use pagewarden::command_argument_builder;
use pagewarden::handlers::{handle_crawl, handle_report, init_logging};
use pagewarden_core::print_banner;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let quiet = chosen_command.get_flag("quiet");

    // Show banner unless --quiet flag is set
    if !quiet {
        print_banner();
    }

    if chosen_command.subcommand().is_none() {
        return;
    }

    init_logging(chosen_command.get_flag("verbose"));

    match chosen_command.subcommand() {
        Some(("crawl", primary_command)) => handle_crawl(primary_command, quiet).await,
        Some(("report", primary_command)) => handle_report(primary_command),
        _ => unreachable!("clap should ensure we don't get here"),
    }
}
