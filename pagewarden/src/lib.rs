#[path = "commands.rs"]
pub mod commands;
#[path = "handlers.rs"]
pub mod handlers;

pub use commands::{CLAP_STYLING, command_argument_builder};
pub use handlers::{
    build_crawl_config, expand_output_path, load_config_file, print_summary, render_saved_report,
};
