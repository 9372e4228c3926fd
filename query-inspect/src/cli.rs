use clap::Parser;
use std::path::PathBuf;

/// Tokenizes and parses a note query, printing the result as JSON.
#[derive(Parser)]
pub struct Cli {
    /// Grammar file to scan with instead of the bundled one.
    #[clap(long)]
    pub grammar: Option<PathBuf>,
    #[clap(long, default_value = "false")]
    /// Print each token with its text and innermost scope instead of the parse result.
    pub tokens: bool,
    #[clap(long, default_value = "false")]
    pub pretty: bool,
    /// Query words; read from stdin when empty.
    pub query: Vec<String>,
}
