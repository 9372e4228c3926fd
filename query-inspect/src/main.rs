mod cli;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::Cli;
use note_query::{ParseResult, QueryParser, Scanner, TokenAnnotation};
use query_scanner::SourceText;
use serde::Serialize;
use std::io::Read;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenView<'a> {
    text: &'a str,
    start_offset: usize,
    end_offset: usize,
    scope: &'a str,
    #[serde(flatten)]
    annotation: &'a TokenAnnotation,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let custom;
    let scanner: &Scanner = match &cli.grammar {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read grammar {}", path.display()))?;
            custom = Scanner::from_json(&json)
                .with_context(|| format!("failed to compile grammar {}", path.display()))?;
            info!(path = %path.display(), "using custom grammar");
            &custom
        }
        None => note_query::bundled_scanner(),
    };

    let text = read_query(&cli)?;
    debug!(?text, "parsing");
    let result = QueryParser::new(scanner).parse(&text);

    let output = if cli.tokens {
        to_json(&token_views(&text, &result), cli.pretty)?
    } else {
        to_json(&result, cli.pretty)?
    };
    println!("{output}");

    if !result.errors.is_empty() {
        for error in &result.errors {
            eprintln!("error: {error}");
        }
        std::process::exit(1);
    }
    Ok(())
}

fn read_query(cli: &Cli) -> Result<String> {
    if !cli.query.is_empty() {
        return Ok(cli.query.join(" "));
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("failed to read query from stdin")?;
    if text.trim().is_empty() {
        bail!("no query given");
    }
    Ok(text.trim_end_matches(['\r', '\n']).to_string())
}

fn token_views<'a>(text: &'a str, result: &'a ParseResult) -> Vec<TokenView<'a>> {
    let source = SourceText::new(text);
    result
        .tokens
        .iter()
        .zip(&result.annotations)
        .map(|(token, annotation)| TokenView {
            text: source
                .slice_utf16(token.start_offset, token.end_offset)
                .unwrap_or_default(),
            start_offset: token.start_offset,
            end_offset: token.end_offset,
            scope: token.scope(),
            annotation,
        })
        .collect()
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("failed to serialize output")
}
