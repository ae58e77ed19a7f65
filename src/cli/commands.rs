use std::fmt::Write as _;

use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use unicode_width::UnicodeWidthStr;

use super::CliContext;
use crate::codec::{self, PageLocation};
use crate::highlight::{build_highlight_regex, mark_matches};
use crate::search::{parse_query, suggest};
use crate::selection::Selection;

const NAME_COLUMN_WIDTH: usize = 40;

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Full link or just its `?query#fragment` part
    pub url: String,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Keywords; every keyword must appear in the item name
    #[arg(required = true)]
    pub query: Vec<String>,
    /// Limit the number of suggestions printed (defaults to search.max_results)
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecentCommand {
    /// Print the ranking, highest priority first
    List,
    /// Record that an item was picked
    Record(RecordArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RecordArgs {
    /// Item code as listed in the catalog
    pub code: String,
}

#[derive(Args, Debug, Clone)]
pub struct RecentArgs {
    #[command(subcommand)]
    pub command: RecentCommand,
}

pub fn decode_link(ctx: &CliContext, args: DecodeArgs) -> Result<()> {
    print!("{}", run_decode(ctx, &args));
    Ok(())
}

fn run_decode(ctx: &CliContext, args: &DecodeArgs) -> String {
    let location = PageLocation::parse(args.url.trim());
    let restored = codec::restore(&location, &ctx.catalog);
    let mut out = format_selection(&restored.selection);
    if let Some(upgraded) = restored.upgraded {
        let _ = writeln!(&mut out, "upgraded link: {upgraded}");
    }
    out
}

fn format_selection(selection: &Selection) -> String {
    if selection.items.is_empty() {
        let mut out = "No items selected.\n".to_string();
        if let Some(ratio) = selection.active_ratio() {
            let _ = writeln!(&mut out, "ratio  {ratio} g/U");
        }
        return out;
    }
    let mut out = String::new();
    for selected in &selection.items {
        let amount = match selected.amount {
            Some(grams) => format!("{grams} g"),
            None => "-".to_string(),
        };
        let _ = writeln!(
            &mut out,
            "{}  {:>6}%  {:>8}  {:>6.1} g",
            pad_name(&selected.item.name),
            selected.item.carbs_percent,
            amount,
            selected.carbs()
        );
    }
    if let Some(ratio) = selection.active_ratio() {
        let _ = writeln!(&mut out, "ratio  {ratio} g/U");
    }
    if !selection.note.is_empty() {
        let _ = writeln!(&mut out, "note   {}", selection.note);
    }
    let _ = writeln!(&mut out, "{}", selection.totals().describe());
    out
}

pub fn search_items(ctx: &CliContext, args: SearchArgs) -> Result<()> {
    let output = run_search(ctx, &args)?;
    print!("{output}");
    Ok(())
}

fn run_search(ctx: &CliContext, args: &SearchArgs) -> Result<String> {
    let raw_query = args.query.join(" ");
    let query = parse_query(&raw_query);
    if query.is_empty() {
        bail!("search query cannot be empty");
    }
    let limit = args.limit.unwrap_or(ctx.config.search.max_results);
    let items = suggest(&ctx.catalog, &ctx.recent, &raw_query, limit);
    if items.is_empty() {
        return Ok("No matches found.\n".to_string());
    }
    let regex = build_highlight_regex(&query);
    let mut out = String::new();
    for item in items {
        let name = match &regex {
            Some(regex) => mark_matches(&item.name, regex),
            None => item.name.clone(),
        };
        let _ = writeln!(
            &mut out,
            "{:<8}{}  {:>6}%",
            item.code,
            pad_name(&name),
            item.carbs_percent
        );
    }
    Ok(out)
}

pub fn handle_recent_command(ctx: &CliContext, args: RecentArgs) -> Result<()> {
    let output = match args.command {
        RecentCommand::List => recent_list(ctx),
        RecentCommand::Record(args) => recent_record(ctx, &args)?,
    };
    print!("{output}");
    Ok(())
}

fn recent_list(ctx: &CliContext) -> String {
    let ranked = ctx.recent.snapshot();
    if ranked.is_empty() {
        return "No recent items.\n".to_string();
    }
    let mut out = String::new();
    for (code, priority) in ranked {
        let name = ctx
            .catalog
            .get(&code)
            .map(|item| item.name.as_str())
            .unwrap_or("<not in catalog>");
        let _ = writeln!(&mut out, "{priority:>7.2}  {code:<8}{name}");
    }
    out
}

fn recent_record(ctx: &CliContext, args: &RecordArgs) -> Result<String> {
    let code = args.code.trim();
    let Some(item) = ctx.catalog.get(code) else {
        bail!("unknown item code {code:?}");
    };
    ctx.recent.record_use(code);
    Ok(format!(
        "Recorded {} ({}), priority now {:.2}\n",
        code,
        item.name,
        ctx.recent.priority(code)
    ))
}

/// Pads to a fixed display width; CJK names take two columns per character.
fn pad_name(name: &str) -> String {
    let width = UnicodeWidthStr::width(name);
    let padding = NAME_COLUMN_WIDTH.saturating_sub(width);
    format!("{name}{}", " ".repeat(padding))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, ConfigPaths};
    use std::fs;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn setup_context() -> TestResult<(TempDir, CliContext)> {
        let temp = TempDir::new()?;
        let root = temp.path();
        let paths = ConfigPaths::rooted(
            root.join("config"),
            root.join("config/config.toml"),
            root.join("data"),
            root.join("state"),
        );
        paths.ensure_directories()?;
        fs::write(
            &paths.catalog_path,
            r#"{"items":[
                {"code":"R01","name":"こめ　［水稲めし］","carbs":77},
                {"code":"B01","name":"Bread","carbs":46.4},
                {"code":"B02","name":"Brown rice","carbs":35.6}
            ]}"#,
        )?;
        let ctx = CliContext::load(AppConfig::default(), paths);
        Ok((temp, ctx))
    }

    #[test]
    fn decode_prints_totals_for_scenario_link() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        let output = run_decode(
            &ctx,
            &DecodeArgs {
                url: "https://carbs.example/?is=R01*150&icr=10".into(),
            },
        );
        assert!(output.contains("Carbohydrate: 115.5g"));
        assert!(output.contains("Insulin: 11.6U"));
        assert!(!output.contains("upgraded link"));
        Ok(())
    }

    #[test]
    fn decode_of_bare_path_reports_nothing_selected() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        let output = run_decode(&ctx, &DecodeArgs { url: "/".into() });
        assert_eq!(output, "No items selected.\n");
        Ok(())
    }

    #[test]
    fn search_marks_keywords_and_ranks_recent_first() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        recent_record(&ctx, &RecordArgs { code: "B02".into() })?;

        let output = run_search(
            &ctx,
            &SearchArgs {
                query: vec!["b".into()],
                limit: None,
            },
        )?;
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("B02"));
        assert!(lines[0].contains("*B*rown rice"));
        assert!(lines[1].starts_with("B01"));
        Ok(())
    }

    #[test]
    fn search_without_matches_says_so() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        let output = run_search(
            &ctx,
            &SearchArgs {
                query: vec!["pasta".into()],
                limit: Some(5),
            },
        )?;
        assert_eq!(output, "No matches found.\n");
        Ok(())
    }

    #[test]
    fn recent_record_persists_across_contexts() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        recent_record(&ctx, &RecordArgs { code: "R01".into() })?;
        recent_record(&ctx, &RecordArgs { code: "R01".into() })?;

        let reopened = CliContext::load(AppConfig::default(), ctx.paths.clone());
        let listing = recent_list(&reopened);
        assert!(listing.contains("1.99"));
        assert!(listing.contains("R01"));
        Ok(())
    }

    #[test]
    fn recent_record_rejects_unknown_codes() -> TestResult {
        let (_temp, ctx) = setup_context()?;
        assert!(recent_record(&ctx, &RecordArgs { code: "ZZZ".into() }).is_err());
        assert_eq!(recent_list(&ctx), "No recent items.\n");
        Ok(())
    }
}
