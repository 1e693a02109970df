use anyhow::bail;
use regex::Regex;
use serde::Serialize;

use crate::clipboard::{clipboards_with_content, Clipboard};
use crate::distance::levenshtein;
use crate::ignore;
use crate::invocation::Ctx;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub clipboard: String,
    pub entry: usize,
    pub score: u64,
    pub preview: String,
}

/// Score one piece of content against one query. Exact match beats a
/// full regex match beats a regex sub-match beats a fuzzy match.
pub fn content_match_rating(content: &str, query: &str, regex: &Regex) -> Option<(u64, String)> {
    if content == query {
        return Some((1000, format!("\x1b[1m{content}\x1b[0m")));
    }

    if let Some(m) = regex.find(content) {
        if m.start() == 0 && m.end() == content.len() {
            return Some((800, format!("\x1b[1m{content}\x1b[0m")));
        }
        let preview = format!(
            "{}\x1b[1m{}\x1b[0m{}",
            &content[..m.start()],
            m.as_str(),
            &content[m.end()..]
        );
        return Some((600, preview));
    }

    if content.len() < 1000 {
        let distance = levenshtein(content, query) as u64;
        if distance < 100 {
            return Some((400_u64.saturating_sub(distance), format!("\x1b[1m{content}\x1b[0m")));
        }
    }

    None
}

fn search_board(board: &mut Clipboard, queries: &[(String, Regex)]) -> anyhow::Result<Vec<SearchResult>> {
    let mut results = Vec::new();
    for position in 0..board.total_entries() {
        board.set_entry(position)?;
        let candidates: Vec<String> = if board.holds_raw_data() {
            vec![std::fs::read_to_string(board.raw_data_path()).unwrap_or_default()]
        } else {
            board
                .entry_files()
                .iter()
                .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
                .collect()
        };
        for candidate in &candidates {
            for (query, regex) in queries {
                if let Some((score, preview)) = content_match_rating(candidate, query, regex) {
                    results.push(SearchResult {
                        clipboard: board.name().to_string(),
                        entry: position,
                        score,
                        preview,
                    });
                }
            }
        }
    }
    Ok(results)
}

fn gather(ctx: &mut Ctx) -> anyhow::Result<Vec<SearchResult>> {
    if ctx.items.is_empty() {
        bail!(
            "You need to enter something to search for. Try entering a search term after the action, like \"{} search Foobar\".",
            ctx.invocation
        );
    }

    let queries: Vec<(String, Regex)> = ctx
        .item_strings()
        .into_iter()
        .map(|q| ignore::validate_pattern(&q).map(|r| (q, r)))
        .collect::<anyhow::Result<_>>()?;

    let mut results = Vec::new();
    if ctx.flags.all {
        for board in clipboards_with_content(&ctx.paths) {
            let mut board = board;
            results.extend(search_board(&mut board, &queries)?);
        }
    } else {
        let mut board = Clipboard::open(&ctx.paths, ctx.board.name(), 0)?;
        results.extend(search_board(&mut board, &queries)?);
    }

    results.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(results)
}

/// Fuzzy search across entries (all clipboards with `--all`).
pub async fn run(ctx: &mut Ctx) -> anyhow::Result<()> {
    let results = gather(ctx)?;
    ctx.stop_indicator().await;
    for r in &results {
        println!(
            "clipboard {} entry {} score {} preview {}",
            r.clipboard, r.entry, r.score, r.preview
        );
    }
    ctx.skip_summary = true;
    Ok(())
}

/// Pipe-mode search emits JSON, previews stripped of highlighting.
pub fn json(ctx: &mut Ctx) -> anyhow::Result<()> {
    let mut results = gather(ctx)?;
    for r in &mut results {
        r.preview = r.preview.replace("\x1b[1m", "").replace("\x1b[0m", "");
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    ctx.skip_summary = true;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(content: &str, query: &str) -> Option<(u64, String)> {
        let regex = Regex::new(query).unwrap();
        content_match_rating(content, query, &regex)
    }

    #[test]
    fn exact_match_scores_1000() {
        assert_eq!(rate("hello", "hello").unwrap().0, 1000);
    }

    #[test]
    fn full_regex_match_scores_800() {
        assert_eq!(rate("hello", "h.llo").unwrap().0, 800);
    }

    #[test]
    fn sub_match_scores_600_and_highlights() {
        let (score, preview) = rate("say hello there", "hello").unwrap();
        assert_eq!(score, 600);
        assert!(preview.contains("\x1b[1mhello\x1b[0m"));
        assert!(preview.starts_with("say "));
    }

    #[test]
    fn fuzzy_tier_subtracts_distance() {
        let (score, _) = rate("hxllo", "hbllo").unwrap();
        // distance 1 between content and query
        assert_eq!(score, 399);
    }

    #[test]
    fn distant_content_does_not_match() {
        let long: String = "z".repeat(200);
        assert!(rate(&long, "abc").is_none());
    }
}
