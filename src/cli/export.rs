//! Aggregates day files into a pair of plain text files consumed by other tools: `<base>.input`
//! lists applications, `<base>.output` holds the matching minutes on the same lines.
//! Only days after the previous export are included.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use crate::utils::{
    dir::user_data_dir,
    time::{date_to_record_name, record_name_to_date},
};

pub const LAST_EXPORT_FILE: &str = "last_export_ts";

/// Used when nothing was exported before.
const EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();

#[derive(Args, Debug)]
pub struct ExportCommand {
    #[arg(help = "Exports to <OUTPUT_BASE>.input and <OUTPUT_BASE>.output in the data directory")]
    output_base: PathBuf,
    #[arg(long, help = "Application directory. By default uses the platform data directory")]
    dir: Option<PathBuf>,
}

pub async fn process_export_command(command: ExportCommand, today: NaiveDate) -> Result<()> {
    let dir = command.dir.map_or_else(user_data_dir, Ok)?;

    let last_export = load_last_export(&dir).await;
    println!("Loading files after: {last_export}\n");

    let data = gather_totals(&dir, last_export).await?;
    if data.is_empty() {
        println!("No data to export");
    } else {
        for (identity, seconds) in &data {
            println!("  {identity}: {seconds}s → {}min", seconds_to_minutes(*seconds));
        }
        let (input, output) = write_export(&dir, &command.output_base, &data).await?;
        println!("\nExported to:\n  {}\n  {}", input.display(), output.display());
    }

    save_last_export(&dir, today).await?;
    println!("Saved last export timestamp: {today}");
    Ok(())
}

/// Date of the previous export. Missing or unreadable markers mean everything gets exported.
pub async fn load_last_export(dir: &Path) -> NaiveDate {
    let path = dir.join(LAST_EXPORT_FILE);
    match fs::read_to_string(&path).await {
        Ok(content) => record_name_to_date(content.trim()).unwrap_or_else(|| {
            warn!("Ignoring malformed export marker {content:?}");
            EPOCH
        }),
        Err(e) => {
            debug!("No export marker at {path:?}: {e}");
            EPOCH
        }
    }
}

pub async fn save_last_export(dir: &Path, today: NaiveDate) -> Result<()> {
    let path = dir.join(LAST_EXPORT_FILE);
    fs::write(&path, date_to_record_name(today))
        .await
        .with_context(|| format!("Failed to write {path:?}"))
}

/// Sums the totals of every day file dated strictly after `after`. Files that aren't day files
/// (rules, quarantined days) are ignored, unreadable day files are skipped with a warning.
pub async fn gather_totals(dir: &Path, after: NaiveDate) -> Result<BTreeMap<String, u64>> {
    let mut day_files = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("Failed to list {dir:?}"))?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_none_or(|v| v != "json") {
            continue;
        }
        let Some(date) = path
            .file_stem()
            .and_then(|v| v.to_str())
            .and_then(record_name_to_date)
        else {
            continue;
        };
        if date > after {
            day_files.push(path);
        }
    }
    day_files.sort();

    let mut aggregated = BTreeMap::<String, u64>::new();
    for path in day_files {
        println!("Processing {}", path.file_name().unwrap_or_default().to_string_lossy());
        let parsed = fs::read(&path)
            .await
            .map_err(anyhow::Error::from)
            .and_then(|v| Ok(serde_json::from_slice::<Value>(&v)?));
        match parsed {
            Ok(Value::Object(totals)) => {
                for (identity, value) in totals {
                    if let Some(seconds) = seconds_of(&value) {
                        let total = aggregated.entry(identity.to_lowercase()).or_default();
                        *total = total.saturating_add(seconds);
                    }
                }
            }
            Ok(_) => warn!("{path:?} doesn't contain an object, skipping it"),
            Err(e) => {
                warn!("Could not read {path:?}: {e:?}");
                println!("  Warning: could not read {}: {e}", path.display());
            }
        }
    }
    Ok(aggregated)
}

/// Whole seconds from a json number. Fractions are truncated, negative values ignored.
fn seconds_of(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.is_finite() && *v >= 0.)
            .map(|v| v.trunc() as u64)
    })
}

/// Minutes rounded to nearest, ties to even.
pub fn seconds_to_minutes(seconds: u64) -> u64 {
    (seconds as f64 / 60.).round_ties_even() as u64
}

pub async fn write_export(
    dir: &Path,
    output_base: &Path,
    data: &BTreeMap<String, u64>,
) -> Result<(PathBuf, PathBuf)> {
    let base = output_base
        .file_name()
        .with_context(|| format!("{output_base:?} doesn't name a file"))?
        .to_string_lossy();
    let input = dir.join(format!("{base}.input"));
    let output = dir.join(format!("{base}.output"));

    let identities = data.keys().map(String::as_str).collect::<Vec<_>>().join("\n");
    let minutes = data
        .values()
        .map(|v| seconds_to_minutes(*v).to_string())
        .collect::<Vec<_>>()
        .join("\n");

    fs::write(&input, identities)
        .await
        .with_context(|| format!("Failed to write {input:?}"))?;
    fs::write(&output, minutes)
        .await
        .with_context(|| format!("Failed to write {output:?}"))?;
    Ok((input, output))
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, path::Path};

    use anyhow::Result;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{
        gather_totals, load_last_export, save_last_export, seconds_to_minutes, write_export,
        EPOCH, LAST_EXPORT_FILE,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_minutes_round_half_to_even() {
        assert_eq!(seconds_to_minutes(0), 0);
        assert_eq!(seconds_to_minutes(29), 0);
        assert_eq!(seconds_to_minutes(30), 0);
        assert_eq!(seconds_to_minutes(90), 2);
        assert_eq!(seconds_to_minutes(91), 2);
        assert_eq!(seconds_to_minutes(150), 2);
        assert_eq!(seconds_to_minutes(3600), 60);
    }

    #[tokio::test]
    async fn test_export_marker() -> Result<()> {
        let dir = tempdir()?;
        assert_eq!(load_last_export(dir.path()).await, EPOCH);

        std::fs::write(dir.path().join(LAST_EXPORT_FILE), "yesterday")?;
        assert_eq!(load_last_export(dir.path()).await, EPOCH);

        save_last_export(dir.path(), date(2024, 5, 2)).await?;
        assert_eq!(
            std::fs::read_to_string(dir.path().join(LAST_EXPORT_FILE))?,
            "2024-05-02"
        );
        assert_eq!(load_last_export(dir.path()).await, date(2024, 5, 2));
        Ok(())
    }

    #[tokio::test]
    async fn test_gather_only_days_after_marker() -> Result<()> {
        let dir = tempdir()?;
        let write = |name: &str, content: &str| std::fs::write(dir.path().join(name), content);
        write("2024-05-01.json", r#"{ "chrome": 600 }"#)?;
        write("2024-05-02.json", r#"{ "chrome": 60, "Minecraft": 120.7 }"#)?;
        write("2024-05-03.json", r#"{ "minecraft": 30, "steam": -4 }"#)?;
        write("2024-05-04.json", "not json")?;
        write("2024-05-05.corrupt.json", r#"{ "chrome": 9999 }"#)?;
        write("aliases.json", r#"{ "a": "b" }"#)?;

        let totals = gather_totals(dir.path(), date(2024, 5, 1)).await?;

        assert_eq!(totals.get("chrome"), Some(&60));
        assert_eq!(totals.get("minecraft"), Some(&150));
        assert_eq!(totals.get("steam"), None);
        assert_eq!(totals.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_gather_saturates_huge_totals() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join("2024-05-02.json"),
            format!(r#"{{ "steam": {} }}"#, u64::MAX),
        )?;
        std::fs::write(dir.path().join("2024-05-03.json"), r#"{ "Steam": 1 }"#)?;

        let totals = gather_totals(dir.path(), date(2024, 5, 1)).await?;

        assert_eq!(totals.get("steam"), Some(&u64::MAX));
        Ok(())
    }

    #[tokio::test]
    async fn test_write_export_files() -> Result<()> {
        let dir = tempdir()?;
        let data: BTreeMap<String, u64> = [("steam".to_string(), 90), ("chrome".to_string(), 3600)]
            .into_iter()
            .collect();

        let (input, output) = write_export(dir.path(), Path::new("/elsewhere/games"), &data).await?;

        assert_eq!(input, dir.path().join("games.input"));
        assert_eq!(std::fs::read_to_string(input)?, "chrome\nsteam");
        assert_eq!(std::fs::read_to_string(output)?, "60\n2");
        Ok(())
    }
}
