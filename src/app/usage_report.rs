use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LlmModule, UsageRecord};

const RECENT_WINDOW_DAYS: i64 = 7;
const DAILY_WINDOW_DAYS: i64 = 30;
const TOP_MODULE_LIMIT: usize = 5;
const UNKNOWN_MODULE_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUsage {
    pub name: String,
    pub usage: u64,
    pub tokens: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTokens {
    pub date: NaiveDate,
    pub tokens: u64,
}

/// Aggregate view over the usage log for the analytics dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub total_logs: u64,
    pub total_tokens: u64,
    /// Records from the last seven days.
    pub recent_logs: u64,
    pub top_modules: Vec<ModuleUsage>,
    /// UTC calendar days within the last thirty days, oldest first.
    pub tokens_by_day: Vec<DailyTokens>,
}

impl UsageReport {
    pub fn build(records: &[UsageRecord], modules: &[LlmModule], now: DateTime<Utc>) -> Self {
        let recent_cutoff = now - Duration::days(RECENT_WINDOW_DAYS);
        let daily_cutoff = now - Duration::days(DAILY_WINDOW_DAYS);

        let mut total_tokens = 0u64;
        let mut recent_logs = 0u64;
        let mut per_module: HashMap<&str, (u64, u64)> = HashMap::new();
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for record in records {
            total_tokens = total_tokens.saturating_add(record.tokens_used);
            if record.created_at >= recent_cutoff {
                recent_logs += 1;
            }

            let entry = per_module.entry(record.module_id.as_str()).or_default();
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(record.tokens_used);

            if record.created_at >= daily_cutoff {
                let day = per_day.entry(record.created_at.date_naive()).or_default();
                *day = day.saturating_add(record.tokens_used);
            }
        }

        let names: HashMap<&str, &str> = modules
            .iter()
            .map(|module| (module.id.as_str(), module.name.as_str()))
            .collect();

        let mut top_modules = per_module
            .into_iter()
            .map(|(module_id, (usage, tokens))| ModuleUsage {
                name: names
                    .get(module_id)
                    .copied()
                    .unwrap_or(UNKNOWN_MODULE_NAME)
                    .to_string(),
                usage,
                tokens,
            })
            .collect::<Vec<_>>();
        top_modules.sort_by(|left, right| {
            right
                .usage
                .cmp(&left.usage)
                .then_with(|| right.tokens.cmp(&left.tokens))
                .then_with(|| left.name.cmp(&right.name))
        });
        top_modules.truncate(TOP_MODULE_LIMIT);

        Self {
            total_logs: records.len() as u64,
            total_tokens,
            recent_logs,
            top_modules,
            tokens_by_day: per_day
                .into_iter()
                .map(|(date, tokens)| DailyTokens { date, tokens })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use super::{DailyTokens, ModuleUsage, UsageReport};
    use crate::domain::{LlmModule, UsageRecord};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0)
            .single()
            .expect("fixed timestamp should be valid")
    }

    fn module(id: &str, name: &str) -> LlmModule {
        LlmModule {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
            prompt_template: "{input}".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            created_at: now() - Duration::days(90),
        }
    }

    fn record(module_id: &str, tokens_used: u64, days_ago: i64) -> UsageRecord {
        UsageRecord {
            user_id: "faculty-1".to_string(),
            module_id: module_id.to_string(),
            tokens_used,
            prompt: "prompt".to_string(),
            response: "response".to_string(),
            created_at: now() - Duration::days(days_ago),
        }
    }

    #[test]
    fn build_on_empty_log_is_all_zero() {
        let report = UsageReport::build(&[], &[], now());

        assert_eq!(report.total_logs, 0);
        assert_eq!(report.total_tokens, 0);
        assert_eq!(report.recent_logs, 0);
        assert!(report.top_modules.is_empty());
        assert!(report.tokens_by_day.is_empty());
    }

    #[test]
    fn build_counts_totals_and_recent_window() {
        let records = [
            record("m-1", 10, 0),
            record("m-1", 5, 6),
            record("m-2", 20, 8),
            record("m-2", 1, 45),
        ];

        let report = UsageReport::build(&records, &[module("m-1", "Summarizer")], now());

        assert_eq!(report.total_logs, 4);
        assert_eq!(report.total_tokens, 36);
        assert_eq!(report.recent_logs, 2);
    }

    #[test]
    fn build_ranks_modules_and_names_unknown_ids() {
        let records = [
            record("m-1", 4, 0),
            record("m-2", 9, 0),
            record("m-2", 1, 1),
            record("gone", 100, 2),
        ];
        let modules = [module("m-1", "Summarizer"), module("m-2", "Quiz Builder")];

        let report = UsageReport::build(&records, &modules, now());

        assert_eq!(
            report.top_modules,
            vec![
                ModuleUsage {
                    name: "Quiz Builder".to_string(),
                    usage: 2,
                    tokens: 10,
                },
                ModuleUsage {
                    name: "Unknown".to_string(),
                    usage: 1,
                    tokens: 100,
                },
                ModuleUsage {
                    name: "Summarizer".to_string(),
                    usage: 1,
                    tokens: 4,
                },
            ]
        );
    }

    #[test]
    fn build_keeps_only_top_five_modules() {
        let records = (0..7)
            .map(|index| record(&format!("m-{index}"), index, 0))
            .collect::<Vec<_>>();

        let report = UsageReport::build(&records, &[], now());

        assert_eq!(report.top_modules.len(), 5);
        assert_eq!(report.top_modules[0].tokens, 6);
    }

    #[test]
    fn build_buckets_tokens_by_utc_day_within_thirty_days() {
        let records = [
            record("m-1", 3, 1),
            record("m-1", 4, 1),
            record("m-1", 2, 0),
            record("m-1", 50, 31),
        ];

        let report = UsageReport::build(&records, &[], now());

        assert_eq!(
            report.tokens_by_day,
            vec![
                DailyTokens {
                    date: NaiveDate::from_ymd_opt(2026, 3, 30).expect("valid date"),
                    tokens: 7,
                },
                DailyTokens {
                    date: NaiveDate::from_ymd_opt(2026, 3, 31).expect("valid date"),
                    tokens: 2,
                },
            ]
        );
    }
}
