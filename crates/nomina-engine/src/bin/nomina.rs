//! # nomina: Payroll Command Line
//!
//! Runs one payroll operation against the configured database and prints
//! the result as JSON. Failures print `{ "code", "message" }` to stderr and
//! exit non-zero.
//!
//! ## Usage
//! ```bash
//! nomina register --employee emp-001 --start 2026-03-02T08:00:00Z --end 2026-03-02T16:00:00Z --rate 4500
//! nomina overtime --entry <ID> --hours 1.5 --bonus 2000 --notes "Weekend inventory"
//! nomina generate --from 2026-03-01 --to 2026-03-31 --active-only --comments "March payroll"
//! nomina revert   --batch <ID>
//! nomina search   --period monthly --employee vega --page 1 --page-size 20
//! nomina entry    --id <ID>
//! nomina batch    --id <ID>
//! ```
//!
//! Configuration comes from `NOMINA_*` environment variables (see
//! `EngineConfig`); `RUST_LOG` controls log output on stderr.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use nomina_core::query::{Page, PeriodType};
use nomina_core::{BatchState, Hours, Money, PayrollBatch, TimeEntry, ValidationError};
use nomina_engine::services::{
    ApplyOvertimeAndBonusRequest, BatchDetail, EntryDetail, GenerateBatchRequest, RegisterHoursRequest,
    RevertConfirmation, SearchBatchesRequest,
};
use nomina_engine::{EngineConfig, PayrollEngine, PayrollError, PayrollResult};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
Nomina payroll engine

Usage: nomina <COMMAND> [OPTIONS]

Commands:
  register   --employee <ID> --start <TIME> [--end <TIME>] --rate <AMOUNT> [--entry <ID>]
  overtime   --entry <ID> --hours <HOURS> [--rate <AMOUNT>] [--bonus <AMOUNT>] [--notes <TEXT>] [--actor <NAME>]
  generate   --from <TIME> --to <TIME> [--active-only] [--comments <TEXT>]
  revert     --batch <ID>
  search     [--from <TIME>] [--to <TIME>] [--employee-id <ID>] [--employee <TEXT>]
             [--state generated|voided] [--period monthly|quarterly|yearly]
             [--page <N>] [--page-size <N>]
  entry      --id <ID>
  batch      --id <ID>

TIME is RFC 3339, 'YYYY-MM-DDTHH:MM' (UTC) or 'YYYY-MM-DD'. A bare date
means the start of the day, or its last second when used as --end/--to.
AMOUNT is in major units with at most two decimals (1234.56).";

/// Everything a command can print.
#[derive(Serialize)]
#[serde(untagged)]
enum Response {
    Entry(TimeEntry),
    EntryDetail(EntryDetail),
    Batch(PayrollBatch),
    BatchDetail(BatchDetail),
    Reverted(RevertConfirmation),
    Batches(Page<PayrollBatch>),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(ExitCode::from(2));
    };
    if matches!(command.as_str(), "--help" | "-h" | "help") {
        println!("{}", USAGE);
        return Ok(ExitCode::SUCCESS);
    }

    let config = EngineConfig::load().context("Invalid NOMINA_* configuration")?;
    info!(database = %config.database_path, "Configuration loaded");
    let engine = PayrollEngine::connect(config)
        .await
        .context("Could not open the payroll database")?;

    let outcome = match Flags::parse(&args[1..]) {
        Ok(flags) => run(&engine, command, &flags).await,
        Err(err) => Err(err),
    };

    let code = match outcome {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", serde_json::to_string_pretty(&err.to_response())?);
            ExitCode::FAILURE
        }
    };

    engine.database().close().await;
    Ok(code)
}

async fn run(engine: &PayrollEngine, command: &str, flags: &Flags) -> PayrollResult<Response> {
    match command {
        "register" => {
            let request = RegisterHoursRequest {
                entry_id: flags.optional("entry"),
                employee_id: flags.required("employee")?,
                period_start: flags.instant("start", false)?.ok_or_else(|| missing("start"))?,
                period_end: flags.instant("end", true)?,
                hourly_rate_cents: flags.money("rate")?.ok_or_else(|| missing("rate"))?.cents(),
            };
            Ok(Response::Entry(engine.register_hours(request).await?))
        }
        "overtime" => {
            let hours = flags.hours("hours")?.ok_or_else(|| missing("hours"))?;
            let request = ApplyOvertimeAndBonusRequest {
                entry_id: flags.required("entry")?,
                overtime_hundredths: hours.hundredths(),
                overtime_rate_cents: flags.money("rate")?.map(|m| m.cents()),
                bonus_amount_cents: flags.money("bonus")?.map(|m| m.cents()).unwrap_or(0),
                notes: flags.optional("notes"),
                actor: flags
                    .optional("actor")
                    .or_else(|| env::var("USER").ok())
                    .unwrap_or_else(|| "nomina-cli".to_string()),
            };
            Ok(Response::Entry(engine.apply_overtime_and_bonus(request).await?))
        }
        "generate" => {
            let request = GenerateBatchRequest {
                period_start: flags.instant("from", false)?.ok_or_else(|| missing("from"))?,
                period_end: flags.instant("to", true)?.ok_or_else(|| missing("to"))?,
                active_employees_only: flags.switch("active-only"),
                comments: flags.optional("comments"),
            };
            Ok(Response::Batch(engine.generate_batch(request).await?))
        }
        "revert" => {
            let batch_id = flags.required("batch")?;
            Ok(Response::Reverted(engine.revert_batch(&batch_id).await?))
        }
        "search" => {
            let request = SearchBatchesRequest {
                from: flags.instant("from", false)?,
                to: flags.instant("to", true)?,
                employee_id: flags.optional("employee-id"),
                state: flags.optional("state").map(|s| parse_state(&s)).transpose()?,
                period_type: flags.optional("period").map(|p| PeriodType::parse(&p)).transpose()?,
                employee: flags.optional("employee"),
                page: flags.number("page")?,
                page_size: flags.number("page-size")?,
            };
            Ok(Response::Batches(engine.search_batches(request).await?))
        }
        "entry" => {
            let id = flags.required("id")?;
            Ok(Response::EntryDetail(engine.query().entry_detail(&id).await?))
        }
        "batch" => {
            let id = flags.required("id")?;
            Ok(Response::BatchDetail(engine.query().batch_detail(&id).await?))
        }
        other => Err(PayrollError::validation(format!(
            "Unknown command '{}'; run `nomina --help`",
            other
        ))),
    }
}

// =============================================================================
// Flag Parsing
// =============================================================================

/// Flags that take no value.
const SWITCHES: &[&str] = &["active-only"];

/// `--name value` pairs and bare switches of one invocation.
struct Flags {
    values: HashMap<String, String>,
    switches: Vec<String>,
}

impl Flags {
    fn parse(args: &[String]) -> PayrollResult<Self> {
        let mut values = HashMap::new();
        let mut switches = Vec::new();

        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            let Some(name) = arg.strip_prefix("--") else {
                return Err(PayrollError::validation(format!("Unexpected argument '{}'", arg)));
            };
            if SWITCHES.contains(&name) {
                switches.push(name.to_string());
                continue;
            }
            match iter.next() {
                Some(value) => {
                    values.insert(name.to_string(), value.clone());
                }
                None => return Err(PayrollError::validation(format!("--{} needs a value", name))),
            }
        }

        Ok(Flags { values, switches })
    }

    fn optional(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }

    fn required(&self, name: &str) -> PayrollResult<String> {
        self.optional(name).ok_or_else(|| missing(name))
    }

    fn switch(&self, name: &str) -> bool {
        self.switches.iter().any(|s| s == name)
    }

    fn money(&self, name: &str) -> PayrollResult<Option<Money>> {
        self.values
            .get(name)
            .map(|raw| raw.parse::<Money>().map_err(|e| renamed(e, name)))
            .transpose()
    }

    fn hours(&self, name: &str) -> PayrollResult<Option<Hours>> {
        self.values
            .get(name)
            .map(|raw| raw.parse::<Hours>().map_err(|e| renamed(e, name)))
            .transpose()
    }

    fn number(&self, name: &str) -> PayrollResult<Option<u32>> {
        self.values
            .get(name)
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| {
                    PayrollError::from(ValidationError::InvalidFormat {
                        field: name.to_string(),
                        reason: format!("'{}' is not a whole number", raw),
                    })
                })
            })
            .transpose()
    }

    fn instant(&self, name: &str, end_of_day: bool) -> PayrollResult<Option<DateTime<Utc>>> {
        self.values
            .get(name)
            .map(|raw| {
                parse_instant(raw, end_of_day).ok_or_else(|| {
                    PayrollError::from(ValidationError::InvalidFormat {
                        field: name.to_string(),
                        reason: format!("'{}' is not an RFC 3339 time or a YYYY-MM-DD date", raw),
                    })
                })
            })
            .transpose()
    }
}

fn missing(name: &str) -> PayrollError {
    ValidationError::Required {
        field: format!("--{}", name),
    }
    .into()
}

/// Reports a parse error under the flag's name.
fn renamed(err: ValidationError, name: &str) -> PayrollError {
    match err {
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: format!("--{}", name),
            reason,
        }
        .into(),
        other => other.into(),
    }
}

fn parse_instant(raw: &str, end_of_day: bool) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Some(instant.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)?
    } else {
        date.and_hms_opt(0, 0, 0)?
    };
    Some(time.and_utc())
}

fn parse_state(raw: &str) -> PayrollResult<BatchState> {
    match raw.trim().to_lowercase().as_str() {
        "generated" => Ok(BatchState::Generated),
        "voided" => Ok(BatchState::Voided),
        other => Err(ValidationError::InvalidFormat {
            field: "--state".to_string(),
            reason: format!("'{}' is not generated or voided", other),
        }
        .into()),
    }
}
