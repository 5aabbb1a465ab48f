mod api;
mod config;
mod filter;
mod group;
mod models;
mod salary;
mod timeline;
mod view;

use anyhow::{anyhow, Result};
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use api::{ApiClient, ImportMode};
use filter::FilterQuery;
use group::{GroupIndex, SortMode};
use models::{parse_datetime, FinalResult, Interview, PositionRecord, SalaryType};

#[derive(Parser)]
#[command(name = "pursuit")]
#[command(about = "Job application pipeline tracker - companies, positions, interview stages, outcomes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and cache the bearer token
    Login {
        /// Username
        #[arg(short, long)]
        username: String,

        /// Password
        #[arg(short, long)]
        password: String,
    },

    /// List applications grouped by company (card view by default)
    List {
        /// Render as a table instead of cards
        #[arg(long)]
        table: bool,

        /// Sort mode: pool-days, update-time, apply-time, created-time
        #[arg(short, long, default_value = "pool-days")]
        sort: String,

        /// Comma-separated keywords (company, position, or base location)
        #[arg(short, long)]
        keywords: Option<String>,

        /// Final result filter (exact label, or 已挂 / 待定)
        #[arg(long)]
        final_result: Option<String>,

        /// Current status filter (exact)
        #[arg(long)]
        current_status: Option<String>,

        /// Minimum annualized salary, in ten-thousands
        #[arg(long)]
        min_salary: Option<f64>,

        /// Filter on the server instead of locally
        #[arg(long)]
        server_side: bool,
    },

    /// Show one record with its full timeline
    Show {
        /// Record ID
        id: i64,
    },

    /// Add one application record
    Add {
        /// Company name
        #[arg(long)]
        company: String,

        /// Position title
        #[arg(long)]
        position: String,

        /// Apply time, e.g. 2025-03-01T09:00
        #[arg(long)]
        apply_time: String,

        /// Base location
        #[arg(long)]
        base_location: Option<String>,

        /// Company URL
        #[arg(long)]
        company_url: Option<String>,

        /// Assessment time
        #[arg(long)]
        test_time: Option<String>,

        /// Written exam time
        #[arg(long)]
        written_exam_time: Option<String>,

        /// Latest pipeline stage label (free text)
        #[arg(long)]
        current_status: Option<String>,

        /// Date of the latest pipeline stage
        #[arg(long)]
        current_status_date: Option<String>,

        /// Final result label (OC, PENDING, 简历挂, ...)
        #[arg(long)]
        final_result: Option<String>,

        /// Salary type: 总包, 月薪, 待商议
        #[arg(long)]
        salary_type: Option<String>,

        /// Salary value ("35" for 总包, "15k×12" for 月薪)
        #[arg(long)]
        salary_value: Option<String>,

        /// Interview round as TYPE@TIME, e.g. 一面@2025-03-05T10:00 (repeatable)
        #[arg(long = "interview")]
        interviews: Vec<String>,

        /// Free-text remarks
        #[arg(long)]
        remarks: Option<String>,
    },

    /// Add several positions at one company as a single group
    AddGroup {
        /// Company name
        #[arg(long)]
        company: String,

        /// Position titles (the first one becomes primary)
        #[arg(long, required = true, num_args = 1..)]
        positions: Vec<String>,

        /// Apply time shared by the batch
        #[arg(long)]
        apply_time: String,

        /// Base location
        #[arg(long)]
        base_location: Option<String>,

        /// Company URL
        #[arg(long)]
        company_url: Option<String>,
    },

    /// Update fields of one record
    Update {
        /// Record ID
        id: i64,

        #[arg(long)]
        company: Option<String>,

        #[arg(long)]
        position: Option<String>,

        #[arg(long)]
        apply_time: Option<String>,

        #[arg(long)]
        base_location: Option<String>,

        #[arg(long)]
        company_url: Option<String>,

        #[arg(long)]
        test_time: Option<String>,

        #[arg(long)]
        written_exam_time: Option<String>,

        #[arg(long)]
        current_status: Option<String>,

        #[arg(long)]
        current_status_date: Option<String>,

        #[arg(long)]
        final_result: Option<String>,

        #[arg(long)]
        salary_type: Option<String>,

        #[arg(long)]
        salary_value: Option<String>,

        /// Append an interview round as TYPE@TIME (repeatable)
        #[arg(long = "interview")]
        interviews: Vec<String>,

        #[arg(long)]
        remarks: Option<String>,
    },

    /// Delete one record
    Delete {
        /// Record ID
        id: i64,
    },

    /// Make a record the primary (default-displayed) position of its group
    SwitchPrimary {
        /// Company group ID
        group_id: String,

        /// Record ID to promote
        record_id: i64,
    },

    /// Export records as a spreadsheet
    Export {
        /// Output file
        #[arg(short, long, default_value = "records.xlsx")]
        output: PathBuf,

        /// Export only records matching these filters
        #[arg(short, long)]
        keywords: Option<String>,

        #[arg(long)]
        final_result: Option<String>,

        #[arg(long)]
        current_status: Option<String>,

        #[arg(long)]
        min_salary: Option<f64>,
    },

    /// Import records from a spreadsheet
    Import {
        /// Spreadsheet file (.xlsx / .xls)
        file: PathBuf,

        /// Mode: preview, add, replace, skip
        #[arg(short, long, default_value = "preview")]
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let now = chrono::Local::now().naive_local();

    match cli.command {
        Commands::Login { username, password } => {
            let client = ApiClient::new(config::base_url(), None);
            let token = client.login(&username, &password).await?;
            config::save_token(&token)?;
            println!("Logged in as {}.", username);
        }

        Commands::List {
            table,
            sort,
            keywords,
            final_result,
            current_status,
            min_salary,
            server_side,
        } => {
            let sort_mode = SortMode::parse(&sort)
                .ok_or_else(|| anyhow!("Unknown sort mode '{}'", sort))?;
            let query = FilterQuery {
                keywords,
                final_result,
                current_status,
                min_salary,
            };

            let client = authed_client()?;
            let (records, total) = if server_side && !query.is_empty() {
                let hits = client.search_records(&query).await?;
                (hits, None)
            } else {
                let all = client.list_records().await?;
                let total = all.len();
                if query.is_empty() {
                    (all, None)
                } else {
                    (filter::apply(&all, &query), Some(total))
                }
            };

            let index = GroupIndex::build(&records).order(sort_mode, now);
            match total {
                Some(total) => println!("{} of {} record(s) match.", records.len(), total),
                None if !query.is_empty() => println!("{} record(s) match.", records.len()),
                None => {}
            }
            if table {
                view::render_table(&index, now);
            } else {
                view::render_cards(&index, now);
            }
        }

        Commands::Show { id } => {
            let client = authed_client()?;
            let records = client.list_records().await?;
            match records.iter().find(|r| r.id == Some(id)) {
                Some(record) => view::render_record(record, now),
                None => println!("Record #{} not found.", id),
            }
        }

        Commands::Add {
            company,
            position,
            apply_time,
            base_location,
            company_url,
            test_time,
            written_exam_time,
            current_status,
            current_status_date,
            final_result,
            salary_type,
            salary_value,
            interviews,
            remarks,
        } => {
            let record = PositionRecord {
                company_name: company,
                position,
                apply_time: Some(parse_dt_arg(&apply_time)?),
                base_location,
                company_url,
                test_time: parse_opt_dt_arg(test_time.as_deref())?,
                written_exam_time: parse_opt_dt_arg(written_exam_time.as_deref())?,
                current_status,
                current_status_date: parse_opt_dt_arg(current_status_date.as_deref())?,
                final_result: final_result.map(FinalResult::from),
                expected_salary_type: salary_type.as_deref().map(parse_salary_type).transpose()?,
                expected_salary_value: salary_value,
                interviews: parse_interview_args(&interviews)?,
                remarks,
                is_primary: true,
                ..Default::default()
            };
            // Validation happens before any network call.
            record.validate_for_submit()?;

            let client = authed_client()?;
            match client.create_record(&record).await? {
                Some(created) => println!(
                    "Added record #{} ({} / {}).",
                    created.id.map(|id| id.to_string()).unwrap_or_default(),
                    created.company_name,
                    created.position
                ),
                None => println!("Added record ({} / {}).", record.company_name, record.position),
            }
        }

        Commands::AddGroup {
            company,
            positions,
            apply_time,
            base_location,
            company_url,
        } => {
            let apply_time = parse_dt_arg(&apply_time)?;
            let records: Vec<PositionRecord> = positions
                .iter()
                .enumerate()
                .map(|(i, position)| PositionRecord {
                    company_name: company.clone(),
                    position: position.clone(),
                    apply_time: Some(apply_time),
                    base_location: base_location.clone(),
                    company_url: company_url.clone(),
                    is_primary: i == 0,
                    ..Default::default()
                })
                .collect();
            for record in &records {
                record.validate_for_submit()?;
            }

            let client = authed_client()?;
            client.create_batch(&records).await?;
            println!(
                "Added {} position(s) at {} as one company group.",
                records.len(),
                company
            );
        }

        Commands::Update {
            id,
            company,
            position,
            apply_time,
            base_location,
            company_url,
            test_time,
            written_exam_time,
            current_status,
            current_status_date,
            final_result,
            salary_type,
            salary_value,
            interviews,
            remarks,
        } => {
            let client = authed_client()?;
            let records = client.list_records().await?;
            let mut record = records
                .into_iter()
                .find(|r| r.id == Some(id))
                .ok_or_else(|| anyhow!("Record #{} not found", id))?;

            if let Some(v) = company {
                record.company_name = v;
            }
            if let Some(v) = position {
                record.position = v;
            }
            if let Some(v) = apply_time {
                record.apply_time = Some(parse_dt_arg(&v)?);
            }
            if let Some(v) = base_location {
                record.base_location = Some(v);
            }
            if let Some(v) = company_url {
                record.company_url = Some(v);
            }
            if let Some(v) = test_time {
                record.test_time = Some(parse_dt_arg(&v)?);
            }
            if let Some(v) = written_exam_time {
                record.written_exam_time = Some(parse_dt_arg(&v)?);
            }
            if let Some(v) = current_status {
                record.current_status = Some(v);
            }
            if let Some(v) = current_status_date {
                record.current_status_date = Some(parse_dt_arg(&v)?);
            }
            if let Some(v) = final_result {
                record.final_result = Some(FinalResult::from(v));
            }
            if let Some(v) = salary_type {
                record.expected_salary_type = Some(parse_salary_type(&v)?);
            }
            if let Some(v) = salary_value {
                record.expected_salary_value = Some(v);
            }
            record
                .interviews
                .extend(parse_interview_args(&interviews)?);
            if let Some(v) = remarks {
                record.remarks = Some(v);
            }
            record.validate_for_submit()?;

            client.update_record(&record).await?;
            println!("Updated record #{}.", id);
        }

        Commands::Delete { id } => {
            let client = authed_client()?;
            client.delete_record(id).await?;
            println!("Deleted record #{}.", id);
        }

        Commands::SwitchPrimary {
            group_id,
            record_id,
        } => {
            let client = authed_client()?;
            let records = client.list_records().await?;
            let mut index = GroupIndex::build(&records);

            let Some(updated) = index.switch_primary(&group_id, record_id) else {
                println!(
                    "Group '{}' with record #{} not found; nothing changed.",
                    group_id, record_id
                );
                return Ok(());
            };
            let updated = updated.to_vec();

            // Every sibling is re-submitted so the persisted flags stay
            // consistent with the new ordering.
            client.save_group(&updated).await?;

            // Full rebuild from the backend before re-rendering.
            let records = client.list_records().await?;
            let index = GroupIndex::build(&records).order(SortMode::default(), now);
            println!("Record #{} is now primary for its group.", record_id);
            view::render_cards(&index, now);
        }

        Commands::Export {
            output,
            keywords,
            final_result,
            current_status,
            min_salary,
        } => {
            let query = FilterQuery {
                keywords,
                final_result,
                current_status,
                min_salary,
            };
            let client = authed_client()?;
            let bytes = client.export(Some(&query), &output).await?;
            println!("Exported {} byte(s) to {}.", bytes, output.display());
        }

        Commands::Import { file, mode } => {
            let mode = ImportMode::parse(&mode)
                .ok_or_else(|| anyhow!("Unknown import mode '{}'", mode))?;
            let client = authed_client()?;
            let outcome = client.import(&file, mode).await?;
            if outcome.success {
                println!(
                    "Import ({}) succeeded: {}",
                    mode.as_str(),
                    outcome.message.unwrap_or_else(|| "ok".to_string())
                );
                if !outcome.details.is_empty() {
                    for (key, value) in &outcome.details {
                        println!("  {}: {}", key, value);
                    }
                }
            } else {
                return Err(anyhow!(
                    "Import failed: {}",
                    outcome
                        .message
                        .unwrap_or_else(|| "unknown error".to_string())
                ));
            }
        }
    }

    Ok(())
}

fn authed_client() -> Result<ApiClient> {
    let token = config::load_token()?;
    if token.is_none() {
        return Err(anyhow!("Not logged in. Run 'pursuit login' first."));
    }
    Ok(ApiClient::new(config::base_url(), token))
}

fn parse_dt_arg(s: &str) -> Result<NaiveDateTime> {
    parse_datetime(s)
        .ok_or_else(|| anyhow!("Unrecognized datetime '{}', expected e.g. 2025-03-01T09:00", s))
}

fn parse_opt_dt_arg(s: Option<&str>) -> Result<Option<NaiveDateTime>> {
    s.map(parse_dt_arg).transpose()
}

fn parse_salary_type(s: &str) -> Result<SalaryType> {
    match s {
        "总包" | "total-package" => Ok(SalaryType::TotalPackage),
        "月薪" | "monthly" => Ok(SalaryType::Monthly),
        "待商议" | "negotiable" => Ok(SalaryType::Negotiable),
        _ => Err(anyhow!(
            "Unknown salary type '{}', expected 总包, 月薪 or 待商议",
            s
        )),
    }
}

/// "一面@2025-03-05T10:00" adds a timed round; a bare "一面" adds a round
/// that stays off the timeline until it gets a time.
fn parse_interview_args(args: &[String]) -> Result<Vec<Interview>> {
    args.iter()
        .map(|arg| {
            let (interview_type, time) = match arg.split_once('@') {
                Some((t, time)) => (t, Some(time)),
                None => (arg.as_str(), None),
            };
            if interview_type.trim().is_empty() {
                return Err(anyhow!("Interview round needs a type, got '{}'", arg));
            }
            Ok(Interview {
                interview_type: interview_type.trim().to_string(),
                interview_time: parse_opt_dt_arg(time)?,
            })
        })
        .collect()
}
