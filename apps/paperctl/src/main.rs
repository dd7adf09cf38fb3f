mod config;

use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use editor_core::{
    has_errors, validate, AssignmentGateway, EditorEngine, HttpGateway, PaperPatch, Severity,
    ValidationIssue,
};
use shared::{
    domain::{AssignmentId, Paper, PaperId, PaperStatus, SessionId},
    protocol::{PaperListQuery, ScheduleAssignment},
};
use tracing::{debug, info};

use crate::config::{load_settings, Settings};

#[derive(Parser, Debug)]
#[command(name = "paperctl", about = "Manage exam papers through the paper API")]
struct Cli {
    /// Overrides `api_base_url` from paperctl.toml and the environment.
    #[arg(long)]
    api_base_url: Option<String>,
    #[arg(long)]
    token: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        page_size: Option<u32>,
    },
    Show {
        paper_id: String,
    },
    /// Validates a remote paper by id, or a local JSON file.
    Validate {
        target: String,
    },
    New {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        duration: Option<i64>,
    },
    SetTitle {
        paper_id: String,
        title: String,
    },
    Publish {
        paper_id: String,
        #[arg(long)]
        version: Option<i64>,
        /// Publish even when validation reports errors.
        #[arg(long)]
        force: bool,
    },
    Duplicate {
        paper_id: String,
    },
    Delete {
        paper_id: String,
    },
    /// Converts a Markdown file; `--save` persists the result as a new draft.
    Import {
        file: PathBuf,
        #[arg(long)]
        save: bool,
    },
    #[command(subcommand)]
    Assign(AssignCommand),
}

#[derive(Subcommand, Debug)]
enum AssignCommand {
    Create {
        #[arg(long)]
        session: String,
        #[arg(long)]
        paper: String,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long)]
        group: Option<String>,
    },
    Update {
        #[arg(long)]
        session: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        paper: String,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
        #[arg(long)]
        group: Option<String>,
    },
    Delete {
        #[arg(long)]
        session: String,
        #[arg(long)]
        id: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StatusArg {
    Draft,
    Published,
    Archived,
}

impl From<StatusArg> for PaperStatus {
    fn from(value: StatusArg) -> Self {
        match value {
            StatusArg::Draft => PaperStatus::Draft,
            StatusArg::Published => PaperStatus::Published,
            StatusArg::Archived => PaperStatus::Archived,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings()?;
    if let Some(url) = cli.api_base_url {
        settings.api_base_url = url;
    }
    if let Some(token) = cli.token {
        settings.auth_token = Some(token);
    }
    debug!(api_base_url = %settings.api_base_url, "paperctl: settings loaded");

    let gateway = Arc::new(build_gateway(&settings)?);
    let engine = build_engine(&settings, gateway.clone());
    debug!(
        autosave = engine.autosave_enabled(),
        delay_ms = settings.autosave_delay_ms,
        "paperctl: editor ready"
    );

    match cli.command {
        Command::List {
            status,
            search,
            page,
            page_size,
        } => {
            let query = PaperListQuery {
                status: status.map(PaperStatus::from),
                search,
                page,
                page_size,
            };
            let page = engine.fetch_list(query).await?;
            for item in &page.items {
                let status = item
                    .status
                    .map(|status| status.to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{}\t{}\t{}", item.id, status, item.title);
            }
            println!("total={}", page.total);
        }
        Command::Show { paper_id } => {
            let paper = engine.load(&PaperId::new(paper_id)).await?;
            println!("{}", serde_json::to_string_pretty(&paper)?);
        }
        Command::Validate { target } => {
            let paper = resolve_paper(&engine, &target).await?;
            let issues = validate(Some(&paper));
            print_issues(&issues);
            if has_errors(&issues) {
                bail!("paper '{}' has validation errors", paper.title);
            }
        }
        Command::New { title, duration } => {
            engine.new_draft();
            if let Some(title) = title {
                engine.update_paper(PaperPatch::title(title));
            }
            if let Some(duration) = duration {
                engine.update_paper(PaperPatch::duration(duration));
            }
            let paper = engine.save().await?;
            print_issues(&engine.issues());
            println!("created paper_id={}", describe_id(&paper));
        }
        Command::SetTitle { paper_id, title } => {
            engine.load(&PaperId::new(paper_id)).await?;
            engine.update_paper(PaperPatch::title(title));
            let paper = engine.save().await?;
            println!("saved paper_id={} title={}", describe_id(&paper), paper.title);
        }
        Command::Publish {
            paper_id,
            version,
            force,
        } => {
            engine.load(&PaperId::new(paper_id)).await?;
            let issues = engine.issues();
            if has_errors(&issues) && !force {
                print_issues(&issues);
                bail!("refusing to publish a paper with validation errors; pass --force to override");
            }
            let receipt = engine.publish(version).await?;
            let status = receipt.status.unwrap_or(PaperStatus::Published);
            match receipt.version {
                Some(version) => println!("status={status} version={version}"),
                None => println!("status={status}"),
            }
        }
        Command::Duplicate { paper_id } => {
            let duplicated = engine.duplicate_paper(&PaperId::new(paper_id)).await?;
            println!("duplicated paper_id={duplicated}");
        }
        Command::Delete { paper_id } => {
            let paper_id = PaperId::new(paper_id);
            engine.delete_paper(&paper_id).await?;
            println!("deleted paper_id={paper_id}");
        }
        Command::Import { file, save } => {
            let markdown = fs::read_to_string(&file)
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let result = engine.import_markdown(&markdown).await?;
            let imported = result.paper();
            if !save {
                println!("{}", serde_json::to_string_pretty(&result)?);
                return Ok(());
            }
            let Some(paper) = imported else {
                bail!("import response did not contain a paper");
            };
            let created = engine.create_draft(Some(paper)).await?;
            info!(paper_id = ?created.id, "paperctl: imported paper saved");
            println!("created paper_id={}", describe_id(&created));
        }
        Command::Assign(command) => run_assign(gateway.as_ref(), command).await?,
    }

    Ok(())
}

fn build_gateway(settings: &Settings) -> Result<HttpGateway> {
    let gateway = HttpGateway::with_timeout(&settings.api_base_url, settings.request_timeout())?;
    Ok(match &settings.auth_token {
        Some(token) => gateway.with_token(token.clone()),
        None => gateway,
    })
}

fn build_engine(settings: &Settings, gateway: Arc<HttpGateway>) -> Arc<EditorEngine> {
    EditorEngine::new(gateway, settings.editor_config())
}

/// Local JSON files take precedence over remote ids.
async fn resolve_paper(engine: &EditorEngine, target: &str) -> Result<Paper> {
    let path = PathBuf::from(target);
    if path.is_file() {
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        return serde_json::from_str(&raw)
            .with_context(|| format!("'{}' is not a paper document", path.display()));
    }
    Ok(engine.load(&PaperId::new(target)).await?)
}

async fn run_assign(gateway: &impl AssignmentGateway, command: AssignCommand) -> Result<()> {
    match command {
        AssignCommand::Create {
            session,
            paper,
            start,
            end,
            group,
        } => {
            let session_id = SessionId::new(session);
            let assignment = build_assignment(&session_id, paper, start, end, group)?;
            let created = gateway.create_assignment(&session_id, &assignment).await?;
            println!("{}", serde_json::to_string_pretty(&created)?);
        }
        AssignCommand::Update {
            session,
            id,
            paper,
            start,
            end,
            group,
        } => {
            let session_id = SessionId::new(session);
            let assignment_id = AssignmentId::new(id);
            let mut assignment = build_assignment(&session_id, paper, start, end, group)?;
            assignment.id = Some(assignment_id.clone());
            let updated = gateway
                .update_assignment(&session_id, &assignment_id, &assignment)
                .await?;
            println!("{}", serde_json::to_string_pretty(&updated)?);
        }
        AssignCommand::Delete { session, id } => {
            let assignment_id = AssignmentId::new(id);
            gateway
                .delete_assignment(&SessionId::new(session), &assignment_id)
                .await?;
            println!("deleted assignment_id={assignment_id}");
        }
    }
    Ok(())
}

fn build_assignment(
    session_id: &SessionId,
    paper: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    examinee_group_filter: Option<String>,
) -> Result<ScheduleAssignment> {
    if end_time <= start_time {
        bail!("assignment end time must be after its start time");
    }
    Ok(ScheduleAssignment {
        id: None,
        paper_id: PaperId::new(paper),
        schedule_session_id: session_id.clone(),
        start_time,
        end_time,
        examinee_group_filter,
    })
}

fn describe_id(paper: &Paper) -> String {
    paper
        .id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".into())
}

fn print_issues(issues: &[ValidationIssue]) {
    for issue in issues {
        let label = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!("{label}\t{}\t{}", issue.path, issue.message);
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
