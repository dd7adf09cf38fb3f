use super::*;

use chrono::TimeZone;

fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, hour, 0, 0)
        .single()
        .expect("timestamp")
}

#[test]
fn parses_list_filters() {
    let cli = Cli::try_parse_from([
        "paperctl",
        "list",
        "--status",
        "published",
        "--search",
        "unit 3",
        "--page-size",
        "50",
    ])
    .expect("parse");
    match cli.command {
        Command::List {
            status,
            search,
            page,
            page_size,
        } => {
            assert_eq!(status.map(PaperStatus::from), Some(PaperStatus::Published));
            assert_eq!(search.as_deref(), Some("unit 3"));
            assert_eq!(page, None);
            assert_eq!(page_size, Some(50));
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn parses_assignment_times_as_rfc3339() {
    let cli = Cli::try_parse_from([
        "paperctl",
        "--token",
        "abc",
        "assign",
        "create",
        "--session",
        "s-1",
        "--paper",
        "p-1",
        "--start",
        "2026-06-01T08:00:00Z",
        "--end",
        "2026-06-01T10:00:00Z",
    ])
    .expect("parse");
    assert_eq!(cli.token.as_deref(), Some("abc"));
    match cli.command {
        Command::Assign(AssignCommand::Create { start, end, group, .. }) => {
            assert_eq!(start, at(8));
            assert_eq!(end, at(10));
            assert_eq!(group, None);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn rejects_unknown_status() {
    assert!(Cli::try_parse_from(["paperctl", "list", "--status", "pending"]).is_err());
}

#[test]
fn assignment_window_must_be_positive() {
    let session = SessionId::new("s-1");
    assert!(build_assignment(&session, "p-1".into(), at(10), at(8), None).is_err());
    assert!(build_assignment(&session, "p-1".into(), at(8), at(8), None).is_err());

    let assignment =
        build_assignment(&session, "p-1".into(), at(8), at(10), Some("grade-9".into()))
            .expect("assignment");
    assert_eq!(assignment.schedule_session_id, session);
    assert_eq!(assignment.paper_id, PaperId::new("p-1"));
    assert_eq!(assignment.id, None);
}

#[test]
fn describes_missing_id() {
    let mut paper = Paper::default_template();
    assert_eq!(describe_id(&paper), "<none>");
    paper.id = Some(PaperId::new("p-9"));
    assert_eq!(describe_id(&paper), "p-9");
}

#[test]
fn engine_follows_autosave_settings() {
    let settings = Settings::default();
    let engine = build_engine(&settings, Arc::new(build_gateway(&settings).expect("gateway")));
    assert!(engine.autosave_enabled());

    let settings = Settings {
        autosave_enabled: false,
        ..Settings::default()
    };
    let engine = build_engine(&settings, Arc::new(build_gateway(&settings).expect("gateway")));
    assert!(!engine.autosave_enabled());
}
