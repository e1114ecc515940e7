use super::*;

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["scoreline-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_migrate_and_tick() {
    let cli = Cli::try_parse_from(["scoreline-cli", "migrate"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Migrate)));

    let cli = Cli::try_parse_from(["scoreline-cli", "tick"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Tick)));
}

#[test]
fn parses_fetch_with_source_id() {
    let id = Uuid::new_v4();
    let cli = Cli::try_parse_from(["scoreline-cli", "fetch", "--source", &id.to_string()])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Fetch { source }) if source == id));
}

#[test]
fn fetch_rejects_non_uuid_source() {
    assert!(Cli::try_parse_from(["scoreline-cli", "fetch", "--source", "espn"]).is_err());
}

#[test]
fn merge_defaults_to_a_real_run() {
    let org = Uuid::new_v4();
    let cli = Cli::try_parse_from(["scoreline-cli", "merge", "--org", &org.to_string()])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Merge { org: o, dry_run: false }) if o == org
    ));
}

#[test]
fn merge_accepts_dry_run_flag() {
    let org = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["scoreline-cli", "merge", "--org", &org, "--dry-run"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Merge { dry_run: true, .. })
    ));
}

#[test]
fn rescore_requires_item_and_org() {
    let item = Uuid::new_v4().to_string();
    assert!(Cli::try_parse_from(["scoreline-cli", "rescore", "--item", &item]).is_err());

    let org = Uuid::new_v4().to_string();
    let cli = Cli::try_parse_from(["scoreline-cli", "rescore", "--item", &item, "--org", &org])
        .expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Rescore { .. })));
}
