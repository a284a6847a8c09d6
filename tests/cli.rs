use clap::Parser;
use lockmerge::cli::{Cli, Commands, DetectArgs, InitArgs};
use lockmerge::core::ConflictStrategy;

#[test]
fn merge_args_follow_git_placeholders() {
    // Given
    let argv = vec![
        "lockmerge",
        "merge",
        ".merge_file_Ab12",
        ".merge_file_Ob12",
        ".merge_file_Bb12",
        "web/pnpm-lock.yaml",
    ];

    // When
    let cmd = Cli::parse_from(argv);

    // Then
    match cmd.command {
        Commands::Merge(args) => {
            assert!(args.current.to_string_lossy().ends_with("Ab12"));
            assert!(args.ancestor.to_string_lossy().ends_with("Ob12"));
            assert!(args.other.to_string_lossy().ends_with("Bb12"));
            assert!(args.path.ends_with("pnpm-lock.yaml"));
        }
        _ => panic!("expected Merge command"),
    }
}

#[test]
fn merge_requires_all_four_paths() {
    let res = Cli::try_parse_from(["lockmerge", "merge", "a", "o", "b"]);
    assert!(res.is_err());
}

#[test]
fn install_accepts_driver_command_and_strategy() {
    let cmd = Cli::parse_from([
        "lockmerge",
        "install",
        "--resolve-package-json",
        "ours",
        "--driver-command",
        "lockmerge merge %A %O %B %P",
    ]);

    match cmd.command {
        Commands::Install(args) => {
            assert_eq!(args.resolve_package_json, Some(ConflictStrategy::Ours));
            assert_eq!(
                args.driver_command.as_deref(),
                Some("lockmerge merge %A %O %B %P")
            );
        }
        _ => panic!("expected Install command"),
    }
}

#[test]
fn detect_defaults_to_current_dir() {
    let cmd = Cli::parse_from(["lockmerge", "detect", "--json"]);
    match cmd.command {
        Commands::Detect(DetectArgs { path, json }) => {
            assert_eq!(path, std::path::PathBuf::from("."));
            assert!(json);
        }
        _ => panic!("expected Detect command"),
    }
}

#[test]
fn global_flags_after_subcommand() {
    let cmd = Cli::parse_from(["lockmerge", "init", "--force", "--no-color"]);
    assert!(cmd.no_color);
    assert!(matches!(cmd.command, Commands::Init(InitArgs { force: true, .. })));
}
