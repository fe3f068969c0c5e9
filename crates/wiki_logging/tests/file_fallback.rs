use log::LevelFilter;
use wiki_logging::{initialize, LogDestination};

// Runs in its own test binary: the global logger can only be set once.
#[test]
fn unwritable_log_file_falls_back_to_terminal() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, "file").unwrap();
    let log_path = blocker.join("infinite_wiki.log");

    assert!(initialize(LogDestination::File, LevelFilter::Warn, &log_path));
    assert_eq!(log::max_level(), LevelFilter::Warn);
    assert!(!log_path.exists());

    // A second setup finds the logger already installed.
    assert!(!initialize(LogDestination::Terminal, LevelFilter::Info, &log_path));
}
