use super::*;

#[test]
/// What: Every recognized key is parsed, with comments and key spelling variants.
///
/// Inputs:
/// - Config text mixing comment styles, dashed and dotted keys and inline comments.
///
/// Output:
/// - Settings reflect each value; the URL keeps its `//`.
fn parses_all_keys() {
    let content = r"
# comment
// another comment
; ini-style comment
region-id = 805362004   # Musterhausen
match.parent = yes
name_fallback = on
area_names = Musterhausen, Altstadt ,
only_active_future = false
allow_stale = 0
run on startup = no
refresh_interval_secs = -1
timeout_ms = 5000
feed_url = https://example.org/cap/latest.zip
index_dir = https://example.org/cap/
index_pattern = A_{ts}_B.zip
link_concurrency = 8
retry_delay_ms = 10
persist_result = false
something_else = 1
";
    let mut s = Settings::default();
    parse_settings(content, &mut s);
    assert_eq!(s.region_id.as_deref(), Some("805362004"));
    assert!(s.match_parent);
    assert!(s.name_fallback);
    assert_eq!(s.area_names, vec!["Musterhausen".to_string(), "Altstadt".to_string()]);
    assert!(!s.only_active_future);
    assert!(!s.allow_stale);
    assert!(!s.run_on_startup);
    assert_eq!(s.refresh_interval_secs, -1);
    assert_eq!(s.timeout_ms, 5000);
    assert_eq!(s.feed_url, "https://example.org/cap/latest.zip");
    assert_eq!(s.index_dir.as_deref(), Some("https://example.org/cap/"));
    assert_eq!(s.link_concurrency, 8);
    assert_eq!(s.retry_delay_ms, 10);
    assert!(!s.persist_result);
    let index = s.index_source().expect("valid pattern").expect("index configured");
    assert_eq!(index.pattern.template(), "A_{ts}_B.zip");
}

#[test]
fn bad_values_keep_defaults() {
    let mut s = Settings::default();
    parse_settings("timeout_ms = soon\nallow_stale = maybe\nlink_concurrency = 0\n", &mut s);
    assert_eq!(s, Settings::default());
}

#[test]
fn inline_comment_markers_need_whitespace() {
    assert_eq!(strip_inline_comment("http://x/#a # note"), "http://x/#a");
    assert_eq!(strip_inline_comment("42 // note"), "42");
    assert_eq!(strip_inline_comment("# all comment"), "");
}

#[test]
fn invalid_index_pattern_is_reported() {
    let s = Settings {
        index_dir: Some("http://x/".into()),
        index_pattern: Some("no-placeholder.zip".into()),
        ..Settings::default()
    };
    assert!(s.index_source().is_err());
    assert!(Settings::default().index_source().expect("no index").is_none());
}

#[test]
fn load_settings_from_explicit_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("capwarn.conf");
    std::fs::write(&path, "region_id = 105362000\n").expect("write config");
    let s = load_settings(Some(&path));
    assert_eq!(s.region_id.as_deref(), Some("105362000"));
    let missing = load_settings(Some(&dir.path().join("absent.conf")));
    assert_eq!(missing, Settings::default());
}
