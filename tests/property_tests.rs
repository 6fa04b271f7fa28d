//! Property-Based Tests for wok-platform
//!
//! These tests verify:
//! - Scheme string round-trips (parse → to_string → parse)
//! - Destination address grammar for any host and path
//! - Remote flow directories always stay under their project's staged root
//! - Shell escaping survives a round trip through `sh`-style quoting rules

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use strum::IntoEnumIterator;

use wok_platform::paths::normalize;
use wok_platform::runner::shell_escape;
use wok_platform::{ConfigElement, Endpoint, PlatformPaths, Project, Scheme};

// =============================================================================
// Strategies
// =============================================================================

fn scheme_strategy() -> impl Strategy<Value = Scheme> {
    prop_oneof![
        Just(Scheme::Local),
        Just(Scheme::File),
        Just(Scheme::Ssh),
        Just(Scheme::Rsync),
    ]
}

fn host_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,12}(\\.[a-z][a-z0-9]{0,6}){0,2}"
}

fn segment_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_][A-Za-z0-9_.-]{0,10}".prop_filter("not a dot segment", |s| s != "." && s != "..")
}

fn abs_path_strategy() -> impl Strategy<Value = PathBuf> {
    prop::collection::vec(segment_strategy(), 1..5).prop_map(|segs| {
        let mut path = PathBuf::from("/");
        for seg in segs {
            path.push(seg);
        }
        path
    })
}

fn paths(projects_path: &Path) -> PlatformPaths {
    let conf = ConfigElement::from_value(serde_json::json!({
        "projects_path": projects_path.display().to_string()
    }))
    .unwrap();
    PlatformPaths::from_config(&conf, Path::new("/work")).unwrap()
}

// =============================================================================
// Scheme / Endpoint Properties
// =============================================================================

proptest! {
    /// Scheme: to_string → parse round-trip is identity
    #[test]
    fn scheme_roundtrip(scheme in scheme_strategy()) {
        let parsed: Scheme = scheme.to_string().parse().expect("Should parse");
        prop_assert_eq!(scheme, parsed);
    }

    /// ssh destinations are `host:path`
    #[test]
    fn ssh_destination_grammar(host in host_strategy(), path in abs_path_strategy()) {
        let endpoint = Endpoint::parse(&format!("ssh://{}", host)).unwrap();
        let dest = endpoint.destination(&path);
        prop_assert_eq!(dest, format!("{}:{}", host, path.display()));
    }

    /// rsync daemon destinations are `host::path`
    #[test]
    fn rsync_destination_grammar(host in host_strategy(), path in abs_path_strategy()) {
        let endpoint = Endpoint::parse(&format!("rsync://{}", host)).unwrap();
        let dest = endpoint.destination(&path);
        prop_assert_eq!(dest, format!("{}::{}", host, path.display()));
    }

    /// Local and file destinations are the bare path
    #[test]
    fn local_destination_is_bare_path(root in abs_path_strategy(), path in abs_path_strategy()) {
        let bare = Endpoint::parse(&root.display().to_string()).unwrap();
        prop_assert_eq!(bare.scheme(), Scheme::Local);
        prop_assert_eq!(bare.destination(&path), path.display().to_string());

        let file = Endpoint::parse(&format!("file://{}", root.display())).unwrap();
        prop_assert_eq!(file.scheme(), Scheme::File);
        prop_assert_eq!(file.destination(&path), path.display().to_string());
    }

    /// Unknown schemes are always rejected
    #[test]
    fn unknown_scheme_rejected(scheme in "[a-z]{2,8}", host in host_strategy()) {
        prop_assume!(Scheme::iter().all(|s| s.to_string() != scheme));
        let url = format!("{}://{}/x", scheme, host);
        prop_assert!(Endpoint::parse(&url).is_err());
    }
}

// =============================================================================
// Path Properties
// =============================================================================

proptest! {
    /// A flow anywhere under its project maps under the project's staged root
    #[test]
    fn remote_flow_dir_under_project_root(
        projects in abs_path_strategy(),
        local_root in abs_path_strategy(),
        name in segment_strategy(),
        sub in prop::collection::vec(segment_strategy(), 0..4),
        file in segment_strategy(),
    ) {
        let paths = paths(&projects);
        let project = Project::new(name.clone(), local_root.clone());
        let mut flow = local_root.clone();
        for seg in &sub {
            flow.push(seg);
        }
        flow.push(&file);

        let dir = paths.remote_flow_dir(&project, &flow).unwrap();
        let root = paths.project_root(&name);
        prop_assert!(dir.starts_with(&root));

        let mut expected = root.clone();
        for seg in &sub {
            expected.push(seg);
        }
        prop_assert_eq!(dir, expected);
    }

    /// Flows outside their project never produce a path
    #[test]
    fn flow_outside_project_rejected(
        local_root in abs_path_strategy(),
        other in segment_strategy(),
        file in segment_strategy(),
    ) {
        let paths = paths(Path::new("/remote/projects"));
        let project = Project::new("p", local_root.join("inner"));
        let flow = local_root.join(format!("{}-x", other)).join(file);
        prop_assert!(paths.remote_flow_dir(&project, &flow).is_err());
    }

    /// Normalization is idempotent and leaves no `.` components
    #[test]
    fn normalize_idempotent(segs in prop::collection::vec(
        prop_oneof![segment_strategy(), Just(".".to_string()), Just("..".to_string())],
        0..8,
    )) {
        let mut path = PathBuf::from("/");
        for seg in &segs {
            path.push(seg);
        }
        let once = normalize(&path);
        prop_assert_eq!(normalize(&once), once.clone());
        prop_assert!(once.is_absolute());
        prop_assert!(once.components().all(|c| !matches!(
            c,
            std::path::Component::CurDir | std::path::Component::ParentDir
        )));
    }
}

// =============================================================================
// Shell Escaping Properties
// =============================================================================

/// Undo single-quote escaping the way a POSIX shell reads a word
fn shell_unquote(word: &str) -> String {
    let mut out = String::new();
    let mut in_quotes = false;
    let mut chars = word.chars();
    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('\'', _) => in_quotes = !in_quotes,
            ('\\', false) => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            (c, _) => out.push(c),
        }
    }
    out
}

proptest! {
    /// Escaped strings read back unchanged
    #[test]
    fn shell_escape_roundtrip(s in "[ -~]{0,24}") {
        prop_assert_eq!(shell_unquote(&shell_escape(&s)), s);
    }

    /// Escaped strings never expose a bare space
    #[test]
    fn shell_escape_is_one_word(s in "[ -~]{1,24}") {
        let escaped = shell_escape(&s);
        if escaped.contains(' ') {
            prop_assert!(escaped.starts_with('\''));
        }
    }
}
