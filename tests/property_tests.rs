//! Property-based tests for command rendering and output parsing.

use proptest::prelude::*;

use gitter_access::git::command::{Command, CommandArgument, split_command_line};
use gitter_access::git::config::parse_config_list;
use gitter_access::git::diff::parse_diff;
use gitter_access::git::history::parse_revisions;
use gitter_access::git::refs::parse_tags;
use gitter_access::git::remotes::parse_remotes;
use gitter_access::models::{ConfigFile, DiffType, TagType};

/// Strategy for generating valid hex object hashes.
fn object_hash() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::sample::select(vec![
            '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
        ]),
        40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn config_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,8}\\.[a-zA-Z][a-zA-Z0-9]{0,8}"
}

proptest! {
    /// The printed form of a command splits back into its exact argv.
    #[test]
    fn command_display_splits_to_argv(
        name in "[a-z][a-z-]{0,11}",
        args in prop::collection::vec(any::<String>(), 0..6),
    ) {
        let command = Command::new(
            &name,
            args.iter().map(|a| CommandArgument::new(a.as_str())).collect(),
        )
        .unwrap();
        let argv: Vec<String> = command.argv().map(str::to_string).collect();
        prop_assert_eq!(split_command_line(&command.to_string()).unwrap(), argv);
    }

    /// Entries written in git's `--null --list` layout parse back unchanged.
    #[test]
    fn config_listing_roundtrip(
        entries in prop::collection::vec((config_name(), "[^\\x00]{0,20}"), 0..8),
    ) {
        let text: String = entries
            .iter()
            .map(|(name, value)| format!("{}\n{}\0", name, value))
            .collect();
        let parsed = parse_config_list(&text, &ConfigFile::Repository);
        let pairs: Vec<(String, String)> = parsed
            .into_iter()
            .map(|p| (p.name, p.value))
            .collect();
        prop_assert_eq!(pairs, entries);
    }

    #[test]
    fn tag_listing_keeps_order(
        tags in prop::collection::btree_map(
            "[a-zA-Z0-9._-]{1,16}",
            (object_hash(), any::<bool>()),
            0..8,
        ),
    ) {
        let tag_object = "f".repeat(40);
        let mut text = String::new();
        for (name, (hash, annotated)) in &tags {
            if *annotated {
                text.push_str(&format!("{} refs/tags/{}\n", tag_object, name));
                text.push_str(&format!("{} refs/tags/{}^{{}}\n", hash, name));
            } else {
                text.push_str(&format!("{} refs/tags/{}\n", hash, name));
            }
        }

        let parsed = parse_tags(&text);
        prop_assert_eq!(parsed.len(), tags.len());
        for (record, (name, (hash, annotated))) in parsed.iter().zip(&tags) {
            prop_assert_eq!(&record.name, name);
            prop_assert_eq!(&record.hash, hash);
            let expected = if *annotated { TagType::Annotated } else { TagType::Lightweight };
            prop_assert_eq!(record.tag_type, expected);
        }
    }

    /// Parsers degrade on garbage instead of panicking, and are deterministic.
    #[test]
    fn parsers_tolerate_arbitrary_input(text in any::<String>()) {
        prop_assert_eq!(
            parse_config_list(&text, &ConfigFile::User),
            parse_config_list(&text, &ConfigFile::User)
        );
        prop_assert_eq!(parse_revisions(&text), parse_revisions(&text));
        prop_assert_eq!(parse_tags(&text), parse_tags(&text));
        prop_assert_eq!(parse_remotes(&text), parse_remotes(&text));
        prop_assert_eq!(
            parse_diff(&text, DiffType::WorkingTree),
            parse_diff(&text, DiffType::WorkingTree)
        );
    }

    /// Garbage wrapped in diff headers still parses without panicking.
    #[test]
    fn diff_parser_tolerates_broken_hunks(
        header in "@@ -[0-9]{1,10}(,[0-9]{1,10})? \\+[0-9]{1,10}(,[0-9]{1,10})? @@.{0,10}",
        body in prop::collection::vec("[ +\\-\\\\]?.{0,12}", 0..10),
    ) {
        let text = format!("diff --git a/f b/f\n{}\n{}\n", header, body.join("\n"));
        let diff = parse_diff(&text, DiffType::Revisions);
        prop_assert_eq!(diff.file_count(), 1);
    }
}
