//! Parsing of command response text

use serde::Serialize;

use crate::constants::protocol::PLAYER_LIST_MARKER;

/// Online players reported by the `list` command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerList {
    pub players: Vec<String>,
    pub online: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
}

impl PlayerList {
    /// Parse `list` output
    ///
    /// `online` prefers the count the server printed and falls back to the
    /// number of names found.
    #[must_use]
    pub fn parse(response: &str) -> Self {
        let players = parse_player_list(response);
        let counts = parse_player_counts(response);
        Self {
            online: counts
                .map(|(online, _)| online as usize)
                .unwrap_or(players.len()),
            max: counts.map(|(_, max)| max),
            players,
        }
    }
}

/// Extract player names following the `players online:` marker
///
/// A response without the marker yields an empty list.
#[must_use]
pub fn parse_player_list(response: &str) -> Vec<String> {
    let Some((_, tail)) = response.rsplit_once(PLAYER_LIST_MARKER) else {
        return Vec::new();
    };
    tail.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extract `(online, max)` from text such as `There are 2 of a max of 20`
/// or `There are 2/20 players online`
#[must_use]
pub fn parse_player_counts(response: &str) -> Option<(u32, u32)> {
    let head = response
        .split_once(PLAYER_LIST_MARKER)
        .map_or(response, |(head, _)| head);
    let mut words = head.split_whitespace().skip_while(|w| *w != "are").skip(1);

    let first = words.next()?;
    if let Some((online, max)) = first.split_once('/') {
        return Some((online.parse().ok()?, max.parse().ok()?));
    }
    let online = first.parse().ok()?;

    let max = words
        .skip_while(|w| *w != "max")
        .skip(1)
        .find(|w| *w != "of")?
        .parse()
        .ok()?;
    Some((online, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_list_two_names() {
        let names = parse_player_list("There are 2 of max 20 players online: alice, bob");
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_player_list_without_marker_is_empty() {
        assert!(parse_player_list("Unknown command").is_empty());
    }

    #[test]
    fn test_player_list_nobody_online() {
        assert!(parse_player_list("There are 0 of a max of 20 players online: ").is_empty());
    }

    #[test]
    fn test_player_list_drops_empty_entries() {
        let names = parse_player_list("players online: alice,, ,bob ,");
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_counts_of_max_form() {
        assert_eq!(
            parse_player_counts("There are 2 of max 20 players online: alice, bob"),
            Some((2, 20))
        );
    }

    #[test]
    fn test_counts_of_a_max_of_form() {
        assert_eq!(
            parse_player_counts("There are 3 of a max of 50 players online: a, b, c"),
            Some((3, 50))
        );
    }

    #[test]
    fn test_counts_slash_form() {
        assert_eq!(
            parse_player_counts("There are 1/10 players online: steve"),
            Some((1, 10))
        );
    }

    #[test]
    fn test_counts_absent() {
        assert_eq!(parse_player_counts("Unknown command"), None);
    }

    #[test]
    fn test_player_list_struct() {
        let list = PlayerList::parse("There are 2 of max 20 players online: alice, bob");
        assert_eq!(list.online, 2);
        assert_eq!(list.max, Some(20));
        assert_eq!(list.players, vec!["alice", "bob"]);
    }

    #[test]
    fn test_player_list_struct_falls_back_to_name_count() {
        let list = PlayerList::parse("players online: alice");
        assert_eq!(list.online, 1);
        assert_eq!(list.max, None);
    }
}
