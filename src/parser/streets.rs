use std::sync::LazyLock;

use regex::Regex;

static WIDE_GAP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").unwrap());
static STREET_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i) (ST|STREET|AVE|AVENUE|RD|ROAD|BLVD|BOULEVARD|PKWY|PARKWAY|PL|PLACE|DR|DRIVE|CT|COURT|HWY|HIGHWAY|WAY|LANE|LN|EXPWY|EXPRESSWAY)$",
    )
    .unwrap()
});

/// Decompose a row's street-name block into `[on, from, to]`.
///
/// Wide whitespace gaps are tried first; when they don't give exactly three
/// names, words are accumulated until the name ends in a street-type suffix.
/// Missing slots are empty strings.
pub fn split_streets(block: &str) -> [String; 3] {
    let tokens: Vec<&str> = WIDE_GAP_RE
        .split(block)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();
    if let [on, from, to] = tokens.as_slice() {
        return [on.to_string(), from.to_string(), to.to_string()];
    }

    let mut streets: Vec<String> = Vec::with_capacity(3);
    let mut buf: Vec<&str> = Vec::new();
    for word in block.split_whitespace() {
        buf.push(word);
        let joined = buf.join(" ");
        if STREET_TYPE_RE.is_match(&joined) {
            streets.push(joined);
            buf.clear();
        }
        if streets.len() == 3 {
            break;
        }
    }
    if !buf.is_empty() && streets.len() < 3 {
        streets.push(buf.join(" "));
    }

    let mut out: [String; 3] = Default::default();
    for (slot, name) in out.iter_mut().zip(streets) {
        *slot = name;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(block: &str) -> [String; 3] {
        split_streets(block)
    }

    #[test]
    fn wide_gaps() {
        assert_eq!(split("A  B  C"), ["A", "B", "C"]);
        assert_eq!(
            split("GRAND CONCOURSE   E 183 ST \t E 184 ST"),
            ["GRAND CONCOURSE", "E 183 ST", "E 184 ST"]
        );
    }

    #[test]
    fn suffix_scan() {
        assert_eq!(split("MAIN ST OAK AVE 5TH BLVD"), ["MAIN ST", "OAK AVE", "5TH BLVD"]);
        assert_eq!(split("4 AVE 9 ST 10 ST"), ["4 AVE", "9 ST", "10 ST"]);
        assert_eq!(
            split("hylan boulevard mill rd Guyon Avenue"),
            ["hylan boulevard", "mill rd", "Guyon Avenue"]
        );
    }

    #[test]
    fn two_gap_tokens_fall_back_to_scan() {
        assert_eq!(split("JEROME AVE  BURNSIDE AVE"), ["JEROME AVE", "BURNSIDE AVE", ""]);
    }

    #[test]
    fn unclosed_tail_becomes_next_street() {
        assert_eq!(split("MAIN ST OAK AVE BROADWAY"), ["MAIN ST", "OAK AVE", "BROADWAY"]);
        assert_eq!(split("BROADWAY W 72"), ["BROADWAY W 72", "", ""]);
    }

    #[test]
    fn words_after_third_street_are_ignored() {
        assert_eq!(split("A ST B ST C ST D ST"), ["A ST", "B ST", "C ST"]);
    }

    #[test]
    fn suffix_must_be_a_trailing_word() {
        // EAST and WESTWAY do not end in a standalone suffix word.
        assert_eq!(split("EAST WESTWAY MAIN ST"), ["EAST WESTWAY MAIN ST", "", ""]);
        // A lone leading suffix word has no preceding space to match.
        assert_eq!(split("ST MARKS PL 2 AVE 3 AVE"), ["ST MARKS PL", "2 AVE", "3 AVE"]);
    }

    #[test]
    fn early_false_positive_is_kept() {
        assert_eq!(
            split("PARK PLACE SOUTH 5 AVE 6 AVE"),
            ["PARK PLACE", "SOUTH 5 AVE", "6 AVE"]
        );
    }

    #[test]
    fn empty_block() {
        assert_eq!(split(""), ["", "", ""]);
        assert_eq!(split("   "), ["", "", ""]);
    }
}
