//! Directory entries parsed from `ls -l` output.

use chrono::{DateTime, NaiveDate, Utc};
use log::trace;
use serde::{Serialize, Serializer};

use super::timestamp::listing_timestamp;

/// Minimum number of whitespace separated fields in an entry line.
const MIN_FIELDS: usize = 9;

/// Entry type, from the first character of the mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    /// `-`
    File,
    /// `d`
    Directory,
    /// `l`
    Symlink,
    /// Any other type character (`c`, `b`, `p`, `s`).
    Other(char),
}

impl FileType {
    /// Decode a mode string's type character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(FileType::File),
            'd' => Some(FileType::Directory),
            'l' => Some(FileType::Symlink),
            'c' | 'b' | 'p' | 's' | 'D' => Some(FileType::Other(c)),
            _ => None,
        }
    }

    /// The type character as printed by `ls -l`.
    pub fn as_char(self) -> char {
        match self {
            FileType::File => '-',
            FileType::Directory => 'd',
            FileType::Symlink => 'l',
            FileType::Other(c) => c,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_char(self.as_char())
    }
}

/// Permission letters for user, group and other, with `-` placeholders
/// removed (`rwxr-x---` gives `rwx`, `rx`, ``).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub user: String,
    pub group: String,
    pub other: String,
}

impl Permissions {
    /// Decode the nine permission characters following the type character.
    pub fn from_mode(mode: &str) -> Self {
        let triad = |range: std::ops::Range<usize>| -> String {
            mode.chars()
                .skip(range.start)
                .take(range.len())
                .filter(|c| *c != '-')
                .collect()
        };
        Self {
            user: triad(1..4),
            group: triad(4..7),
            other: triad(7..10),
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntry {
    #[serde(rename = "type")]
    pub file_type: FileType,
    pub name: String,
    /// Target of a symbolic link.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_target: Option<String>,
    pub size: u64,
    pub modify_time: Option<DateTime<Utc>>,
    /// Same as `modify_time`; listings only carry one timestamp.
    pub access_time: Option<DateTime<Utc>>,
    pub rights: Permissions,
    pub owner: String,
    pub group: String,
}

impl DirEntry {
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

/// Parse one `ls -l` line.
///
/// Lines with fewer than nine fields, or whose first field is not a mode
/// string, are not entries and give `None`.
pub fn parse_listing_line(line: &str, today: NaiveDate) -> Option<DirEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let mode = fields[0];
    let file_type = mode.chars().next().and_then(FileType::from_char)?;
    if mode.chars().count() < 10 {
        return None;
    }
    let size = fields[4].parse().ok()?;

    let modify_time = listing_timestamp(fields[5], fields[6], fields[7], today);
    if modify_time.is_none() {
        trace!("listing: unparsed timestamp in {:?}", line);
    }

    let full_name = fields[MIN_FIELDS - 1..].join(" ");
    let (name, link_target) = match (file_type, full_name.split_once(" -> ")) {
        (FileType::Symlink, Some((name, target))) => (name.to_string(), Some(target.to_string())),
        _ => (full_name, None),
    };

    Some(DirEntry {
        file_type,
        name,
        link_target,
        size,
        modify_time,
        access_time: modify_time,
        rights: Permissions::from_mode(mode),
        owner: fields[2].to_string(),
        group: fields[3].to_string(),
    })
}

/// Parse every entry line of a listing, in order, skipping the rest.
pub fn parse_listing<'a, I>(lines: I, today: NaiveDate) -> Vec<DirEntry>
where
    I: IntoIterator<Item = &'a str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_listing_line(line, today))
        .collect()
}
