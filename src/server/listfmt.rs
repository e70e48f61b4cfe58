//! Renders directory entries in the three supported listing formats: classic
//! `ls -l` lines for LIST, the Easily Parsed LIST Format (EPLF), and the RFC
//! 3659 machine readable fact lines used by MLSD/MLST.

use crate::server::options::ListFormat;
use crate::storage::{Fileinfo, Metadata};

use chrono::{DateTime, Utc};
use std::path::Path;

// Entries younger than this render a time of day, older ones a year, the way
// ls has always done it.
const SIX_MONTHS_SECS: i64 = 60 * 60 * 24 * 182;

fn basename<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.as_ref().to_string_lossy().trim_end_matches('/').to_string())
}

fn modified_utc<M: Metadata>(metadata: &M) -> DateTime<Utc> {
    metadata.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

/// Renders one entry in the given format.
pub fn format_line<P, M>(format: ListFormat, fi: &Fileinfo<P, M>, now: DateTime<Utc>, facts: &[String]) -> String
where
    P: AsRef<Path>,
    M: Metadata,
{
    match format {
        ListFormat::Ls => ls_line(fi, now),
        ListFormat::Ep => eplf_line(fi),
        ListFormat::Mlsd => mlsd_line(fi, facts),
    }
}

/// `<perm> 1 1 1 <size, width 12> <Mmm dd HH:MM | Mmm dd  yyyy> <name>`
pub fn ls_line<P, M>(fi: &Fileinfo<P, M>, now: DateTime<Utc>) -> String
where
    P: AsRef<Path>,
    M: Metadata,
{
    let modified = modified_utc(&fi.metadata);
    let date = if now.signed_duration_since(modified).num_seconds() < SIX_MONTHS_SECS {
        modified.format("%b %d %H:%M")
    } else {
        modified.format("%b %d  %Y")
    };
    format!(
        "{}{} 1 1 1 {:>12} {} {}",
        if fi.metadata.is_dir() { "d" } else { "-" },
        fi.metadata.permissions(),
        fi.metadata.len(),
        date,
        basename(&fi.path),
    )
}

/// `+s<size>,m<unix ts>,up<mode octal>,(/ | r)\t<name>`
pub fn eplf_line<P, M>(fi: &Fileinfo<P, M>) -> String
where
    P: AsRef<Path>,
    M: Metadata,
{
    let modified = modified_utc(&fi.metadata);
    format!(
        "+s{},m{},up{:o},{}\t{}",
        fi.metadata.len(),
        modified.timestamp(),
        fi.metadata.permissions().0 & 0o7777,
        if fi.metadata.is_dir() { "/" } else { "r" },
        basename(&fi.path),
    )
}

/// Semicolon joined facts, a space, then the name:
/// `Type=file;Size=10;Modify=20240102030405;Perm=radwf;UNIX.mode=0644; readme.txt`
pub fn mlsd_line<P, M>(fi: &Fileinfo<P, M>, facts: &[String]) -> String
where
    P: AsRef<Path>,
    M: Metadata,
{
    let mut line = String::new();
    for fact in facts {
        match fact.to_uppercase().as_str() {
            "TYPE" => line.push_str(if fi.metadata.is_dir() { "Type=dir;" } else { "Type=file;" }),
            "SIZE" => line.push_str(&format!("Size={};", fi.metadata.len())),
            "MODIFY" => line.push_str(&format!("Modify={};", modified_utc(&fi.metadata).format("%Y%m%d%H%M%S"))),
            "PERM" => line.push_str(&format!("Perm={};", perm_fact(&fi.metadata))),
            "UNIX.MODE" => line.push_str(&format!("UNIX.mode={:04o};", fi.metadata.permissions().0 & 0o7777)),
            _ => {}
        }
    }
    line.push(' ');
    line.push_str(&basename(&fi.path));
    line
}

// RFC 3659 "perm" fact. Directories can be entered and listed, and modified
// when the owner-write bit is on; files can be read when owner-read is on
// and appended/deleted/written when owner-write is on.
fn perm_fact<M: Metadata>(metadata: &M) -> String {
    let mode = metadata.permissions().0;
    let mut perms = String::new();
    if metadata.is_dir() {
        perms.push_str("el");
        if mode & 0o200 > 0 {
            perms.push_str("cmdfp");
        }
    } else {
        if mode & 0o400 > 0 {
            perms.push('r');
        }
        if mode & 0o200 > 0 {
            perms.push_str("adwf");
        }
    }
    perms
}

/// Renders a complete listing with CRLF line endings, ready for the data
/// channel.
pub fn render_listing<P, M>(entries: &[Fileinfo<P, M>], format: ListFormat, facts: &[String]) -> Vec<u8>
where
    P: AsRef<Path>,
    M: Metadata,
{
    let now = Utc::now();
    entries
        .iter()
        .map(|fi| format!("{}\r\n", format_line(format, fi, now, facts)))
        .collect::<String>()
        .into_bytes()
}

/// Renders the bare-name listing used by NLST.
pub fn render_names<P, M>(entries: &[Fileinfo<P, M>]) -> Vec<u8>
where
    P: AsRef<Path>,
    M: Metadata,
{
    entries.iter().map(|fi| format!("{}\r\n", basename(&fi.path))).collect::<String>().into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::session::default_mlst_facts;
    use crate::storage::{Fileinfo, Permissions};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    #[derive(Debug, Clone)]
    struct Meta {
        size: u64,
        is_dir: bool,
        modified: SystemTime,
    }

    impl Metadata for Meta {
        fn len(&self) -> u64 {
            self.size
        }
        fn is_dir(&self) -> bool {
            self.is_dir
        }
        fn is_file(&self) -> bool {
            !self.is_dir
        }
        fn modified(&self) -> crate::storage::Result<SystemTime> {
            Ok(self.modified)
        }
    }

    // 2024-01-02T03:04:05Z
    fn mtime() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_704_164_645)
    }

    fn file(name: &str, size: u64) -> Fileinfo<PathBuf, Meta> {
        Fileinfo {
            path: PathBuf::from(name),
            metadata: Meta {
                size,
                is_dir: false,
                modified: mtime(),
            },
        }
    }

    fn dir(name: &str) -> Fileinfo<PathBuf, Meta> {
        Fileinfo {
            path: PathBuf::from(name),
            metadata: Meta {
                size: 0,
                is_dir: true,
                modified: mtime(),
            },
        }
    }

    #[test]
    fn ls_recent_file_shows_time() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(ls_line(&file("readme.txt", 10), now), "-rw-r--r-- 1 1 1           10 Jan 02 03:04 readme.txt");
    }

    #[test]
    fn ls_old_file_shows_year() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(ls_line(&file("readme.txt", 10), now), "-rw-r--r-- 1 1 1           10 Jan 02  2024 readme.txt");
    }

    #[test]
    fn ls_directory_mode() {
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        assert_eq!(ls_line(&dir("sub"), now), "drwxr-xr-x 1 1 1            0 Jan 02 03:04 sub");
    }

    #[test]
    fn eplf_file_and_dir() {
        assert_eq!(eplf_line(&file("readme.txt", 10)), "+s10,m1704164645,up644,r\treadme.txt");
        assert_eq!(eplf_line(&dir("sub")), "+s0,m1704164645,up755,/\tsub");
    }

    #[test]
    fn mlsd_full_facts() {
        assert_eq!(
            mlsd_line(&file("readme.txt", 10), &default_mlst_facts()),
            "Type=file;Size=10;Modify=20240102030405;Perm=radwf;UNIX.mode=0644; readme.txt"
        );
        assert_eq!(
            mlsd_line(&dir("sub"), &default_mlst_facts()),
            "Type=dir;Size=0;Modify=20240102030405;Perm=elcmdfp;UNIX.mode=0755; sub"
        );
    }

    #[test]
    fn mlsd_narrowed_facts() {
        let facts = vec!["Type".to_string(), "Size".to_string()];
        assert_eq!(mlsd_line(&file("readme.txt", 10), &facts), "Type=file;Size=10; readme.txt");
    }

    #[test]
    fn nlst_renders_bare_names() {
        let listing = render_names(&[file("a.txt", 1), dir("sub")]);
        assert_eq!(String::from_utf8(listing).unwrap(), "a.txt\r\nsub\r\n");
    }

    #[test]
    fn permissions_render_rwx_triplets() {
        assert_eq!(format!("{}", Permissions(0o644)), "rw-r--r--");
        assert_eq!(format!("{}", Permissions(0o755)), "rwxr-xr-x");
    }
}
