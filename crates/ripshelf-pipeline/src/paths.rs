//! Workspace layout and library naming.

use std::io;
use std::path::{Path, PathBuf};

use ripshelf_domain::JobId;

/// Characters most library filesystems refuse in names.
const FORBIDDEN: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Create `staging/`, `encoding/`, `logs/` and `data/` under the workspace
/// root. Idempotent.
pub fn ensure_workspace_layout(workspace_root: &Path) -> io::Result<()> {
    for dir in ["staging", "encoding", "logs", "data"] {
        std::fs::create_dir_all(workspace_root.join(dir))?;
    }
    Ok(())
}

/// Rip artifacts for one job live here while the pipeline owns them.
pub fn staging_dir(workspace_root: &Path, id: JobId) -> PathBuf {
    workspace_root.join("staging").join(format!("job_{}", id))
}

/// Encoded output for one job lives here until the mover files it.
pub fn encoding_dir(workspace_root: &Path, id: JobId) -> PathBuf {
    workspace_root.join("encoding").join(format!("job_{}", id))
}

/// Strip characters library filesystems disallow and trim leading/trailing
/// dots and whitespace.
pub fn sanitize_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| !FORBIDDEN.contains(c))
        .collect::<String>()
        .trim_matches(|c: char| c == '.' || c.is_whitespace())
        .to_string()
}

/// Canonical movie destination: `<Title> (<Year>)/<Title> (<Year>).<ext>`
/// under the movies root. Without a year the parenthetical is omitted.
pub fn movie_destination(
    movies_root: &Path,
    title: &str,
    year: Option<i32>,
    extension: &str,
) -> PathBuf {
    let title = sanitize_title(title);
    let stem = match year {
        Some(year) => format!("{} ({})", title, year),
        None => title,
    };
    movies_root.join(&stem).join(format!("{}.{}", stem, extension))
}

/// Canonical episode filename: `<Show> - SxxEyy - <Title>.<ext>`.
///
/// The tv-season lifecycle is not wired up yet; the naming contract lives
/// here so the mover grows into it without renaming anything.
pub fn episode_filename(
    show: &str,
    season: u32,
    episode: u32,
    title: &str,
    extension: &str,
) -> String {
    format!(
        "{} - S{:02}E{:02} - {}.{}",
        sanitize_title(show),
        season,
        episode,
        sanitize_title(title),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_removes_forbidden_characters() {
        assert_eq!(sanitize_title("A:B/C?"), "ABC");
        assert_eq!(sanitize_title("Who? What: Where\\"), "Who What Where");
        assert_eq!(sanitize_title("plain title"), "plain title");
    }

    #[test]
    fn sanitize_trims_dots_and_whitespace() {
        assert_eq!(sanitize_title("  Vertigo. "), "Vertigo");
        assert_eq!(sanitize_title("...hidden..."), "hidden");
    }

    #[test]
    fn movie_destination_with_year() {
        let dest = movie_destination(Path::new("/Volumes/Movies"), "The Matrix", Some(1999), "mkv");
        assert_eq!(
            dest,
            PathBuf::from("/Volumes/Movies/The Matrix (1999)/The Matrix (1999).mkv")
        );
    }

    #[test]
    fn movie_destination_without_year() {
        let dest = movie_destination(Path::new("/m"), "Unknown Disc", None, "mkv");
        assert_eq!(dest, PathBuf::from("/m/Unknown Disc/Unknown Disc.mkv"));
    }

    #[test]
    fn movie_destination_sanitizes() {
        let dest = movie_destination(Path::new("/m"), "Face/Off", Some(1997), "mkv");
        assert_eq!(dest, PathBuf::from("/m/FaceOff (1997)/FaceOff (1997).mkv"));
    }

    #[test]
    fn episode_naming() {
        assert_eq!(
            episode_filename("Breaking Bad", 4, 2, "Thirty-Eight Snub", "mkv"),
            "Breaking Bad - S04E02 - Thirty-Eight Snub.mkv"
        );
    }

    #[test]
    fn job_directories() {
        let ws = Path::new("/ws");
        assert_eq!(staging_dir(ws, JobId::new(7)), PathBuf::from("/ws/staging/job_7"));
        assert_eq!(encoding_dir(ws, JobId::new(7)), PathBuf::from("/ws/encoding/job_7"));
    }

    #[test]
    fn workspace_layout_is_idempotent() {
        let dir = tempfile::TempDir::new().unwrap();
        ensure_workspace_layout(dir.path()).unwrap();
        ensure_workspace_layout(dir.path()).unwrap();
        for sub in ["staging", "encoding", "logs", "data"] {
            assert!(dir.path().join(sub).is_dir());
        }
    }
}
