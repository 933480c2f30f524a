//! Finding each person's photo in the image folder.

use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use walkdir::WalkDir;

/// Collect the photos directly inside `dir` whose extension is in `extensions`.
///
/// Extensions are compared case-insensitively and without the leading dot.
/// The result is sorted by path.
pub fn collect_photos(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    anyhow::ensure!(
        dir.is_dir(),
        "image folder {} does not exist or is not a directory",
        dir.display()
    );

    let mut photos = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(true) {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let allowed = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            });
        if allowed {
            photos.push(entry.into_path());
        } else {
            debug!("Skipping non-image file {}", entry.path().display());
        }
    }
    photos.sort();
    Ok(photos)
}

/// Photos whose file name contains `name`.
pub fn matching_photos<'a>(photos: &'a [PathBuf], name: &str) -> Vec<&'a PathBuf> {
    photos
        .iter()
        .filter(|path| {
            path.file_name()
                .and_then(|file| file.to_str())
                .is_some_and(|file| file.contains(name))
        })
        .collect()
}

/// Ask which of several matching photos to use. Anything but a valid index
/// picks the first one.
pub fn prompt_photo_choice<R: BufRead, W: Write>(
    matches: &[&PathBuf],
    input: &mut R,
    output: &mut W,
) -> io::Result<usize> {
    for (index, path) in matches.iter().enumerate() {
        let file = path.file_name().map(|f| f.to_string_lossy()).unwrap_or_default();
        writeln!(output, "[{index}] {file}")?;
    }
    writeln!(output, "Which image should be used?")?;
    write!(output, "Enter one number [0]: ")?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    let answer = line.trim();
    if answer.is_empty() {
        return Ok(0);
    }
    match answer.parse::<usize>() {
        Ok(index) if index < matches.len() => Ok(index),
        _ => {
            warn!("'{answer}' is not a valid choice, using the first image");
            Ok(0)
        }
    }
}

/// Pick the photo for `name`, or `None` when nothing matches.
///
/// Several matches are resolved by prompting on the terminal when
/// `interactive` is set, and by taking the first one otherwise.
pub fn find_photo(photos: &[PathBuf], name: &str, interactive: bool) -> Result<Option<PathBuf>> {
    let matches = matching_photos(photos, name);
    debug!("Matched photos for '{name}': {matches:?}");

    let index = match matches.len() {
        0 => return Ok(None),
        1 => 0,
        _ if interactive => {
            let stdin = io::stdin();
            let stdout = io::stdout();
            prompt_photo_choice(&matches, &mut stdin.lock(), &mut stdout.lock())
                .context("failed to ask which photo to use")?
        }
        count => {
            warn!("{count} photos match '{name}', using {}", matches[0].display());
            0
        }
    };
    Ok(Some(matches[index].clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{fs, io::Cursor};
    use tempfile::tempdir;

    fn extensions() -> Vec<String> {
        ["jpg", "png"].iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn collects_only_allowed_extensions() {
        let dir = tempdir().unwrap();
        for file in ["b Ana.JPG", "a Ben.png", "notes.txt", "c Cleo.gif"] {
            fs::write(dir.path().join(file), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        let photos = collect_photos(dir.path(), &extensions()).unwrap();
        let names: Vec<_> = photos
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, ["a Ben.png", "b Ana.JPG"]);
    }

    #[test]
    fn missing_folder_is_an_error() {
        assert!(collect_photos(Path::new("/definitely/not/here"), &extensions()).is_err());
    }

    #[test]
    fn names_match_as_substrings() {
        let photos = vec![
            PathBuf::from("pics/001 Ana Lopez.jpg"),
            PathBuf::from("pics/002 Ana Lopez (2).jpg"),
            PathBuf::from("pics/Ben.jpg"),
        ];
        assert_eq!(matching_photos(&photos, "Ana Lopez").len(), 2);
        assert_eq!(matching_photos(&photos, "Ben"), vec![&photos[2]]);
        assert!(matching_photos(&photos, "Cleo").is_empty());
    }

    #[test]
    fn single_match_needs_no_prompt() {
        let photos = vec![PathBuf::from("Ben.jpg"), PathBuf::from("Ana.jpg")];
        assert_eq!(
            find_photo(&photos, "Ana", true).unwrap(),
            Some(PathBuf::from("Ana.jpg"))
        );
        assert_eq!(find_photo(&photos, "Zed", false).unwrap(), None);
    }

    #[test]
    fn several_matches_take_the_first_when_not_interactive() {
        let photos = vec![PathBuf::from("Ana 1.jpg"), PathBuf::from("Ana 2.jpg")];
        assert_eq!(
            find_photo(&photos, "Ana", false).unwrap(),
            Some(PathBuf::from("Ana 1.jpg"))
        );
    }

    #[test]
    fn prompt_accepts_valid_index_and_falls_back_otherwise() {
        let a = PathBuf::from("Ana 1.jpg");
        let b = PathBuf::from("Ana 2.jpg");
        let matches = [&a, &b];

        let mut out = Vec::new();
        let choice = prompt_photo_choice(&matches, &mut Cursor::new("1\n"), &mut out).unwrap();
        assert_eq!(choice, 1);
        let shown = String::from_utf8(out).unwrap();
        assert!(shown.contains("[0] Ana 1.jpg"));
        assert!(shown.contains("[1] Ana 2.jpg"));

        for answer in ["7\n", "two\n", "\n", ""] {
            let choice =
                prompt_photo_choice(&matches, &mut Cursor::new(answer), &mut Vec::new()).unwrap();
            assert_eq!(choice, 0, "answer {answer:?}");
        }
    }
}
