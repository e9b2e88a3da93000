//! File selection for `yeticli addfiles`.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Uploads above this many files ask for confirmation.
const CONFIRM_ABOVE: usize = 2;

/// Files selected for upload.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadPlan {
    /// The path the user asked for, made absolute.
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
    /// Directories passed over because `--recurse` was not given.
    pub skipped: Vec<PathBuf>,
}

/// Select the files to upload for `path`.
///
/// `path` is expanded as a glob pattern, so `samples/*.exe` can name several
/// files; a plain path expands to itself. A matched directory is skipped
/// unless `recurse` is set, in which case every regular file below it is
/// selected. Matches come back in a stable order. Nothing matching selects
/// nothing.
pub fn collect_paths(path: &Path, recurse: bool) -> io::Result<UploadPlan> {
    let root = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let pattern = root.to_string_lossy().into_owned();
    let mut plan = UploadPlan {
        root,
        ..Default::default()
    };

    let matches = glob::glob(&pattern)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    for matched in matches {
        let matched = matched.map_err(glob::GlobError::into_error)?;
        if matched.is_dir() {
            if recurse {
                walk(&matched, &mut plan.files)?;
            } else {
                plan.skipped.push(matched);
            }
        } else if matched.is_file() {
            plan.files.push(matched);
        }
    }

    Ok(plan)
}

fn walk(dir: &Path, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(())
}

/// Ask before uploading more than a couple of files.
///
/// Lists the files and reads one line of `input`. An empty answer or `y`
/// proceeds; anything else declines.
pub fn confirm_upload<R: BufRead, W: Write>(
    plan: &UploadPlan,
    mut input: R,
    mut output: W,
) -> io::Result<bool> {
    if plan.files.len() <= CONFIRM_ABOVE {
        return Ok(true);
    }

    for file in &plan.files {
        writeln!(output, "{}", file.display())?;
    }
    write!(
        output,
        "You are about to upload {} files from '{}' to Yeti. Proceed? [Y/n] ",
        plan.files.len(),
        plan.root.display()
    )?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y"))
}

/// Split `--tags a,b` into trimmed, non-empty tag names.
pub fn parse_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
