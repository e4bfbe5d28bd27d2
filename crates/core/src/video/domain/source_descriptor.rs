use std::fmt;
use std::path::{Path, PathBuf};

use crate::shared::constants::{DEFAULT_DIRECTORY_PATTERN, IMAGE_EXTENSIONS, STREAM_SCHEMES};

/// Where frames come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// A video container, or a single still image.
    File(PathBuf),
    /// Sorted files in a directory whose names match a wildcard pattern.
    Directory { path: PathBuf, pattern: String },
    /// An explicit, already ordered list of image files.
    FileList(Vec<PathBuf>),
    /// A local capture device, by index.
    Camera(u32),
    /// A network stream URL.
    Stream(String),
}

impl SourceDescriptor {
    /// Interprets a command-line style argument.
    ///
    /// All digits selects a camera, a known URL scheme a stream, an
    /// existing directory a directory source (with `pattern` or `*`), and
    /// anything else a file.
    pub fn parse(input: &str, pattern: Option<&str>) -> Self {
        if !input.is_empty() && input.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(index) = input.parse() {
                return SourceDescriptor::Camera(index);
            }
        }
        if let Some((scheme, _)) = input.split_once("://") {
            if STREAM_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
                return SourceDescriptor::Stream(input.to_string());
            }
        }
        let path = PathBuf::from(input);
        if path.is_dir() {
            return SourceDescriptor::Directory {
                path,
                pattern: pattern.unwrap_or(DEFAULT_DIRECTORY_PATTERN).to_string(),
            };
        }
        SourceDescriptor::File(path)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        SourceDescriptor::Directory {
            path: path.into(),
            pattern: DEFAULT_DIRECTORY_PATTERN.to_string(),
        }
    }

    /// True for sources with a known, finite length.
    pub fn is_finite(&self) -> bool {
        !matches!(
            self,
            SourceDescriptor::Camera(_) | SourceDescriptor::Stream(_)
        )
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::File(path) => write!(f, "{}", path.display()),
            SourceDescriptor::Directory { path, pattern } => {
                write!(f, "{}", path.join(pattern).display())
            }
            SourceDescriptor::FileList(paths) => write!(f, "<list of {} files>", paths.len()),
            SourceDescriptor::Camera(index) => write!(f, "camera {index}"),
            SourceDescriptor::Stream(url) => f.write_str(url),
        }
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Shell-style wildcard match on a file name: `*` matches any run of
/// characters, `?` exactly one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star_p, star_n)) = backtrack {
            pi = star_p + 1;
            ni = star_n + 1;
            backtrack = Some((star_p, star_n + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}
