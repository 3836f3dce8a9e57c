use std::path::PathBuf;

/// Broad class of a failure, used by front ends to pick an exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Required input (q-points, parameters) was never supplied.
    Configuration,
    /// Inputs disagree with each other, e.g. an atom type without a scattering length.
    DataIntegrity,
    InvalidInput,
    /// A statistic is undefined for the given sample count.
    Statistical,
    Parse,
    Io,
    Fit,
}

impl ErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::InvalidInput => 2,
            Self::Parse => 3,
            Self::Io => 3,
            Self::DataIntegrity => 4,
            Self::Statistical => 4,
            Self::Fit => 5,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::DataIntegrity => "data integrity",
            Self::InvalidInput => "invalid input",
            Self::Statistical => "statistics",
            Self::Parse => "parse",
            Self::Io => "io",
            Self::Fit => "fit",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MdReflError {
    #[error("no q vectors have been defined, read a .dat file or generate a q grid")]
    NoQPoints,
    #[error("no scattering length for atom type '{0}'")]
    MissingScatteringLength(String),
    #[error("cannot average an empty ensemble")]
    EmptyEnsemble,
    #[error("layer count mismatch between frames: expected {expected}, found {found}")]
    LayerCountMismatch { expected: usize, found: usize },
    #[error("reflectivity curve length mismatch: expected {expected} points, found {found}")]
    CurveLengthMismatch { expected: usize, found: usize },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{}line {line}: {message}", source_prefix(.path))]
    Parse {
        path: Option<PathBuf>,
        line: usize,
        message: String,
    },
    #[error("no experimental intensities to compare against")]
    NoExperimentalIntensity,
    #[error("fit failed: {0}")]
    FitFailed(String),
    #[error("snapshot error: {0}")]
    Snapshot(String),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn source_prefix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!("{}: ", p.display()),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, MdReflError>;

impl MdReflError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NoQPoints => ErrorCategory::Configuration,
            Self::MissingScatteringLength(_) => ErrorCategory::DataIntegrity,
            Self::LayerCountMismatch { .. } | Self::CurveLengthMismatch { .. } => {
                ErrorCategory::InvalidInput
            }
            Self::EmptyEnsemble => ErrorCategory::Statistical,
            Self::InvalidInput(_) => ErrorCategory::InvalidInput,
            Self::Parse { .. } | Self::Snapshot(_) => ErrorCategory::Parse,
            Self::NoExperimentalIntensity => ErrorCategory::Configuration,
            Self::FitFailed(_) => ErrorCategory::Fit,
            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            path: None,
            line,
            message: message.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the file a parse error came from.
    pub(crate) fn in_file(self, file: impl Into<PathBuf>) -> Self {
        match self {
            Self::Parse { line, message, .. } => Self::Parse {
                path: Some(file.into()),
                line,
                message,
            },
            other => other,
        }
    }
}
