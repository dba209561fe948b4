use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no dataset files found in {0}")]
    NoInput(PathBuf),

    #[error("{file}: {source}")]
    Workbook {
        file: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("{0}: workbook has no worksheet")]
    NoWorksheet(PathBuf),

    #[error("{file}: header row {row} missing")]
    MissingHeader { file: PathBuf, row: usize },

    #[error("{0}: no date column")]
    NoDateColumn(PathBuf),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
