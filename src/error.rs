use crate::config::ConfigError;
use crate::parse::ReadError;
use crate::score::ScoreError;
use crate::solver::SolveError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("invalid placement: {0}")]
    Score(#[from] ScoreError),
    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}
