//! Reader for the whitespace-separated problem format.
//!
//! ```text
//! V E R C X
//! size_0 size_1 ... size_{V-1}
//! L_dc K            (once per endpoint)
//! cache latency     (K lines)
//! video endpoint n  (R lines)
//! ```

use crate::types::{Endpoint, Placement, Problem, Request};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::{FromStr, Lines};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based line number of the offending line.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unexpected end of input, expected {0}")]
    UnexpectedEof(&'static str),
    #[error("expected {expected} tokens ({what}), found {found}")]
    TokenCount {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("invalid integer {0:?}")]
    InvalidInteger(String),
    #[error("{what} {value} out of range (must be below {limit})")]
    OutOfRange {
        what: &'static str,
        value: usize,
        limit: usize,
    },
    #[error("unexpected trailing input")]
    TrailingInput,
}

#[derive(Error, Debug)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Read and parse a problem file.
pub fn read_problem(path: &Path) -> Result<Problem, ReadError> {
    let buf = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_problem(&buf)?)
}

/// Read and parse a placement file in the output format.
pub fn read_placement(path: &Path) -> Result<Placement, ReadError> {
    let buf = std::fs::read_to_string(path).map_err(|source| ReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_placement(&buf)?)
}

pub fn parse_problem(input: &str) -> Result<Problem, ParseError> {
    let mut reader = LineReader::new(input);

    let header: [u64; 5] = reader.fixed("header (V E R C X)")?;
    let [videos, endpoints, requests, caches, capacity] = header;
    let (videos, endpoint_count, request_count, cache_count) = (
        videos as usize,
        endpoints as usize,
        requests as usize,
        caches as usize,
    );

    let video_sizes = reader.exactly::<u64>("video sizes", videos)?;

    let mut parsed_endpoints = Vec::with_capacity(endpoint_count);
    for _ in 0..endpoint_count {
        let [datacenter_latency, connections] = reader.fixed::<u64, 2>("endpoint (L_dc K)")?;
        let mut cache_latencies = BTreeMap::new();
        for _ in 0..connections {
            let [cache, latency] = reader.fixed::<u64, 2>("cache connection (cache latency)")?;
            let cache = reader.in_range("cache id", cache as usize, cache_count)?;
            // A repeated cache id keeps the last latency seen.
            cache_latencies.insert(cache, latency);
        }
        parsed_endpoints.push(Endpoint {
            datacenter_latency,
            cache_latencies,
        });
    }

    let mut parsed_requests = Vec::with_capacity(request_count);
    for _ in 0..request_count {
        let [video, endpoint, count] = reader.fixed::<u64, 3>("request (video endpoint n)")?;
        let video = reader.in_range("video id", video as usize, videos)?;
        let endpoint = reader.in_range("endpoint id", endpoint as usize, endpoint_count)?;
        parsed_requests.push(Request {
            video,
            endpoint,
            count,
        });
    }

    reader.finish()?;

    Ok(Problem {
        video_sizes,
        endpoints: parsed_endpoints,
        requests: parsed_requests,
        cache_count,
        cache_capacity: capacity,
    })
}

pub fn parse_placement(input: &str) -> Result<Placement, ParseError> {
    let mut reader = LineReader::new(input);
    let [lines] = reader.fixed::<usize, 1>("cache count")?;

    let mut placement = Placement::default();
    for _ in 0..lines {
        let tokens = reader.tokens::<usize>("cache line (cache video...)")?;
        let Some((&cache, videos)) = tokens.split_first() else {
            return Err(reader.error(ParseErrorKind::TokenCount {
                what: "cache line (cache video...)",
                expected: 1,
                found: 0,
            }));
        };
        for &video in videos {
            placement.insert(cache, video);
        }
    }

    reader.finish()?;
    Ok(placement)
}

/// Line cursor that remembers where it is, so every error can name its line.
struct LineReader<'a> {
    lines: Lines<'a>,
    line: usize,
}

impl<'a> LineReader<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            lines: input.lines(),
            line: 0,
        }
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError {
            line: self.line,
            kind,
        }
    }

    fn next_line(&mut self, what: &'static str) -> Result<&'a str, ParseError> {
        match self.lines.next() {
            Some(line) => {
                self.line += 1;
                Ok(line)
            }
            None => Err(ParseError {
                line: self.line + 1,
                kind: ParseErrorKind::UnexpectedEof(what),
            }),
        }
    }

    fn tokens<T: FromStr>(&mut self, what: &'static str) -> Result<Vec<T>, ParseError> {
        let line = self.next_line(what)?;
        line.split_whitespace()
            .map(|token| {
                token
                    .parse::<T>()
                    .map_err(|_| self.error(ParseErrorKind::InvalidInteger(token.to_owned())))
            })
            .collect()
    }

    fn exactly<T: FromStr>(
        &mut self,
        what: &'static str,
        expected: usize,
    ) -> Result<Vec<T>, ParseError> {
        let tokens = self.tokens(what)?;
        if tokens.len() != expected {
            return Err(self.error(ParseErrorKind::TokenCount {
                what,
                expected,
                found: tokens.len(),
            }));
        }
        Ok(tokens)
    }

    fn fixed<T: FromStr, const N: usize>(
        &mut self,
        what: &'static str,
    ) -> Result<[T; N], ParseError> {
        let tokens = self.exactly::<T>(what, N)?;
        let found = tokens.len();
        tokens.try_into().map_err(|_| {
            self.error(ParseErrorKind::TokenCount {
                what,
                expected: N,
                found,
            })
        })
    }

    fn in_range(
        &self,
        what: &'static str,
        value: usize,
        limit: usize,
    ) -> Result<usize, ParseError> {
        if value < limit {
            Ok(value)
        } else {
            Err(self.error(ParseErrorKind::OutOfRange { what, value, limit }))
        }
    }

    /// Only blank lines may follow the declared content.
    fn finish(mut self) -> Result<(), ParseError> {
        while let Some(line) = self.lines.next() {
            self.line += 1;
            if !line.trim().is_empty() {
                return Err(self.error(ParseErrorKind::TrailingInput));
            }
        }
        Ok(())
    }
}
