//! Randomized robustness harness.
//!
//! Mutates seed files, feeds them through an injected parse entry point and
//! keeps every input that crashed, reported errors or ran over the wall-clock
//! ceiling. Reproducers are named by a content hash of the mutated bytes so
//! the same failure is only kept once. The harness is a pure consumer of the
//! parser: diagnostics arrive through a [`DiagnosticSink`] handed into the
//! parsing session, never through a process-global hook.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ripemd::{Digest, Ripemd160};

use crate::cfb::error::{CfbError, Result};
use crate::cfb::{DiagnosticLevel, DiagnosticSink};

/// Cap on how much of a seed file is read per run.
pub const MAX_SEED_SIZE: usize = 5000 * 512;

/// Default wall-clock ceiling for one parse run.
pub const MAX_DURATION: Duration = Duration::from_secs(2);

/// Diagnostics matching these substrings are known-benign and never count
/// as failures.
const DEFAULT_IGNORED: &[&str] = &["unknown property name"];

/// Apply 1 to `clamp(len/25, 4, 50)` single-byte mutations to `data`,
/// each optionally forcing the high bit.
pub fn mangle(data: &mut [u8], rng: &mut impl Rng) {
    if data.is_empty() {
        return;
    }
    let max_count = ((data.len() - 1) / 25).clamp(4, 50);
    let count = rng.gen_range(1..=max_count);
    for _ in 0..count {
        let offset = rng.gen_range(0..data.len());
        let mut value: u8 = rng.gen();
        if rng.gen_bool(0.5) {
            value |= 0x80;
        }
        data[offset] = value;
    }
}

/// Sink counting error diagnostics, with a benign-substring ignore list.
pub struct FilteringSink {
    ignored: Vec<String>,
    errors: Cell<u64>,
}

impl FilteringSink {
    pub fn new(ignored: Vec<String>) -> Self {
        Self {
            ignored,
            errors: Cell::new(0),
        }
    }

    /// Number of non-ignored error diagnostics seen so far.
    pub fn error_count(&self) -> u64 {
        self.errors.get()
    }
}

impl DiagnosticSink for FilteringSink {
    fn report(&self, level: DiagnosticLevel, message: &str) {
        if level != DiagnosticLevel::Error {
            return;
        }
        if self.ignored.iter().any(|pat| message.contains(pat)) {
            return;
        }
        self.errors.set(self.errors.get() + 1);
        warn!("parse diagnostic: {}", message);
    }
}

/// Outcome of one mutation run.
#[derive(Debug)]
pub struct RunReport {
    pub failed: bool,
    pub timed_out: bool,
    pub duration: Duration,
    /// Path of the saved reproducer, if the run failed. The file may
    /// predate this run when the same mutated content was already seen.
    pub reproducer: Option<PathBuf>,
}

/// Stress driver over a seed corpus and an injected parse entry point.
///
/// `parse` receives the mutated bytes and a per-run diagnostic sink; it is
/// expected to run the whole dissection (format sniffing included) and
/// return its overall result.
pub struct Fuzzer<P> {
    parse: P,
    seeds: Vec<PathBuf>,
    error_dir: PathBuf,
    max_duration: Duration,
    max_seed_size: usize,
    ignored: Vec<String>,
    rng: StdRng,
    nb_error: u64,
}

impl<P> std::fmt::Debug for Fuzzer<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fuzzer")
            .field("seeds", &self.seeds)
            .field("error_dir", &self.error_dir)
            .field("max_duration", &self.max_duration)
            .field("max_seed_size", &self.max_seed_size)
            .field("ignored", &self.ignored)
            .field("nb_error", &self.nb_error)
            .finish_non_exhaustive()
    }
}

impl<P> Fuzzer<P>
where
    P: FnMut(&[u8], &dyn DiagnosticSink) -> Result<()>,
{
    /// Build a fuzzer over every regular file in `seed_dirs`.
    ///
    /// # Errors
    /// A missing seed directory aborts the whole run; an empty corpus
    /// returns [`CfbError::EmptySeedCorpus`]. The error directory is
    /// created if it does not exist.
    pub fn new(seed_dirs: &[PathBuf], error_dir: impl Into<PathBuf>, parse: P) -> Result<Self> {
        let mut seeds = Vec::new();
        for dir in seed_dirs {
            for entry in fs::read_dir(dir)? {
                let entry = entry?;
                if entry.file_type()?.is_file() {
                    seeds.push(entry.path());
                }
            }
        }
        if seeds.is_empty() {
            return Err(CfbError::EmptySeedCorpus(seed_dirs.to_vec()));
        }
        let error_dir = error_dir.into();
        fs::create_dir_all(&error_dir)?;
        info!(
            "Stress corpus loaded: {} seed files, reproducers under {}",
            seeds.len(),
            error_dir.display()
        );
        Ok(Self {
            parse,
            seeds,
            error_dir,
            max_duration: MAX_DURATION,
            max_seed_size: MAX_SEED_SIZE,
            ignored: DEFAULT_IGNORED.iter().map(|s| s.to_string()).collect(),
            rng: StdRng::from_entropy(),
            nb_error: 0,
        })
    }

    /// Replace the random source (seedable for deterministic tests).
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Replace the wall-clock ceiling for one run.
    pub fn with_max_duration(mut self, ceiling: Duration) -> Self {
        self.max_duration = ceiling;
        self
    }

    /// Add a benign diagnostic substring to the ignore list.
    pub fn ignore_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.ignored.push(pattern.into());
        self
    }

    /// Total failed runs so far.
    pub fn error_count(&self) -> u64 {
        self.nb_error
    }

    /// Mutate one randomly chosen seed and classify the parse.
    pub fn run_once(&mut self) -> Result<RunReport> {
        let seed = self.seeds[self.rng.gen_range(0..self.seeds.len())].clone();
        debug!("total: {} errors -- test file: {}", self.nb_error, seed.display());

        let mut data = fs::read(&seed)?;
        data.truncate(self.max_seed_size);
        mangle(&mut data, &mut self.rng);

        let sink = FilteringSink::new(self.ignored.clone());
        let start = Instant::now();
        let parse_result = (self.parse)(&data, &sink);
        let duration = start.elapsed();

        let mut failed = sink.error_count() > 0;
        if let Err(e) = parse_result {
            warn!("parse failure on mutated {}: {}", seed.display(), e);
            failed = true;
        }
        let timed_out = duration > self.max_duration;
        if timed_out {
            warn!("run took {:.1?}, over the {:.1?} ceiling", duration, self.max_duration);
            failed = true;
        }

        let reproducer = if failed {
            Some(self.save_reproducer(&seed, &data, if timed_out { "timeout-" } else { "" })?)
        } else {
            None
        };
        Ok(RunReport {
            failed,
            timed_out,
            duration,
            reproducer,
        })
    }

    /// Loop [`run_once`](Self::run_once) until interrupted or an I/O error
    /// stops the harness.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.run_once()?;
        }
    }

    /// Write the mutated bytes under a content-hash name, deduplicating
    /// runs that produced identical content.
    fn save_reproducer(&mut self, seed: &Path, data: &[u8], prefix: &str) -> Result<PathBuf> {
        self.nb_error += 1;
        let digest = Ripemd160::digest(data);
        let basename = seed
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "seed".to_string());
        let name = format!("{}{}-{}", prefix, hex::encode(digest), basename);
        let path = self.error_dir.join(name);
        if path.exists() {
            debug!("duplicate reproducer, keeping {}", path.display());
        } else {
            fs::write(&path, data)?;
            info!("=> ERROR: {}", path.display());
        }
        Ok(path)
    }
}
