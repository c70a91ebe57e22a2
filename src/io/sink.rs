//! Per-generation result consumers.

use std::path::{Path, PathBuf};

use crate::compute::Frame;
use crate::schema::IterationResult;

use super::image_source::{ImageError, save_png};

/// Receives one record per generation together with that generation's best render.
pub trait ResultSink {
    fn consume(&mut self, result: &IterationResult, frame: &Frame) -> Result<(), ImageError>;
}

impl<F> ResultSink for F
where
    F: FnMut(&IterationResult, &Frame),
{
    fn consume(&mut self, result: &IterationResult, frame: &Frame) -> Result<(), ImageError> {
        self(result, frame);
        Ok(())
    }
}

/// Logs every `every`-th generation at info level.
#[derive(Debug, Clone)]
pub struct LogSink {
    every: usize,
}

impl LogSink {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new(10)
    }
}

impl ResultSink for LogSink {
    fn consume(&mut self, result: &IterationResult, _frame: &Frame) -> Result<(), ImageError> {
        if result.generation % self.every == 0 {
            log::info!(
                "Gen {:5}: best {:.6} (MSE {:.2}), worst {:.6}, mean {:.6}, elite {:.6}",
                result.generation,
                result.best_fitness,
                result.best_mse,
                result.worst_fitness,
                result.mean_fitness,
                result.elite_fitness
            );
        }
        Ok(())
    }
}

/// Writes the best render of every `every`-th generation to `dir/gen_NNNNNN.png`.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    dir: PathBuf,
    every: usize,
    written: usize,
}

impl SnapshotSink {
    /// Create the sink, creating `dir` if needed.
    pub fn new(dir: impl Into<PathBuf>, every: usize) -> Result<Self, ImageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ImageError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            every: every.max(1),
            written: 0,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of snapshots written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    fn path_for(&self, generation: usize) -> PathBuf {
        self.dir.join(format!("gen_{:06}.png", generation))
    }
}

impl ResultSink for SnapshotSink {
    fn consume(&mut self, result: &IterationResult, frame: &Frame) -> Result<(), ImageError> {
        if result.generation % self.every == 0 {
            save_png(frame, self.path_for(result.generation))?;
            self.written += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{FileImageSource, ImageSource};
    use tempfile::TempDir;

    fn result(generation: usize) -> IterationResult {
        IterationResult {
            generation,
            best_slot: 0,
            best_fitness: 0.5,
            worst_fitness: 0.1,
            mean_fitness: 0.3,
            best_mse: 1.0,
            elite_fitness: 0.5,
            improved: false,
        }
    }

    #[test]
    fn test_snapshot_sink_writes_every_nth() {
        let dir = TempDir::new().unwrap();
        let mut sink = SnapshotSink::new(dir.path().join("frames"), 2).unwrap();
        let frame = Frame::filled(2, 2, [1, 2, 3, 255]);

        for generation in 1..=5 {
            sink.consume(&result(generation), &frame).unwrap();
        }
        assert_eq!(sink.written(), 2);
        assert!(sink.dir().join("gen_000002.png").exists());
        assert!(sink.dir().join("gen_000004.png").exists());
        assert!(!sink.dir().join("gen_000003.png").exists());

        let loaded = FileImageSource::new()
            .load(&sink.dir().join("gen_000004.png"))
            .unwrap();
        assert_eq!(loaded, frame);
    }

    #[test]
    fn test_closure_sink() {
        let mut generations = Vec::new();
        let mut sink = |r: &IterationResult, _: &Frame| generations.push(r.generation);
        let frame = Frame::new(1, 1);
        sink.consume(&result(3), &frame).unwrap();
        sink.consume(&result(4), &frame).unwrap();
        assert_eq!(generations, vec![3, 4]);
    }

    #[test]
    fn test_log_sink_never_fails() {
        let mut sink = LogSink::new(0);
        let frame = Frame::new(1, 1);
        for generation in 0..3 {
            sink.consume(&result(generation), &frame).unwrap();
        }
    }
}
