use crate::engines::generation::genome::Genome;
use crate::error::Result;
use crate::types::GenerationRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Append-only table: a header naming every free parameter, then one row
/// per generation with the best organism's values.
pub struct GenerationLog {
    path: PathBuf,
    keys: Vec<String>,
    writer: BufWriter<File>,
}

impl GenerationLog {
    pub fn create<P: AsRef<Path>>(path: P, keys: Vec<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut writer = BufWriter::new(File::create(&path)?);
        write!(writer, "generation best_fitness")?;
        for key in &keys {
            write!(writer, " {}", key)?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(Self { path, keys, writer })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &GenerationRecord, best: &Genome) -> Result<()> {
        write!(self.writer, "{} {}", record.generation, record.best_fitness)?;
        for key in &self.keys {
            match best.get(key) {
                Some(value) => write!(self.writer, " {}", value)?,
                None => write!(self.writer, " nan")?,
            }
        }
        writeln!(self.writer)?;
        // Flushed per row so the log is readable while the run continues
        self.writer.flush()?;
        Ok(())
    }
}
