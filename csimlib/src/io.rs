use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;
use crate::error::SimulationError;

/// Opens a trace file for reading
pub fn open_trace(path: &Path) -> Result<Box<dyn BufRead>, SimulationError> {
    let unavailable = |source: io::Error| SimulationError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(unavailable)?;
    get_reader(file).map_err(unavailable)
}

pub fn get_reader(file: File) -> io::Result<Box<dyn BufRead>> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        // Traces are read a line at a time, so a large buffer saves on read calls
        const BUFFER_SIZE: usize = 64 * 4096;
        Ok(Box::new(BufReader::with_capacity(BUFFER_SIZE, file)))
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use std::io::{BufReader, Cursor};
        use memmap2::{Advice, Mmap};
        // Nothing to map
        if file.metadata()?.len() == 0 {
            return Ok(Box::new(BufReader::new(file)));
        }
        // The trace is only ever read front to back
        let m = unsafe { Mmap::map(&file)? };
        m.advise(Advice::Sequential)?;
        Ok(Box::new(Cursor::new(m)))
    }
}
