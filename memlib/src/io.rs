use std::fs::File;
use std::io::Read;

use crate::error::TraceError;

/// Wraps a trace file in the fastest reader the platform offers.
pub fn get_reader(file: File) -> Result<impl Read, TraceError> {
    // Compatibility on other systems
    #[cfg(not(unix))]
    {
        use std::io::BufReader;
        // Keep reads aligned with whole records, 4096 is the standard block size (or a multiple of it) on most systems
        const BUFFER_SIZE: usize = crate::trace::RECORD_SIZE * 4096;
        Ok(BufReader::with_capacity(BUFFER_SIZE, file))
    }
    // Memory map the file for speed on unix systems
    #[cfg(unix)]
    {
        use std::io::Cursor;
        use memmap2::{Advice, Mmap};
        unsafe {
            let m = Mmap::map(&file)?;
            m.advise(Advice::Sequential)?;
            Ok(Cursor::new(m))
        }
    }
}
