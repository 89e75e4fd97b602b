/// Re-chunks driver buffers of arbitrary size into fixed-size chunks.
///
/// Drivers without a fixed frames-per-buffer mode hand over whatever the
/// device produced; the assembler accumulates those samples and emits one
/// chunk per `chunk_len` interleaved samples, carrying the remainder over.
/// The staging buffer is allocated once, so `push` does not allocate on
/// the audio thread.
#[derive(Debug)]
pub struct ChunkAssembler<T> {
    staging: Vec<T>,
    chunk_len: usize,
}

impl<T: Copy> ChunkAssembler<T> {
    /// Panics if `chunk_len` is 0.
    pub fn new(chunk_len: usize) -> Self {
        assert!(chunk_len > 0, "chunk length must be positive");
        Self {
            staging: Vec::with_capacity(chunk_len),
            chunk_len,
        }
    }

    /// Feed driver samples, calling `emit` for every completed chunk.
    pub fn push(&mut self, mut samples: &[T], mut emit: impl FnMut(&[T])) {
        while !samples.is_empty() {
            if self.staging.is_empty() && samples.len() >= self.chunk_len {
                // whole chunks straight from the driver buffer
                let (chunk, rest) = samples.split_at(self.chunk_len);
                emit(chunk);
                samples = rest;
                continue;
            }

            let wanted = self.chunk_len - self.staging.len();
            let take = wanted.min(samples.len());
            self.staging.extend_from_slice(&samples[..take]);
            samples = &samples[take..];

            if self.staging.len() == self.chunk_len {
                emit(&self.staging);
                self.staging.clear();
            }
        }
    }

    /// Samples waiting for the next chunk.
    pub fn pending(&self) -> usize {
        self.staging.len()
    }

    pub fn chunk_len(&self) -> usize {
        self.chunk_len
    }

    /// Drop any partial chunk.
    pub fn reset(&mut self) {
        self.staging.clear();
    }
}
