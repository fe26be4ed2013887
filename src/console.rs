use std::io::{self, BufRead, Write};

/// Longest input line accepted; the rest of an overlong line is discarded.
pub const MAX_INPUT_SIZE: usize = 1024;

/// Interactive streams of a session. Redirection never touches these.
pub struct Console {
    pub input: Box<dyn BufRead>,
    pub out: Box<dyn Write>,
    pub err: Box<dyn Write>,
}

impl Console {
    pub fn new(input: Box<dyn BufRead>, out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        Self { input, out, err }
    }

    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
            Box::new(io::stderr()),
        )
    }

    /// Read one line of at most `MAX_INPUT_SIZE` bytes. `None` at end of input.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        read_bounded_line(&mut self.input, MAX_INPUT_SIZE)
    }
}

/// Read up to `limit` bytes of the next line, dropping anything past the
/// limit up to and including the newline. Returns `None` at end of input.
pub fn read_bounded_line<R: BufRead + ?Sized>(reader: &mut R, limit: usize) -> io::Result<Option<String>> {
    let mut line = Vec::new();
    let mut saw_any = false;

    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            break;
        }
        saw_any = true;

        let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
            Some(i) => (&available[..i], i + 1, true),
            None => (available, available.len(), false),
        };
        let room = limit.saturating_sub(line.len());
        line.extend_from_slice(&chunk[..chunk.len().min(room)]);
        reader.consume(consumed);

        if done {
            break;
        }
    }

    if !saw_any {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&line).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reads_lines_until_eof() {
        let mut input = Cursor::new("ls -l\npwd\nlast");
        assert_eq!(read_bounded_line(&mut input, 64).unwrap().as_deref(), Some("ls -l"));
        assert_eq!(read_bounded_line(&mut input, 64).unwrap().as_deref(), Some("pwd"));
        assert_eq!(read_bounded_line(&mut input, 64).unwrap().as_deref(), Some("last"));
        assert_eq!(read_bounded_line(&mut input, 64).unwrap(), None);
    }

    #[test]
    fn overlong_line_is_truncated_and_remainder_dropped() {
        let mut input = Cursor::new("abcdefghij\nnext\n");
        assert_eq!(read_bounded_line(&mut input, 4).unwrap().as_deref(), Some("abcd"));
        assert_eq!(read_bounded_line(&mut input, 4).unwrap().as_deref(), Some("next"));
    }

    #[test]
    fn empty_line_is_not_eof() {
        let mut input = Cursor::new("\n");
        assert_eq!(read_bounded_line(&mut input, 8).unwrap().as_deref(), Some(""));
        assert_eq!(read_bounded_line(&mut input, 8).unwrap(), None);
    }
}
