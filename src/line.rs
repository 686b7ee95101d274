use log::warn;
use std::io::{self, BufRead, ErrorKind, Write};
use termion::event::Key;
use termion::input::TermRead;
use termion::raw::IntoRawMode;

const BELL: &str = "\x07";

/// Source of input lines for the shell.
pub trait LineSource {
    /// Reads one line holding at most `capacity - 1` characters.
    ///
    /// Returns `None` once input is exhausted.
    fn read_line(&mut self, capacity: usize) -> io::Result<Option<String>>;
}

/// Interactive terminal input, edited in raw mode.
pub struct Terminal;

impl LineSource for Terminal {
    fn read_line(&mut self, capacity: usize) -> io::Result<Option<String>> {
        // Raw mode lasts only while the line is typed.
        let mut stdout = io::stdout().into_raw_mode()?;
        let line = edit_line(io::stdin().keys(), &mut stdout, capacity);
        drop(stdout);
        line
    }
}

/// Non-interactive input such as a pipe or a script file.
pub struct Piped<R> {
    reader: R,
}

impl<R: BufRead> Piped<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineSource for Piped<R> {
    fn read_line(&mut self, capacity: usize) -> io::Result<Option<String>> {
        let mut buffer = Vec::new();
        if self.reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }
        let decoded = String::from_utf8_lossy(&buffer);
        let line = decoded.trim_end_matches(['\n', '\r']);

        let limit = capacity.saturating_sub(1);
        if line.chars().count() > limit {
            warn!("input line longer than {} characters was cut short", limit);
        }
        Ok(Some(line.chars().take(limit).collect()))
    }
}

/// Picks raw-mode editing when stdin is a terminal.
pub fn stdin_source() -> Box<dyn LineSource> {
    if termion::is_tty(&io::stdin()) {
        Box::new(Terminal)
    } else {
        Box::new(Piped::new(io::stdin().lock()))
    }
}

/// Builds a line from keystrokes, echoing to `out`.
///
/// Printable characters are echoed and kept while there is room. Backspace
/// erases the last character. Control characters, other special keys and
/// characters past capacity ring the bell instead. Ctrl-C abandons the line.
/// Ctrl-D on an empty line, or running out of keys with nothing typed, means
/// end of input. Bytes that do not decode to a key ring the bell and are
/// skipped.
pub fn edit_line<I, W>(keys: I, out: &mut W, capacity: usize) -> io::Result<Option<String>>
where
    I: IntoIterator<Item = io::Result<Key>>,
    W: Write,
{
    let mut buffer = String::new();
    let mut len = 0usize;

    for key in keys {
        let key = match key {
            Ok(key) => key,
            // termion reports undecodable input as `Other`.
            Err(e) if matches!(e.kind(), ErrorKind::InvalidData | ErrorKind::Other) => {
                warn!("skipping undecodable key: {}", e);
                write!(out, "{}", BELL)?;
                out.flush()?;
                continue;
            }
            Err(e) => return Err(e),
        };
        match key {
            Key::Char('\n') | Key::Char('\r') => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(Some(buffer));
            }
            Key::Ctrl('c') => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(Some(String::new()));
            }
            Key::Ctrl('d') if buffer.is_empty() => {
                write!(out, "\r\n")?;
                out.flush()?;
                return Ok(None);
            }
            Key::Backspace if len > 0 => {
                buffer.pop();
                len -= 1;
                // Move cursor back, erase char with space, move back again
                write!(out, "\x08 \x08")?;
            }
            Key::Char(c) if !c.is_control() && len + 1 < capacity => {
                buffer.push(c);
                len += 1;
                write!(out, "{}", c)?;
            }
            _ => write!(out, "{}", BELL)?,
        }
        out.flush()?;
    }

    Ok(if buffer.is_empty() { None } else { Some(buffer) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::tests::FakeHost;
    use crate::{Shell, ShellConfig};

    fn typed(keys: Vec<Key>, capacity: usize) -> (Option<String>, String) {
        let mut out = Vec::new();
        let line = edit_line(keys.into_iter().map(Ok), &mut out, capacity).unwrap();
        (line, String::from_utf8(out).unwrap())
    }

    fn chars(s: &str) -> Vec<Key> {
        s.chars().map(Key::Char).collect()
    }

    #[test]
    fn echoes_and_returns_the_line() {
        let mut keys = chars("ls -l");
        keys.push(Key::Char('\n'));
        let (line, out) = typed(keys, 64);
        assert_eq!(line.as_deref(), Some("ls -l"));
        assert_eq!(out, "ls -l\r\n");
    }

    #[test]
    fn backspace_erases() {
        let keys = vec![
            Key::Char('a'),
            Key::Char('b'),
            Key::Backspace,
            Key::Char('c'),
            Key::Char('\r'),
        ];
        let (line, out) = typed(keys, 64);
        assert_eq!(line.as_deref(), Some("ac"));
        assert_eq!(out, "ab\x08 \x08c\r\n");
    }

    #[test]
    fn backspace_on_empty_line_rings() {
        let (line, out) = typed(vec![Key::Backspace, Key::Char('\n')], 64);
        assert_eq!(line.as_deref(), Some(""));
        assert_eq!(out, "\x07\r\n");
    }

    #[test]
    fn control_characters_ring() {
        let keys = vec![Key::Char('\t'), Key::Char('x'), Key::Left, Key::Char('\n')];
        let (line, out) = typed(keys, 64);
        assert_eq!(line.as_deref(), Some("x"));
        assert_eq!(out, "\x07x\x07\r\n");
    }

    #[test]
    fn stops_accepting_at_capacity() {
        let mut keys = chars("abcdef");
        keys.push(Key::Char('\n'));
        let (line, out) = typed(keys, 4);
        assert_eq!(line.as_deref(), Some("abc"));
        assert_eq!(out, "abc\x07\x07\x07\r\n");
    }

    #[test]
    fn ctrl_c_discards_line() {
        let mut keys = chars("halt");
        keys.push(Key::Ctrl('c'));
        let (line, _) = typed(keys, 64);
        assert_eq!(line.as_deref(), Some(""));
    }

    #[test]
    fn ctrl_d_on_empty_line_is_end_of_input() {
        assert_eq!(typed(vec![Key::Ctrl('d')], 64).0, None);
        assert_eq!(typed(vec![], 64).0, None);

        let keys = vec![Key::Char('a'), Key::Ctrl('d'), Key::Char('\n')];
        assert_eq!(typed(keys, 64).0.as_deref(), Some("a"));
    }

    #[test]
    fn undecodable_keys_ring_and_are_skipped() {
        let keys = vec![
            Ok(Key::Char('a')),
            Err(io::Error::new(ErrorKind::InvalidData, "bad utf-8")),
            Ok(Key::Char('\n')),
        ];
        let mut out = Vec::new();
        let line = edit_line(keys, &mut out, 64).unwrap();
        assert_eq!(line.as_deref(), Some("a"));
        assert_eq!(out, b"a\x07\r\n");
    }

    #[test]
    fn invalid_utf8_line_does_not_end_the_shell() {
        let mut shell = Shell::new(ShellConfig::default(), FakeHost::default());
        let mut source = Piped::new(&b"\xff\nexit 3\n"[..]);
        let mut out = Vec::new();
        assert_eq!(shell.run(&mut source, &mut out).unwrap(), 3);
    }

    #[test]
    fn piped_invalid_utf8_is_replaced() {
        let mut source = Piped::new(&b"ec\xffho\n"[..]);
        assert_eq!(source.read_line(64).unwrap().as_deref(), Some("ec\u{fffd}ho"));
    }

    #[test]
    fn piped_lines_are_trimmed_and_bounded() {
        let mut source = Piped::new("exit 3\r\nabcdefgh\n".as_bytes());
        assert_eq!(source.read_line(64).unwrap().as_deref(), Some("exit 3"));
        assert_eq!(source.read_line(5).unwrap().as_deref(), Some("abcd"));
        assert_eq!(source.read_line(64).unwrap(), None);
    }
}
