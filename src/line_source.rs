//! Line-producing text sources.
//!
//! [`LineSource`] is the one capability the surrounding front-end needs from
//! a text stream: the next line, or end of stream. Lines keep their
//! terminator (`"\n"` or `"\r\n"`); the last line of a stream may lack one.
//! The broadcasting engine never uses this module.

use std::io::BufRead;

use crate::Result;

/// Produces lines of text until the stream ends.
pub trait LineSource {
    /// Next line including its terminator, or `None` at end of stream.
    fn next_line(&mut self) -> Result<Option<String>>;
}

impl<S: LineSource + ?Sized> LineSource for &mut S {
    fn next_line(&mut self) -> Result<Option<String>> {
        (**self).next_line()
    }
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn next_line(&mut self) -> Result<Option<String>> {
        (**self).next_line()
    }
}

/// [`LineSource`] over any buffered reader.
#[derive(Debug)]
pub struct ReaderLines<R> {
    reader: R,
}

impl<R: BufRead> ReaderLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead> LineSource for ReaderLines<R> {
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(line))
    }
}

/// [`LineSource`] over an in-memory string.
#[derive(Debug, Clone)]
pub struct StrLines<'a> {
    rest: &'a str,
}

impl<'a> StrLines<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { rest: text }
    }
}

impl LineSource for StrLines<'_> {
    fn next_line(&mut self) -> Result<Option<String>> {
        if self.rest.is_empty() {
            return Ok(None);
        }
        let end = self.rest.find('\n').map_or(self.rest.len(), |i| i + 1);
        let (line, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(Some(line.to_string()))
    }
}

/// Iterate a source's lines. Stops after the first error.
pub fn lines<S: LineSource>(source: S) -> Lines<S> {
    Lines {
        source,
        done: false,
    }
}

/// Iterator returned by [`lines`].
#[derive(Debug)]
pub struct Lines<S> {
    source: S,
    done: bool,
}

impl<S: LineSource> Iterator for Lines<S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.source.next_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
