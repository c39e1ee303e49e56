use crate::config::MAX_ARGS;

const WHITESPACE: [char; 4] = ['\t', '\r', '\n', ' '];

/// Ordered command arguments, borrowed from the caller's line buffer.
///
/// Entries alias the original input and are only valid while that buffer
/// is; the lifetime ties them together. Capacity is fixed, nothing here
/// allocates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Args<'a> {
    toks: [&'a str; MAX_ARGS],
    len: usize,
}

impl<'a> Args<'a> {
    pub fn empty() -> Self {
        Self {
            toks: [""; MAX_ARGS],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, idx: usize) -> Option<&'a str> {
        (idx < self.len).then(|| self.toks[idx])
    }

    /// The command name, when there is one.
    pub fn first(&self) -> Option<&'a str> {
        self.get(0)
    }

    pub fn as_slice(&self) -> &[&'a str] {
        &self.toks[..self.len]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizeError {
    /// More than `MAX_ARGS` tokens; the command must not be executed.
    TooManyArgs,
}

/// Split a line into whitespace-separated tokens.
///
/// Whitespace is tab, CR, LF and space. Empty or all-whitespace input
/// yields zero tokens. Exceeding `MAX_ARGS` is an error rather than a
/// silent truncation.
pub fn tokenize(line: &str) -> Result<Args<'_>, TokenizeError> {
    let mut args = Args::empty();
    for tok in line.split(WHITESPACE).filter(|t| !t.is_empty()) {
        if args.len == MAX_ARGS {
            return Err(TokenizeError::TooManyArgs);
        }
        args.toks[args.len] = tok;
        args.len += 1;
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_whitespace_is_ignored() {
        let args = tokenize("help  ").unwrap();
        assert_eq!(args.as_slice(), &["help"]);
    }

    #[test]
    fn empty_and_blank_lines_yield_no_tokens() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize(" \t\r\n ").unwrap().is_empty());
    }

    #[test]
    fn splits_on_every_whitespace_kind() {
        let args = tokenize("a\tb\rc\nd e").unwrap();
        assert_eq!(args.as_slice(), &["a", "b", "c", "d", "e"]);
        assert_eq!(args.first(), Some("a"));
        assert_eq!(args.get(4), Some("e"));
        assert_eq!(args.get(5), None);
    }

    #[test]
    fn accepts_exactly_max_args() {
        let line = (0..MAX_ARGS)
            .map(|i| format!("t{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let args = tokenize(&line).unwrap();
        assert_eq!(args.len(), MAX_ARGS);
    }

    #[test]
    fn rejects_more_than_max_args() {
        let line = (0..MAX_ARGS + 1)
            .map(|i| format!("t{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        assert_eq!(tokenize(&line), Err(TokenizeError::TooManyArgs));
    }
}
