use anyhow::{bail, Result};
use casefile_core::resolver::Confirmer;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

/// `y`/`yes` and `n`/`no`, any case; anything else asks again.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks on `output` and reads the answer from `input`, one line per try.
pub struct PromptConfirmer<R, W> {
    input: R,
    output: W,
}

impl PromptConfirmer<BufReader<tokio::io::Stdin>, std::io::Stdout> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
    }
}

impl<R, W> PromptConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }
}

#[async_trait::async_trait]
impl<R, W> Confirmer for PromptConfirmer<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: Write + Send,
{
    async fn confirm(&mut self, older: &Path, newer: &Path) -> Result<bool> {
        writeln!(self.output, "Possible duplicate:")?;
        writeln!(self.output, "  older: {}", older.display())?;
        writeln!(self.output, "  newer: {}", newer.display())?;
        loop {
            write!(self.output, "Delete the older file? (y/n) ")?;
            self.output.flush()?;
            let mut line = String::new();
            if self.input.read_line(&mut line).await? == 0 {
                bail!("input closed before an answer was given");
            }
            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(self.output, "Please answer y or n.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("n"), Some(false));
        assert_eq!(parse_answer("No\r\n"), Some(false));
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("maybe"), None);
    }
}
