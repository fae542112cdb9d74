use std::io::{self, BufRead, Stderr, StdinLock, Write};

/// Line-oriented operator dialogue. Prompts go to `output`, answers come from `input`.
#[derive(Debug)]
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl Prompter<StdinLock<'static>, Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn say(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{message}")?;
        self.output.flush()
    }

    /// Returns the trimmed answer. End of input is reported as [`io::ErrorKind::UnexpectedEof`].
    pub fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        write!(self.output, "{prompt}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input closed before an answer was given",
            ));
        }

        Ok(line.trim().to_owned())
    }

    pub fn read_non_empty(&mut self, prompt: &str) -> io::Result<String> {
        loop {
            let answer = self.read_line(prompt)?;

            if !answer.is_empty() {
                return Ok(answer);
            }
        }
    }

    /// Yes/no question, an empty answer means no.
    pub fn confirm(&mut self, question: &str) -> io::Result<bool> {
        loop {
            let answer = self.read_line(&format!("{question} [y/N]: "))?;

            match answer.to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => self.say("Please answer 'y' or 'n'.")?,
            }
        }
    }
}
